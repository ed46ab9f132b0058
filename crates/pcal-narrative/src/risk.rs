//! Safety scoring over equal-length windows.
//!
//! `safety = 100 × (1 − (0.6 × failure_rate + 0.4 × override_rate))`.
//! A window with no decisions scores 100.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use pcal_core::models::{Decision, SafetyTrend, WindowStats};

pub const FAILURE_WEIGHT: f64 = 0.6;
pub const OVERRIDE_WEIGHT: f64 = 0.4;
/// Score movement smaller than this is reported as `Same`.
pub const TREND_DEAD_BAND: f64 = 5.0;

/// Stats for decisions with `from < timestamp <= to`.
pub fn window_stats(
    decisions: &[Decision],
    overridden_ids: &HashSet<String>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> WindowStats {
    let mut stats = WindowStats {
        from: Some(from),
        to: Some(to),
        ..Default::default()
    };

    for d in decisions
        .iter()
        .filter(|d| d.timestamp > from && d.timestamp <= to)
    {
        stats.decisions += 1;
        if d.outcome.is_failure() {
            stats.failures += 1;
        }
        if overridden_ids.contains(&d.id) {
            stats.overridden += 1;
        }
    }

    if stats.decisions > 0 {
        let total = stats.decisions as f64;
        stats.failure_rate = stats.failures as f64 / total;
        stats.override_rate = stats.overridden as f64 / total;
    }
    stats.safety_score = safety_score(stats.failure_rate, stats.override_rate);
    stats
}

pub fn safety_score(failure_rate: f64, override_rate: f64) -> f64 {
    (100.0 * (1.0 - (FAILURE_WEIGHT * failure_rate + OVERRIDE_WEIGHT * override_rate)))
        .clamp(0.0, 100.0)
}

/// Compare two windows. With no history to compare against the trend is
/// `Same`.
pub fn safety_trend(current: &WindowStats, previous: &WindowStats) -> SafetyTrend {
    if previous.decisions == 0 {
        return SafetyTrend::Same;
    }
    let delta = current.safety_score - previous.safety_score;
    if delta > TREND_DEAD_BAND {
        SafetyTrend::Safer
    } else if delta < -TREND_DEAD_BAND {
        SafetyTrend::Riskier
    } else {
        SafetyTrend::Same
    }
}
