//! Recurring decision patterns and repeated mistakes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DecisionDomain, DecisionOutcome, DecisionSource};

/// The recurring shape a pattern is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternSignature {
    pub source: DecisionSource,
    pub domain: DecisionDomain,
    pub outcome: DecisionOutcome,
}

impl PatternSignature {
    /// Stable key, e.g. `cutover:deployment:blocked`.
    pub fn key(&self) -> String {
        format!("{}:{}:{}", self.source, self.domain, self.outcome)
    }

    pub fn display_name(&self) -> String {
        format!(
            "Recurring {} {} decisions from {}",
            self.outcome, self.domain, self.source
        )
    }
}

/// Ordered low → critical so `max()` picks the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSeverity {
    Low,
    Medium,
    High,
    Critical,
}

str_enum!(PatternSeverity, "pattern severity", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

impl PatternSeverity {
    /// Banding on occurrences relative to the detection threshold.
    /// Monotonic in `occurrences`.
    pub fn from_occurrences(occurrences: usize, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        if occurrences >= threshold.saturating_mul(4) {
            Self::Critical
        } else if occurrences >= threshold.saturating_mul(3) {
            Self::High
        } else if occurrences >= threshold.saturating_mul(2) {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternTrend {
    Increasing,
    Stable,
    Decreasing,
}

str_enum!(PatternTrend, "pattern trend", {
    Increasing => "increasing",
    Stable => "stable",
    Decreasing => "decreasing",
});

impl PatternTrend {
    pub fn between(current: usize, previous: usize) -> Self {
        match current.cmp(&previous) {
            std::cmp::Ordering::Greater => Self::Increasing,
            std::cmp::Ordering::Equal => Self::Stable,
            std::cmp::Ordering::Less => Self::Decreasing,
        }
    }
}

/// The one mutable aggregate in the model. Replaced whole on every scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub signature: PatternSignature,
    pub name: String,
    /// Count in the current window.
    pub occurrences: usize,
    /// Count in the preceding window of equal length.
    pub previous_occurrences: usize,
    pub severity: PatternSeverity,
    pub trend: PatternTrend,
    /// Decisions counted in the current window, oldest first.
    pub decision_ids: Vec<String>,
    pub first_detected_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pattern {
    pub fn key(&self) -> String {
        self.signature.key()
    }

    /// True when the scan-derived fields differ.
    pub fn differs_from(&self, other: &Pattern) -> bool {
        self.occurrences != other.occurrences
            || self.previous_occurrences != other.previous_occurrences
            || self.severity != other.severity
            || self.trend != other.trend
    }
}

/// A pattern in which an override was later tied to an incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatedMistake {
    pub id: String,
    pub pattern_key: String,
    pub signature: PatternSignature,
    pub occurrences: usize,
    pub overridden_decision_ids: Vec<String>,
    pub incident_ids: Vec<String>,
    pub description: String,
    pub recommendation: String,
    pub detected_at: DateTime<Utc>,
}
