//! Accountability layer configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::defaults::*;
use crate::errors::{PcalError, PcalResult};

/// Configuration for every PCAL component.
///
/// Loaded from TOML (`pcal.toml`); missing fields fall back to
/// defaults. Call [`PcalConfig::validate`] before handing it to a runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcalConfig {
    /// Feature gate. When false the runtime turns every call into a no-op.
    pub enabled: bool,

    // Decision stream
    /// Ledger capacity; the oldest decision is evicted past this size.
    pub max_decisions: usize,

    // Platform memory
    /// A signature must occur more than this many times in one window.
    pub pattern_threshold: usize,
    pub pattern_window_secs: u64,
    pub max_snapshots: usize,

    // Feedback loop
    pub override_threshold: usize,
    pub feedback_lookback_secs: u64,
    /// Minimum `caused_by` link confidence (0-100) counted as evidence.
    pub min_link_confidence: f64,
    /// Floor for confidence multipliers, never zero.
    pub min_confidence_multiplier: f64,
    /// Delta applied per automatic adjustment.
    pub confidence_step: f64,
    pub auto_adjust: bool,
    /// Acknowledged recommendations kept; the oldest are dropped first.
    pub max_acknowledged_recommendations: usize,

    // Narrative generator
    pub risk_window_secs: u64,
}

impl Default for PcalConfig {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_ENABLED,
            max_decisions: DEFAULT_MAX_DECISIONS,
            pattern_threshold: DEFAULT_PATTERN_THRESHOLD,
            pattern_window_secs: DEFAULT_PATTERN_WINDOW_SECS,
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
            override_threshold: DEFAULT_OVERRIDE_THRESHOLD,
            feedback_lookback_secs: DEFAULT_FEEDBACK_LOOKBACK_SECS,
            min_link_confidence: DEFAULT_MIN_LINK_CONFIDENCE,
            min_confidence_multiplier: DEFAULT_MIN_CONFIDENCE_MULTIPLIER,
            confidence_step: DEFAULT_CONFIDENCE_STEP,
            auto_adjust: DEFAULT_AUTO_ADJUST,
            max_acknowledged_recommendations: DEFAULT_MAX_ACKNOWLEDGED_RECOMMENDATIONS,
            risk_window_secs: DEFAULT_RISK_WINDOW_SECS,
        }
    }
}

impl PcalConfig {
    /// Load config from a TOML string, falling back to defaults for missing fields.
    pub fn from_toml(toml_str: &str) -> PcalResult<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Apply `PCAL_ENABLED` if it is set to a recognizable boolean.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var(ENABLED_ENV_VAR) {
            match parse_bool(&raw) {
                Some(enabled) => self.enabled = enabled,
                None => tracing::warn!(
                    var = ENABLED_ENV_VAR,
                    value = %raw,
                    "Ignoring unrecognized boolean in environment"
                ),
            }
        }
        self
    }

    /// Reject configurations the components cannot run with.
    pub fn validate(&self) -> PcalResult<()> {
        if self.max_decisions == 0 {
            return Err(PcalError::Config("max_decisions must be > 0".into()));
        }
        if self.pattern_threshold == 0 {
            return Err(PcalError::Config("pattern_threshold must be > 0".into()));
        }
        if self.pattern_window_secs == 0 {
            return Err(PcalError::Config("pattern_window_secs must be > 0".into()));
        }
        if self.max_snapshots == 0 {
            return Err(PcalError::Config("max_snapshots must be > 0".into()));
        }
        if self.override_threshold == 0 {
            return Err(PcalError::Config("override_threshold must be > 0".into()));
        }
        if self.max_acknowledged_recommendations == 0 {
            return Err(PcalError::Config(
                "max_acknowledged_recommendations must be > 0".into(),
            ));
        }
        if self.feedback_lookback_secs == 0 {
            return Err(PcalError::Config("feedback_lookback_secs must be > 0".into()));
        }
        if self.risk_window_secs == 0 {
            return Err(PcalError::Config("risk_window_secs must be > 0".into()));
        }
        for (name, value) in [
            ("pattern_window_secs", self.pattern_window_secs),
            ("feedback_lookback_secs", self.feedback_lookback_secs),
            ("risk_window_secs", self.risk_window_secs),
        ] {
            if value > MAX_WINDOW_SECS {
                return Err(PcalError::Config(format!(
                    "{name} must be <= {MAX_WINDOW_SECS}, got {value}"
                )));
            }
        }
        if !(0.0..=100.0).contains(&self.min_link_confidence) {
            return Err(PcalError::Config(format!(
                "min_link_confidence must be within 0-100, got {}",
                self.min_link_confidence
            )));
        }
        if !(self.min_confidence_multiplier > 0.0 && self.min_confidence_multiplier <= 1.0) {
            return Err(PcalError::Config(format!(
                "min_confidence_multiplier must be within (0, 1], got {}",
                self.min_confidence_multiplier
            )));
        }
        if !(self.confidence_step > 0.0 && self.confidence_step <= 1.0) {
            return Err(PcalError::Config(format!(
                "confidence_step must be within (0, 1], got {}",
                self.confidence_step
            )));
        }
        Ok(())
    }

    pub fn pattern_window(&self) -> Duration {
        secs(self.pattern_window_secs)
    }

    pub fn feedback_lookback(&self) -> Duration {
        secs(self.feedback_lookback_secs)
    }

    pub fn risk_window(&self) -> Duration {
        secs(self.risk_window_secs)
    }
}

fn secs(value: u64) -> Duration {
    Duration::seconds(value.min(MAX_WINDOW_SECS) as i64)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        PcalConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn window_helpers_convert_seconds() {
        let config = PcalConfig {
            pattern_window_secs: 120,
            ..Default::default()
        };
        assert_eq!(config.pattern_window(), Duration::minutes(2));
    }
}
