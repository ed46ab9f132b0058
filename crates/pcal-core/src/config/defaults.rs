//! Default values for every `PcalConfig` field.

pub const DEFAULT_ENABLED: bool = true;
pub const DEFAULT_MAX_DECISIONS: usize = 10_000;
pub const DEFAULT_PATTERN_THRESHOLD: usize = 3;
pub const DEFAULT_PATTERN_WINDOW_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_OVERRIDE_THRESHOLD: usize = 3;
pub const DEFAULT_FEEDBACK_LOOKBACK_SECS: u64 = 7 * 24 * 60 * 60;
pub const DEFAULT_RISK_WINDOW_SECS: u64 = 7 * 24 * 60 * 60;
pub const DEFAULT_MIN_LINK_CONFIDENCE: f64 = 50.0;
pub const DEFAULT_MIN_CONFIDENCE_MULTIPLIER: f64 = 0.1;
pub const DEFAULT_CONFIDENCE_STEP: f64 = 0.1;
pub const DEFAULT_AUTO_ADJUST: bool = false;
pub const DEFAULT_MAX_SNAPSHOTS: usize = 50;
pub const DEFAULT_MAX_ACKNOWLEDGED_RECOMMENDATIONS: usize = 500;

/// Environment variable that force-enables or disables the whole layer.
pub const ENABLED_ENV_VAR: &str = "PCAL_ENABLED";

/// Upper bound for any window length (ten years).
pub const MAX_WINDOW_SECS: u64 = 10 * 365 * 24 * 60 * 60;
