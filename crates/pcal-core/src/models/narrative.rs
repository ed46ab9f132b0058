//! Computed-on-demand report views. Owned by the caller, never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PatternSeverity, PatternTrend};

/// Closed set of analytical questions the narrative generator answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeQuery {
    WhyRolloutFailed,
    WhyFeatureBlocked,
    RiskiestArea,
    SafetyTrend,
    OverrideActivity,
    RepeatedMistakes,
}

str_enum!(NarrativeQuery, "narrative query", {
    WhyRolloutFailed => "why_rollout_failed",
    WhyFeatureBlocked => "why_feature_blocked",
    RiskiestArea => "riskiest_area",
    SafetyTrend => "safety_trend",
    OverrideActivity => "override_activity",
    RepeatedMistakes => "repeated_mistakes",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeRequest {
    pub query: NarrativeQuery,
    /// Narrows rollout/feature queries to one decision target.
    pub target: Option<String>,
}

impl NarrativeRequest {
    pub fn new(query: NarrativeQuery) -> Self {
        Self {
            query,
            target: None,
        }
    }

    pub fn for_target(query: NarrativeQuery, target: impl Into<String>) -> Self {
        Self {
            query,
            target: Some(target.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub query: NarrativeQuery,
    pub headline: String,
    pub summary: String,
    pub root_causes: Vec<String>,
    pub recommendations: Vec<String>,
    pub evidence_decision_ids: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyTrend {
    Safer,
    Same,
    Riskier,
}

str_enum!(SafetyTrend, "safety trend", {
    Safer => "safer",
    Same => "same",
    Riskier => "riskier",
});

/// Rates over one risk window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub decisions: usize,
    pub failures: usize,
    pub overridden: usize,
    pub failure_rate: f64,
    pub override_rate: f64,
    pub safety_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskItem {
    pub pattern_key: String,
    pub name: String,
    pub severity: PatternSeverity,
    pub trend: PatternTrend,
    pub occurrences: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// 0-100, higher is safer.
    pub safety_score: f64,
    pub safety_trend: SafetyTrend,
    pub current_window: WindowStats,
    pub previous_window: WindowStats,
    pub top_risks: Vec<RiskItem>,
    pub top_opportunities: Vec<RiskItem>,
    pub pending_recommendations: usize,
    pub active_overrides: usize,
    pub generated_at: DateTime<Utc>,
}

impl Default for RiskReport {
    fn default() -> Self {
        Self {
            safety_score: 100.0,
            safety_trend: SafetyTrend::Same,
            current_window: WindowStats::default(),
            previous_window: WindowStats::default(),
            top_risks: Vec::new(),
            top_opportunities: Vec::new(),
            pending_recommendations: 0,
            active_overrides: 0,
            generated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}
