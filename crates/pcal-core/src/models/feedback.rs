//! Feedback loop models: recommendations, signals and cycle results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationAction {
    Escalate,
    Block,
    LowerAutomationConfidence,
    RequireSecondApproval,
    ReviewPolicy,
}

str_enum!(RecommendationAction, "recommendation action", {
    Escalate => "escalate",
    Block => "block",
    LowerAutomationConfidence => "lower_automation_confidence",
    RequireSecondApproval => "require_second_approval",
    ReviewPolicy => "review_policy",
});

/// Two-state lifecycle: `Pending` → `Acknowledged` (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Pending,
    Acknowledged,
}

str_enum!(RecommendationStatus, "recommendation status", {
    Pending => "pending",
    Acknowledged => "acknowledged",
});

/// The rule that raised a feedback signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackRule {
    OverrideFrequency,
    IncidentLinkedPattern,
    RepeatedMistake,
    CriticalPattern,
    BypassedPolicy,
}

str_enum!(FeedbackRule, "feedback rule", {
    OverrideFrequency => "override_frequency",
    IncidentLinkedPattern => "incident_linked_pattern",
    RepeatedMistake => "repeated_mistake",
    CriticalPattern => "critical_pattern",
    BypassedPolicy => "bypassed_policy",
});

impl FeedbackRule {
    pub fn action(&self) -> RecommendationAction {
        match self {
            Self::OverrideFrequency | Self::IncidentLinkedPattern => {
                RecommendationAction::LowerAutomationConfidence
            }
            Self::RepeatedMistake => RecommendationAction::RequireSecondApproval,
            Self::CriticalPattern => RecommendationAction::Escalate,
            Self::BypassedPolicy => RecommendationAction::ReviewPolicy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub action: RecommendationAction,
    pub target: String,
    pub reason: String,
    pub rule: FeedbackRule,
    pub status: RecommendationStatus,
    pub created_at: DateTime<Utc>,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl Recommendation {
    pub fn is_pending(&self) -> bool {
        self.status == RecommendationStatus::Pending
    }
}

/// One rule hit in a feedback cycle, before deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSignal {
    pub rule: FeedbackRule,
    pub target: String,
    pub detail: String,
    /// Whether this hit produced a new recommendation.
    pub produced_recommendation: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackState {
    pub cycles_run: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub pending_recommendations: usize,
    pub acknowledged_recommendations: usize,
    /// Multipliers that differ from 1.0, keyed by source name.
    pub confidence_adjustments: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackCycleResult {
    pub signals_detected: usize,
    pub recommendations_generated: usize,
    pub signals: Vec<FeedbackSignal>,
    pub state: FeedbackState,
}
