//! Decision model: the immutable ledger record and its enums.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One governance event. Immutable once it leaves the ledger's ingest path;
/// everything learned about it later lives in separate records keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub source: DecisionSource,
    pub domain: DecisionDomain,
    pub outcome: DecisionOutcome,
    pub reason: String,
    /// 0-100.
    pub confidence: f64,
    /// Ordered as supplied by the producer.
    pub signals: Vec<Signal>,
    pub authority: AuthorityType,
    /// Always present when `authority` is `Human`.
    pub actor: Option<String>,
    pub reversible: bool,
    /// The entity acted on (rollout id, flag key, route).
    pub target: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
    /// blake3 over the canonical field ordering, `id` excluded.
    pub signature: String,
}

impl Decision {
    /// Display name of whoever holds authority for this decision.
    pub fn authority_label(&self) -> String {
        match (&self.authority, &self.actor) {
            (_, Some(actor)) => format!("{} ({})", actor, self.authority),
            (authority, None) => format!("{} via {}", authority, self.source),
        }
    }

    /// Whether this outcome stopped or flagged the action.
    pub fn is_adverse(&self) -> bool {
        self.outcome.is_adverse()
    }
}

/// A weighted piece of evidence a producer attached to a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub name: String,
    pub value: serde_json::Value,
    pub weight: f64,
    pub source: String,
}

impl Signal {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
        weight: f64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            weight,
            source: source.into(),
        }
    }

    /// `name=value` rendering used in evidence lists.
    pub fn evidence_line(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => format!("{}={}", self.name, s),
            other => format!("{}={}", self.name, other),
        }
    }
}

/// The subsystem that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Cutover,
    Governor,
    LoadController,
    Incident,
    Override,
    Manual,
}

str_enum!(DecisionSource, "decision source", {
    Cutover => "cutover",
    Governor => "governor",
    LoadController => "load_controller",
    Incident => "incident",
    Override => "override",
    Manual => "manual",
});

/// The platform area a decision applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionDomain {
    Platform,
    Feature,
    Traffic,
    Deployment,
    Content,
    Experiment,
}

str_enum!(DecisionDomain, "decision domain", {
    Platform => "platform",
    Feature => "feature",
    Traffic => "traffic",
    Deployment => "deployment",
    Content => "content",
    Experiment => "experiment",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Approved,
    Blocked,
    Warning,
    Escalated,
}

str_enum!(DecisionOutcome, "decision outcome", {
    Approved => "approved",
    Blocked => "blocked",
    Warning => "warning",
    Escalated => "escalated",
});

impl DecisionOutcome {
    /// Blocked and escalated outcomes count as failures in risk scoring.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Blocked | Self::Escalated)
    }

    /// Anything other than a clean approval.
    pub fn is_adverse(&self) -> bool {
        !matches!(self, Self::Approved)
    }

    /// The outcome an override of this outcome produces.
    pub fn overridden(&self) -> Self {
        match self {
            Self::Approved => Self::Blocked,
            _ => Self::Approved,
        }
    }
}

/// Who held the authority to make a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityType {
    System,
    Policy,
    Human,
}

str_enum!(AuthorityType, "authority type", {
    System => "system",
    Policy => "policy",
    Human => "human",
});

/// Optional fields for `ingest_decision`.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Defaults to 50.
    pub confidence: Option<f64>,
    pub signals: Vec<Signal>,
    /// Defaults to `System`.
    pub authority: Option<AuthorityType>,
    pub actor: Option<String>,
    /// Defaults to true.
    pub reversible: Option<bool>,
    pub target: Option<String>,
    pub metadata: BTreeMap<String, String>,
    /// Backfill timestamp for replayed history. Defaults to the clock.
    pub timestamp: Option<DateTime<Utc>>,
}

impl IngestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn signal(mut self, signal: Signal) -> Self {
        self.signals.push(signal);
        self
    }

    pub fn authority(mut self, authority: AuthorityType) -> Self {
        self.authority = Some(authority);
        self
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn reversible(mut self, reversible: bool) -> Self {
        self.reversible = Some(reversible);
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Ledger aggregate, computed fresh on every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionStats {
    pub total: usize,
    pub avg_confidence: f64,
    pub outcome_breakdown: BTreeMap<DecisionOutcome, usize>,
    pub source_breakdown: BTreeMap<DecisionSource, usize>,
    pub authority_breakdown: BTreeMap<AuthorityType, usize>,
    pub human_decisions: usize,
    pub irreversible_decisions: usize,
    /// Decisions dropped by oldest-first eviction since the last reset.
    pub evicted_total: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}
