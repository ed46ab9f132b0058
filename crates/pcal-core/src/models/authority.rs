//! Authority records: approvals, overrides and the resolved chain.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{AuthorityType, DecisionOutcome};

/// An explicit sign-off, independent of any single decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub id: String,
    pub approved_by: String,
    pub authority_type: AuthorityType,
    /// Matched against a decision's id, target, domain or source.
    pub target: String,
    pub justification: String,
    pub timestamp: DateTime<Utc>,
}

/// A time-bounded human action superseding an automated decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
    pub id: String,
    pub decision_id: String,
    pub overridden_by: String,
    pub justification: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl Override {
    pub fn expires_at(&self) -> DateTime<Utc> {
        let ms = i64::try_from(self.duration_ms).unwrap_or(i64::MAX);
        self.created_at
            .checked_add_signed(Duration::milliseconds(ms.min(MAX_OVERRIDE_MS)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Derived, never stored: `now < created_at + duration_ms`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }
}

/// Caps override durations at roughly a thousand years.
const MAX_OVERRIDE_MS: i64 = 1_000 * 365 * 24 * 60 * 60 * 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityNodeKind {
    /// The decision's own authority.
    Origin,
    Approval,
    Override,
}

/// One link in an authority chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityNode {
    pub kind: AuthorityNodeKind,
    pub authority: AuthorityType,
    pub actor: String,
    /// The outcome this node stands for.
    pub stance: DecisionOutcome,
    pub justification: String,
    pub timestamp: DateTime<Utc>,
    /// Only set for override nodes.
    pub still_active: Option<bool>,
    /// Id of the approval or override record, or the decision id for the origin.
    pub record_id: String,
}

impl AuthorityNode {
    pub fn describe(&self) -> String {
        match self.kind {
            AuthorityNodeKind::Origin => format!(
                "{} authority '{}' decided {}",
                self.authority, self.actor, self.stance
            ),
            AuthorityNodeKind::Approval => format!(
                "{} approval by '{}': {}",
                self.authority, self.actor, self.justification
            ),
            AuthorityNodeKind::Override => format!(
                "override by '{}' to {}: {}",
                self.actor, self.stance, self.justification
            ),
        }
    }
}

/// Ordered reconstruction of who is responsible for a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityChain {
    pub decision_id: String,
    /// Origin first, then approvals, then overrides, each chronological.
    pub nodes: Vec<AuthorityNode>,
    pub original_outcome: DecisionOutcome,
    pub effective_outcome: DecisionOutcome,
    /// Policy nodes whose stance conflicts with the effective outcome.
    pub bypassed_policies: Vec<String>,
    pub human_involved: bool,
    pub resolved_at: DateTime<Utc>,
}

impl AuthorityChain {
    pub fn overrides(&self) -> impl Iterator<Item = &AuthorityNode> {
        self.nodes
            .iter()
            .filter(|n| n.kind == AuthorityNodeKind::Override)
    }

    pub fn was_overridden(&self) -> bool {
        self.overrides().next().is_some()
    }
}

/// The fixed accountability questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountabilityQuestion {
    WhoAllowed,
    Why,
    WhatEvidence,
    WasOverridden,
    CanBeReversed,
}

str_enum!(AccountabilityQuestion, "accountability question", {
    WhoAllowed => "who_allowed",
    Why => "why",
    WhatEvidence => "what_evidence",
    WasOverridden => "was_overridden",
    CanBeReversed => "can_be_reversed",
});

impl AccountabilityQuestion {
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::WhoAllowed => "Who allowed this?",
            Self::Why => "Why did this happen?",
            Self::WhatEvidence => "What evidence was used?",
            Self::WasOverridden => "Was the automated outcome overridden?",
            Self::CanBeReversed => "Can this be reversed?",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountabilityAnswer {
    pub question: AccountabilityQuestion,
    pub answer: String,
    pub evidence: Vec<String>,
}
