//! Plain-language answers to the fixed accountability questions.

use chrono::{DateTime, Utc};

use pcal_core::models::{
    AccountabilityAnswer, AccountabilityQuestion, AuthorityChain, AuthorityNodeKind, Decision,
    Override,
};

use crate::resolver::active_at;

pub(crate) fn answer_all(
    decision: &Decision,
    chain: &AuthorityChain,
    overrides: &[Override],
    now: DateTime<Utc>,
) -> Vec<AccountabilityAnswer> {
    AccountabilityQuestion::ALL
        .iter()
        .map(|question| match question {
            AccountabilityQuestion::WhoAllowed => who_allowed(decision, chain, overrides),
            AccountabilityQuestion::Why => why(decision, overrides),
            AccountabilityQuestion::WhatEvidence => what_evidence(decision),
            AccountabilityQuestion::WasOverridden => was_overridden(chain, overrides, now),
            AccountabilityQuestion::CanBeReversed => can_be_reversed(decision, overrides, now),
        })
        .collect()
}

fn who_allowed(
    decision: &Decision,
    chain: &AuthorityChain,
    overrides: &[Override],
) -> AccountabilityAnswer {
    let origin = decision.authority_label();
    let answer = match overrides.last() {
        Some(latest) => format!(
            "{} decided {}; {} overrode it to {}",
            origin, decision.outcome, latest.overridden_by, chain.effective_outcome
        ),
        None => {
            let approvers: Vec<&str> = chain
                .nodes
                .iter()
                .filter(|n| n.kind == AuthorityNodeKind::Approval)
                .map(|n| n.actor.as_str())
                .collect();
            if approvers.is_empty() {
                format!("{} decided {}", origin, decision.outcome)
            } else {
                format!(
                    "{} decided {}, approved by {}",
                    origin,
                    decision.outcome,
                    approvers.join(", ")
                )
            }
        }
    };

    AccountabilityAnswer {
        question: AccountabilityQuestion::WhoAllowed,
        answer,
        evidence: chain.nodes.iter().map(|n| n.describe()).collect(),
    }
}

fn why(decision: &Decision, overrides: &[Override]) -> AccountabilityAnswer {
    let mut evidence = vec![format!("reason: {}", decision.reason)];
    evidence.extend(
        overrides
            .iter()
            .map(|o| format!("override reason from {}: {}", o.overridden_by, o.reason)),
    );

    AccountabilityAnswer {
        question: AccountabilityQuestion::Why,
        answer: format!(
            "{} returned {} at {:.0}% confidence: {}",
            decision.source, decision.outcome, decision.confidence, decision.reason
        ),
        evidence,
    }
}

fn what_evidence(decision: &Decision) -> AccountabilityAnswer {
    let answer = if decision.signals.is_empty() {
        "No signals were attached to this decision".to_string()
    } else {
        let strongest = decision
            .signals
            .iter()
            .max_by(|a, b| a.weight.total_cmp(&b.weight))
            .map(|s| s.name.as_str())
            .unwrap_or_default();
        format!(
            "{} signal(s) considered; heaviest was {}",
            decision.signals.len(),
            strongest
        )
    };

    AccountabilityAnswer {
        question: AccountabilityQuestion::WhatEvidence,
        answer,
        evidence: decision.signals.iter().map(|s| s.evidence_line()).collect(),
    }
}

fn was_overridden(
    chain: &AuthorityChain,
    overrides: &[Override],
    now: DateTime<Utc>,
) -> AccountabilityAnswer {
    let answer = if overrides.is_empty() {
        "No, the automated outcome stands".to_string()
    } else {
        let active = active_at(overrides, now).count();
        format!(
            "Yes, {} override(s) by {} ({} still active); effective outcome is {}",
            overrides.len(),
            overriders(overrides),
            active,
            chain.effective_outcome
        )
    };

    AccountabilityAnswer {
        question: AccountabilityQuestion::WasOverridden,
        answer,
        evidence: overrides
            .iter()
            .map(|o| format!("{}: {}", o.overridden_by, o.justification))
            .collect(),
    }
}

fn can_be_reversed(
    decision: &Decision,
    overrides: &[Override],
    now: DateTime<Utc>,
) -> AccountabilityAnswer {
    let answer = match (decision.reversible, active_at(overrides, now).last()) {
        (false, _) => "No, the decision was marked irreversible".to_string(),
        (true, Some(active)) => format!(
            "Yes; an override by {} is in force until {}",
            active.overridden_by,
            active.expires_at().to_rfc3339()
        ),
        (true, None) => "Yes, the decision is reversible".to_string(),
    };

    AccountabilityAnswer {
        question: AccountabilityQuestion::CanBeReversed,
        answer,
        evidence: vec![format!("reversible={}", decision.reversible)],
    }
}

fn overriders(overrides: &[Override]) -> String {
    let mut names: Vec<&str> = overrides.iter().map(|o| o.overridden_by.as_str()).collect();
    names.dedup();
    names.join(", ")
}
