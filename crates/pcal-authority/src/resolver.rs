//! AuthorityChainResolver: approvals, overrides and chain reconstruction.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use pcal_core::clock::Clock;
use pcal_core::errors::{PcalError, PcalResult};
use pcal_core::models::{
    AccountabilityAnswer, Approval, AuthorityChain, AuthorityNode, AuthorityNodeKind,
    AuthorityType, Decision, DecisionOutcome, Override,
};
use pcal_core::sync;
use pcal_stream::DecisionStream;

use crate::accountability;

#[derive(Default)]
struct Records {
    approvals: Vec<Approval>,
    overrides: Vec<Override>,
}

/// Owns approvals and overrides. Both reference decisions by id only; a
/// decision evicted from the ledger leaves its records in place.
pub struct AuthorityChainResolver {
    stream: Arc<DecisionStream>,
    clock: Arc<dyn Clock>,
    records: RwLock<Records>,
}

impl AuthorityChainResolver {
    pub fn new(stream: Arc<DecisionStream>, clock: Arc<dyn Clock>) -> Self {
        Self {
            stream,
            clock,
            records: RwLock::new(Records::default()),
        }
    }

    pub fn stream(&self) -> &Arc<DecisionStream> {
        &self.stream
    }

    /// Record an explicit sign-off. `target` is matched against a decision's
    /// id, target, domain name or source name during chain resolution.
    pub fn record_approval(
        &self,
        approved_by: impl Into<String>,
        authority_type: AuthorityType,
        target: impl Into<String>,
        justification: impl Into<String>,
    ) -> PcalResult<Approval> {
        let approved_by = non_blank("approved_by", approved_by.into())?;
        let target = non_blank("target", target.into())?;

        let approval = Approval {
            id: uuid::Uuid::new_v4().to_string(),
            approved_by,
            authority_type,
            target,
            justification: justification.into(),
            timestamp: self.clock.now(),
        };

        sync::write(&self.records)?.approvals.push(approval.clone());
        info!(
            approval_id = %approval.id,
            approved_by = %approval.approved_by,
            authority = %approval.authority_type,
            target = %approval.target,
            "Approval recorded"
        );
        Ok(approval)
    }

    /// Record a time-bounded human override of a decision.
    pub fn record_override(
        &self,
        decision_id: impl Into<String>,
        overridden_by: impl Into<String>,
        justification: impl Into<String>,
        reason: impl Into<String>,
        duration_ms: u64,
    ) -> PcalResult<Override> {
        if duration_ms == 0 {
            return Err(PcalError::InvalidInput("override duration_ms must be > 0".into()));
        }
        let decision_id = non_blank("decision_id", decision_id.into())?;
        let overridden_by = non_blank("overridden_by", overridden_by.into())?;

        let record = Override {
            id: uuid::Uuid::new_v4().to_string(),
            decision_id,
            overridden_by,
            justification: justification.into(),
            reason: reason.into(),
            created_at: self.clock.now(),
            duration_ms,
        };

        if self.stream.get_decision(&record.decision_id)?.is_none() {
            debug!(decision_id = %record.decision_id, "Override recorded for a decision not in the ledger");
        }

        sync::write(&self.records)?.overrides.push(record.clone());
        info!(
            override_id = %record.id,
            decision_id = %record.decision_id,
            overridden_by = %record.overridden_by,
            duration_ms = record.duration_ms,
            "Override recorded"
        );
        Ok(record)
    }

    /// Overrides whose window has not elapsed at the clock's current time.
    pub fn get_active_overrides(&self) -> PcalResult<Vec<Override>> {
        let now = self.clock.now();
        Ok(sync::read(&self.records)?
            .overrides
            .iter()
            .filter(|o| o.is_active_at(now))
            .cloned()
            .collect())
    }

    /// Every override ever recorded against `decision_id`, oldest first.
    pub fn get_overrides_for(&self, decision_id: &str) -> PcalResult<Vec<Override>> {
        let mut overrides: Vec<Override> = sync::read(&self.records)?
            .overrides
            .iter()
            .filter(|o| o.decision_id == decision_id)
            .cloned()
            .collect();
        overrides.sort_by_key(|o| o.created_at);
        Ok(overrides)
    }

    pub fn get_all_overrides(&self) -> PcalResult<Vec<Override>> {
        Ok(sync::read(&self.records)?.overrides.clone())
    }

    pub fn get_approvals_for_target(&self, target: &str) -> PcalResult<Vec<Approval>> {
        Ok(sync::read(&self.records)?
            .approvals
            .iter()
            .filter(|a| a.target == target)
            .cloned()
            .collect())
    }

    /// Reconstruct the authority chain for a decision. `None` when the
    /// decision is not in the ledger.
    ///
    /// Reads the ledger and the authority records under separate locks, so a
    /// resolution racing with ingestion may miss records written meanwhile.
    pub async fn resolve_authority_chain(
        &self,
        decision_id: &str,
    ) -> PcalResult<Option<AuthorityChain>> {
        let Some(decision) = self.stream.get_decision(decision_id)? else {
            return Ok(None);
        };
        let chain = self.build_chain(&decision)?;
        debug!(
            decision_id,
            nodes = chain.nodes.len(),
            effective = %chain.effective_outcome,
            "Authority chain resolved"
        );
        Ok(Some(chain))
    }

    /// Answer the fixed accountability questions. Empty for unknown ids.
    pub fn answer_accountability(&self, decision_id: &str) -> PcalResult<Vec<AccountabilityAnswer>> {
        let Some(decision) = self.stream.get_decision(decision_id)? else {
            return Ok(Vec::new());
        };
        let chain = self.build_chain(&decision)?;
        let overrides = self.get_overrides_for(decision_id)?;
        Ok(accountability::answer_all(
            &decision,
            &chain,
            &overrides,
            self.clock.now(),
        ))
    }

    /// Drop every approval and override. Destructive.
    pub fn clear_all(&self) -> PcalResult<()> {
        let mut records = sync::write(&self.records)?;
        let dropped_approvals = records.approvals.len();
        let dropped_overrides = records.overrides.len();
        *records = Records::default();
        info!(dropped_approvals, dropped_overrides, "Authority records cleared");
        Ok(())
    }

    fn build_chain(&self, decision: &Decision) -> PcalResult<AuthorityChain> {
        let now = self.clock.now();
        let records = sync::read(&self.records)?;

        let mut nodes = vec![origin_node(decision)];

        let mut approvals: Vec<&Approval> = records
            .approvals
            .iter()
            .filter(|a| approval_matches(a, decision))
            .collect();
        approvals.sort_by_key(|a| a.timestamp);
        nodes.extend(approvals.into_iter().map(|a| AuthorityNode {
            kind: AuthorityNodeKind::Approval,
            authority: a.authority_type,
            actor: a.approved_by.clone(),
            stance: DecisionOutcome::Approved,
            justification: a.justification.clone(),
            timestamp: a.timestamp,
            still_active: None,
            record_id: a.id.clone(),
        }));

        let mut overrides: Vec<&Override> = records
            .overrides
            .iter()
            .filter(|o| o.decision_id == decision.id)
            .collect();
        overrides.sort_by_key(|o| o.created_at);
        let override_stance = decision.outcome.overridden();
        nodes.extend(overrides.into_iter().map(|o| AuthorityNode {
            kind: AuthorityNodeKind::Override,
            authority: AuthorityType::Human,
            actor: o.overridden_by.clone(),
            stance: override_stance,
            justification: o.justification.clone(),
            timestamp: o.created_at,
            still_active: Some(o.is_active_at(now)),
            record_id: o.id.clone(),
        }));

        let effective_outcome = nodes
            .iter()
            .rev()
            .find(|n| n.kind == AuthorityNodeKind::Override)
            .map(|n| n.stance)
            .unwrap_or(decision.outcome);

        let bypassed_policies = nodes
            .iter()
            .filter(|n| n.authority == AuthorityType::Policy && n.stance != effective_outcome)
            .map(AuthorityNode::describe)
            .collect();

        let human_involved = nodes.iter().any(|n| n.authority == AuthorityType::Human);

        Ok(AuthorityChain {
            decision_id: decision.id.clone(),
            nodes,
            original_outcome: decision.outcome,
            effective_outcome,
            bypassed_policies,
            human_involved,
            resolved_at: now,
        })
    }
}

fn origin_node(decision: &Decision) -> AuthorityNode {
    AuthorityNode {
        kind: AuthorityNodeKind::Origin,
        authority: decision.authority,
        actor: decision
            .actor
            .clone()
            .unwrap_or_else(|| decision.source.to_string()),
        stance: decision.outcome,
        justification: decision.reason.clone(),
        timestamp: decision.timestamp,
        still_active: None,
        record_id: decision.id.clone(),
    }
}

fn approval_matches(approval: &Approval, decision: &Decision) -> bool {
    approval.target == decision.id
        || decision.target.as_deref() == Some(approval.target.as_str())
        || approval.target == decision.domain.as_str()
        || approval.target == decision.source.as_str()
}

fn non_blank(field: &str, value: String) -> PcalResult<String> {
    if value.trim().is_empty() {
        Err(PcalError::InvalidInput(format!("{field} must not be empty")))
    } else {
        Ok(value)
    }
}

/// Active at `now`, for callers holding an override snapshot.
pub fn active_at(overrides: &[Override], now: DateTime<Utc>) -> impl Iterator<Item = &Override> {
    overrides.iter().filter(move |o| o.is_active_at(now))
}
