//! DecisionStream: the bounded, append-only decision ledger.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use pcal_core::clock::Clock;
use pcal_core::config::PcalConfig;
use pcal_core::errors::{PcalError, PcalResult};
use pcal_core::models::{
    AuthorityType, Decision, DecisionDomain, DecisionOutcome, DecisionSource, DecisionStats,
    IngestOptions,
};
use pcal_core::sync;

use crate::signature::compute_signature;

const DEFAULT_CONFIDENCE: f64 = 50.0;

#[derive(Default)]
struct Ledger {
    /// Decision ids, oldest first.
    order: VecDeque<String>,
    records: HashMap<String, Decision>,
    evicted_total: u64,
}

/// Append-only ledger of every decision.
///
/// Decisions are only ever handed out as clones. The single accepted form of
/// information loss is oldest-first eviction once `max_decisions` is
/// exceeded; each eviction is logged and counted in `evicted_total`.
pub struct DecisionStream {
    inner: RwLock<Ledger>,
    clock: Arc<dyn Clock>,
    max_decisions: usize,
}

impl DecisionStream {
    /// Create a ledger holding at most `max_decisions` entries.
    pub fn new(max_decisions: usize, clock: Arc<dyn Clock>) -> PcalResult<Self> {
        if max_decisions == 0 {
            return Err(PcalError::Config("max_decisions must be > 0".into()));
        }
        Ok(Self {
            inner: RwLock::new(Ledger::default()),
            clock,
            max_decisions,
        })
    }

    pub fn from_config(config: &PcalConfig, clock: Arc<dyn Clock>) -> PcalResult<Self> {
        Self::new(config.max_decisions, clock)
    }

    pub fn max_decisions(&self) -> usize {
        self.max_decisions
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Record a decision. Authority defaults to `System`, confidence to 50.
    pub fn ingest_decision(
        &self,
        source: DecisionSource,
        domain: DecisionDomain,
        outcome: DecisionOutcome,
        reason: impl Into<String>,
        options: IngestOptions,
    ) -> PcalResult<Decision> {
        let confidence = options.confidence.unwrap_or(DEFAULT_CONFIDENCE);
        if !confidence.is_finite() || !(0.0..=100.0).contains(&confidence) {
            return Err(PcalError::InvalidInput(format!(
                "confidence must be within 0-100, got {}",
                confidence
            )));
        }

        let authority = options.authority.unwrap_or(AuthorityType::System);
        let actor = options.actor.filter(|a| !a.trim().is_empty());
        if authority == AuthorityType::Human && actor.is_none() {
            return Err(PcalError::InvalidInput(
                "human-authority decisions require an actor".into(),
            ));
        }

        let mut decision = Decision {
            id: uuid::Uuid::new_v4().to_string(),
            source,
            domain,
            outcome,
            reason: reason.into(),
            confidence,
            signals: options.signals,
            authority,
            actor,
            reversible: options.reversible.unwrap_or(true),
            target: options.target,
            metadata: options.metadata,
            timestamp: options.timestamp.unwrap_or_else(|| self.clock.now()),
            signature: String::new(),
        };
        decision.signature = compute_signature(&decision);

        let mut ledger = sync::write(&self.inner)?;
        ledger.order.push_back(decision.id.clone());
        ledger.records.insert(decision.id.clone(), decision.clone());

        while ledger.order.len() > self.max_decisions {
            if let Some(evicted) = ledger.order.pop_front() {
                ledger.records.remove(&evicted);
                ledger.evicted_total += 1;
                debug!(
                    decision_id = %evicted,
                    max = self.max_decisions,
                    "Ledger full, evicted oldest decision"
                );
            }
        }

        debug!(
            decision_id = %decision.id,
            source = %decision.source,
            domain = %decision.domain,
            outcome = %decision.outcome,
            authority = %decision.authority,
            confidence = decision.confidence,
            "Decision ingested"
        );
        Ok(decision)
    }

    /// Record a decision made directly by a person.
    pub fn ingest_manual_decision(
        &self,
        domain: DecisionDomain,
        outcome: DecisionOutcome,
        reason: impl Into<String>,
        actor: impl Into<String>,
    ) -> PcalResult<Decision> {
        self.ingest_decision(
            DecisionSource::Manual,
            domain,
            outcome,
            reason,
            IngestOptions::new()
                .authority(AuthorityType::Human)
                .actor(actor),
        )
    }

    pub fn get_decision(&self, id: &str) -> PcalResult<Option<Decision>> {
        Ok(sync::read(&self.inner)?.records.get(id).cloned())
    }

    /// Most recent first. `None` returns the whole ledger.
    pub fn get_recent_decisions(&self, n: Option<usize>) -> PcalResult<Vec<Decision>> {
        let ledger = sync::read(&self.inner)?;
        let limit = n.unwrap_or(ledger.order.len());
        Ok(ledger
            .order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| ledger.records.get(id).cloned())
            .collect())
    }

    pub fn get_decisions_by_source(&self, source: DecisionSource) -> PcalResult<Vec<Decision>> {
        self.filter(|d| d.source == source)
    }

    pub fn get_decisions_by_outcome(&self, outcome: DecisionOutcome) -> PcalResult<Vec<Decision>> {
        self.filter(|d| d.outcome == outcome)
    }

    /// Decisions with `from <= timestamp < to`, ledger order.
    pub fn get_decisions_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PcalResult<Vec<Decision>> {
        self.filter(|d| d.timestamp >= from && d.timestamp < to)
    }

    /// Every decision carrying this signature, ledger order.
    pub fn find_by_signature(&self, signature: &str) -> PcalResult<Vec<Decision>> {
        self.filter(|d| d.signature == signature)
    }

    /// Snapshot of the whole ledger, oldest first.
    pub fn all_decisions(&self) -> PcalResult<Vec<Decision>> {
        self.filter(|_| true)
    }

    pub fn get_decision_stats(&self) -> PcalResult<DecisionStats> {
        let ledger = sync::read(&self.inner)?;
        let mut stats = DecisionStats {
            total: ledger.order.len(),
            evicted_total: ledger.evicted_total,
            ..Default::default()
        };

        let mut outcome_breakdown = BTreeMap::new();
        let mut source_breakdown = BTreeMap::new();
        let mut authority_breakdown = BTreeMap::new();
        let mut confidence_sum = 0.0;

        for decision in ledger.order.iter().filter_map(|id| ledger.records.get(id)) {
            confidence_sum += decision.confidence;
            *outcome_breakdown.entry(decision.outcome).or_insert(0) += 1;
            *source_breakdown.entry(decision.source).or_insert(0) += 1;
            *authority_breakdown.entry(decision.authority).or_insert(0) += 1;
            if decision.authority == AuthorityType::Human {
                stats.human_decisions += 1;
            }
            if !decision.reversible {
                stats.irreversible_decisions += 1;
            }
            stats.oldest = Some(match stats.oldest {
                Some(t) if t <= decision.timestamp => t,
                _ => decision.timestamp,
            });
            stats.newest = Some(match stats.newest {
                Some(t) if t >= decision.timestamp => t,
                _ => decision.timestamp,
            });
        }

        if stats.total > 0 {
            stats.avg_confidence = confidence_sum / stats.total as f64;
        }
        stats.outcome_breakdown = outcome_breakdown;
        stats.source_breakdown = source_breakdown;
        stats.authority_breakdown = authority_breakdown;
        Ok(stats)
    }

    pub fn len(&self) -> PcalResult<usize> {
        Ok(sync::read(&self.inner)?.order.len())
    }

    pub fn is_empty(&self) -> PcalResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Drop every decision and reset the eviction counter. Destructive.
    pub fn clear_all(&self) -> PcalResult<()> {
        let mut ledger = sync::write(&self.inner)?;
        let dropped = ledger.order.len();
        *ledger = Ledger::default();
        info!(dropped, "Decision stream cleared");
        Ok(())
    }

    fn filter(&self, predicate: impl Fn(&Decision) -> bool) -> PcalResult<Vec<Decision>> {
        let ledger = sync::read(&self.inner)?;
        Ok(ledger
            .order
            .iter()
            .filter_map(|id| ledger.records.get(id))
            .filter(|d| predicate(*d))
            .cloned()
            .collect())
    }
}
