//! PlatformMemory: patterns, incident links, repeated mistakes, snapshots.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use pcal_authority::AuthorityChainResolver;
use pcal_core::clock::Clock;
use pcal_core::config::PcalConfig;
use pcal_core::errors::{PcalError, PcalResult};
use pcal_core::models::{IncidentLink, LinkType, MemorySnapshot, Pattern, RepeatedMistake};
use pcal_core::sync;
use pcal_stream::DecisionStream;

use crate::graph::ProvenanceGraph;
use crate::patterns::{self, WindowScan};

#[derive(Default)]
struct MemoryState {
    /// Keyed by signature key. Swapped whole on every scan.
    patterns: BTreeMap<String, Pattern>,
    repeated_mistakes: Vec<RepeatedMistake>,
    snapshots: VecDeque<MemorySnapshot>,
}

pub struct PlatformMemory {
    stream: Arc<DecisionStream>,
    authority: Arc<AuthorityChainResolver>,
    clock: Arc<dyn Clock>,
    graph: ProvenanceGraph,
    state: RwLock<MemoryState>,
    pattern_threshold: usize,
    pattern_window: Duration,
    max_snapshots: usize,
}

impl PlatformMemory {
    pub fn new(
        config: &PcalConfig,
        stream: Arc<DecisionStream>,
        authority: Arc<AuthorityChainResolver>,
        clock: Arc<dyn Clock>,
    ) -> PcalResult<Self> {
        if config.pattern_threshold == 0 {
            return Err(PcalError::Config("pattern_threshold must be > 0".into()));
        }
        if config.max_snapshots == 0 {
            return Err(PcalError::Config("max_snapshots must be > 0".into()));
        }
        Ok(Self {
            stream,
            authority,
            clock,
            graph: ProvenanceGraph::new(),
            state: RwLock::new(MemoryState::default()),
            pattern_threshold: config.pattern_threshold,
            pattern_window: config.pattern_window(),
            max_snapshots: config.max_snapshots,
        })
    }

    pub fn pattern_threshold(&self) -> usize {
        self.pattern_threshold
    }

    /// Rescan the ledger and replace the pattern set.
    ///
    /// Returns only patterns that are new or whose counts, severity or
    /// trend changed. Signatures that no longer qualify are retired.
    pub fn detect_patterns(&self) -> PcalResult<Vec<Pattern>> {
        let now = self.clock.now();
        let scan = self.scan(now)?;

        let mut state = sync::write(&self.state)?;
        let mut next = BTreeMap::new();
        let mut changed = Vec::new();

        for (signature, decisions) in scan.qualifying(self.pattern_threshold) {
            let key = signature.key();
            let existing = state.patterns.get(&key);
            let pattern = patterns::build_pattern(
                *signature,
                decisions,
                scan.previous_count(signature),
                self.pattern_threshold,
                existing,
                now,
            );

            let is_change = existing.map_or(true, |e| pattern.differs_from(e));
            if is_change {
                info!(
                    pattern = %key,
                    occurrences = pattern.occurrences,
                    previous = pattern.previous_occurrences,
                    severity = %pattern.severity,
                    trend = %pattern.trend,
                    new = existing.is_none(),
                    "Pattern detected"
                );
                changed.push(pattern.clone());
            }
            next.insert(key, pattern);
        }

        for key in state.patterns.keys().filter(|k| !next.contains_key(*k)) {
            info!(pattern = %key, "Pattern retired");
        }
        state.patterns = next;

        patterns::sort_by_severity(&mut changed);
        debug!(
            total = state.patterns.len(),
            changed = changed.len(),
            "Pattern scan complete"
        );
        Ok(changed)
    }

    /// The full current pattern set, most severe first.
    pub fn get_patterns(&self) -> PcalResult<Vec<Pattern>> {
        let mut all: Vec<Pattern> = sync::read(&self.state)?.patterns.values().cloned().collect();
        patterns::sort_by_severity(&mut all);
        Ok(all)
    }

    pub fn get_pattern(&self, key: &str) -> PcalResult<Option<Pattern>> {
        Ok(sync::read(&self.state)?.patterns.get(key).cloned())
    }

    /// Add a provenance edge from an incident to a decision.
    pub fn link_incident_to_decision(
        &self,
        incident_id: impl Into<String>,
        decision_id: impl Into<String>,
        link_type: LinkType,
        confidence: f64,
    ) -> PcalResult<IncidentLink> {
        if !confidence.is_finite() || !(0.0..=100.0).contains(&confidence) {
            return Err(PcalError::InvalidInput(format!(
                "link confidence must be within 0-100, got {}",
                confidence
            )));
        }
        let incident_id = incident_id.into();
        let decision_id = decision_id.into();
        if incident_id.trim().is_empty() || decision_id.trim().is_empty() {
            return Err(PcalError::InvalidInput(
                "incident_id and decision_id must not be empty".into(),
            ));
        }

        let link = IncidentLink {
            id: uuid::Uuid::new_v4().to_string(),
            incident_id,
            decision_id,
            link_type,
            confidence,
            created_at: self.clock.now(),
        };
        self.graph.add_link(link.clone())?;
        info!(
            link_id = %link.id,
            incident_id = %link.incident_id,
            decision_id = %link.decision_id,
            link_type = %link.link_type,
            confidence = link.confidence,
            "Incident linked to decision"
        );
        Ok(link)
    }

    pub fn get_incident_links(&self) -> PcalResult<Vec<IncidentLink>> {
        self.graph.all_links()
    }

    pub fn get_links_for_decision(&self, decision_id: &str) -> PcalResult<Vec<IncidentLink>> {
        self.graph.links_for_decision(decision_id)
    }

    pub fn get_links_for_incident(&self, incident_id: &str) -> PcalResult<Vec<IncidentLink>> {
        self.graph.links_for_incident(incident_id)
    }

    pub fn decisions_caused_by(&self, incident_id: &str) -> PcalResult<Vec<String>> {
        self.graph.decisions_caused_by(incident_id)
    }

    /// Qualifying signatures where an overridden decision was later blamed
    /// for an incident. Replaces the stored set.
    pub fn detect_repeated_mistakes(&self) -> PcalResult<Vec<RepeatedMistake>> {
        let now = self.clock.now();
        let scan = self.scan(now)?;
        let previous: HashMap<String, RepeatedMistake> = sync::read(&self.state)?
            .repeated_mistakes
            .iter()
            .map(|m| (m.pattern_key.clone(), m.clone()))
            .collect();

        let mut found = Vec::new();
        for (signature, decisions) in scan.qualifying(self.pattern_threshold) {
            let mut overridden_decision_ids = Vec::new();
            let mut incident_ids: Vec<String> = Vec::new();

            for decision in decisions {
                let overrides = self.authority.get_overrides_for(&decision.id)?;
                let Some(first_override) = overrides.iter().map(|o| o.created_at).min() else {
                    continue;
                };
                let blamed: Vec<IncidentLink> = self
                    .graph
                    .links_for_decision(&decision.id)?
                    .into_iter()
                    .filter(|l| l.link_type == LinkType::CausedBy && l.created_at >= first_override)
                    .collect();
                if blamed.is_empty() {
                    continue;
                }
                overridden_decision_ids.push(decision.id.clone());
                for link in blamed {
                    if !incident_ids.contains(&link.incident_id) {
                        incident_ids.push(link.incident_id);
                    }
                }
            }

            if overridden_decision_ids.is_empty() {
                continue;
            }

            let key = signature.key();
            let prior = previous.get(&key);
            let mistake = RepeatedMistake {
                id: prior
                    .map(|m| m.id.clone())
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                pattern_key: key.clone(),
                signature: *signature,
                occurrences: decisions.len(),
                description: format!(
                    "{}: {} overridden decision(s) were later blamed for incident(s) {}",
                    signature.display_name(),
                    overridden_decision_ids.len(),
                    incident_ids.join(", ")
                ),
                recommendation: format!(
                    "Require a second approval before overriding {} {} decisions from {}",
                    signature.outcome, signature.domain, signature.source
                ),
                overridden_decision_ids,
                incident_ids,
                detected_at: prior.map(|m| m.detected_at).unwrap_or(now),
            };
            if prior.is_none() {
                info!(
                    pattern = %key,
                    incidents = mistake.incident_ids.len(),
                    "Repeated mistake detected"
                );
            }
            found.push(mistake);
        }

        sync::write(&self.state)?.repeated_mistakes = found.clone();
        Ok(found)
    }

    pub fn get_repeated_mistakes(&self) -> PcalResult<Vec<RepeatedMistake>> {
        Ok(sync::read(&self.state)?.repeated_mistakes.clone())
    }

    /// Capture the current pattern set and ledger summary. Kept up to
    /// `max_snapshots`, oldest dropped first.
    pub fn capture_memory_snapshot(&self) -> PcalResult<MemorySnapshot> {
        let stats = self.stream.get_decision_stats()?;
        let incident_link_count = self.graph.edge_count()?;

        let mut state = sync::write(&self.state)?;
        let mut patterns: Vec<Pattern> = state.patterns.values().cloned().collect();
        patterns::sort_by_severity(&mut patterns);

        let snapshot = MemorySnapshot {
            id: uuid::Uuid::new_v4().to_string(),
            captured_at: self.clock.now(),
            patterns,
            repeated_mistakes: state.repeated_mistakes.clone(),
            decision_count: stats.total,
            incident_link_count,
            outcome_counts: stats.outcome_breakdown,
        };

        state.snapshots.push_back(snapshot.clone());
        while state.snapshots.len() > self.max_snapshots {
            state.snapshots.pop_front();
        }
        debug!(
            snapshot_id = %snapshot.id,
            patterns = snapshot.patterns.len(),
            decisions = snapshot.decision_count,
            "Memory snapshot captured"
        );
        Ok(snapshot)
    }

    /// Retained snapshots, oldest first.
    pub fn get_snapshots(&self) -> PcalResult<Vec<MemorySnapshot>> {
        Ok(sync::read(&self.state)?.snapshots.iter().cloned().collect())
    }

    /// Drop patterns, links, mistakes and snapshots. Destructive.
    pub fn clear_all(&self) -> PcalResult<()> {
        *sync::write(&self.state)? = MemoryState::default();
        self.graph.clear()?;
        info!("Platform memory cleared");
        Ok(())
    }

    fn scan(&self, now: DateTime<Utc>) -> PcalResult<WindowScan> {
        Ok(patterns::scan(
            self.stream.all_decisions()?,
            now,
            self.pattern_window,
        ))
    }
}
