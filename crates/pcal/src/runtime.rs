//! PcalRuntime: the constructible context every caller goes through.
//!
//! When the feature gate is off every call short-circuits to an empty
//! result (`None`, an empty vec, `false`, `1.0` or a default report) so
//! producers never need their own conditional logic.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use pcal_authority::AuthorityChainResolver;
use pcal_core::clock::{Clock, SystemClock};
use pcal_core::config::PcalConfig;
use pcal_core::errors::PcalResult;
use pcal_core::models::{
    AccountabilityAnswer, Approval, AuthorityChain, AuthorityType, Decision, DecisionDomain,
    DecisionOutcome, DecisionSource, DecisionStats, FeedbackCycleResult, FeedbackState,
    IncidentLink, IngestOptions, LinkType, MemorySnapshot, Narrative, NarrativeRequest, Override,
    Pattern, Recommendation, RepeatedMistake, RiskReport,
};
use pcal_feedback::FeedbackLoop;
use pcal_memory::PlatformMemory;
use pcal_narrative::NarrativeGenerator;
use pcal_stream::DecisionStream;

/// Output of [`PcalRuntime::run_maintenance_cycle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceReport {
    pub changed_patterns: Vec<Pattern>,
    pub repeated_mistakes: Vec<RepeatedMistake>,
    pub feedback: FeedbackCycleResult,
}

pub struct PcalRuntime {
    config: PcalConfig,
    clock: Arc<dyn Clock>,
    stream: Arc<DecisionStream>,
    authority: Arc<AuthorityChainResolver>,
    memory: Arc<PlatformMemory>,
    feedback: Arc<FeedbackLoop>,
    narrative: NarrativeGenerator,
}

impl PcalRuntime {
    /// Build every component. Fails fast on invalid configuration.
    pub fn new(config: PcalConfig, clock: Arc<dyn Clock>) -> PcalResult<Self> {
        config.validate()?;

        let stream = Arc::new(DecisionStream::from_config(&config, clock.clone())?);
        let authority = Arc::new(AuthorityChainResolver::new(stream.clone(), clock.clone()));
        let memory = Arc::new(PlatformMemory::new(
            &config,
            stream.clone(),
            authority.clone(),
            clock.clone(),
        )?);
        let feedback = Arc::new(FeedbackLoop::new(
            &config,
            stream.clone(),
            authority.clone(),
            memory.clone(),
            clock.clone(),
        )?);
        let narrative = NarrativeGenerator::new(
            &config,
            stream.clone(),
            authority.clone(),
            memory.clone(),
            feedback.clone(),
            clock.clone(),
        );

        info!(
            enabled = config.enabled,
            max_decisions = config.max_decisions,
            pattern_threshold = config.pattern_threshold,
            auto_adjust = config.auto_adjust,
            "PCAL runtime initialized"
        );
        Ok(Self {
            config,
            clock,
            stream,
            authority,
            memory,
            feedback,
            narrative,
        })
    }

    /// Wall-clock runtime.
    pub fn with_system_clock(config: PcalConfig) -> PcalResult<Self> {
        Self::new(config, Arc::new(SystemClock))
    }

    /// Parse TOML, apply `PCAL_ENABLED`, validate and build.
    pub fn from_toml(toml_str: &str, clock: Arc<dyn Clock>) -> PcalResult<Self> {
        let config = PcalConfig::from_toml(toml_str)?.with_env_overrides();
        Self::new(config, clock)
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &PcalConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // Component handles. These bypass the `enabled` gate.

    pub fn stream(&self) -> &Arc<DecisionStream> {
        &self.stream
    }

    pub fn authority(&self) -> &Arc<AuthorityChainResolver> {
        &self.authority
    }

    pub fn memory(&self) -> &Arc<PlatformMemory> {
        &self.memory
    }

    pub fn feedback(&self) -> &Arc<FeedbackLoop> {
        &self.feedback
    }

    pub fn narrative(&self) -> &NarrativeGenerator {
        &self.narrative
    }

    // Decision stream

    pub fn ingest_decision(
        &self,
        source: DecisionSource,
        domain: DecisionDomain,
        outcome: DecisionOutcome,
        reason: impl Into<String>,
        options: IngestOptions,
    ) -> PcalResult<Option<Decision>> {
        if !self.gate("ingest_decision") {
            return Ok(None);
        }
        self.stream
            .ingest_decision(source, domain, outcome, reason, options)
            .map(Some)
    }

    pub fn ingest_manual_decision(
        &self,
        domain: DecisionDomain,
        outcome: DecisionOutcome,
        reason: impl Into<String>,
        actor: impl Into<String>,
    ) -> PcalResult<Option<Decision>> {
        if !self.gate("ingest_manual_decision") {
            return Ok(None);
        }
        self.stream
            .ingest_manual_decision(domain, outcome, reason, actor)
            .map(Some)
    }

    pub fn get_decision(&self, id: &str) -> PcalResult<Option<Decision>> {
        if !self.gate("get_decision") {
            return Ok(None);
        }
        self.stream.get_decision(id)
    }

    pub fn get_recent_decisions(&self, n: Option<usize>) -> PcalResult<Vec<Decision>> {
        if !self.gate("get_recent_decisions") {
            return Ok(Vec::new());
        }
        self.stream.get_recent_decisions(n)
    }

    pub fn get_decisions_by_source(&self, source: DecisionSource) -> PcalResult<Vec<Decision>> {
        if !self.gate("get_decisions_by_source") {
            return Ok(Vec::new());
        }
        self.stream.get_decisions_by_source(source)
    }

    pub fn get_decisions_by_outcome(&self, outcome: DecisionOutcome) -> PcalResult<Vec<Decision>> {
        if !self.gate("get_decisions_by_outcome") {
            return Ok(Vec::new());
        }
        self.stream.get_decisions_by_outcome(outcome)
    }

    /// Decisions with `from <= timestamp < to`.
    pub fn get_decisions_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PcalResult<Vec<Decision>> {
        if !self.gate("get_decisions_between") {
            return Ok(Vec::new());
        }
        self.stream.get_decisions_between(from, to)
    }

    pub fn find_by_signature(&self, signature: &str) -> PcalResult<Vec<Decision>> {
        if !self.gate("find_by_signature") {
            return Ok(Vec::new());
        }
        self.stream.find_by_signature(signature)
    }

    pub fn get_decision_stats(&self) -> PcalResult<DecisionStats> {
        if !self.gate("get_decision_stats") {
            return Ok(DecisionStats::default());
        }
        self.stream.get_decision_stats()
    }

    // Authority

    pub fn record_approval(
        &self,
        approved_by: impl Into<String>,
        authority_type: AuthorityType,
        target: impl Into<String>,
        justification: impl Into<String>,
    ) -> PcalResult<Option<Approval>> {
        if !self.gate("record_approval") {
            return Ok(None);
        }
        self.authority
            .record_approval(approved_by, authority_type, target, justification)
            .map(Some)
    }

    pub fn record_override(
        &self,
        decision_id: impl Into<String>,
        overridden_by: impl Into<String>,
        justification: impl Into<String>,
        reason: impl Into<String>,
        duration_ms: u64,
    ) -> PcalResult<Option<Override>> {
        if !self.gate("record_override") {
            return Ok(None);
        }
        self.authority
            .record_override(decision_id, overridden_by, justification, reason, duration_ms)
            .map(Some)
    }

    pub fn get_active_overrides(&self) -> PcalResult<Vec<Override>> {
        if !self.gate("get_active_overrides") {
            return Ok(Vec::new());
        }
        self.authority.get_active_overrides()
    }

    pub fn get_overrides_for(&self, decision_id: &str) -> PcalResult<Vec<Override>> {
        if !self.gate("get_overrides_for") {
            return Ok(Vec::new());
        }
        self.authority.get_overrides_for(decision_id)
    }

    pub async fn resolve_authority_chain(
        &self,
        decision_id: &str,
    ) -> PcalResult<Option<AuthorityChain>> {
        if !self.gate("resolve_authority_chain") {
            return Ok(None);
        }
        self.authority.resolve_authority_chain(decision_id).await
    }

    pub fn answer_accountability(&self, decision_id: &str) -> PcalResult<Vec<AccountabilityAnswer>> {
        if !self.gate("answer_accountability") {
            return Ok(Vec::new());
        }
        self.authority.answer_accountability(decision_id)
    }

    // Platform memory

    pub fn detect_patterns(&self) -> PcalResult<Vec<Pattern>> {
        if !self.gate("detect_patterns") {
            return Ok(Vec::new());
        }
        self.memory.detect_patterns()
    }

    pub fn get_patterns(&self) -> PcalResult<Vec<Pattern>> {
        if !self.gate("get_patterns") {
            return Ok(Vec::new());
        }
        self.memory.get_patterns()
    }

    pub fn link_incident_to_decision(
        &self,
        incident_id: impl Into<String>,
        decision_id: impl Into<String>,
        link_type: LinkType,
        confidence: f64,
    ) -> PcalResult<Option<IncidentLink>> {
        if !self.gate("link_incident_to_decision") {
            return Ok(None);
        }
        self.memory
            .link_incident_to_decision(incident_id, decision_id, link_type, confidence)
            .map(Some)
    }

    pub fn get_incident_links(&self) -> PcalResult<Vec<IncidentLink>> {
        if !self.gate("get_incident_links") {
            return Ok(Vec::new());
        }
        self.memory.get_incident_links()
    }

    pub fn detect_repeated_mistakes(&self) -> PcalResult<Vec<RepeatedMistake>> {
        if !self.gate("detect_repeated_mistakes") {
            return Ok(Vec::new());
        }
        self.memory.detect_repeated_mistakes()
    }

    pub fn get_repeated_mistakes(&self) -> PcalResult<Vec<RepeatedMistake>> {
        if !self.gate("get_repeated_mistakes") {
            return Ok(Vec::new());
        }
        self.memory.get_repeated_mistakes()
    }

    pub fn capture_memory_snapshot(&self) -> PcalResult<Option<MemorySnapshot>> {
        if !self.gate("capture_memory_snapshot") {
            return Ok(None);
        }
        self.memory.capture_memory_snapshot().map(Some)
    }

    pub fn get_snapshots(&self) -> PcalResult<Vec<MemorySnapshot>> {
        if !self.gate("get_snapshots") {
            return Ok(Vec::new());
        }
        self.memory.get_snapshots()
    }

    // Feedback loop

    pub fn run_feedback_cycle(&self) -> PcalResult<Option<FeedbackCycleResult>> {
        if !self.gate("run_feedback_cycle") {
            return Ok(None);
        }
        self.feedback.run_feedback_cycle().map(Some)
    }

    pub fn get_pending_recommendations(&self) -> PcalResult<Vec<Recommendation>> {
        if !self.gate("get_pending_recommendations") {
            return Ok(Vec::new());
        }
        self.feedback.get_pending_recommendations()
    }

    pub fn get_recommendations(&self) -> PcalResult<Vec<Recommendation>> {
        if !self.gate("get_recommendations") {
            return Ok(Vec::new());
        }
        self.feedback.get_recommendations()
    }

    pub fn acknowledge_recommendation(&self, id: &str, actor: &str) -> PcalResult<bool> {
        if !self.gate("acknowledge_recommendation") {
            return Ok(false);
        }
        self.feedback.acknowledge_recommendation(id, actor)
    }

    pub fn get_confidence_adjustment(&self, source: DecisionSource) -> f64 {
        if !self.gate("get_confidence_adjustment") {
            return 1.0;
        }
        self.feedback.get_confidence_adjustment(source)
    }

    pub fn apply_confidence_adjustment(
        &self,
        source: DecisionSource,
        delta: f64,
    ) -> PcalResult<Option<f64>> {
        if !self.gate("apply_confidence_adjustment") {
            return Ok(None);
        }
        self.feedback.apply_confidence_adjustment(source, delta).map(Some)
    }

    pub fn reset_confidence_adjustment(&self, source: DecisionSource) -> bool {
        if !self.gate("reset_confidence_adjustment") {
            return false;
        }
        self.feedback.reset_confidence_adjustment(source)
    }

    pub fn feedback_state(&self) -> PcalResult<FeedbackState> {
        if !self.gate("feedback_state") {
            return Ok(FeedbackState::default());
        }
        self.feedback.state()
    }

    // Narratives

    pub fn generate_narrative(&self, request: &NarrativeRequest) -> PcalResult<Option<Narrative>> {
        if !self.gate("generate_narrative") {
            return Ok(None);
        }
        self.narrative.generate_narrative(request).map(Some)
    }

    pub fn generate_risk_report(&self) -> PcalResult<RiskReport> {
        if !self.gate("generate_risk_report") {
            return Ok(RiskReport::default());
        }
        self.narrative.generate_risk_report()
    }

    /// Pattern scan, then repeated-mistake scan, then one feedback cycle.
    pub fn run_maintenance_cycle(&self) -> PcalResult<Option<MaintenanceReport>> {
        if !self.gate("run_maintenance_cycle") {
            return Ok(None);
        }
        let changed_patterns = self.memory.detect_patterns()?;
        let repeated_mistakes = self.memory.detect_repeated_mistakes()?;
        let feedback = self.feedback.run_feedback_cycle()?;
        info!(
            changed_patterns = changed_patterns.len(),
            repeated_mistakes = repeated_mistakes.len(),
            recommendations = feedback.recommendations_generated,
            "Maintenance cycle complete"
        );
        Ok(Some(MaintenanceReport {
            changed_patterns,
            repeated_mistakes,
            feedback,
        }))
    }

    /// Reset every component. Destructive; runs even when disabled.
    pub fn clear_all(&self) -> PcalResult<()> {
        self.narrative.clear_all()?;
        self.feedback.clear_all()?;
        self.memory.clear_all()?;
        self.authority.clear_all()?;
        self.stream.clear_all()?;
        Ok(())
    }

    fn gate(&self, operation: &'static str) -> bool {
        if !self.config.enabled {
            debug!(operation, "PCAL disabled, skipping");
        }
        self.config.enabled
    }
}
