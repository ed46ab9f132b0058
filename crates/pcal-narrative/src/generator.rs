//! NarrativeGenerator: query dispatch and the risk report.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use tracing::debug;

use pcal_authority::AuthorityChainResolver;
use pcal_core::clock::Clock;
use pcal_core::config::PcalConfig;
use pcal_core::errors::PcalResult;
use pcal_core::models::{
    DecisionOutcome, Narrative, NarrativeQuery, NarrativeRequest, Pattern, PatternTrend, RiskItem,
    RiskReport,
};
use pcal_feedback::FeedbackLoop;
use pcal_memory::PlatformMemory;
use pcal_stream::DecisionStream;

use crate::risk;

/// Most entries listed in `top_risks` and `top_opportunities`.
pub const MAX_RISK_ITEMS: usize = 5;

pub struct NarrativeGenerator {
    pub(crate) stream: Arc<DecisionStream>,
    pub(crate) authority: Arc<AuthorityChainResolver>,
    pub(crate) memory: Arc<PlatformMemory>,
    pub(crate) feedback: Arc<FeedbackLoop>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) risk_window: Duration,
}

impl NarrativeGenerator {
    pub fn new(
        config: &PcalConfig,
        stream: Arc<DecisionStream>,
        authority: Arc<AuthorityChainResolver>,
        memory: Arc<PlatformMemory>,
        feedback: Arc<FeedbackLoop>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stream,
            authority,
            memory,
            feedback,
            clock,
            risk_window: config.risk_window(),
        }
    }

    pub fn generate_narrative(&self, request: &NarrativeRequest) -> PcalResult<Narrative> {
        let target = request.target.as_deref();
        let narrative = match request.query {
            NarrativeQuery::WhyRolloutFailed => self.why_rollout_failed(target)?,
            NarrativeQuery::WhyFeatureBlocked => self.why_feature_blocked(target)?,
            NarrativeQuery::RiskiestArea => self.riskiest_area()?,
            NarrativeQuery::SafetyTrend => self.safety_trend()?,
            NarrativeQuery::OverrideActivity => self.override_activity()?,
            NarrativeQuery::RepeatedMistakes => self.repeated_mistakes()?,
        };
        debug!(
            query = %request.query,
            target = target.unwrap_or("-"),
            root_causes = narrative.root_causes.len(),
            "Narrative generated"
        );
        Ok(narrative)
    }

    /// Score the current risk window against the one before it.
    pub fn generate_risk_report(&self) -> PcalResult<RiskReport> {
        let now = self.clock.now();
        let decisions = self.stream.all_decisions()?;
        let overridden: HashSet<String> = self
            .authority
            .get_all_overrides()?
            .into_iter()
            .map(|o| o.decision_id)
            .collect();

        let current_start = now - self.risk_window;
        let previous_start = current_start - self.risk_window;
        let current_window = risk::window_stats(&decisions, &overridden, current_start, now);
        let previous_window =
            risk::window_stats(&decisions, &overridden, previous_start, current_start);

        let patterns = self.memory.get_patterns()?;
        let top_risks = patterns
            .iter()
            .filter(|p| is_risk(p))
            .take(MAX_RISK_ITEMS)
            .map(risk_item)
            .collect();
        let top_opportunities = patterns
            .iter()
            .filter(|p| !is_risk(p))
            .take(MAX_RISK_ITEMS)
            .map(risk_item)
            .collect();

        let report = RiskReport {
            safety_score: current_window.safety_score,
            safety_trend: risk::safety_trend(&current_window, &previous_window),
            current_window,
            previous_window,
            top_risks,
            top_opportunities,
            pending_recommendations: self.feedback.get_pending_recommendations()?.len(),
            active_overrides: self.authority.get_active_overrides()?.len(),
            generated_at: now,
        };
        debug!(
            score = report.safety_score,
            trend = %report.safety_trend,
            risks = report.top_risks.len(),
            "Risk report generated"
        );
        Ok(report)
    }

    /// No state is held; kept so every component can be reset the same way.
    pub fn clear_all(&self) -> PcalResult<()> {
        debug!("Narrative generator holds no state");
        Ok(())
    }
}

/// Non-approved and not shrinking.
fn is_risk(pattern: &Pattern) -> bool {
    pattern.signature.outcome != DecisionOutcome::Approved
        && pattern.trend != PatternTrend::Decreasing
}

fn risk_item(pattern: &Pattern) -> RiskItem {
    RiskItem {
        pattern_key: pattern.key(),
        name: pattern.name.clone(),
        severity: pattern.severity,
        trend: pattern.trend,
        occurrences: pattern.occurrences,
    }
}
