//! FeedbackLoop: rule cycles, recommendation lifecycle, confidence multipliers.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

use pcal_authority::AuthorityChainResolver;
use pcal_core::clock::Clock;
use pcal_core::config::PcalConfig;
use pcal_core::errors::{PcalError, PcalResult};
use pcal_core::models::{
    DecisionSource, FeedbackCycleResult, FeedbackSignal, FeedbackState, Recommendation,
    RecommendationAction, RecommendationStatus,
};
use pcal_core::sync;
use pcal_memory::PlatformMemory;
use pcal_stream::DecisionStream;

use crate::rules::{self, RuleInputs, RuleSettings};

const NEUTRAL_MULTIPLIER: f64 = 1.0;

#[derive(Default)]
struct LoopState {
    recommendations: Vec<Recommendation>,
    cycles_run: u64,
    last_cycle_at: Option<DateTime<Utc>>,
}

pub struct FeedbackLoop {
    stream: Arc<DecisionStream>,
    authority: Arc<AuthorityChainResolver>,
    memory: Arc<PlatformMemory>,
    clock: Arc<dyn Clock>,
    settings: RuleSettings,
    min_multiplier: f64,
    confidence_step: f64,
    auto_adjust: bool,
    max_acknowledged: usize,
    state: RwLock<LoopState>,
    /// Per-source multipliers. Absent means 1.0.
    multipliers: DashMap<DecisionSource, f64>,
}

impl FeedbackLoop {
    pub fn new(
        config: &PcalConfig,
        stream: Arc<DecisionStream>,
        authority: Arc<AuthorityChainResolver>,
        memory: Arc<PlatformMemory>,
        clock: Arc<dyn Clock>,
    ) -> PcalResult<Self> {
        if config.override_threshold == 0 {
            return Err(PcalError::Config("override_threshold must be > 0".into()));
        }
        if !(config.min_confidence_multiplier > 0.0 && config.min_confidence_multiplier <= 1.0) {
            return Err(PcalError::Config(format!(
                "min_confidence_multiplier must be within (0, 1], got {}",
                config.min_confidence_multiplier
            )));
        }
        Ok(Self {
            stream,
            authority,
            memory,
            clock,
            settings: RuleSettings {
                override_threshold: config.override_threshold,
                lookback: config.feedback_lookback(),
                min_link_confidence: config.min_link_confidence,
            },
            min_multiplier: config.min_confidence_multiplier,
            confidence_step: config.confidence_step,
            auto_adjust: config.auto_adjust,
            max_acknowledged: config.max_acknowledged_recommendations.max(1),
            state: RwLock::new(LoopState::default()),
            multipliers: DashMap::new(),
        })
    }

    /// Evaluate every rule once against current memory findings.
    ///
    /// Reads the stored pattern and repeated-mistake sets as they are; run
    /// the memory scans first for fresh findings. A recommendation is only
    /// created when no pending one shares its `(action, target)`.
    pub fn run_feedback_cycle(&self) -> PcalResult<FeedbackCycleResult> {
        let now = self.clock.now();
        let inputs = self.gather_inputs()?;
        let hits = rules::evaluate(&inputs, &self.settings, now);

        let mut signals = Vec::with_capacity(hits.len());
        let mut generated = 0usize;
        let mut to_adjust = Vec::new();
        {
            let mut state = sync::write(&self.state)?;
            for hit in hits {
                let action = hit.action();
                let duplicate = state
                    .recommendations
                    .iter()
                    .any(|r| r.is_pending() && r.action == action && r.target == hit.target);

                if !duplicate {
                    let recommendation = Recommendation {
                        id: uuid::Uuid::new_v4().to_string(),
                        action,
                        target: hit.target.clone(),
                        reason: hit.detail.clone(),
                        rule: hit.rule,
                        status: RecommendationStatus::Pending,
                        created_at: now,
                        acknowledged_by: None,
                        acknowledged_at: None,
                    };
                    info!(
                        recommendation_id = %recommendation.id,
                        rule = %hit.rule,
                        action = %action,
                        target = %hit.target,
                        "Recommendation raised"
                    );
                    state.recommendations.push(recommendation);
                    generated += 1;

                    if self.auto_adjust && action == RecommendationAction::LowerAutomationConfidence {
                        if let Some(source) = hit.source {
                            to_adjust.push(source);
                        }
                    }
                } else {
                    debug!(rule = %hit.rule, target = %hit.target, "Pending recommendation already exists");
                }

                signals.push(FeedbackSignal {
                    rule: hit.rule,
                    target: hit.target,
                    detail: hit.detail,
                    produced_recommendation: !duplicate,
                });
            }
            state.cycles_run += 1;
            state.last_cycle_at = Some(now);
        }

        for source in to_adjust {
            self.apply_confidence_adjustment(source, self.confidence_step)?;
        }

        let state = self.state()?;
        info!(
            cycle = state.cycles_run,
            signals = signals.len(),
            generated,
            pending = state.pending_recommendations,
            "Feedback cycle complete"
        );
        Ok(FeedbackCycleResult {
            signals_detected: signals.len(),
            recommendations_generated: generated,
            signals,
            state,
        })
    }

    pub fn get_pending_recommendations(&self) -> PcalResult<Vec<Recommendation>> {
        Ok(sync::read(&self.state)?
            .recommendations
            .iter()
            .filter(|r| r.is_pending())
            .cloned()
            .collect())
    }

    /// Every pending recommendation plus the retained acknowledged history,
    /// oldest first.
    pub fn get_recommendations(&self) -> PcalResult<Vec<Recommendation>> {
        Ok(sync::read(&self.state)?.recommendations.clone())
    }

    /// `Pending` → `Acknowledged`. False for unknown or already acknowledged ids.
    pub fn acknowledge_recommendation(&self, id: &str, actor: &str) -> PcalResult<bool> {
        let now = self.clock.now();
        let mut state = sync::write(&self.state)?;
        let Some(recommendation) = state
            .recommendations
            .iter_mut()
            .find(|r| r.id == id && r.is_pending())
        else {
            return Ok(false);
        };
        recommendation.status = RecommendationStatus::Acknowledged;
        recommendation.acknowledged_by = Some(actor.to_string());
        recommendation.acknowledged_at = Some(now);
        info!(
            recommendation_id = id,
            actor,
            action = %recommendation.action,
            target = %recommendation.target,
            "Recommendation acknowledged"
        );
        let pruned = prune_acknowledged(&mut state.recommendations, self.max_acknowledged);
        if pruned > 0 {
            debug!(pruned, "Dropped oldest acknowledged recommendations");
        }
        Ok(true)
    }

    /// Multiplier producers should apply to their own confidence.
    pub fn get_confidence_adjustment(&self, source: DecisionSource) -> f64 {
        self.multipliers
            .get(&source)
            .map(|m| *m)
            .unwrap_or(NEUTRAL_MULTIPLIER)
    }

    /// Lower (positive delta) or raise (negative delta) a source's multiplier,
    /// clamped to `[min_confidence_multiplier, 1.0]`. Returns the new value.
    pub fn apply_confidence_adjustment(&self, source: DecisionSource, delta: f64) -> PcalResult<f64> {
        if !delta.is_finite() {
            return Err(PcalError::InvalidInput(format!(
                "confidence delta must be finite, got {}",
                delta
            )));
        }
        let mut entry = self.multipliers.entry(source).or_insert(NEUTRAL_MULTIPLIER);
        let previous = *entry;
        let next = (previous - delta).clamp(self.min_multiplier, NEUTRAL_MULTIPLIER);
        *entry = next;
        drop(entry);

        info!(
            source = %source,
            previous,
            multiplier = next,
            delta,
            "Confidence adjustment applied"
        );
        Ok(next)
    }

    /// Back to 1.0. Returns whether an adjustment existed.
    pub fn reset_confidence_adjustment(&self, source: DecisionSource) -> bool {
        let removed = self.multipliers.remove(&source).is_some();
        if removed {
            info!(source = %source, "Confidence adjustment reset");
        }
        removed
    }

    pub fn state(&self) -> PcalResult<FeedbackState> {
        let state = sync::read(&self.state)?;
        let pending = state.recommendations.iter().filter(|r| r.is_pending()).count();
        let confidence_adjustments: BTreeMap<String, f64> = self
            .multipliers
            .iter()
            .filter(|e| *e.value() != NEUTRAL_MULTIPLIER)
            .map(|e| (e.key().to_string(), *e.value()))
            .collect();
        Ok(FeedbackState {
            cycles_run: state.cycles_run,
            last_cycle_at: state.last_cycle_at,
            pending_recommendations: pending,
            acknowledged_recommendations: state.recommendations.len() - pending,
            confidence_adjustments,
        })
    }

    /// Drop recommendations, counters and multipliers. Destructive.
    pub fn clear_all(&self) -> PcalResult<()> {
        *sync::write(&self.state)? = LoopState::default();
        self.multipliers.clear();
        info!("Feedback loop cleared");
        Ok(())
    }

    fn gather_inputs(&self) -> PcalResult<RuleInputs> {
        Ok(RuleInputs {
            decisions: self
                .stream
                .all_decisions()?
                .into_iter()
                .map(|d| (d.id.clone(), d))
                .collect(),
            overrides: self.authority.get_all_overrides()?,
            patterns: self.memory.get_patterns()?,
            repeated_mistakes: self.memory.get_repeated_mistakes()?,
            links: self.memory.get_incident_links()?,
        })
    }
}

/// Drop the oldest acknowledged entries beyond `keep`. Pending entries are
/// never dropped. Returns how many were removed.
fn prune_acknowledged(recommendations: &mut Vec<Recommendation>, keep: usize) -> usize {
    let acknowledged = recommendations.iter().filter(|r| !r.is_pending()).count();
    let mut excess = acknowledged.saturating_sub(keep);
    let pruned = excess;
    recommendations.retain(|r| {
        if excess > 0 && !r.is_pending() {
            excess -= 1;
            false
        } else {
            true
        }
    });
    pruned
}
