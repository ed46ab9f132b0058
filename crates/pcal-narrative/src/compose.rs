//! One composition routine per narrative query.

use std::collections::{BTreeMap, HashSet};

use pcal_core::errors::PcalResult;
use pcal_core::models::{
    Decision, DecisionDomain, DecisionOutcome, LinkType, Narrative, NarrativeQuery, PatternSignature,
    Recommendation, SafetyTrend,
};

use crate::generator::NarrativeGenerator;

/// Evidence ids listed per narrative.
const MAX_EVIDENCE: usize = 10;

impl NarrativeGenerator {
    pub(crate) fn why_rollout_failed(&self, target: Option<&str>) -> PcalResult<Narrative> {
        let failures: Vec<Decision> = self
            .stream
            .all_decisions()?
            .into_iter()
            .filter(|d| d.domain == DecisionDomain::Deployment && d.outcome.is_failure())
            .filter(|d| matches_target(d, target))
            .collect();
        self.explain_failures(NarrativeQuery::WhyRolloutFailed, "rollout", target, failures)
    }

    pub(crate) fn why_feature_blocked(&self, target: Option<&str>) -> PcalResult<Narrative> {
        let blocked: Vec<Decision> = self
            .stream
            .all_decisions()?
            .into_iter()
            .filter(|d| d.domain == DecisionDomain::Feature && d.outcome == DecisionOutcome::Blocked)
            .filter(|d| matches_target(d, target))
            .collect();
        self.explain_failures(NarrativeQuery::WhyFeatureBlocked, "feature", target, blocked)
    }

    pub(crate) fn riskiest_area(&self) -> PcalResult<Narrative> {
        let risky: Vec<_> = self
            .memory
            .get_patterns()?
            .into_iter()
            .filter(|p| p.signature.outcome != DecisionOutcome::Approved)
            .collect();

        let Some(worst) = risky.first() else {
            return Ok(self.empty(
                NarrativeQuery::RiskiestArea,
                "No active risk patterns",
                "No non-approved decision signature currently exceeds the pattern threshold.",
            ));
        };

        let root_causes = risky
            .iter()
            .take(3)
            .map(|p| {
                format!(
                    "{} ({} severity, {} occurrences, {})",
                    p.name, p.severity, p.occurrences, p.trend
                )
            })
            .collect();

        let pending = self.feedback.get_pending_recommendations()?;
        let worst_key = worst.key();
        let mut recommendations = recommendations_for(
            &pending,
            &[worst.signature.source.as_str(), worst_key.as_str()],
        );
        if recommendations.is_empty() {
            recommendations.push(format!(
                "Review the {} thresholds that keep returning {} in {}",
                worst.signature.source, worst.signature.outcome, worst.signature.domain
            ));
        }

        Ok(Narrative {
            query: NarrativeQuery::RiskiestArea,
            headline: format!("{} is the riskiest area", area_label(&worst.signature)),
            summary: format!(
                "{} active risk pattern(s). The worst is {} with {} occurrences in the current window (previously {}).",
                risky.len(),
                worst_key,
                worst.occurrences,
                worst.previous_occurrences
            ),
            root_causes,
            recommendations,
            evidence_decision_ids: worst.decision_ids.iter().take(MAX_EVIDENCE).cloned().collect(),
            generated_at: self.clock.now(),
        })
    }

    pub(crate) fn safety_trend(&self) -> PcalResult<Narrative> {
        let report = self.generate_risk_report()?;
        let current = &report.current_window;
        let previous = &report.previous_window;

        let headline = match report.safety_trend {
            SafetyTrend::Safer => "The platform is getting safer".to_string(),
            SafetyTrend::Riskier => "The platform is getting riskier".to_string(),
            SafetyTrend::Same => "Platform safety is holding steady".to_string(),
        };

        let root_causes = vec![
            format!(
                "failure rate {:.0}% (previous window {:.0}%)",
                current.failure_rate * 100.0,
                previous.failure_rate * 100.0
            ),
            format!(
                "override rate {:.0}% (previous window {:.0}%)",
                current.override_rate * 100.0,
                previous.override_rate * 100.0
            ),
            format!(
                "{} decision(s) this window, {} in the previous one",
                current.decisions, previous.decisions
            ),
        ];

        let mut recommendations: Vec<String> = report
            .top_risks
            .iter()
            .map(|r| format!("Investigate {} ({} severity, {})", r.pattern_key, r.severity, r.trend))
            .collect();
        if report.safety_trend == SafetyTrend::Riskier && recommendations.is_empty() {
            recommendations.push("Review recent overrides and blocked decisions".to_string());
        }

        Ok(Narrative {
            query: NarrativeQuery::SafetyTrend,
            headline,
            summary: format!(
                "Safety score {:.0}/100 against {:.0}/100 in the previous window; {} pending recommendation(s), {} active override(s).",
                current.safety_score,
                previous.safety_score,
                report.pending_recommendations,
                report.active_overrides
            ),
            root_causes,
            recommendations,
            evidence_decision_ids: Vec::new(),
            generated_at: report.generated_at,
        })
    }

    pub(crate) fn override_activity(&self) -> PcalResult<Narrative> {
        let now = self.clock.now();
        let since = now - self.risk_window;
        let overrides: Vec<_> = self
            .authority
            .get_all_overrides()?
            .into_iter()
            .filter(|o| o.created_at > since && o.created_at <= now)
            .collect();

        if overrides.is_empty() {
            return Ok(self.empty(
                NarrativeQuery::OverrideActivity,
                "No recent overrides",
                "No human overrides were recorded in the current risk window.",
            ));
        }

        let active = overrides.iter().filter(|o| o.is_active_at(now)).count();
        let mut by_actor: BTreeMap<&str, usize> = BTreeMap::new();
        let mut by_source: BTreeMap<String, usize> = BTreeMap::new();
        for o in &overrides {
            *by_actor.entry(o.overridden_by.as_str()).or_insert(0) += 1;
            let source = match self.stream.get_decision(&o.decision_id)? {
                Some(d) => d.source.to_string(),
                None => "evicted".to_string(),
            };
            *by_source.entry(source).or_insert(0) += 1;
        }

        let mut root_causes: Vec<String> = by_actor
            .iter()
            .map(|(actor, n)| format!("{actor} overrode {n} decision(s)"))
            .collect();
        root_causes.extend(
            by_source
                .iter()
                .map(|(source, n)| format!("{n} override(s) against {source} decisions")),
        );

        let pending = self.feedback.get_pending_recommendations()?;
        let sources: Vec<&str> = by_source.keys().map(String::as_str).collect();
        let recommendations = recommendations_for(&pending, &sources);

        let mut evidence = Vec::new();
        for o in &overrides {
            if !evidence.contains(&o.decision_id) {
                evidence.push(o.decision_id.clone());
            }
        }
        evidence.truncate(MAX_EVIDENCE);

        Ok(Narrative {
            query: NarrativeQuery::OverrideActivity,
            headline: format!(
                "{} override(s) in the last {}h, {} still active",
                overrides.len(),
                self.risk_window.num_hours(),
                active
            ),
            summary: format!(
                "{} people overrode automated decisions across {} source(s).",
                by_actor.len(),
                by_source.len()
            ),
            root_causes,
            recommendations,
            evidence_decision_ids: evidence,
            generated_at: now,
        })
    }

    pub(crate) fn repeated_mistakes(&self) -> PcalResult<Narrative> {
        let mistakes = self.memory.get_repeated_mistakes()?;
        if mistakes.is_empty() {
            return Ok(self.empty(
                NarrativeQuery::RepeatedMistakes,
                "No repeated mistakes",
                "No override in a recurring pattern has been linked to a later incident.",
            ));
        }

        let incidents: HashSet<&str> = mistakes
            .iter()
            .flat_map(|m| m.incident_ids.iter().map(String::as_str))
            .collect();

        Ok(Narrative {
            query: NarrativeQuery::RepeatedMistakes,
            headline: format!("{} repeated mistake(s) found", mistakes.len()),
            summary: format!(
                "Overrides inside recurring patterns were later blamed for {} incident(s).",
                incidents.len()
            ),
            root_causes: mistakes.iter().map(|m| m.description.clone()).collect(),
            recommendations: mistakes.iter().map(|m| m.recommendation.clone()).collect(),
            evidence_decision_ids: mistakes
                .iter()
                .flat_map(|m| m.overridden_decision_ids.iter().cloned())
                .take(MAX_EVIDENCE)
                .collect(),
            generated_at: self.clock.now(),
        })
    }

    /// Shared by the rollout and feature queries: explain the most recent
    /// failure and what is known around it.
    fn explain_failures(
        &self,
        query: NarrativeQuery,
        noun: &str,
        target: Option<&str>,
        failures: Vec<Decision>,
    ) -> PcalResult<Narrative> {
        let subject = target.map_or_else(|| noun.to_string(), |t| format!("{noun} {t}"));
        let Some(latest) = failures.last() else {
            return Ok(self.empty(
                query,
                &format!("No failed {subject} on record"),
                "Nothing matching was blocked or escalated in the ledger.",
            ));
        };

        let mut root_causes = vec![format!(
            "{} {} it: {} ({:.0}% confidence)",
            latest.source, latest.outcome, latest.reason, latest.confidence
        )];

        let mut signals: Vec<_> = latest.signals.iter().collect();
        signals.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        root_causes.extend(
            signals
                .iter()
                .take(3)
                .map(|s| format!("signal {} (weight {:.2})", s.evidence_line(), s.weight)),
        );

        for link in self.memory.get_links_for_decision(&latest.id)? {
            if link.link_type == LinkType::CausedBy {
                root_causes.push(format!(
                    "incident {} was caused by this decision ({:.0}% confidence)",
                    link.incident_id, link.confidence
                ));
            }
        }

        for o in self.authority.get_overrides_for(&latest.id)? {
            root_causes.push(format!(
                "{} overrode it: {}",
                o.overridden_by, o.justification
            ));
        }

        let signature = PatternSignature {
            source: latest.source,
            domain: latest.domain,
            outcome: latest.outcome,
        };
        let pattern = self.memory.get_pattern(&signature.key())?;
        if let Some(p) = &pattern {
            root_causes.push(format!(
                "part of a recurring pattern: {} occurrences, {} severity, {}",
                p.occurrences, p.severity, p.trend
            ));
        }

        let pending = self.feedback.get_pending_recommendations()?;
        let key = signature.key();
        let mut recommendations =
            recommendations_for(&pending, &[latest.source.as_str(), key.as_str()]);
        recommendations.extend(
            self.memory
                .get_repeated_mistakes()?
                .into_iter()
                .filter(|m| m.signature == signature)
                .map(|m| m.recommendation),
        );
        if recommendations.is_empty() {
            recommendations.push(if latest.reversible {
                format!("Address the failing signals and retry the {noun}")
            } else {
                format!("The {noun} decision is irreversible; plan a forward fix")
            });
        }

        Ok(Narrative {
            query,
            headline: format!("The {subject} was {} by {}", latest.outcome, latest.source),
            summary: format!(
                "{} matching failure(s) on record; the latest was {} at {}. {}",
                failures.len(),
                latest.outcome,
                latest.timestamp.to_rfc3339(),
                match &pattern {
                    Some(_) => "This keeps happening.",
                    None => "No recurring pattern yet.",
                }
            ),
            root_causes,
            recommendations,
            evidence_decision_ids: failures
                .iter()
                .rev()
                .take(MAX_EVIDENCE)
                .map(|d| d.id.clone())
                .collect(),
            generated_at: self.clock.now(),
        })
    }

    fn empty(&self, query: NarrativeQuery, headline: &str, summary: &str) -> Narrative {
        Narrative {
            query,
            headline: headline.to_string(),
            summary: summary.to_string(),
            root_causes: Vec::new(),
            recommendations: Vec::new(),
            evidence_decision_ids: Vec::new(),
            generated_at: self.clock.now(),
        }
    }
}

fn matches_target(decision: &Decision, target: Option<&str>) -> bool {
    match target {
        None => true,
        Some(t) => decision.id == t || decision.target.as_deref() == Some(t),
    }
}

fn area_label(signature: &PatternSignature) -> String {
    format!("{} {}", signature.source, signature.domain)
}

/// Pending recommendations aimed at any of `targets`, as sentences.
fn recommendations_for(pending: &[Recommendation], targets: &[&str]) -> Vec<String> {
    pending
        .iter()
        .filter(|r| targets.contains(&r.target.as_str()))
        .map(|r| format!("{} for {}: {}", r.action, r.target, r.reason))
        .collect()
}
