//! The fixed feedback rule set.
//!
//! Rules are pure functions over a snapshot of ledger, authority and memory
//! state. Evaluation order is stable so two cycles over the same inputs
//! produce the same hits in the same order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};

use pcal_core::models::{
    AuthorityType, Decision, DecisionOutcome, DecisionSource, FeedbackRule, IncidentLink,
    LinkType, Override, Pattern, PatternSeverity, RecommendationAction, RepeatedMistake,
};

/// Thresholds the rules read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleSettings {
    pub override_threshold: usize,
    pub lookback: Duration,
    pub min_link_confidence: f64,
}

/// Everything one cycle evaluates, captured up front.
#[derive(Debug, Clone, Default)]
pub struct RuleInputs {
    /// Ledger contents keyed by id. Overrides on evicted decisions are skipped.
    pub decisions: HashMap<String, Decision>,
    pub overrides: Vec<Override>,
    pub patterns: Vec<Pattern>,
    pub repeated_mistakes: Vec<RepeatedMistake>,
    pub links: Vec<IncidentLink>,
}

/// One rule firing against one target.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleHit {
    pub rule: FeedbackRule,
    pub target: String,
    pub detail: String,
    /// Set when the target names a decision source.
    pub source: Option<DecisionSource>,
}

impl RuleHit {
    pub fn action(&self) -> RecommendationAction {
        self.rule.action()
    }

    fn for_source(rule: FeedbackRule, source: DecisionSource, detail: String) -> Self {
        Self {
            rule,
            target: source.to_string(),
            detail,
            source: Some(source),
        }
    }
}

/// Run every rule in order.
pub fn evaluate(inputs: &RuleInputs, settings: &RuleSettings, now: DateTime<Utc>) -> Vec<RuleHit> {
    let mut hits = Vec::new();
    hits.extend(override_frequency(inputs, settings, now));
    hits.extend(incident_linked_pattern(inputs, settings));
    hits.extend(repeated_mistake(inputs));
    hits.extend(critical_pattern(inputs));
    hits.extend(bypassed_policy(inputs, settings, now));
    hits
}

/// At least `override_threshold` overrides inside the lookback window
/// against decisions from one source.
pub fn override_frequency(
    inputs: &RuleInputs,
    settings: &RuleSettings,
    now: DateTime<Utc>,
) -> Vec<RuleHit> {
    let since = now - settings.lookback;
    let mut per_source: BTreeMap<DecisionSource, usize> = BTreeMap::new();
    for o in inputs
        .overrides
        .iter()
        .filter(|o| o.created_at >= since && o.created_at <= now)
    {
        if let Some(decision) = inputs.decisions.get(&o.decision_id) {
            *per_source.entry(decision.source).or_insert(0) += 1;
        }
    }

    per_source
        .into_iter()
        .filter(|(_, count)| *count >= settings.override_threshold)
        .map(|(source, count)| {
            RuleHit::for_source(
                FeedbackRule::OverrideFrequency,
                source,
                format!(
                    "{count} human override(s) of {source} decisions within the last {}h",
                    settings.lookback.num_hours()
                ),
            )
        })
        .collect()
}

/// A source with an active non-approved pattern whose decisions were
/// blamed for an incident with enough confidence.
pub fn incident_linked_pattern(inputs: &RuleInputs, settings: &RuleSettings) -> Vec<RuleHit> {
    let mut patterned: BTreeMap<DecisionSource, Vec<&Pattern>> = BTreeMap::new();
    for p in inputs
        .patterns
        .iter()
        .filter(|p| p.signature.outcome != DecisionOutcome::Approved)
    {
        patterned.entry(p.signature.source).or_default().push(p);
    }

    let mut hits = Vec::new();
    for (source, patterns) in patterned {
        let blamed: BTreeSet<&str> = inputs
            .links
            .iter()
            .filter(|l| l.link_type == LinkType::CausedBy)
            .filter(|l| l.confidence >= settings.min_link_confidence)
            .filter(|l| {
                inputs
                    .decisions
                    .get(&l.decision_id)
                    .is_some_and(|d| d.source == source)
            })
            .map(|l| l.incident_id.as_str())
            .collect();
        if blamed.is_empty() {
            continue;
        }

        let keys: Vec<String> = patterns.iter().map(|p| p.key()).collect();
        hits.push(RuleHit::for_source(
            FeedbackRule::IncidentLinkedPattern,
            source,
            format!(
                "pattern(s) {} active while incident(s) {} were caused by {} decisions",
                keys.join(", "),
                blamed.into_iter().collect::<Vec<_>>().join(", "),
                source
            ),
        ));
    }
    hits
}

/// Every stored repeated mistake, one hit per source.
pub fn repeated_mistake(inputs: &RuleInputs) -> Vec<RuleHit> {
    let mut per_source: BTreeMap<DecisionSource, Vec<&RepeatedMistake>> = BTreeMap::new();
    for m in &inputs.repeated_mistakes {
        per_source.entry(m.signature.source).or_default().push(m);
    }
    per_source
        .into_iter()
        .map(|(source, mistakes)| {
            let keys: Vec<&str> = mistakes.iter().map(|m| m.pattern_key.as_str()).collect();
            RuleHit::for_source(
                FeedbackRule::RepeatedMistake,
                source,
                format!("overrides later caused incidents in {}", keys.join(", ")),
            )
        })
        .collect()
}

/// Critical blocked or escalated patterns.
pub fn critical_pattern(inputs: &RuleInputs) -> Vec<RuleHit> {
    inputs
        .patterns
        .iter()
        .filter(|p| p.severity == PatternSeverity::Critical)
        .filter(|p| {
            matches!(
                p.signature.outcome,
                DecisionOutcome::Blocked | DecisionOutcome::Escalated
            )
        })
        .map(|p| RuleHit {
            rule: FeedbackRule::CriticalPattern,
            target: p.key(),
            detail: format!(
                "{} reached {} occurrences ({})",
                p.name, p.occurrences, p.trend
            ),
            source: None,
        })
        .collect()
}

/// At least `override_threshold` active overrides on policy-authority
/// decisions from one source.
pub fn bypassed_policy(
    inputs: &RuleInputs,
    settings: &RuleSettings,
    now: DateTime<Utc>,
) -> Vec<RuleHit> {
    let mut per_source: BTreeMap<DecisionSource, usize> = BTreeMap::new();
    for o in inputs.overrides.iter().filter(|o| o.is_active_at(now)) {
        if let Some(decision) = inputs.decisions.get(&o.decision_id) {
            if decision.authority == AuthorityType::Policy {
                *per_source.entry(decision.source).or_insert(0) += 1;
            }
        }
    }

    per_source
        .into_iter()
        .filter(|(_, count)| *count >= settings.override_threshold)
        .map(|(source, count)| {
            RuleHit::for_source(
                FeedbackRule::BypassedPolicy,
                source,
                format!("{count} active override(s) bypass {source} policy decisions"),
            )
        })
        .collect()
}
