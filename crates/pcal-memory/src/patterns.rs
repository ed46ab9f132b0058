//! Windowed signature counting and pattern construction.
//!
//! The current window is `(now - window, now]`, the previous one is the
//! equal-length span right before it. Decisions stamped in the future are
//! ignored until the clock reaches them.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use pcal_core::models::{Decision, Pattern, PatternSeverity, PatternSignature, PatternTrend};

pub(crate) struct WindowScan {
    pub current: BTreeMap<PatternSignature, Vec<Decision>>,
    pub previous: BTreeMap<PatternSignature, usize>,
}

impl WindowScan {
    /// Signatures seen more than `threshold` times in the current window.
    pub fn qualifying(&self, threshold: usize) -> impl Iterator<Item = (&PatternSignature, &Vec<Decision>)> {
        self.current
            .iter()
            .filter(move |(_, decisions)| decisions.len() > threshold)
    }

    pub fn previous_count(&self, signature: &PatternSignature) -> usize {
        self.previous.get(signature).copied().unwrap_or(0)
    }
}

pub(crate) fn scan(decisions: Vec<Decision>, now: DateTime<Utc>, window: Duration) -> WindowScan {
    let current_start = now - window;
    let previous_start = current_start - window;

    let mut current: BTreeMap<PatternSignature, Vec<Decision>> = BTreeMap::new();
    let mut previous: BTreeMap<PatternSignature, usize> = BTreeMap::new();

    for decision in decisions {
        let signature = signature_of(&decision);
        let ts = decision.timestamp;
        if ts > current_start && ts <= now {
            current.entry(signature).or_default().push(decision);
        } else if ts > previous_start && ts <= current_start {
            *previous.entry(signature).or_insert(0) += 1;
        }
    }

    WindowScan { current, previous }
}

pub(crate) fn signature_of(decision: &Decision) -> PatternSignature {
    PatternSignature {
        source: decision.source,
        domain: decision.domain,
        outcome: decision.outcome,
    }
}

/// Build the replacement for a pattern. Identity (`id`,
/// `first_detected_at`) carries over from `existing`; `updated_at` only
/// moves when the scan-derived fields change.
pub(crate) fn build_pattern(
    signature: PatternSignature,
    window_decisions: &[Decision],
    previous_occurrences: usize,
    threshold: usize,
    existing: Option<&Pattern>,
    now: DateTime<Utc>,
) -> Pattern {
    let occurrences = window_decisions.len();
    let mut pattern = Pattern {
        id: existing
            .map(|p| p.id.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        signature,
        name: signature.display_name(),
        occurrences,
        previous_occurrences,
        severity: PatternSeverity::from_occurrences(occurrences, threshold),
        trend: PatternTrend::between(occurrences, previous_occurrences),
        decision_ids: window_decisions.iter().map(|d| d.id.clone()).collect(),
        first_detected_at: existing.map(|p| p.first_detected_at).unwrap_or(now),
        updated_at: now,
    };
    if let Some(existing) = existing {
        if !pattern.differs_from(existing) {
            pattern.updated_at = existing.updated_at;
        }
    }
    pattern
}

/// Most severe first, then most frequent, then by key.
pub(crate) fn sort_by_severity(patterns: &mut [Pattern]) {
    patterns.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(b.occurrences.cmp(&a.occurrences))
            .then_with(|| a.signature.cmp(&b.signature))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcal_core::models::{AuthorityType, DecisionDomain, DecisionOutcome, DecisionSource};

    fn decision_at(ts: DateTime<Utc>, outcome: DecisionOutcome) -> Decision {
        Decision {
            id: uuid::Uuid::new_v4().to_string(),
            source: DecisionSource::Cutover,
            domain: DecisionDomain::Deployment,
            outcome,
            reason: "r".into(),
            confidence: 50.0,
            signals: Vec::new(),
            authority: AuthorityType::System,
            actor: None,
            reversible: true,
            target: None,
            metadata: Default::default(),
            timestamp: ts,
            signature: String::new(),
        }
    }

    #[test]
    fn scan_splits_current_and_previous_windows() {
        let now = Utc::now();
        let window = Duration::hours(1);
        let decisions = vec![
            decision_at(now, DecisionOutcome::Blocked),
            decision_at(now - Duration::minutes(30), DecisionOutcome::Blocked),
            decision_at(now - Duration::minutes(90), DecisionOutcome::Blocked),
            decision_at(now - Duration::hours(3), DecisionOutcome::Blocked),
            decision_at(now + Duration::minutes(5), DecisionOutcome::Blocked),
        ];
        let result = scan(decisions, now, window);
        let sig = signature_of(&decision_at(now, DecisionOutcome::Blocked));
        assert_eq!(result.current[&sig].len(), 2);
        assert_eq!(result.previous_count(&sig), 1);
    }

    #[test]
    fn unchanged_rebuild_keeps_identity_and_timestamp() {
        let now = Utc::now();
        let decisions: Vec<Decision> = (0..4)
            .map(|_| decision_at(now, DecisionOutcome::Blocked))
            .collect();
        let sig = signature_of(&decisions[0]);
        let first = build_pattern(sig, &decisions, 0, 3, None, now);
        let later = now + Duration::minutes(1);
        let second = build_pattern(sig, &decisions, 0, 3, Some(&first), later);
        assert_eq!(second.id, first.id);
        assert_eq!(second.updated_at, first.updated_at);
        assert!(!second.differs_from(&first));
    }

    #[test]
    fn severity_sort_puts_worst_first() {
        let now = Utc::now();
        let few: Vec<Decision> = (0..4).map(|_| decision_at(now, DecisionOutcome::Warning)).collect();
        let many: Vec<Decision> = (0..12).map(|_| decision_at(now, DecisionOutcome::Blocked)).collect();
        let mut patterns = vec![
            build_pattern(signature_of(&few[0]), &few, 0, 3, None, now),
            build_pattern(signature_of(&many[0]), &many, 0, 3, None, now),
        ];
        sort_by_severity(&mut patterns);
        assert_eq!(patterns[0].severity, PatternSeverity::Critical);
        assert_eq!(patterns[1].severity, PatternSeverity::Low);
    }
}
