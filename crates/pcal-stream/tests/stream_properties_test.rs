//! Property tests for the decision stream.

use proptest::prelude::*;

use pcal_core::models::*;
use pcal_stream::{verify_signature, DecisionStream};
use test_fixtures::{as_dyn, manual_clock, with_confidence};

fn outcome_strategy() -> impl Strategy<Value = DecisionOutcome> {
    prop_oneof![
        Just(DecisionOutcome::Approved),
        Just(DecisionOutcome::Blocked),
        Just(DecisionOutcome::Warning),
        Just(DecisionOutcome::Escalated),
    ]
}

proptest! {
    // avg_confidence is the arithmetic mean of everything ingested.
    #[test]
    fn prop_avg_confidence_is_mean(confidences in prop::collection::vec(0.0f64..=100.0, 1..60)) {
        let clock = manual_clock();
        let stream = DecisionStream::new(1_000, as_dyn(&clock)).unwrap();
        for c in &confidences {
            stream
                .ingest_decision(
                    DecisionSource::LoadController,
                    DecisionDomain::Traffic,
                    DecisionOutcome::Warning,
                    "prop",
                    with_confidence(*c),
                )
                .unwrap();
        }
        let expected = confidences.iter().sum::<f64>() / confidences.len() as f64;
        let stats = stream.get_decision_stats().unwrap();
        prop_assert_eq!(stats.total, confidences.len());
        prop_assert!((stats.avg_confidence - expected).abs() < 1e-9);
    }

    // get_decision(d.id) returns d unchanged, with a valid signature.
    #[test]
    fn prop_round_trip(
        reason in "[a-z |]{0,40}",
        confidence in 0.0f64..=100.0,
        outcome in outcome_strategy(),
        reversible in any::<bool>(),
    ) {
        let clock = manual_clock();
        let stream = DecisionStream::new(10, as_dyn(&clock)).unwrap();
        let d = stream
            .ingest_decision(
                DecisionSource::Cutover,
                DecisionDomain::Deployment,
                outcome,
                reason,
                with_confidence(confidence).reversible(reversible),
            )
            .unwrap();
        let fetched = stream.get_decision(&d.id).unwrap().unwrap();
        prop_assert!(verify_signature(&fetched));
        prop_assert_eq!(fetched, d);
    }

    // The ledger never exceeds its capacity and keeps the newest entries.
    #[test]
    fn prop_capacity_bound(max in 1usize..20, count in 0usize..60) {
        let clock = manual_clock();
        let stream = DecisionStream::new(max, as_dyn(&clock)).unwrap();
        let mut last = None;
        for i in 0..count {
            let d = stream
                .ingest_decision(
                    DecisionSource::Governor,
                    DecisionDomain::Feature,
                    DecisionOutcome::Approved,
                    format!("n{i}"),
                    IngestOptions::default(),
                )
                .unwrap();
            last = Some(d.id);
        }
        prop_assert_eq!(stream.len().unwrap(), count.min(max));
        if let Some(id) = last {
            prop_assert!(stream.get_decision(&id).unwrap().is_some());
        }
        let stats = stream.get_decision_stats().unwrap();
        prop_assert_eq!(stats.evicted_total as usize, count.saturating_sub(max));
    }
}
