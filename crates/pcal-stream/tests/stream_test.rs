//! Decision stream tests: ingest, lookups, eviction, stats, signatures.

use std::sync::Arc;

use chrono::Duration;
use pcal_core::models::*;
use pcal_core::{Clock, PcalError};
use pcal_stream::{verify_signature, DecisionStream};
use test_fixtures::{as_dyn, cutover_signals, manual_clock, with_confidence};

fn stream(max: usize) -> (DecisionStream, Arc<pcal_core::ManualClock>) {
    let clock = manual_clock();
    (DecisionStream::new(max, as_dyn(&clock)).unwrap(), clock)
}

#[test]
fn ingest_round_trips_every_field() {
    let (stream, _) = stream(10);
    let mut options = with_confidence(72.0)
        .target("rollout-42")
        .metadata("region", "eu-west-1")
        .reversible(false);
    options.signals = cutover_signals();

    let d = stream
        .ingest_decision(
            DecisionSource::Cutover,
            DecisionDomain::Deployment,
            DecisionOutcome::Blocked,
            "error budget exhausted",
            options,
        )
        .unwrap();

    let fetched = stream.get_decision(&d.id).unwrap().unwrap();
    assert_eq!(fetched, d);
    assert_eq!(fetched.signals.len(), 3);
    assert_eq!(fetched.signals[0].name, "error_rate");
    assert!(!fetched.reversible);
    assert!(verify_signature(&fetched));
}

#[test]
fn defaults_are_system_authority_and_reversible() {
    let (stream, _) = stream(10);
    let d = stream
        .ingest_decision(
            DecisionSource::Governor,
            DecisionDomain::Feature,
            DecisionOutcome::Approved,
            "flag healthy",
            IngestOptions::default(),
        )
        .unwrap();
    assert_eq!(d.authority, AuthorityType::System);
    assert!(d.reversible);
    assert_eq!(d.actor, None);
    assert!((d.confidence - 50.0).abs() < f64::EPSILON);
}

#[test]
fn manual_decision_forces_human_authority() {
    let (stream, _) = stream(10);
    let d = stream
        .ingest_manual_decision(
            DecisionDomain::Platform,
            DecisionOutcome::Approved,
            "manual freeze lift",
            "alice",
        )
        .unwrap();
    assert_eq!(d.authority, AuthorityType::Human);
    assert_eq!(d.actor.as_deref(), Some("alice"));
    assert_eq!(d.source, DecisionSource::Manual);
}

#[test]
fn human_authority_without_actor_fails_fast() {
    let (stream, _) = stream(10);
    let err = stream
        .ingest_decision(
            DecisionSource::Override,
            DecisionDomain::Platform,
            DecisionOutcome::Approved,
            "who?",
            IngestOptions::new().authority(AuthorityType::Human),
        )
        .unwrap_err();
    assert!(matches!(err, PcalError::InvalidInput(_)));
    assert!(stream.is_empty().unwrap());
}

#[test]
fn out_of_range_confidence_is_rejected() {
    let (stream, _) = stream(10);
    for bad in [-1.0, 100.5, f64::NAN] {
        let result = stream.ingest_decision(
            DecisionSource::Cutover,
            DecisionDomain::Deployment,
            DecisionOutcome::Warning,
            "bad",
            with_confidence(bad),
        );
        assert!(result.is_err(), "confidence {bad} should be rejected");
    }
}

#[test]
fn unknown_id_returns_none() {
    let (stream, _) = stream(10);
    assert!(stream.get_decision("nope").unwrap().is_none());
}

#[test]
fn recent_decisions_are_most_recent_first() {
    let (stream, clock) = stream(10);
    let mut ids = Vec::new();
    for i in 0..4 {
        clock.advance(Duration::seconds(1));
        let d = stream
            .ingest_decision(
                DecisionSource::LoadController,
                DecisionDomain::Traffic,
                DecisionOutcome::Warning,
                format!("shed load #{i}"),
                IngestOptions::default(),
            )
            .unwrap();
        ids.push(d.id);
    }

    let recent = stream.get_recent_decisions(Some(2)).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, ids[3]);
    assert_eq!(recent[1].id, ids[2]);
    assert_eq!(stream.get_recent_decisions(None).unwrap().len(), 4);
}

#[test]
fn filters_by_source_and_outcome() {
    let (stream, _) = stream(10);
    let ingest = |source, outcome| {
        stream
            .ingest_decision(source, DecisionDomain::Platform, outcome, "x", IngestOptions::default())
            .unwrap()
    };
    ingest(DecisionSource::Cutover, DecisionOutcome::Blocked);
    ingest(DecisionSource::Cutover, DecisionOutcome::Approved);
    ingest(DecisionSource::Governor, DecisionOutcome::Blocked);

    assert_eq!(stream.get_decisions_by_source(DecisionSource::Cutover).unwrap().len(), 2);
    assert_eq!(stream.get_decisions_by_outcome(DecisionOutcome::Blocked).unwrap().len(), 2);
    assert!(stream.get_decisions_by_source(DecisionSource::Incident).unwrap().is_empty());
}

#[test]
fn exceeding_capacity_evicts_oldest_first() {
    let (stream, _) = stream(3);
    let ids: Vec<String> = (0..5)
        .map(|i| {
            stream
                .ingest_decision(
                    DecisionSource::Cutover,
                    DecisionDomain::Deployment,
                    DecisionOutcome::Approved,
                    format!("step {i}"),
                    IngestOptions::default(),
                )
                .unwrap()
                .id
        })
        .collect();

    assert_eq!(stream.len().unwrap(), 3);
    assert!(stream.get_decision(&ids[0]).unwrap().is_none());
    assert!(stream.get_decision(&ids[1]).unwrap().is_none());
    assert!(stream.get_decision(&ids[4]).unwrap().is_some());
    assert_eq!(stream.get_decision_stats().unwrap().evicted_total, 2);
}

#[test]
fn zero_capacity_is_a_config_error() {
    let clock = manual_clock();
    assert!(matches!(
        DecisionStream::new(0, as_dyn(&clock)),
        Err(PcalError::Config(_))
    ));
}

#[test]
fn stats_are_computed_fresh() {
    let (stream, _) = stream(10);
    assert_eq!(stream.get_decision_stats().unwrap().total, 0);

    stream
        .ingest_decision(
            DecisionSource::Cutover,
            DecisionDomain::Deployment,
            DecisionOutcome::Blocked,
            "a",
            with_confidence(40.0),
        )
        .unwrap();
    stream
        .ingest_manual_decision(DecisionDomain::Platform, DecisionOutcome::Approved, "b", "bob")
        .unwrap();

    let stats = stream.get_decision_stats().unwrap();
    assert_eq!(stats.total, 2);
    assert!((stats.avg_confidence - 45.0).abs() < 1e-9);
    assert_eq!(stats.outcome_breakdown[&DecisionOutcome::Blocked], 1);
    assert_eq!(stats.source_breakdown[&DecisionSource::Manual], 1);
    assert_eq!(stats.human_decisions, 1);
}

#[test]
fn window_query_is_half_open() {
    let (stream, clock) = stream(10);
    let start = clock.now();
    stream
        .ingest_decision(
            DecisionSource::Cutover,
            DecisionDomain::Deployment,
            DecisionOutcome::Blocked,
            "in window",
            IngestOptions::default(),
        )
        .unwrap();
    clock.advance(Duration::minutes(10));
    stream
        .ingest_decision(
            DecisionSource::Cutover,
            DecisionDomain::Deployment,
            DecisionOutcome::Blocked,
            "at boundary",
            IngestOptions::default(),
        )
        .unwrap();

    let hits = stream
        .get_decisions_between(start, start + Duration::minutes(10))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].reason, "in window");
}

#[test]
fn identical_submissions_share_a_signature() {
    let (stream, _) = stream(10);
    let make = || {
        stream
            .ingest_decision(
                DecisionSource::Governor,
                DecisionDomain::Feature,
                DecisionOutcome::Blocked,
                "kill switch",
                IngestOptions::default(),
            )
            .unwrap()
    };
    let a = make();
    let b = make();
    assert_ne!(a.id, b.id);
    assert_eq!(a.signature, b.signature);
    assert_eq!(stream.find_by_signature(&a.signature).unwrap().len(), 2);
}

#[test]
fn clear_all_resets_ledger() {
    let (stream, _) = stream(2);
    for _ in 0..3 {
        stream
            .ingest_decision(
                DecisionSource::Cutover,
                DecisionDomain::Deployment,
                DecisionOutcome::Approved,
                "x",
                IngestOptions::default(),
            )
            .unwrap();
    }
    stream.clear_all().unwrap();
    let stats = stream.get_decision_stats().unwrap();
    assert_eq!(stats.total, 0);
    assert_eq!(stats.evicted_total, 0);
}
