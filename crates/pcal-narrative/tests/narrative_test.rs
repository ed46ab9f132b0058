//! Narrative composition and risk reporting over a populated stack.

use std::sync::Arc;

use chrono::Duration;
use pcal_authority::AuthorityChainResolver;
use pcal_core::models::*;
use pcal_core::{ManualClock, PcalConfig};
use pcal_feedback::FeedbackLoop;
use pcal_memory::PlatformMemory;
use pcal_narrative::{render_markdown, NarrativeGenerator};
use pcal_stream::DecisionStream;
use test_fixtures::{as_dyn, cutover_signals, manual_clock, with_confidence};

struct Stack {
    clock: Arc<ManualClock>,
    stream: Arc<DecisionStream>,
    authority: Arc<AuthorityChainResolver>,
    memory: Arc<PlatformMemory>,
    feedback: Arc<FeedbackLoop>,
    narrative: NarrativeGenerator,
}

fn stack() -> Stack {
    let config = PcalConfig::default();
    let clock = manual_clock();
    let stream = Arc::new(DecisionStream::from_config(&config, as_dyn(&clock)).unwrap());
    let authority = Arc::new(AuthorityChainResolver::new(stream.clone(), as_dyn(&clock)));
    let memory = Arc::new(
        PlatformMemory::new(&config, stream.clone(), authority.clone(), as_dyn(&clock)).unwrap(),
    );
    let feedback = Arc::new(
        FeedbackLoop::new(
            &config,
            stream.clone(),
            authority.clone(),
            memory.clone(),
            as_dyn(&clock),
        )
        .unwrap(),
    );
    let narrative = NarrativeGenerator::new(
        &config,
        stream.clone(),
        authority.clone(),
        memory.clone(),
        feedback.clone(),
        as_dyn(&clock),
    );
    Stack {
        clock,
        stream,
        authority,
        memory,
        feedback,
        narrative,
    }
}

fn decide(s: &Stack, source: DecisionSource, domain: DecisionDomain, outcome: DecisionOutcome) -> Decision {
    s.clock.advance(Duration::minutes(1));
    s.stream
        .ingest_decision(source, domain, outcome, "automated check", IngestOptions::default())
        .unwrap()
}

#[test]
fn every_query_answers_on_an_empty_stack() {
    let s = stack();
    for query in NarrativeQuery::ALL {
        let n = s.narrative.generate_narrative(&NarrativeRequest::new(*query)).unwrap();
        assert_eq!(n.query, *query);
        assert!(!n.headline.is_empty());
    }
}

#[test]
fn rollout_failure_explains_signals_incidents_and_overrides() {
    let s = stack();
    let mut options = with_confidence(91.0).target("rollout-9");
    options.signals = cutover_signals();
    let failed = s
        .stream
        .ingest_decision(
            DecisionSource::Cutover,
            DecisionDomain::Deployment,
            DecisionOutcome::Blocked,
            "error budget exhausted",
            options,
        )
        .unwrap();
    s.authority
        .record_override(&failed.id, "alice", "ship the fix", "sev1", 60_000)
        .unwrap();
    s.memory
        .link_incident_to_decision("inc-7", &failed.id, LinkType::CausedBy, 80.0)
        .unwrap();
    decide(&s, DecisionSource::Cutover, DecisionDomain::Deployment, DecisionOutcome::Approved);

    let n = s
        .narrative
        .generate_narrative(&NarrativeRequest::for_target(
            NarrativeQuery::WhyRolloutFailed,
            "rollout-9",
        ))
        .unwrap();
    assert_eq!(n.headline, "The rollout rollout-9 was blocked by cutover");
    assert_eq!(n.evidence_decision_ids, vec![failed.id.clone()]);
    assert!(n.root_causes[0].contains("error budget exhausted"));
    assert!(n.root_causes.iter().any(|c| c.contains("error_rate")));
    assert!(n.root_causes.iter().any(|c| c.contains("inc-7")));
    assert!(n.root_causes.iter().any(|c| c.contains("alice")));
    assert!(!n.recommendations.is_empty());

    let md = render_markdown(&n);
    assert!(md.starts_with("# The rollout rollout-9"));
}

#[test]
fn unknown_target_reports_nothing_failed() {
    let s = stack();
    decide(&s, DecisionSource::Governor, DecisionDomain::Feature, DecisionOutcome::Blocked);
    let n = s
        .narrative
        .generate_narrative(&NarrativeRequest::for_target(
            NarrativeQuery::WhyFeatureBlocked,
            "checkout-v2",
        ))
        .unwrap();
    assert!(n.headline.starts_with("No failed feature checkout-v2"));
    assert!(n.evidence_decision_ids.is_empty());
}

#[test]
fn feature_blocked_mentions_pattern() {
    let s = stack();
    for _ in 0..4 {
        decide(&s, DecisionSource::Governor, DecisionDomain::Feature, DecisionOutcome::Blocked);
    }
    s.memory.detect_patterns().unwrap();
    let n = s
        .narrative
        .generate_narrative(&NarrativeRequest::new(NarrativeQuery::WhyFeatureBlocked))
        .unwrap();
    assert_eq!(n.evidence_decision_ids.len(), 4);
    assert!(n.root_causes.iter().any(|c| c.contains("recurring pattern")));
}

#[test]
fn riskiest_area_picks_most_severe_pattern() {
    let s = stack();
    for _ in 0..12 {
        decide(&s, DecisionSource::LoadController, DecisionDomain::Traffic, DecisionOutcome::Blocked);
    }
    for _ in 0..4 {
        decide(&s, DecisionSource::Governor, DecisionDomain::Feature, DecisionOutcome::Warning);
    }
    s.memory.detect_patterns().unwrap();
    s.feedback.run_feedback_cycle().unwrap();

    let n = s
        .narrative
        .generate_narrative(&NarrativeRequest::new(NarrativeQuery::RiskiestArea))
        .unwrap();
    assert_eq!(n.headline, "load_controller traffic is the riskiest area");
    assert_eq!(n.root_causes.len(), 2);
    assert!(n.recommendations[0].starts_with("escalate for load_controller:traffic:blocked"));
}

#[test]
fn risk_report_scores_and_trends() {
    let s = stack();
    // Previous window: all approved.
    for _ in 0..4 {
        decide(&s, DecisionSource::Cutover, DecisionDomain::Deployment, DecisionOutcome::Approved);
    }
    s.clock.advance(Duration::days(7));
    // Current window: half blocked, one overridden.
    decide(&s, DecisionSource::Cutover, DecisionDomain::Deployment, DecisionOutcome::Approved);
    decide(&s, DecisionSource::Cutover, DecisionDomain::Deployment, DecisionOutcome::Approved);
    decide(&s, DecisionSource::Cutover, DecisionDomain::Deployment, DecisionOutcome::Blocked);
    let overridden = decide(&s, DecisionSource::Cutover, DecisionDomain::Deployment, DecisionOutcome::Blocked);
    s.authority
        .record_override(&overridden.id, "bob", "false positive", "flaky probe", 600_000)
        .unwrap();

    let report = s.narrative.generate_risk_report().unwrap();
    assert_eq!(report.previous_window.decisions, 4);
    assert_eq!(report.previous_window.safety_score, 100.0);
    assert_eq!(report.current_window.decisions, 4);
    assert_eq!(report.current_window.failures, 2);
    assert_eq!(report.current_window.overridden, 1);
    // 100 × (1 − (0.6 × 0.5 + 0.4 × 0.25)) = 60
    assert!((report.safety_score - 60.0).abs() < 1e-9);
    assert_eq!(report.safety_trend, SafetyTrend::Riskier);
    assert_eq!(report.active_overrides, 1);

    let trend = s
        .narrative
        .generate_narrative(&NarrativeRequest::new(NarrativeQuery::SafetyTrend))
        .unwrap();
    assert_eq!(trend.headline, "The platform is getting riskier");
}

#[test]
fn risks_and_opportunities_are_split_by_trend() {
    let s = stack();
    for _ in 0..8 {
        decide(&s, DecisionSource::Cutover, DecisionDomain::Deployment, DecisionOutcome::Blocked);
    }
    s.clock.advance(Duration::days(1));
    for _ in 0..4 {
        decide(&s, DecisionSource::Cutover, DecisionDomain::Deployment, DecisionOutcome::Blocked);
        decide(&s, DecisionSource::Governor, DecisionDomain::Feature, DecisionOutcome::Escalated);
    }
    s.memory.detect_patterns().unwrap();

    let report = s.narrative.generate_risk_report().unwrap();
    assert_eq!(report.top_risks.len(), 1);
    assert_eq!(report.top_risks[0].pattern_key, "governor:feature:escalated");
    assert_eq!(report.top_opportunities.len(), 1);
    assert_eq!(report.top_opportunities[0].trend, PatternTrend::Decreasing);
}

#[test]
fn override_activity_counts_actors() {
    let s = stack();
    for actor in ["alice", "alice", "bob"] {
        let d = decide(&s, DecisionSource::Governor, DecisionDomain::Feature, DecisionOutcome::Blocked);
        s.authority
            .record_override(&d.id, actor, "launch", "deadline", 60_000)
            .unwrap();
    }
    s.clock.advance(Duration::minutes(5));

    let n = s
        .narrative
        .generate_narrative(&NarrativeRequest::new(NarrativeQuery::OverrideActivity))
        .unwrap();
    assert!(n.headline.starts_with("3 override(s)"));
    assert!(n.headline.ends_with("0 still active"));
    assert!(n.root_causes.contains(&"alice overrode 2 decision(s)".to_string()));
    assert!(n.root_causes.contains(&"3 override(s) against governor decisions".to_string()));
    assert_eq!(n.evidence_decision_ids.len(), 3);
}

#[test]
fn repeated_mistakes_narrative_lists_findings() {
    let s = stack();
    let decisions: Vec<Decision> = (0..4)
        .map(|_| decide(&s, DecisionSource::Cutover, DecisionDomain::Deployment, DecisionOutcome::Blocked))
        .collect();
    s.authority
        .record_override(&decisions[0].id, "alice", "ship", "deadline", 600_000)
        .unwrap();
    s.clock.advance(Duration::minutes(2));
    s.memory
        .link_incident_to_decision("inc-1", &decisions[0].id, LinkType::CausedBy, 90.0)
        .unwrap();
    s.memory.detect_repeated_mistakes().unwrap();

    let n = s
        .narrative
        .generate_narrative(&NarrativeRequest::new(NarrativeQuery::RepeatedMistakes))
        .unwrap();
    assert_eq!(n.headline, "1 repeated mistake(s) found");
    assert_eq!(n.evidence_decision_ids, vec![decisions[0].id.clone()]);
    assert!(n.recommendations[0].contains("second approval"));
}
