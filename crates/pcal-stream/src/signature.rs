//! Deterministic decision signatures.
//!
//! blake3 over a canonical `|`-separated rendering of every immutable field
//! except `id`: source, domain, outcome, reason, confidence (4 decimals),
//! signals in order, authority, actor, reversible, target, metadata (key
//! order), timestamp (RFC 3339, nanoseconds). Signals and metadata are
//! prefixed with their entry count, optional fields with `-` (absent) or
//! `+` (present), and every delimiter inside free text is escaped, so
//! distinct decisions never share a canonical rendering.

use chrono::SecondsFormat;
use pcal_core::models::Decision;

/// Compute the signature of a decision's immutable fields.
pub fn compute_signature(decision: &Decision) -> String {
    let mut canonical = String::with_capacity(256);
    push_field(&mut canonical, decision.source.as_str());
    push_field(&mut canonical, decision.domain.as_str());
    push_field(&mut canonical, decision.outcome.as_str());
    push_field(&mut canonical, &escape(&decision.reason));
    push_field(&mut canonical, &format!("{:.4}", decision.confidence));
    push_field(&mut canonical, &decision.signals.len().to_string());
    for signal in &decision.signals {
        push_field(
            &mut canonical,
            &format!(
                "{}={}@{:.4}#{}",
                escape(&signal.name),
                escape(&signal.value.to_string()),
                signal.weight,
                escape(&signal.source)
            ),
        );
    }
    push_field(&mut canonical, decision.authority.as_str());
    push_field(&mut canonical, &optional(decision.actor.as_deref()));
    push_field(&mut canonical, if decision.reversible { "1" } else { "0" });
    push_field(&mut canonical, &optional(decision.target.as_deref()));
    push_field(&mut canonical, &decision.metadata.len().to_string());
    for (key, value) in &decision.metadata {
        push_field(&mut canonical, &format!("{}:{}", escape(key), escape(value)));
    }
    canonical.push_str(
        &decision
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Nanos, true),
    );

    blake3::hash(canonical.as_bytes()).to_hex().to_string()
}

/// Recompute and compare. False means a field changed after ingest.
pub fn verify_signature(decision: &Decision) -> bool {
    compute_signature(decision) == decision.signature
}

fn push_field(buf: &mut String, value: &str) {
    buf.push_str(value);
    buf.push('|');
}

/// Backslash-escape every delimiter the canonical form uses.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '|' | ':' | '=' | '@' | '#') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn optional(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("+{}", escape(v)),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pcal_core::models::{AuthorityType, DecisionDomain, DecisionOutcome, DecisionSource, Signal};

    fn sample() -> Decision {
        let mut d = Decision {
            id: "d1".into(),
            source: DecisionSource::Cutover,
            domain: DecisionDomain::Deployment,
            outcome: DecisionOutcome::Blocked,
            reason: "error budget exhausted".into(),
            confidence: 82.5,
            signals: vec![Signal::new("error_rate", 0.07, 0.6, "metrics")],
            authority: AuthorityType::System,
            actor: None,
            reversible: true,
            target: Some("rollout-42".into()),
            metadata: Default::default(),
            timestamp: Utc::now(),
            signature: String::new(),
        };
        d.signature = compute_signature(&d);
        d
    }

    #[test]
    fn signature_ignores_id() {
        let a = sample();
        let mut b = a.clone();
        b.id = "d2".into();
        assert_eq!(compute_signature(&a), compute_signature(&b));
    }

    #[test]
    fn tampering_is_detected() {
        let mut d = sample();
        assert!(verify_signature(&d));
        d.outcome = DecisionOutcome::Approved;
        assert!(!verify_signature(&d));
    }

    #[test]
    fn separator_in_text_does_not_collide() {
        let mut a = sample();
        a.reason = "x|y".into();
        a.actor = None;
        let mut b = sample();
        b.reason = "x".into();
        b.actor = Some("y".into());
        b.timestamp = a.timestamp;
        assert_ne!(compute_signature(&a), compute_signature(&b));
    }

    #[test]
    fn metadata_delimiters_do_not_collide() {
        let mut a = sample();
        a.metadata.insert("region:eu".into(), "west".into());
        a.signature = compute_signature(&a);
        let mut b = a.clone();
        b.metadata.clear();
        b.metadata.insert("region".into(), "eu:west".into());
        assert_ne!(compute_signature(&a), compute_signature(&b));
        assert!(!verify_signature(&b));
    }

    #[test]
    fn signal_delimiters_do_not_collide() {
        let mut a = sample();
        a.signals = vec![Signal::new("p99=latency", "slow", 0.5, "apm")];
        let mut b = a.clone();
        b.signals = vec![Signal::new("p99", "latency=slow", 0.5, "apm")];
        assert_ne!(compute_signature(&a), compute_signature(&b));
    }

    #[test]
    fn absent_and_empty_options_differ() {
        let mut d = sample();
        d.target = None;
        d.signature = compute_signature(&d);
        assert!(verify_signature(&d));

        let mut t = d.clone();
        t.target = Some(String::new());
        assert!(!verify_signature(&t));

        let mut a = d.clone();
        a.actor = Some(String::new());
        assert!(!verify_signature(&a));
    }
}
