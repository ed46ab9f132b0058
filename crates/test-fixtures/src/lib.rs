//! Shared fixtures for PCAL integration tests.

use std::sync::{Arc, Once};

use chrono::{DateTime, TimeZone, Utc};
use pcal_core::clock::{Clock, ManualClock};
use pcal_core::config::PcalConfig;
use pcal_core::models::{IngestOptions, Signal};

/// Fixed epoch every fixture clock starts from.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .expect("valid fixture epoch")
}

/// A manual clock frozen at [`epoch`].
pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(epoch()))
}

/// Upcast for constructors taking `Arc<dyn Clock>`.
pub fn as_dyn(clock: &Arc<ManualClock>) -> Arc<dyn Clock> {
    clock.clone()
}

/// Default config with a small ledger so eviction is easy to reach.
pub fn small_config() -> PcalConfig {
    PcalConfig {
        max_decisions: 100,
        ..Default::default()
    }
}

/// Signals a cutover orchestrator typically attaches.
pub fn cutover_signals() -> Vec<Signal> {
    vec![
        Signal::new("error_rate", 0.072, 0.6, "metrics"),
        Signal::new("p99_latency_ms", 840, 0.3, "metrics"),
        Signal::new("canary_health", "degraded", 0.1, "canary"),
    ]
}

pub fn with_confidence(confidence: f64) -> IngestOptions {
    IngestOptions::new().confidence(confidence)
}

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once per test binary. Honors `RUST_LOG`.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

