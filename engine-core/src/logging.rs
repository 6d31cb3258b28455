//! Tracing setup. Every component boundary (stage dispatch, cache
//! get/evict, AST parse, transaction snapshot/rollback, predictor
//! scoring) emits a span or event through `tracing`; this module just
//! wires the global subscriber, matching the teacher's
//! `tracing` + `tracing-subscriber` ambient stack (no telemetry
//! exporter — that collaborator is out of scope, spec §1).

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber reading `RUST_LOG`, defaulting
/// to `info`. Idempotent: a second call is a harmless no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
