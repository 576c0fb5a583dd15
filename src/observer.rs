//! The two injected logging callbacks from spec §7 (`logInfo` / `logError`),
//! reified as a trait so the core never writes to a process-level sink
//! directly.

/// Receives the chain executor's progress and error notifications.
///
/// Unlike the source system's `logError`, which the spec notes (§9, open
/// question 2) is sometimes silently aliased to `logInfo`, `on_error` here
/// is always distinct from `on_info` — that aliasing is called out in the
/// spec as a bug to avoid, not a behavior to preserve.
pub trait ChainObserver: Send + Sync {
    fn on_info(&self, message: &str);
    fn on_error(&self, message: &str);
}

/// Default observer: routes both callbacks through `tracing`, the way the
/// teacher's `bin/server.rs` logs startup and request-handling progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ChainObserver for TracingObserver {
    fn on_info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn on_error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// An observer that drops everything, for call sites that don't care.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ChainObserver for NullObserver {
    fn on_info(&self, _message: &str) {}
    fn on_error(&self, _message: &str) {}
}
