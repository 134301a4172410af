//! Engine stop signal shared by every stage of a run.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::info;

/// Request for the whole pipeline to wind down.
///
/// Raising it is idempotent; `requests` counts every call so callers can
/// check how often a stage asked for a stop.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: AtomicBool,
    requests: AtomicU64,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Returns `true` for the call that actually raised it.
    pub fn request_stop(&self) -> bool {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let first = !self.stopped.swap(true, Ordering::SeqCst);
        if first {
            info!("engine stop requested");
        }
        first
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }
}
