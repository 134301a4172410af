//! Process-wide admission control for in-flight packets.
//!
//! Producers call [`AdmissionGate::wait_for_capacity`] before pulling a
//! packet. Downstream stages call [`AdmissionGate::admit`] when a packet enters
//! them and [`AdmissionGate::release`] when it leaves. The check is
//! opportunistic: two producers may both pass while the count sits at the
//! threshold, so the gate bounds steady-state growth rather than enforcing an
//! exact ceiling.
//!
//! Every admitted packet must eventually be released. A producer blocked on a
//! saturated gate with no consumer left to release slots never wakes up unless
//! the gate is closed.

use parking_lot::{Condvar, Mutex};
use tracing::trace;

#[derive(Debug)]
pub struct AdmissionGate {
    state: Mutex<GateState>,
    released: Condvar,
    threshold: usize,
}

#[derive(Debug, Default)]
struct GateState {
    pending: usize,
    closed: bool,
}

impl AdmissionGate {
    pub fn new(threshold: usize) -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            released: Condvar::new(),
            threshold,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn pending(&self) -> usize {
        self.state.lock().pending
    }

    /// Block until the pending count is at or below the threshold, or the
    /// gate has been closed.
    pub fn wait_for_capacity(&self) {
        let mut state = self.state.lock();
        while state.pending > self.threshold && !state.closed {
            trace!(
                pending = state.pending,
                threshold = self.threshold,
                "admission gate saturated"
            );
            self.released.wait(&mut state);
        }
    }

    /// Account for one packet entering the downstream stages.
    pub fn admit(&self) {
        self.state.lock().pending += 1;
    }

    /// Account for one packet leaving the downstream stages and wake any
    /// producer the release unblocks.
    pub fn release(&self) {
        let mut state = self.state.lock();
        state.pending = state.pending.saturating_sub(1);
        if state.pending <= self.threshold {
            self.released.notify_all();
        }
    }

    /// Stop gating for good: current and future waiters return immediately.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.released.notify_all();
    }
}
