//! Packet receiver: one gated pull per call into a caller-owned buffer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, trace, warn};

use crate::control::StopSignal;
use crate::gate::AdmissionGate;
use crate::packet::PacketBuffer;
use crate::session::CaptureSession;
use crate::source::{PacketSource, SourceError};

/// Non-error result of a receive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// The buffer holds a new packet.
    Packet,
    /// The trace is exhausted; the stop signal has been raised.
    EndOfInput,
    /// The receiver or the engine was already stopped; nothing was pulled.
    Stopped,
}

#[derive(Debug, Error)]
pub enum ReceiveError {
    #[error("trace read failed: {0}")]
    Source(#[from] SourceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverState {
    Ready,
    Stopped,
}

/// Per-thread intake counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverStats {
    pub packets: u64,
    pub bytes: u64,
    pub errors: u64,
}

/// Per-thread receive state.
///
/// Terminal outcomes (end of input or a read fault) raise the shared stop
/// signal once and move the receiver to [`ReceiverState::Stopped`]; later
/// calls return [`ReceiveOutcome::Stopped`] without touching the session.
#[derive(Debug)]
pub struct Receiver {
    gate: Arc<AdmissionGate>,
    stop: Arc<StopSignal>,
    stats: ReceiverStats,
    state: ReceiverState,
}

impl Receiver {
    pub fn new(gate: Arc<AdmissionGate>, stop: Arc<StopSignal>) -> Self {
        Self {
            gate,
            stop,
            stats: ReceiverStats::default(),
            state: ReceiverState::Ready,
        }
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    /// Wait for admission, then pull exactly one packet into `buffer`.
    ///
    /// # Errors
    /// Returns `ReceiveError` when the trace reports a fault; the stop signal
    /// has been raised by then.
    pub fn receive<S: PacketSource>(
        &mut self,
        session: &mut CaptureSession<S>,
        buffer: &mut PacketBuffer,
    ) -> Result<ReceiveOutcome, ReceiveError> {
        if self.state == ReceiverState::Stopped {
            return Ok(ReceiveOutcome::Stopped);
        }
        if self.stop.is_stop_requested() {
            self.state = ReceiverState::Stopped;
            return Ok(ReceiveOutcome::Stopped);
        }

        self.gate.wait_for_capacity();

        let linktype = session.linktype();
        loop {
            let mut oversized = None;
            let pulled = session.pull(&mut |record| {
                if let Err(len) = buffer.fill(record, linktype) {
                    oversized = Some(len);
                }
            });

            match pulled {
                Ok(true) => match oversized {
                    None => {
                        self.stats.packets += 1;
                        self.stats.bytes += buffer.len() as u64;
                        trace!(
                            len = buffer.len(),
                            ts = buffer.ts().as_secs_f64(),
                            "packet received"
                        );
                        return Ok(ReceiveOutcome::Packet);
                    }
                    Some(len) => {
                        self.stats.errors += 1;
                        warn!(
                            len,
                            capacity = buffer.capacity(),
                            "packet larger than buffer, skipped"
                        );
                    }
                },
                Ok(false) => {
                    info!(packets = self.stats.packets, "end of trace reached");
                    self.terminate();
                    return Ok(ReceiveOutcome::EndOfInput);
                }
                Err(err) => {
                    error!(error = %err, "trace read failed");
                    self.stats.errors += 1;
                    self.terminate();
                    return Err(err.into());
                }
            }
        }
    }

    /// Log and return the final counters for this worker.
    pub fn exit_stats(&self, name: &str) -> ReceiverStats {
        info!(
            worker = name,
            packets = self.stats.packets,
            bytes = self.stats.bytes,
            errors = self.stats.errors,
            "receiver exit stats"
        );
        self.stats
    }

    fn terminate(&mut self) {
        self.state = ReceiverState::Stopped;
        self.stop.request_stop();
    }
}
