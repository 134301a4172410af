//! Ingest driver: receive/dispatch loop and the single-trace pipeline.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver as QueueReceiver, Sender};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, IngestConfig};
use crate::control::StopSignal;
use crate::decode::{DecodeOutcome, DecodedPacket, PacketSink, Transport};
use crate::dispatch::{DecodeStats, Dispatcher};
use crate::gate::AdmissionGate;
use crate::packet::PacketBuffer;
use crate::receive::{ReceiveOutcome, Receiver, ReceiverStats};
use crate::session::{CaptureSession, SessionError};
use crate::source::PacketSource;
use crate::{CaptureSummary, IngestReport, InputInfo, SessionInfo, make_report};

const RECEIVER_NAME: &str = "pcapfeed-receiver";
const CONSUMER_NAME: &str = "pcapfeed-consumer";
const RATE_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("downstream consumer thread panicked")]
    ConsumerPanicked,
}

impl IngestError {
    /// Whether the failure should terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IngestError::Session(err) if err.is_fatal())
    }
}

/// How a worker's receive loop ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Terminal {
    EndOfInput,
    Stopped,
    ReadError { message: String },
}

impl Terminal {
    pub fn is_error(&self) -> bool {
        matches!(self, Terminal::ReadError { .. })
    }
}

/// Final state of one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerReport {
    pub receiver: ReceiverStats,
    pub decode: DecodeStats,
    pub terminal: Terminal,
    pub first_ts: Option<Duration>,
    pub last_ts: Option<Duration>,
}

/// One producer thread's receive/dispatch state.
///
/// Workers built on the same gate and stop signal share backpressure and
/// shutdown, each with its own session and buffer.
#[derive(Debug)]
pub struct Worker {
    name: String,
    receiver: Receiver,
    dispatcher: Dispatcher,
    buffer: PacketBuffer,
}

impl Worker {
    pub fn new(
        name: impl Into<String>,
        gate: Arc<AdmissionGate>,
        stop: Arc<StopSignal>,
        buffer_size: usize,
    ) -> Self {
        Self {
            name: name.into(),
            receiver: Receiver::new(gate, stop),
            dispatcher: Dispatcher::new(),
            buffer: PacketBuffer::with_capacity(buffer_size),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Receive and dispatch until a terminal outcome.
    ///
    /// Per-second rates are rolled on trace time and logged at debug level.
    pub fn run<S: PacketSource>(
        &mut self,
        session: &mut CaptureSession<S>,
        sink: &mut dyn PacketSink,
    ) -> WorkerReport {
        let mut first_ts = None;
        let mut last_ts = None;
        let mut interval_start: Option<Duration> = None;

        let terminal = loop {
            match self.receiver.receive(session, &mut self.buffer) {
                Ok(ReceiveOutcome::Packet) => {
                    let ts = self.buffer.ts();
                    update_ts_bounds(&mut first_ts, &mut last_ts, ts);
                    match interval_start {
                        Some(start) if ts.saturating_sub(start) >= RATE_INTERVAL => {
                            let rates = self.dispatcher.counters_mut().roll_interval();
                            debug!(
                                worker = %self.name,
                                pkts_per_sec = rates.packets,
                                bytes_per_sec = rates.bytes,
                                mbit_per_sec = rates.mbit,
                                "interval rates"
                            );
                            interval_start = Some(ts);
                        }
                        Some(_) => {}
                        None => interval_start = Some(ts),
                    }
                    self.dispatcher.dispatch(session, &self.buffer, sink);
                }
                Ok(ReceiveOutcome::EndOfInput) => break Terminal::EndOfInput,
                Ok(ReceiveOutcome::Stopped) => break Terminal::Stopped,
                Err(err) => {
                    break Terminal::ReadError {
                        message: err.to_string(),
                    };
                }
            }
        };

        WorkerReport {
            receiver: self.receiver.exit_stats(&self.name),
            decode: self.dispatcher.counters().snapshot(),
            terminal,
            first_ts,
            last_ts,
        }
    }
}

/// Decoded packet counts by outcome, as seen by the downstream consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeTally {
    pub ipv4: u64,
    pub ipv6: u64,
    pub non_ip: u64,
    pub invalid: u64,
    pub tcp: u64,
    pub udp: u64,
    pub icmp: u64,
    pub other_transport: u64,
}

impl OutcomeTally {
    pub fn record(&mut self, outcome: &DecodeOutcome) {
        match outcome {
            DecodeOutcome::Ip(summary) => {
                if summary.src.is_ipv4() {
                    self.ipv4 += 1;
                } else {
                    self.ipv6 += 1;
                }
                match summary.transport {
                    Transport::Tcp { .. } => self.tcp += 1,
                    Transport::Udp { .. } => self.udp += 1,
                    Transport::Icmp => self.icmp += 1,
                    Transport::Other(_) => self.other_transport += 1,
                }
            }
            DecodeOutcome::NonIp { .. } => self.non_ip += 1,
            DecodeOutcome::Invalid(_) => self.invalid += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.ipv4 + self.ipv6 + self.non_ip + self.invalid
    }
}

/// Sink that admits each decoded packet into the gate and queues it for the
/// downstream consumer, which releases the slot.
#[derive(Debug)]
pub struct QueueSink {
    tx: Sender<DecodedPacket>,
    gate: Arc<AdmissionGate>,
}

impl QueueSink {
    pub fn new(tx: Sender<DecodedPacket>, gate: Arc<AdmissionGate>) -> Self {
        Self { tx, gate }
    }
}

impl PacketSink for QueueSink {
    fn push(&mut self, packet: DecodedPacket) {
        self.gate.admit();
        if self.tx.send(packet).is_err() {
            self.gate.release();
            warn!("downstream queue closed, packet dropped");
        }
    }
}

/// Drain `rx` until every sender is gone, releasing one gate slot per packet.
pub fn drain_queue(rx: QueueReceiver<DecodedPacket>, gate: &AdmissionGate) -> OutcomeTally {
    let mut tally = OutcomeTally::default();
    for packet in rx.iter() {
        tally.record(&packet.outcome);
        gate.release();
    }
    tally
}

/// Ingest one trace file end to end.
///
/// The receive loop runs on the calling thread and feeds a consumer thread
/// through the admission gate.
///
/// # Errors
/// Returns `IngestError::Session` when the trace cannot be opened or its
/// filter or link type is rejected; no packet has been read in that case.
/// A read fault during the run is reported in [`IngestReport::terminal`].
pub fn ingest_file(path: &Path, config: &IngestConfig) -> Result<IngestReport, IngestError> {
    config.validate()?;
    let mut session = CaptureSession::open(path, config.filter())?;
    let input_bytes = path.metadata()?.len();

    let gate = Arc::new(AdmissionGate::new(config.max_pending_packets));
    let stop = Arc::new(StopSignal::new());
    let (tx, rx) = crossbeam_channel::unbounded();

    let consumer = {
        let gate = Arc::clone(&gate);
        thread::Builder::new()
            .name(CONSUMER_NAME.to_string())
            .spawn(move || drain_queue(rx, &gate))?
    };

    let mut worker = Worker::new(
        RECEIVER_NAME,
        Arc::clone(&gate),
        Arc::clone(&stop),
        config.buffer_size,
    );
    let mut sink = QueueSink::new(tx, Arc::clone(&gate));
    let run = worker.run(&mut session, &mut sink);
    drop(sink);

    let outcomes = consumer.join().map_err(|_| IngestError::ConsumerPanicked)?;
    gate.close();

    info!(
        packets = run.receiver.packets,
        bytes = run.receiver.bytes,
        decoded = outcomes.total(),
        "ingest finished"
    );

    let mut report = make_report(InputInfo {
        path: path.display().to_string(),
        bytes: input_bytes,
    });
    report.session = Some(SessionInfo {
        linktype: session.linktype().0,
        decoder: session.decoder(),
        filter: session.filter_expression().map(str::to_string),
        max_pending_packets: config.max_pending_packets,
    });
    report.capture_summary = Some(CaptureSummary {
        packets_total: run.receiver.packets,
        time_start: ts_to_rfc3339(run.first_ts),
        time_end: ts_to_rfc3339(run.last_ts),
    });
    report.receiver = run.receiver;
    report.decode = run.decode;
    report.outcomes = outcomes;
    report.terminal = run.terminal;
    Ok(report)
}

fn update_ts_bounds(first: &mut Option<Duration>, last: &mut Option<Duration>, ts: Duration) {
    *first = Some(first.map_or(ts, |existing| existing.min(ts)));
    *last = Some(last.map_or(ts, |existing| existing.max(ts)));
}

fn ts_to_rfc3339(ts: Option<Duration>) -> Option<String> {
    let nanos = i128::try_from(ts?.as_nanos()).ok()?;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
}
