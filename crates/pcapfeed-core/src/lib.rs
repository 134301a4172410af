//! pcapfeed core library: offline packet ingestion for trace files.
//!
//! A capture session opens one pcap/pcapng trace, installs an optional BPF
//! filter and selects a link-layer decoder. Producer workers pull packets
//! one at a time through a process-wide admission gate that bounds the
//! number of packets in flight, and hand each one to the session's decoder,
//! which pushes a thin network/transport summary downstream.
//!
//! Invariants:
//! - The decoder and filter are fixed before the first packet is pulled.
//! - Exactly one packet is pulled per successful receive.
//! - End of input and read faults raise the engine stop signal once.
//! - Every packet admitted into the gate is released exactly once.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use pcapfeed_core::{IngestConfig, ingest_file};
//!
//! let report = ingest_file(Path::new("capture.pcap"), &IngestConfig::default())?;
//! println!("packets: {}", report.receiver.packets);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

mod config;
mod control;
mod decode;
mod dispatch;
mod filter;
mod gate;
mod packet;
mod pipeline;
mod receive;
mod session;
mod source;

pub use config::{ConfigError, DEFAULT_MAX_PENDING_PACKETS, IngestConfig, MIN_BUFFER_SIZE};
pub use control::StopSignal;
pub use decode::{
    DecodeError, DecodeOutcome, DecodedPacket, LinkDecoder, NetworkSummary, PacketSink, Transport,
};
pub use dispatch::{DecodeCounters, DecodeStats, Dispatcher, IntervalRates};
pub use filter::{FilterError, PacketFilter};
pub use gate::AdmissionGate;
pub use packet::{DEFAULT_BUFFER_SIZE, PacketBuffer};
pub use pcap_parser::Linktype;
pub use pipeline::{
    IngestError, OutcomeTally, QueueSink, Terminal, Worker, WorkerReport, drain_queue, ingest_file,
};
pub use receive::{ReceiveError, ReceiveOutcome, Receiver, ReceiverState, ReceiverStats};
pub use session::{CaptureSession, SessionError};
pub use source::{PacketRecord, PacketSource, PcapFileSource, SourceError};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Tool name embedded in reports.
pub const TOOL_NAME: &str = "pcapfeed";

/// Result of ingesting one trace.
///
/// # Examples
/// ```
/// use pcapfeed_core::{InputInfo, make_report};
///
/// let report = make_report(InputInfo {
///     path: "capture.pcap".to_string(),
///     bytes: 24,
/// });
/// assert_eq!(report.report_version, pcapfeed_core::REPORT_VERSION);
/// assert_eq!(report.receiver.packets, 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    /// Tool identification metadata.
    pub tool: ToolInfo,
    /// Input trace metadata.
    pub input: InputInfo,
    /// Session setup, once the trace was opened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionInfo>,
    /// Capture time range (may be empty when no packet was read).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_summary: Option<CaptureSummary>,
    /// Receiver counters.
    pub receiver: ReceiverStats,
    /// Dispatcher counters.
    pub decode: DecodeStats,
    /// Decode outcomes seen downstream.
    pub outcomes: OutcomeTally,
    /// How the receive loop ended.
    pub terminal: Terminal,
}

/// Tool metadata embedded in reports.
///
/// # Examples
/// ```
/// use pcapfeed_core::ToolInfo;
///
/// let tool = ToolInfo {
///     name: "pcapfeed".to_string(),
///     version: "0.1.0".to_string(),
/// };
/// assert_eq!(tool.name, "pcapfeed");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

/// Input trace metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided to the ingester.
    pub path: String,
    /// Input size in bytes.
    pub bytes: u64,
}

/// Session parameters fixed at setup.
///
/// # Examples
/// ```
/// use pcapfeed_core::{LinkDecoder, SessionInfo};
///
/// let session = SessionInfo {
///     linktype: 1,
///     decoder: LinkDecoder::Ethernet,
///     filter: None,
///     max_pending_packets: 50,
/// };
/// assert_eq!(session.decoder.name(), "ethernet");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Link-layer type number from the trace header.
    pub linktype: i32,
    pub decoder: LinkDecoder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Admission gate threshold.
    pub max_pending_packets: usize,
}

/// Capture summary (timestamps may be absent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSummary {
    /// Packets delivered by the receiver.
    pub packets_total: u64,
    /// RFC3339 timestamp of the first packet (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    /// RFC3339 timestamp of the last packet (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
}

/// Build a report with base fields filled and zeroed counters.
pub fn make_report(input: InputInfo) -> IngestReport {
    IngestReport {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: TOOL_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        input,
        session: None,
        capture_summary: None,
        receiver: ReceiverStats::default(),
        decode: DecodeStats::default(),
        outcomes: OutcomeTally::default(),
        terminal: Terminal::EndOfInput,
    }
}
