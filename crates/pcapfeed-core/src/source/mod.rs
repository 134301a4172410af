//! Trace sources.
//!
//! A source owns the open capture handle and hands out one packet record per
//! pull. Records borrow the source's internal buffer, so they are delivered
//! through a callback in the manner of `pcap_dispatch` with a count of one.

mod pcap;

pub use pcap::PcapFileSource;

use std::time::Duration;

use pcap_parser::Linktype;
use thiserror::Error;

/// One captured packet as recorded in the trace.
#[derive(Debug, Clone, Copy)]
pub struct PacketRecord<'a> {
    /// Capture time since the Unix epoch.
    pub ts: Duration,
    /// Length on the wire, which may exceed the captured bytes.
    pub orig_len: u32,
    /// Captured bytes (snap-length truncated).
    pub data: &'a [u8],
}

/// A finite, forward-only packet trace.
pub trait PacketSource {
    /// Link-layer type of every packet this source yields.
    fn linktype(&self) -> Linktype;

    /// Pull the next packet and pass it to `handler`.
    ///
    /// Returns `Ok(true)` when a packet was delivered and `Ok(false)` once the
    /// trace is exhausted.
    fn dispatch(
        &mut self,
        handler: &mut dyn FnMut(&PacketRecord<'_>),
    ) -> Result<bool, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PCAP parse error: {0}")]
    Pcap(String),
}

impl From<pcap::error::PcapSourceError> for SourceError {
    fn from(value: pcap::error::PcapSourceError) -> Self {
        match value {
            pcap::error::PcapSourceError::Io(err) => SourceError::Io(err),
            pcap::error::PcapSourceError::Pcap { context, message } => {
                SourceError::Pcap(format!("{context}: {message}"))
            }
        }
    }
}
