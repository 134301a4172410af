//! Capture-time packet filters.
//!
//! Filter expressions use libpcap syntax and are compiled by libpcap itself
//! against a dead handle of the trace's link type. The backend is behind the
//! `bpf` cargo feature; without it every filter is rejected at session setup.

use pcap_parser::Linktype;
use thiserror::Error;

use crate::source::PacketRecord;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("BPF filtering is not available in this build (enable the `bpf` feature)")]
    Unsupported,
    #[error("filter compilation failed: {0}")]
    Compile(String),
}

/// A compiled filter installed on a capture session.
pub struct PacketFilter {
    expression: String,
    #[cfg(feature = "bpf")]
    program: pcap::BpfProgram,
}

impl std::fmt::Debug for PacketFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketFilter")
            .field("expression", &self.expression)
            .finish_non_exhaustive()
    }
}

impl PacketFilter {
    #[cfg(feature = "bpf")]
    pub fn compile(expression: &str, linktype: Linktype) -> Result<Self, FilterError> {
        let capture = pcap::Capture::dead(pcap::Linktype(linktype.0))
            .map_err(|e| FilterError::Compile(e.to_string()))?;
        let program = capture
            .compile(expression, true)
            .map_err(|e| FilterError::Compile(e.to_string()))?;
        Ok(Self {
            expression: expression.to_string(),
            program,
        })
    }

    #[cfg(not(feature = "bpf"))]
    pub fn compile(expression: &str, linktype: Linktype) -> Result<Self, FilterError> {
        let _ = (expression, linktype);
        Err(FilterError::Unsupported)
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Whether the filter accepts `record`.
    #[cfg(feature = "bpf")]
    pub fn matches(&self, record: &PacketRecord<'_>) -> bool {
        self.program.filter(record.data)
    }

    #[cfg(not(feature = "bpf"))]
    pub fn matches(&self, record: &PacketRecord<'_>) -> bool {
        let _ = record;
        true
    }
}
