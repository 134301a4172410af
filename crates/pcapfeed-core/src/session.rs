//! Capture session: one open trace, its filter and its decoder.

use std::path::{Path, PathBuf};

use pcap_parser::Linktype;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::decode::LinkDecoder;
use crate::filter::{FilterError, PacketFilter};
use crate::source::{PacketRecord, PacketSource, PcapFileSource, SourceError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot open trace {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: SourceError,
    },
    #[error("bad filter \"{expression}\": {source}")]
    Filter {
        expression: String,
        #[source]
        source: FilterError,
    },
    #[error("link type {0} is not supported (expected Ethernet, Linux SLL, PPP or raw IP)")]
    UnsupportedLinktype(i32),
}

impl SessionError {
    /// Whether the failure is process-fatal.
    ///
    /// Only an unopenable trace is: the file will not change on retry. Filter
    /// and link-type failures only abort this session's setup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Open { .. })
    }
}

/// An open trace with its decoder selected and its filter installed.
///
/// Both are fixed at construction, before the first packet is pulled.
pub struct CaptureSession<S = PcapFileSource> {
    source: S,
    linktype: Linktype,
    decoder: LinkDecoder,
    filter: Option<PacketFilter>,
}

impl CaptureSession<PcapFileSource> {
    pub fn open(path: &Path, filter: Option<&str>) -> Result<Self, SessionError> {
        info!(path = %path.display(), "reading pcap file");
        let source = PcapFileSource::open(path).map_err(|source| {
            error!(path = %path.display(), error = %source, "cannot open trace");
            SessionError::Open {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::from_source(source, filter)
    }
}

impl<S: PacketSource> CaptureSession<S> {
    pub fn from_source(source: S, filter: Option<&str>) -> Result<Self, SessionError> {
        let linktype = source.linktype();

        let filter = match filter {
            Some(expression) => {
                info!(filter = expression, "using bpf filter");
                let compiled = PacketFilter::compile(expression, linktype).map_err(|source| {
                    error!(filter = expression, error = %source, "bpf filter rejected");
                    SessionError::Filter {
                        expression: expression.to_string(),
                        source,
                    }
                })?;
                Some(compiled)
            }
            None => {
                debug!("no bpf filter configured");
                None
            }
        };

        debug!(linktype = linktype.0, "datalink");
        let decoder = LinkDecoder::for_linktype(linktype).ok_or_else(|| {
            error!(linktype = linktype.0, "datalink type not supported");
            SessionError::UnsupportedLinktype(linktype.0)
        })?;

        Ok(Self {
            source,
            linktype,
            decoder,
            filter,
        })
    }

    pub fn linktype(&self) -> Linktype {
        self.linktype
    }

    pub fn decoder(&self) -> LinkDecoder {
        self.decoder
    }

    pub fn filter_expression(&self) -> Option<&str> {
        self.filter.as_ref().map(PacketFilter::expression)
    }

    /// Pull the next packet accepted by the filter and pass it to `handler`.
    ///
    /// Rejected packets are skipped. Returns `Ok(false)` at end of trace.
    pub fn pull(
        &mut self,
        handler: &mut dyn FnMut(&PacketRecord<'_>),
    ) -> Result<bool, SourceError> {
        let filter = self.filter.as_ref();
        loop {
            let mut accepted = false;
            let more = self.source.dispatch(&mut |record| {
                if filter.is_none_or(|filter| filter.matches(record)) {
                    accepted = true;
                    handler(record);
                }
            })?;
            if !more {
                return Ok(false);
            }
            if accepted {
                return Ok(true);
            }
        }
    }
}
