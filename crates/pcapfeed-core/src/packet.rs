use std::time::Duration;

use pcap_parser::Linktype;

use crate::source::PacketRecord;

/// Default buffer capacity: the largest snapshot length libpcap writes.
pub const DEFAULT_BUFFER_SIZE: usize = 65_535;

/// Caller-owned storage for exactly one in-flight packet.
///
/// The receiver overwrites it in place on every successful pull, so a worker
/// must finish dispatching a packet before receiving the next one.
///
/// # Examples
/// ```
/// use pcapfeed_core::PacketBuffer;
///
/// let buffer = PacketBuffer::with_capacity(1514);
/// assert_eq!(buffer.capacity(), 1514);
/// assert!(buffer.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct PacketBuffer {
    storage: Box<[u8]>,
    len: usize,
    orig_len: u32,
    ts: Duration,
    linktype: Linktype,
}

impl PacketBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
            orig_len: 0,
            ts: Duration::ZERO,
            linktype: Linktype::NULL,
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Captured bytes of the current packet.
    pub fn data(&self) -> &[u8] {
        &self.storage[..self.len]
    }

    /// Captured length of the current packet.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Length of the packet on the wire.
    pub fn orig_len(&self) -> u32 {
        self.orig_len
    }

    /// Capture time since the Unix epoch.
    pub fn ts(&self) -> Duration {
        self.ts
    }

    pub fn linktype(&self) -> Linktype {
        self.linktype
    }

    /// Copy a record in, or return its length if it does not fit.
    pub(crate) fn fill(&mut self, record: &PacketRecord<'_>, linktype: Linktype) -> Result<(), usize> {
        let len = record.data.len();
        if len > self.storage.len() {
            return Err(len);
        }
        self.storage[..len].copy_from_slice(record.data);
        self.len = len;
        self.orig_len = record.orig_len;
        self.ts = record.ts;
        self.linktype = linktype;
        Ok(())
    }
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }
}
