/// Read-ahead buffer handed to the pcap-parser readers; must hold the
/// largest block, i.e. a full 65535-byte snapshot plus its header.
pub const PCAP_READER_BUFFER_SIZE: usize = 256 * 1024;

/// Section header block type, which doubles as the PCAPNG file magic.
pub const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];

/// Legacy header magic for nanosecond timestamps, native and swapped.
pub const PCAP_MAGIC_NSEC: u32 = 0xa1b2_3c4d;
pub const PCAP_MAGIC_NSEC_SWAPPED: u32 = 0x4d3c_b2a1;

/// Bit of `if_tsresol` selecting a power-of-two resolution.
pub const PCAPNG_TSRESOL_BINARY: u8 = 0x80;
