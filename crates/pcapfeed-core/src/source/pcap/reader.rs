use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;

use super::error::PcapSourceError;
use super::layout;

/// Read the magic bytes and rewind the reader to the start.
///
/// # Examples
/// This helper is part of an internal module, so the example is marked as
/// text example.
/// ```text
/// use pcapfeed_core::source::pcap::reader::read_magic_and_rewind;
/// use std::io::Cursor;
///
/// let bytes = [0x0a, 0x0d, 0x0d, 0x0a, 0x01];
/// let mut cursor = Cursor::new(bytes);
/// let magic = read_magic_and_rewind(&mut cursor).unwrap();
/// assert_eq!(magic, [0x0a, 0x0d, 0x0d, 0x0a]);
/// ```
///
/// # Errors
/// Returns `PcapSourceError` when the reader cannot be read or rewound.
pub fn read_magic_and_rewind<R: Read + Seek>(reader: &mut R) -> Result<[u8; 4], PcapSourceError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(magic)
}

/// Check whether the magic bytes match PCAPNG.
pub fn is_pcapng_magic(magic: &[u8; 4]) -> bool {
    magic == &layout::PCAPNG_MAGIC
}

/// Check whether a legacy header magic announces nanosecond timestamps.
pub fn is_nanosecond_magic(magic_number: u32) -> bool {
    magic_number == layout::PCAP_MAGIC_NSEC || magic_number == layout::PCAP_MAGIC_NSEC_SWAPPED
}

/// Build a capture time from a legacy record's seconds and fraction.
///
/// # Examples
/// ```text
/// use pcapfeed_core::source::pcap::reader::legacy_ts;
/// use std::time::Duration;
///
/// assert_eq!(legacy_ts(2, 500_000, false), Duration::from_millis(2_500));
/// assert_eq!(legacy_ts(2, 500, true), Duration::new(2, 500));
/// ```
pub fn legacy_ts(ts_sec: u32, ts_fraction: u32, nanosecond: bool) -> Duration {
    let nanos = if nanosecond {
        u64::from(ts_fraction)
    } else {
        u64::from(ts_fraction) * 1_000
    };
    Duration::from_secs(u64::from(ts_sec)) + Duration::from_nanos(nanos)
}

/// Convert a PCAPNG high/low timestamp to a capture time using the
/// interface's `if_tsresol`.
///
/// Returns `None` when the resolution cannot be represented.
///
/// # Examples
/// ```text
/// use pcapfeed_core::source::pcap::reader::pcapng_ts;
/// use std::time::Duration;
///
/// assert_eq!(pcapng_ts(0, 1_500_000, 6), Some(Duration::from_millis(1_500)));
/// ```
pub fn pcapng_ts(ts_high: u32, ts_low: u32, tsresol: u8) -> Option<Duration> {
    let ts = (u64::from(ts_high) << 32) | u64::from(ts_low);
    let exponent = u32::from(tsresol & !layout::PCAPNG_TSRESOL_BINARY);
    let units_per_sec = if tsresol & layout::PCAPNG_TSRESOL_BINARY != 0 {
        2u64.checked_pow(exponent)?
    } else {
        10u64.checked_pow(exponent)?
    };
    let secs = ts / units_per_sec;
    let fraction = u128::from(ts % units_per_sec);
    let nanos = fraction * 1_000_000_000 / u128::from(units_per_sec);
    Some(Duration::new(secs, nanos as u32))
}

/// Trim block data to the captured length, dropping block padding.
pub fn captured_slice(data: &[u8], caplen: u32) -> &[u8] {
    let len = (caplen as usize).min(data.len());
    &data[..len]
}
