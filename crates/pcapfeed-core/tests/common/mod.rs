#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub const LINKTYPE_ETHERNET: u32 = 1;
pub const LINKTYPE_PPP: u32 = 9;
pub const LINKTYPE_RAW: u32 = 101;
pub const LINKTYPE_LINUX_SLL: u32 = 113;
pub const LINKTYPE_USER0: u32 = 147;

const PCAP_MAGIC_USEC: u32 = 0xa1b2_c3d4;
const PCAP_MAGIC_NSEC: u32 = 0xa1b2_3c4d;
const PCAPNG_SHB: u32 = 0x0A0D_0D0A;
const PCAPNG_IDB: u32 = 1;
const PCAPNG_SPB: u32 = 3;
const PCAPNG_EPB: u32 = 6;
const PCAPNG_BYTE_ORDER_MAGIC: u32 = 0x1A2B_3C4D;
const PCAPNG_OPT_TSRESOL: u16 = 9;

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// Trace file in the temp directory, removed on drop.
pub struct TempTrace {
    path: PathBuf,
}

impl TempTrace {
    pub fn write(name: &str, bytes: &[u8]) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let id = NEXT_ID.fetch_add(1, Ordering::SeqCst);
        let mut path = std::env::temp_dir();
        path.push(format!(
            "pcapfeed_{name}_{}_{unique}_{id}",
            std::process::id()
        ));
        fs::write(&path, bytes).unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempTrace {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// One record: capture time as (seconds, fraction) plus captured bytes.
pub struct Record {
    pub ts_sec: u32,
    pub ts_frac: u32,
    pub data: Vec<u8>,
}

impl Record {
    pub fn new(ts_sec: u32, ts_frac: u32, data: Vec<u8>) -> Self {
        Self {
            ts_sec,
            ts_frac,
            data,
        }
    }
}

#[derive(Clone, Copy)]
pub enum Endian {
    Little,
    Big,
}

fn put_u16(out: &mut Vec<u8>, endian: Endian, value: u16) {
    match endian {
        Endian::Little => out.extend_from_slice(&value.to_le_bytes()),
        Endian::Big => out.extend_from_slice(&value.to_be_bytes()),
    }
}

fn put_u32(out: &mut Vec<u8>, endian: Endian, value: u32) {
    match endian {
        Endian::Little => out.extend_from_slice(&value.to_le_bytes()),
        Endian::Big => out.extend_from_slice(&value.to_be_bytes()),
    }
}

/// Legacy pcap file bytes.
pub fn legacy_pcap(linktype: u32, endian: Endian, nanosecond: bool, records: &[Record]) -> Vec<u8> {
    let mut out = Vec::new();
    let magic = if nanosecond {
        PCAP_MAGIC_NSEC
    } else {
        PCAP_MAGIC_USEC
    };
    put_u32(&mut out, endian, magic);
    put_u16(&mut out, endian, 2);
    put_u16(&mut out, endian, 4);
    put_u32(&mut out, endian, 0);
    put_u32(&mut out, endian, 0);
    put_u32(&mut out, endian, 65_535);
    put_u32(&mut out, endian, linktype);
    for record in records {
        put_u32(&mut out, endian, record.ts_sec);
        put_u32(&mut out, endian, record.ts_frac);
        put_u32(&mut out, endian, record.data.len() as u32);
        put_u32(&mut out, endian, record.data.len() as u32);
        out.extend_from_slice(&record.data);
    }
    out
}

/// Little-endian microsecond pcap, the most common layout.
pub fn simple_pcap(linktype: u32, frames: &[Vec<u8>]) -> Vec<u8> {
    let records: Vec<Record> = frames
        .iter()
        .enumerate()
        .map(|(idx, data)| Record::new(idx as u32, 0, data.clone()))
        .collect();
    legacy_pcap(linktype, Endian::Little, false, &records)
}

pub fn pcapng_block(block_type: u32, body: &[u8]) -> Vec<u8> {
    let total_len = (8 + body.len() + 4) as u32;
    let mut block = Vec::with_capacity(total_len as usize);
    block.extend_from_slice(&block_type.to_be_bytes());
    block.extend_from_slice(&total_len.to_be_bytes());
    block.extend_from_slice(body);
    block.extend_from_slice(&total_len.to_be_bytes());
    block
}

pub fn section_header() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&PCAPNG_BYTE_ORDER_MAGIC.to_be_bytes());
    body.extend_from_slice(&1u16.to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    body.extend_from_slice(&(-1i64).to_be_bytes());
    pcapng_block(PCAPNG_SHB, &body)
}

/// Interface description block, optionally carrying `if_tsresol`.
pub fn interface_description(linktype: u16, tsresol: Option<u8>) -> Vec<u8> {
    interface_with_snaplen(linktype, 65_535, tsresol)
}

pub fn interface_with_snaplen(linktype: u16, snaplen: u32, tsresol: Option<u8>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&linktype.to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    body.extend_from_slice(&snaplen.to_be_bytes());
    if let Some(tsresol) = tsresol {
        body.extend_from_slice(&PCAPNG_OPT_TSRESOL.to_be_bytes());
        body.extend_from_slice(&1u16.to_be_bytes());
        body.extend_from_slice(&[tsresol, 0, 0, 0]);
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes());
    }
    pcapng_block(PCAPNG_IDB, &body)
}

/// Enhanced packet block with a raw timestamp in interface units.
pub fn enhanced_packet(if_id: u32, ts: u64, data: &[u8]) -> Vec<u8> {
    let ts_high = ((ts >> 32) & 0xFFFF_FFFF) as u32;
    let ts_low = (ts & 0xFFFF_FFFF) as u32;
    let cap_len = data.len() as u32;
    let mut body = Vec::new();
    body.extend_from_slice(&if_id.to_be_bytes());
    body.extend_from_slice(&ts_high.to_be_bytes());
    body.extend_from_slice(&ts_low.to_be_bytes());
    body.extend_from_slice(&cap_len.to_be_bytes());
    body.extend_from_slice(&cap_len.to_be_bytes());
    body.extend_from_slice(data);
    let pad_len = (4 - (data.len() % 4)) % 4;
    body.extend(std::iter::repeat_n(0u8, pad_len));
    pcapng_block(PCAPNG_EPB, &body)
}

/// Simple packet block: original length, then the block body padded to 32 bits.
pub fn simple_packet(orig_len: u32, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&orig_len.to_be_bytes());
    body.extend_from_slice(data);
    let pad_len = (4 - (data.len() % 4)) % 4;
    body.extend(std::iter::repeat_n(0u8, pad_len));
    pcapng_block(PCAPNG_SPB, &body)
}

/// Single-interface pcapng with microsecond timestamps.
pub fn simple_pcapng(linktype: u16, packets: &[(u64, Vec<u8>)]) -> Vec<u8> {
    let mut out = section_header();
    out.extend_from_slice(&interface_description(linktype, None));
    for (ts_us, data) in packets {
        out.extend_from_slice(&enhanced_packet(0, *ts_us, data));
    }
    out
}

/// Ethernet/IPv4/UDP frame with `payload_len` zero bytes of payload.
pub fn udp_frame(payload_len: usize) -> Vec<u8> {
    let builder = etherparse::PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
        .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
        .udp(6454, 6454);
    let mut frame = Vec::new();
    builder.write(&mut frame, &vec![0u8; payload_len]).unwrap();
    frame
}

/// Ethernet/IPv4/TCP frame with `payload_len` zero bytes of payload.
pub fn tcp_frame(payload_len: usize) -> Vec<u8> {
    let builder = etherparse::PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
        .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
        .tcp(40_000, 80, 1, 4096);
    let mut frame = Vec::new();
    builder.write(&mut frame, &vec![0u8; payload_len]).unwrap();
    frame
}
