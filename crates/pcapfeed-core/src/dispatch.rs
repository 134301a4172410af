//! Decoder dispatch and throughput counters.

use serde::{Deserialize, Serialize};

use crate::decode::PacketSink;
use crate::packet::PacketBuffer;
use crate::session::CaptureSession;
use crate::source::PacketSource;

/// Throughput counters updated once per dispatched packet.
///
/// The per-second counters accumulate until [`DecodeCounters::roll_interval`]
/// drains them. Totals, the average size and the maximum size are never
/// reset.
#[derive(Debug, Clone, Default)]
pub struct DecodeCounters {
    packets: u64,
    packets_per_sec: u64,
    bytes: u64,
    bytes_per_sec: f64,
    mbit_per_sec: f64,
    size_sum: u64,
    size_samples: u64,
    max_packet_size: u64,
}

/// Serializable view of [`DecodeCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodeStats {
    pub packets: u64,
    pub bytes: u64,
    pub avg_packet_size: f64,
    pub max_packet_size: u64,
}

/// Per-second counters drained by [`DecodeCounters::roll_interval`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalRates {
    pub packets: u64,
    pub bytes: f64,
    pub mbit: f64,
}

impl DecodeCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one packet of `len` bytes, in the fixed counter order.
    pub fn record(&mut self, len: usize) {
        let len = len as u64;
        self.packets += 1;
        self.packets_per_sec += 1;
        self.bytes += len;
        self.bytes_per_sec += len as f64;
        self.mbit_per_sec += (len * 8) as f64 / 1_000_000.0;
        self.size_sum += len;
        self.size_samples += 1;
        self.max_packet_size = self.max_packet_size.max(len);
    }

    pub fn packets(&self) -> u64 {
        self.packets
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn max_packet_size(&self) -> u64 {
        self.max_packet_size
    }

    pub fn avg_packet_size(&self) -> f64 {
        if self.size_samples == 0 {
            return 0.0;
        }
        self.size_sum as f64 / self.size_samples as f64
    }

    /// Drain the per-second counters.
    pub fn roll_interval(&mut self) -> IntervalRates {
        let rates = IntervalRates {
            packets: self.packets_per_sec,
            bytes: self.bytes_per_sec,
            mbit: self.mbit_per_sec,
        };
        self.packets_per_sec = 0;
        self.bytes_per_sec = 0.0;
        self.mbit_per_sec = 0.0;
        rates
    }

    pub fn snapshot(&self) -> DecodeStats {
        DecodeStats {
            packets: self.packets,
            bytes: self.bytes,
            avg_packet_size: self.avg_packet_size(),
            max_packet_size: self.max_packet_size,
        }
    }
}

/// Hands received packets to the session's decoder.
#[derive(Debug, Default)]
pub struct Dispatcher {
    counters: DecodeCounters,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> &DecodeCounters {
        &self.counters
    }

    pub fn counters_mut(&mut self) -> &mut DecodeCounters {
        &mut self.counters
    }

    /// Update counters and decode `buffer` into `sink`.
    ///
    /// The buffer must hold a packet from a successful receive on `session`.
    pub fn dispatch<S: PacketSource>(
        &mut self,
        session: &CaptureSession<S>,
        buffer: &PacketBuffer,
        sink: &mut dyn PacketSink,
    ) {
        self.counters.record(buffer.len());
        session.decoder().decode(buffer, sink);
    }
}
