//! Link-layer decoders.
//!
//! The decoder for a session is picked once from the trace's link-layer type
//! and is one of a closed set (SLL, Ethernet, PPP, Raw IP). Decoding is thin:
//! each frame is reduced to a network/transport summary and pushed into the
//! downstream [`PacketSink`]. Failures are carried inside the pushed value and
//! never reported back to the dispatcher.
//!
//! Layout follows the protocol convention used elsewhere in the crate:
//! `layout` holds offsets, `reader` bounds-checked access, `parser` the
//! per-link decoding and `error` the failure cases.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

use std::net::IpAddr;
use std::time::Duration;

use pcap_parser::Linktype;
use serde::{Deserialize, Serialize};

pub use error::DecodeError;

use crate::packet::PacketBuffer;

/// Decoder bound to a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkDecoder {
    Sll,
    Ethernet,
    Ppp,
    Raw,
}

impl LinkDecoder {
    /// Select the decoder for a link-layer type, if one exists.
    ///
    /// # Examples
    /// ```
    /// use pcapfeed_core::{LinkDecoder, Linktype};
    ///
    /// assert_eq!(LinkDecoder::for_linktype(Linktype::ETHERNET), Some(LinkDecoder::Ethernet));
    /// assert_eq!(LinkDecoder::for_linktype(Linktype(147)), None);
    /// ```
    pub fn for_linktype(linktype: Linktype) -> Option<Self> {
        match linktype {
            Linktype::LINUX_SLL => Some(LinkDecoder::Sll),
            Linktype::ETHERNET => Some(LinkDecoder::Ethernet),
            layout::LINKTYPE_PPP => Some(LinkDecoder::Ppp),
            Linktype::RAW => Some(LinkDecoder::Raw),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LinkDecoder::Sll => "sll",
            LinkDecoder::Ethernet => "ethernet",
            LinkDecoder::Ppp => "ppp",
            LinkDecoder::Raw => "raw",
        }
    }

    /// Decode the buffered packet and push the result into `sink`.
    pub fn decode(&self, packet: &PacketBuffer, sink: &mut dyn PacketSink) {
        let frame = packet.data();
        let outcome = match self {
            LinkDecoder::Sll => parser::decode_sll(frame),
            LinkDecoder::Ethernet => parser::decode_ethernet(frame),
            LinkDecoder::Ppp => parser::decode_ppp(frame),
            LinkDecoder::Raw => parser::decode_raw(frame),
        }
        .unwrap_or_else(DecodeOutcome::Invalid);

        sink.push(DecodedPacket {
            ts: packet.ts(),
            link: *self,
            length: packet.len(),
            outcome,
        });
    }
}

/// Downstream stage receiving decoded packets.
pub trait PacketSink {
    fn push(&mut self, packet: DecodedPacket);
}

impl PacketSink for Vec<DecodedPacket> {
    fn push(&mut self, packet: DecodedPacket) {
        Vec::push(self, packet);
    }
}

/// Result of decoding one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPacket {
    pub ts: Duration,
    pub link: LinkDecoder,
    pub length: usize,
    pub outcome: DecodeOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// IPv4/IPv6 packet with its endpoints.
    Ip(NetworkSummary),
    /// Valid frame carrying something other than IP (EtherType or PPP
    /// protocol number).
    NonIp { protocol: u16 },
    /// Frame the decoder could not parse.
    Invalid(DecodeError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSummary {
    pub src: IpAddr,
    pub dst: IpAddr,
    pub transport: Transport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp { src_port: u16, dst_port: u16 },
    Udp { src_port: u16, dst_port: u16 },
    Icmp,
    /// Other or unparsed transport, with the IP protocol number when known.
    Other(Option<u8>),
}
