use std::net::IpAddr;

use etherparse::{NetSlice, SlicedPacket, TransportSlice};

use super::error::DecodeError;
use super::layout;
use super::reader::FrameReader;
use super::{DecodeOutcome, NetworkSummary, Transport};

/// Decode an Ethernet II frame.
pub fn decode_ethernet(frame: &[u8]) -> Result<DecodeOutcome, DecodeError> {
    let sliced =
        SlicedPacket::from_ethernet(frame).map_err(|e| DecodeError::Slice(e.to_string()))?;
    match summarize(&sliced) {
        Some(summary) => Ok(DecodeOutcome::Ip(summary)),
        None => Ok(DecodeOutcome::NonIp {
            protocol: FrameReader::new(frame).read_u16_be(layout::ETHERNET_TYPE_RANGE)?,
        }),
    }
}

/// Decode a Linux cooked capture (SLL) frame.
pub fn decode_sll(frame: &[u8]) -> Result<DecodeOutcome, DecodeError> {
    let sliced =
        SlicedPacket::from_linux_sll(frame).map_err(|e| DecodeError::Slice(e.to_string()))?;
    match summarize(&sliced) {
        Some(summary) => Ok(DecodeOutcome::Ip(summary)),
        None => Ok(DecodeOutcome::NonIp {
            protocol: FrameReader::new(frame).read_u16_be(layout::SLL_PROTOCOL_RANGE)?,
        }),
    }
}

/// Decode a PPP frame, with or without HDLC address/control bytes.
pub fn decode_ppp(frame: &[u8]) -> Result<DecodeOutcome, DecodeError> {
    let reader = FrameReader::new(frame);
    let start = if reader.read_u8(0)? == layout::PPP_HDLC_ADDRESS
        && reader.read_u8(1)? == layout::PPP_HDLC_CONTROL
    {
        layout::PPP_HDLC_LEN
    } else {
        0
    };
    let protocol = reader.read_u16_be(start..start + layout::PPP_PROTOCOL_LEN)?;
    match protocol {
        layout::PPP_PROTOCOL_IPV4 | layout::PPP_PROTOCOL_IPV6 => {
            decode_raw(reader.rest(start + layout::PPP_PROTOCOL_LEN)?)
        }
        other => Ok(DecodeOutcome::NonIp { protocol: other }),
    }
}

/// Decode a bare IPv4/IPv6 packet.
pub fn decode_raw(frame: &[u8]) -> Result<DecodeOutcome, DecodeError> {
    let sliced = SlicedPacket::from_ip(frame).map_err(|e| DecodeError::Slice(e.to_string()))?;
    summarize(&sliced)
        .map(DecodeOutcome::Ip)
        .ok_or_else(|| DecodeError::Slice("missing network layer in packet".to_string()))
}

fn summarize(sliced: &SlicedPacket<'_>) -> Option<NetworkSummary> {
    let net = sliced.net.as_ref()?;
    let (src, dst) = match net {
        NetSlice::Ipv4(ipv4) => (
            IpAddr::V4(ipv4.header().source_addr()),
            IpAddr::V4(ipv4.header().destination_addr()),
        ),
        NetSlice::Ipv6(ipv6) => (
            IpAddr::V6(ipv6.header().source_addr()),
            IpAddr::V6(ipv6.header().destination_addr()),
        ),
    };

    let transport = match &sliced.transport {
        Some(TransportSlice::Udp(udp)) => Transport::Udp {
            src_port: udp.source_port(),
            dst_port: udp.destination_port(),
        },
        Some(TransportSlice::Tcp(tcp)) => Transport::Tcp {
            src_port: tcp.source_port(),
            dst_port: tcp.destination_port(),
        },
        Some(TransportSlice::Icmpv4(_)) | Some(TransportSlice::Icmpv6(_)) => Transport::Icmp,
        None => Transport::Other(net.ip_payload_ref().map(|p| p.ip_number.0)),
    };

    Some(NetworkSummary {
        src,
        dst,
        transport,
    })
}
