/// Ethernet II EtherType field.
pub const ETHERNET_TYPE_RANGE: std::ops::Range<usize> = 12..14;

/// Linux cooked capture (SLL) protocol field.
pub const SLL_PROTOCOL_RANGE: std::ops::Range<usize> = 14..16;

/// PPP in HDLC-like framing: address and control bytes.
pub const PPP_HDLC_ADDRESS: u8 = 0xff;
pub const PPP_HDLC_CONTROL: u8 = 0x03;
pub const PPP_HDLC_LEN: usize = 2;
pub const PPP_PROTOCOL_LEN: usize = 2;

pub const PPP_PROTOCOL_IPV4: u16 = 0x0021;
pub const PPP_PROTOCOL_IPV6: u16 = 0x0057;

/// DLT_PPP. pcap-parser names no constant for it.
pub const LINKTYPE_PPP: pcap_parser::Linktype = pcap_parser::Linktype(9);
