mod common;

use std::time::Duration;

use common::{
    Endian, LINKTYPE_ETHERNET, LINKTYPE_LINUX_SLL, LINKTYPE_RAW, Record, TempTrace,
    enhanced_packet, interface_description, interface_with_snaplen, legacy_pcap, section_header,
    simple_packet, simple_pcap, simple_pcapng,
};
use pcapfeed_core::{Linktype, PacketSource, PcapFileSource, SourceError};

fn drain(source: &mut PcapFileSource) -> Result<Vec<(Duration, Vec<u8>)>, SourceError> {
    let mut packets = Vec::new();
    while source.dispatch(&mut |record| packets.push((record.ts, record.data.to_vec())))? {}
    Ok(packets)
}

#[test]
fn legacy_pcap_reads_packets_in_order() {
    let trace = TempTrace::write(
        "legacy",
        &simple_pcap(LINKTYPE_ETHERNET, &[vec![1; 60], vec![2; 1500], vec![3; 800]]),
    );
    let mut source = PcapFileSource::open(trace.path()).unwrap();
    assert_eq!(source.linktype(), Linktype::ETHERNET);

    let packets = drain(&mut source).unwrap();
    let lengths: Vec<usize> = packets.iter().map(|(_, data)| data.len()).collect();
    assert_eq!(lengths, vec![60, 1500, 800]);
    assert_eq!(packets[2].1[0], 3);
    assert_eq!(packets[1].0, Duration::from_secs(1));
}

#[test]
fn open_consumes_no_packet() {
    let trace = TempTrace::write("open_only", &simple_pcap(LINKTYPE_RAW, &[vec![0x45; 20]]));
    let mut source = PcapFileSource::open(trace.path()).unwrap();
    assert_eq!(source.linktype(), Linktype::RAW);
    assert_eq!(drain(&mut source).unwrap().len(), 1);
}

#[test]
fn big_endian_nanosecond_timestamps() {
    let records = [
        Record::new(100, 250, vec![0; 20]),
        Record::new(101, 999_999_999, vec![0; 20]),
    ];
    let trace = TempTrace::write(
        "legacy_be_ns",
        &legacy_pcap(LINKTYPE_LINUX_SLL, Endian::Big, true, &records),
    );
    let mut source = PcapFileSource::open(trace.path()).unwrap();
    assert_eq!(source.linktype(), Linktype::LINUX_SLL);

    let packets = drain(&mut source).unwrap();
    assert_eq!(packets[0].0, Duration::new(100, 250));
    assert_eq!(packets[1].0, Duration::new(101, 999_999_999));
}

#[test]
fn microsecond_fraction_is_scaled() {
    let records = [Record::new(7, 500_000, vec![0; 4])];
    let trace = TempTrace::write(
        "legacy_us",
        &legacy_pcap(LINKTYPE_RAW, Endian::Little, false, &records),
    );
    let mut source = PcapFileSource::open(trace.path()).unwrap();
    let packets = drain(&mut source).unwrap();
    assert_eq!(packets[0].0, Duration::from_millis(7_500));
}

#[test]
fn header_only_trace_ends_immediately() {
    let trace = TempTrace::write("header_only", &simple_pcap(LINKTYPE_ETHERNET, &[]));
    let mut source = PcapFileSource::open(trace.path()).unwrap();
    assert!(!source.dispatch(&mut |_| panic!("no packet expected")).unwrap());
}

#[test]
fn pcapng_reads_packets_with_default_resolution() {
    let trace = TempTrace::write(
        "ng",
        &simple_pcapng(1, &[(1_000_000, vec![0; 42]), (2_500_000, vec![0; 64])]),
    );
    let mut source = PcapFileSource::open(trace.path()).unwrap();
    assert_eq!(source.linktype(), Linktype::ETHERNET);

    let packets = drain(&mut source).unwrap();
    assert_eq!(packets.len(), 2);
    assert_eq!(packets[0].0, Duration::from_secs(1));
    assert_eq!(packets[1].0, Duration::from_millis(2_500));
    assert_eq!(packets[1].1.len(), 64);
}

#[test]
fn pcapng_honours_interface_tsresol() {
    let mut bytes = section_header();
    bytes.extend_from_slice(&interface_description(101, Some(9)));
    bytes.extend_from_slice(&enhanced_packet(0, 3_000_000_123, &[0x45; 20]));
    let trace = TempTrace::write("ng_ns", &bytes);

    let mut source = PcapFileSource::open(trace.path()).unwrap();
    assert_eq!(source.linktype(), Linktype::RAW);
    let packets = drain(&mut source).unwrap();
    assert_eq!(packets[0].0, Duration::new(3, 123));
}

#[test]
fn simple_packet_is_cut_to_interface_snaplen() {
    let mut bytes = section_header();
    bytes.extend_from_slice(&interface_with_snaplen(101, 5, None));
    bytes.extend_from_slice(&simple_packet(60, &[1, 2, 3, 4, 5, 0xEE, 0xEE, 0xEE]));
    let trace = TempTrace::write("ng_spb_snaplen", &bytes);

    let mut source = PcapFileSource::open(trace.path()).unwrap();
    let mut orig_len = 0;
    let mut data = Vec::new();
    assert!(source.dispatch(&mut |record| {
        orig_len = record.orig_len;
        data = record.data.to_vec();
    })
    .unwrap());
    assert_eq!(data, vec![1, 2, 3, 4, 5]);
    assert_eq!(orig_len, 60);
    assert!(!source.dispatch(&mut |_| panic!("no packet expected")).unwrap());
}

#[test]
fn simple_packet_drops_block_padding() {
    let mut bytes = section_header();
    bytes.extend_from_slice(&interface_with_snaplen(101, 0, None));
    bytes.extend_from_slice(&simple_packet(6, &[0x45; 6]));
    let trace = TempTrace::write("ng_spb_padding", &bytes);

    let mut source = PcapFileSource::open(trace.path()).unwrap();
    let packets = drain(&mut source).unwrap();
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].0, Duration::ZERO);
    assert_eq!(packets[0].1, vec![0x45; 6]);
}

#[test]
fn pcapng_rejects_mixed_link_types() {
    let mut bytes = section_header();
    bytes.extend_from_slice(&interface_description(1, None));
    bytes.extend_from_slice(&enhanced_packet(0, 0, &[0; 60]));
    bytes.extend_from_slice(&interface_description(113, None));
    bytes.extend_from_slice(&enhanced_packet(1, 0, &[0; 60]));
    let trace = TempTrace::write("ng_mixed", &bytes);

    let mut source = PcapFileSource::open(trace.path()).unwrap();
    assert!(source.dispatch(&mut |_| {}).unwrap());
    let err = source.dispatch(&mut |_| {}).unwrap_err();
    assert!(matches!(err, SourceError::Pcap(_)));
    assert!(err.to_string().contains("link type"));
}

#[test]
fn pcapng_rejects_unknown_interface() {
    let mut bytes = section_header();
    bytes.extend_from_slice(&interface_description(1, None));
    bytes.extend_from_slice(&enhanced_packet(4, 0, &[0; 60]));
    let trace = TempTrace::write("ng_bad_if", &bytes);

    let mut source = PcapFileSource::open(trace.path()).unwrap();
    let err = source.dispatch(&mut |_| {}).unwrap_err();
    assert!(err.to_string().contains("unknown interface"));
}

#[test]
fn truncated_record_is_a_read_error() {
    let mut bytes = simple_pcap(LINKTYPE_ETHERNET, &[vec![0; 60], vec![0; 100]]);
    bytes.truncate(bytes.len() - 40);
    let trace = TempTrace::write("truncated_record", &bytes);

    let mut source = PcapFileSource::open(trace.path()).unwrap();
    let mut seen = 0;
    assert!(source.dispatch(&mut |_| seen += 1).unwrap());
    assert!(source.dispatch(&mut |_| seen += 1).is_err());
    assert_eq!(seen, 1);
}

#[test]
fn pcap_source_rejects_truncated_file() {
    let trace = TempTrace::write("truncated_magic", &[0x0a, 0x0d, 0x0d]);
    let err = match PcapFileSource::open(trace.path()) {
        Ok(_) => panic!("expected truncated file to be rejected"),
        Err(err) => err,
    };
    assert!(matches!(err, SourceError::Io(_)));
}

#[test]
fn garbage_file_is_rejected_at_open() {
    let trace = TempTrace::write("garbage", b"definitely not a capture file");
    assert!(PcapFileSource::open(trace.path()).is_err());
}
