use std::fs::File;
use std::path::Path;

use pcap_parser::{
    Block, LegacyPcapReader, Linktype, PcapBlockOwned, PcapError, PcapNGReader,
    traits::PcapReaderIterator,
};

use crate::source::{PacketRecord, PacketSource, SourceError};

use super::error::PcapSourceError;
use super::layout;
use super::reader::{
    captured_slice, is_nanosecond_magic, is_pcapng_magic, legacy_ts, pcapng_ts,
    read_magic_and_rewind,
};

/// Packet source reading a legacy PCAP or PCAPNG file front to back.
pub struct PcapFileSource {
    inner: PcapReader,
    linktype: Linktype,
}

enum PcapReader {
    Legacy {
        reader: LegacyPcapReader<File>,
        linktype: Option<Linktype>,
        nanosecond: bool,
    },
    Ng {
        reader: PcapNGReader<File>,
        linktype: Option<Linktype>,
        interfaces: Vec<Interface>,
    },
}

#[derive(Debug, Clone, Copy)]
struct Interface {
    tsresol: u8,
    /// Zero means unlimited.
    snaplen: u32,
}

impl Interface {
    /// Bytes an SPB actually carries: the block has no caplen field.
    fn simple_caplen(&self, origlen: u32) -> u32 {
        if self.snaplen == 0 {
            origlen
        } else {
            origlen.min(self.snaplen)
        }
    }
}

enum Step {
    Packet,
    Block,
    Eof,
}

impl PcapFileSource {
    /// Open a trace and read its headers up to the first link-layer type.
    ///
    /// No packet is consumed.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(SourceError::from)?;
        let mut inner = create_reader(file).map_err(SourceError::from)?;
        let linktype = resolve_linktype(&mut inner).map_err(SourceError::from)?;
        Ok(Self { inner, linktype })
    }
}

impl PacketSource for PcapFileSource {
    fn linktype(&self) -> Linktype {
        self.linktype
    }

    fn dispatch(
        &mut self,
        handler: &mut dyn FnMut(&PacketRecord<'_>),
    ) -> Result<bool, SourceError> {
        loop {
            match next_block(&mut self.inner, handler).map_err(SourceError::from)? {
                Step::Packet => return Ok(true),
                Step::Eof => return Ok(false),
                Step::Block => {}
            }
        }
    }
}

fn create_reader(file: File) -> Result<PcapReader, PcapSourceError> {
    let mut file = file;
    let magic = read_magic_and_rewind(&mut file)?;

    if is_pcapng_magic(&magic) {
        let reader = PcapNGReader::new(layout::PCAP_READER_BUFFER_SIZE, file)
            .map_err(|e| PcapSourceError::pcap("pcapng reader init", e))?;
        Ok(PcapReader::Ng {
            reader,
            linktype: None,
            interfaces: Vec::new(),
        })
    } else {
        let reader = LegacyPcapReader::new(layout::PCAP_READER_BUFFER_SIZE, file)
            .map_err(|e| PcapSourceError::pcap("pcap reader init", e))?;
        Ok(PcapReader::Legacy {
            reader,
            linktype: None,
            nanosecond: false,
        })
    }
}

fn resolve_linktype(reader: &mut PcapReader) -> Result<Linktype, PcapSourceError> {
    loop {
        let known = match reader {
            PcapReader::Legacy { linktype, .. } | PcapReader::Ng { linktype, .. } => *linktype,
        };
        if let Some(linktype) = known {
            return Ok(linktype);
        }
        match next_block(reader, &mut |_| {})? {
            Step::Block => {}
            Step::Packet => {
                return Err(PcapSourceError::pcap(
                    "trace header",
                    "packet data precedes the link-layer header",
                ));
            }
            Step::Eof => {
                return Err(PcapSourceError::pcap(
                    "trace header",
                    "trace ends before any link-layer header",
                ));
            }
        }
    }
}

fn next_block(
    reader: &mut PcapReader,
    handler: &mut dyn FnMut(&PacketRecord<'_>),
) -> Result<Step, PcapSourceError> {
    let mut refilled = false;
    loop {
        match reader {
            PcapReader::Legacy {
                reader,
                linktype,
                nanosecond,
            } => match reader.next() {
                Ok((offset, block)) => {
                    let step = match block {
                        PcapBlockOwned::LegacyHeader(header) => {
                            *linktype = Some(header.network);
                            *nanosecond = is_nanosecond_magic(header.magic_number);
                            Step::Block
                        }
                        PcapBlockOwned::Legacy(packet) => {
                            let record = PacketRecord {
                                ts: legacy_ts(packet.ts_sec, packet.ts_usec, *nanosecond),
                                orig_len: packet.origlen,
                                data: captured_slice(packet.data, packet.caplen),
                            };
                            handler(&record);
                            Step::Packet
                        }
                        _ => Step::Block,
                    };
                    reader.consume(offset);
                    return Ok(step);
                }
                Err(PcapError::Eof) => return Ok(Step::Eof),
                Err(PcapError::Incomplete(_)) => {
                    if refilled {
                        return Err(PcapSourceError::pcap(
                            "pcap reader next",
                            "truncated record at end of trace",
                        ));
                    }
                    reader
                        .refill()
                        .map_err(|e| PcapSourceError::pcap("pcap reader refill", e))?;
                    refilled = true;
                }
                Err(e) => return Err(PcapSourceError::pcap("pcap reader next", e)),
            },
            PcapReader::Ng {
                reader,
                linktype,
                interfaces,
            } => match reader.next() {
                Ok((offset, block)) => {
                    let step = match block {
                        PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                            interfaces.clear();
                            Ok(Step::Block)
                        }
                        PcapBlockOwned::NG(Block::InterfaceDescription(intf)) => {
                            match *linktype {
                                Some(expected) if expected != intf.linktype => {
                                    Err(PcapSourceError::pcap(
                                        "pcapng interface",
                                        format!(
                                            "interface {} has link type {} but the trace started with {}",
                                            interfaces.len(),
                                            intf.linktype.0,
                                            expected.0
                                        ),
                                    ))
                                }
                                _ => {
                                    *linktype = Some(intf.linktype);
                                    interfaces.push(Interface {
                                        tsresol: intf.if_tsresol,
                                        snaplen: intf.snaplen,
                                    });
                                    Ok(Step::Block)
                                }
                            }
                        }
                        PcapBlockOwned::NG(Block::EnhancedPacket(packet)) => {
                            match interfaces.get(packet.if_id as usize) {
                                Some(interface) => {
                                    match pcapng_ts(packet.ts_high, packet.ts_low, interface.tsresol)
                                    {
                                        Some(ts) => {
                                            let record = PacketRecord {
                                                ts,
                                                orig_len: packet.origlen,
                                                data: captured_slice(packet.data, packet.caplen),
                                            };
                                            handler(&record);
                                            Ok(Step::Packet)
                                        }
                                        None => Err(PcapSourceError::pcap(
                                            "pcapng packet",
                                            format!(
                                                "unsupported timestamp resolution {:#04x}",
                                                interface.tsresol
                                            ),
                                        )),
                                    }
                                }
                                None => Err(PcapSourceError::pcap(
                                    "pcapng packet",
                                    format!("packet references unknown interface {}", packet.if_id),
                                )),
                            }
                        }
                        PcapBlockOwned::NG(Block::SimplePacket(packet)) => {
                            // SPBs always belong to the first interface.
                            match interfaces.first() {
                                Some(interface) => {
                                    let caplen = interface.simple_caplen(packet.origlen);
                                    let record = PacketRecord {
                                        ts: std::time::Duration::ZERO,
                                        orig_len: packet.origlen,
                                        data: captured_slice(packet.data, caplen),
                                    };
                                    handler(&record);
                                    Ok(Step::Packet)
                                }
                                None => Err(PcapSourceError::pcap(
                                    "pcapng packet",
                                    "simple packet block without an interface",
                                )),
                            }
                        }
                        _ => Ok(Step::Block),
                    };
                    reader.consume(offset);
                    return step;
                }
                Err(PcapError::Eof) => return Ok(Step::Eof),
                Err(PcapError::Incomplete(_)) => {
                    if refilled {
                        return Err(PcapSourceError::pcap(
                            "pcapng reader next",
                            "truncated block at end of trace",
                        ));
                    }
                    reader
                        .refill()
                        .map_err(|e| PcapSourceError::pcap("pcapng reader refill", e))?;
                    refilled = true;
                }
                Err(e) => return Err(PcapSourceError::pcap("pcapng reader next", e)),
            },
        }
    }
}
