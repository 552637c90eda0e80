use crate::gtp::GtpuHeader;
use pnet::util::MacAddr;
use pnet_packet::ethernet::{EtherType, EtherTypes};
use pnet_packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use serde::Deserialize;
use std::fmt;
use std::net::Ipv4Addr;

pub const ETHERNET_HEADER_SIZE: usize = 14;
pub const IPV4_HEADER_SIZE: usize = 20;
pub const UDP_HEADER_SIZE: usize = 8;
pub const IPV4_MAX_TOTAL_LENGTH: usize = u16::MAX as usize;

/// The dimensions a transmission can iterate over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RangeKind {
    Sip,
    Dip,
    Sport,
    Dport,
    Teid,
}

impl RangeKind {
    /// Outermost first.
    pub const DEFAULT_ORDER: [RangeKind; 5] = [
        RangeKind::Sip,
        RangeKind::Dip,
        RangeKind::Sport,
        RangeKind::Dport,
        RangeKind::Teid,
    ];
}

impl fmt::Display for RangeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            RangeKind::Sip => "sip",
            RangeKind::Dip => "dip",
            RangeKind::Sport => "sport",
            RangeKind::Dport => "dport",
            RangeKind::Teid => "teid",
        };
        write!(f, "{s}")
    }
}

// Packet template: one record per layer, mutated in place between two packets

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetFields {
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    pub ethertype: EtherType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Fields {
    pub version: u8,
    pub header_length: u8, // in 32-bit words
    pub tos: u8,
    pub identification: u16,
    pub flags: u8,
    pub fragment_offset: u16,
    pub ttl: u8,
    pub next_protocol: IpNextHeaderProtocol,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    // derived when lengths or checksums are fixed by the composer
    pub total_length: u16,
    pub checksum: u16,
}

impl Default for Ipv4Fields {
    fn default() -> Self {
        Ipv4Fields {
            version: 4,
            header_length: 5,
            tos: 0,
            identification: 0,
            flags: 0,
            fragment_offset: 0,
            ttl: 255,
            next_protocol: IpNextHeaderProtocols::Udp,
            src_ip: Ipv4Addr::UNSPECIFIED,
            dst_ip: Ipv4Addr::UNSPECIFIED,
            total_length: 0,
            checksum: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UdpFields {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16,
    pub checksum: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketTemplate {
    pub ethernet: EthernetFields,
    pub ipv4: Ipv4Fields,
    pub udp: UdpFields,
    pub gtpu: Option<GtpuHeader>,
    pub payload: Vec<u8>,
}

impl PacketTemplate {
    /// A plain Ethernet/IPv4/UDP template with a zeroed payload of `payload_len` bytes.
    pub fn new(src_mac: MacAddr, dst_mac: MacAddr, payload_len: usize) -> Self {
        PacketTemplate {
            ethernet: EthernetFields {
                src_mac,
                dst_mac,
                ethertype: EtherTypes::Ipv4,
            },
            ipv4: Ipv4Fields::default(),
            udp: UdpFields::default(),
            gtpu: None,
            payload: vec![0; payload_len],
        }
    }

    pub fn with_gtpu(mut self, header: GtpuHeader) -> Self {
        self.gtpu = Some(header);
        self
    }

    /// Size of everything carried by UDP: the GTP-U header, if any, and the payload.
    pub fn udp_payload_len(&self) -> usize {
        self.gtpu.as_ref().map_or(0, GtpuHeader::header_len) + self.payload.len()
    }

    pub fn ipv4_total_len(&self) -> usize {
        IPV4_HEADER_SIZE + UDP_HEADER_SIZE + self.udp_payload_len()
    }

    pub fn frame_len(&self) -> usize {
        ETHERNET_HEADER_SIZE + self.ipv4_total_len()
    }
}
