use crate::error::{Error, Result};
use crate::structs::*;

use pnet_packet::ethernet::MutableEthernetPacket;
use pnet_packet::ipv4::{self, MutableIpv4Packet};
use pnet_packet::udp::{self, MutableUdpPacket};

/// Which dependent fields the composer derives instead of copying them from the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeOptions {
    pub fix_lengths: bool,
    pub compute_checksums: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        ComposeOptions {
            fix_lengths: true,
            compute_checksums: false,
        }
    }
}

/// Serializes a [`PacketTemplate`] into an Ethernet frame.
///
/// Layers are written from the inside out (payload, GTP-U, UDP, IPv4, Ethernet) so that every
/// length and checksum is computed over bytes that are already in place.
#[derive(Debug, Clone, Default)]
pub struct PacketComposer {
    options: ComposeOptions,
}

fn build_error(layer: &str) -> Error {
    Error::Serialize {
        reason: format!("buffer too small for the {layer} header"),
    }
}

impl PacketComposer {
    pub fn new(options: ComposeOptions) -> Self {
        PacketComposer { options }
    }

    pub fn options(&self) -> ComposeOptions {
        self.options
    }

    /// Writes the ports, the length and the checksum of the UDP header. The UDP payload must
    /// already be in place for the checksum.
    fn setup_udp_packet(&self, packet: &mut [u8], template: &PacketTemplate) -> Result<()> {
        let len = packet.len();
        let mut udp_packet = MutableUdpPacket::new(packet).ok_or_else(|| build_error("UDP"))?;
        udp_packet.set_source(template.udp.src_port);
        udp_packet.set_destination(template.udp.dst_port);
        udp_packet.set_length(if self.options.fix_lengths {
            len as u16
        } else {
            template.udp.length
        });
        let checksum = if self.options.compute_checksums {
            match udp::ipv4_checksum(
                &udp_packet.to_immutable(),
                &template.ipv4.src_ip,
                &template.ipv4.dst_ip,
            ) {
                0 => 0xffff, // a computed zero is transmitted as all ones
                c => c,
            }
        } else {
            template.udp.checksum
        };
        udp_packet.set_checksum(checksum);
        Ok(())
    }

    /// Writes the IPv4 header, then its checksum when requested.
    fn setup_ip_packet(&self, packet: &mut [u8], template: &PacketTemplate) -> Result<()> {
        let len = packet.len();
        let fields = &template.ipv4;
        let mut ipv4_packet =
            MutableIpv4Packet::new(packet).ok_or_else(|| build_error("IPv4"))?;
        ipv4_packet.set_version(fields.version);
        ipv4_packet.set_header_length(fields.header_length);
        ipv4_packet.set_dscp(fields.tos >> 2);
        ipv4_packet.set_ecn(fields.tos & 0b11);
        ipv4_packet.set_total_length(if self.options.fix_lengths {
            len as u16
        } else {
            fields.total_length
        });
        ipv4_packet.set_identification(fields.identification);
        ipv4_packet.set_flags(fields.flags);
        ipv4_packet.set_fragment_offset(fields.fragment_offset);
        ipv4_packet.set_ttl(fields.ttl);
        ipv4_packet.set_next_level_protocol(fields.next_protocol);
        ipv4_packet.set_source(fields.src_ip);
        ipv4_packet.set_destination(fields.dst_ip);
        let checksum = if self.options.compute_checksums {
            ipv4::checksum(&ipv4_packet.to_immutable())
        } else {
            fields.checksum
        };
        ipv4_packet.set_checksum(checksum);
        Ok(())
    }

    fn setup_ethernet_frame(&self, packet: &mut [u8], template: &PacketTemplate) -> Result<()> {
        let mut eth_packet =
            MutableEthernetPacket::new(packet).ok_or_else(|| build_error("Ethernet"))?;
        eth_packet.set_destination(template.ethernet.dst_mac);
        eth_packet.set_source(template.ethernet.src_mac);
        eth_packet.set_ethertype(template.ethernet.ethertype);
        Ok(())
    }

    /// Serializes `template` into `buf`, replacing its content. The buffer is reused between
    /// packets to avoid one allocation per frame.
    pub fn compose_into(&self, template: &PacketTemplate, buf: &mut Vec<u8>) -> Result<()> {
        let ip_total_len = template.ipv4_total_len();
        if ip_total_len > IPV4_MAX_TOTAL_LENGTH {
            return Err(Error::Serialize {
                reason: format!(
                    "IPv4 total length {ip_total_len} exceeds {IPV4_MAX_TOTAL_LENGTH}"
                ),
            });
        }
        let ip_start = ETHERNET_HEADER_SIZE;
        let udp_start = ip_start + IPV4_HEADER_SIZE;
        let mut offset = udp_start + UDP_HEADER_SIZE;

        buf.clear();
        buf.resize(template.frame_len(), 0);

        if let Some(gtpu) = &template.gtpu {
            let length = if self.options.fix_lengths {
                gtpu.derived_length(template.payload.len()) as u16
            } else {
                gtpu.message_length
            };
            gtpu.write_to(&mut buf[offset..], length);
            offset += gtpu.header_len();
        }
        buf[offset..].copy_from_slice(&template.payload);

        self.setup_udp_packet(&mut buf[udp_start..], template)?;
        self.setup_ip_packet(&mut buf[ip_start..], template)?;
        self.setup_ethernet_frame(buf, template)?;
        Ok(())
    }

    pub fn compose(&self, template: &PacketTemplate) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(template.frame_len());
        self.compose_into(template, &mut buf)?;
        Ok(buf)
    }
}
