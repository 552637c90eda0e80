use crate::compose::{ComposeOptions, PacketComposer};
use crate::error::{Error, Result};
use crate::gtp::GtpuHeader;
use crate::range::{parse_address_range, parse_port_range, parse_teid_range};
use crate::session::{Dimension, TransmissionSession};
use crate::structs::{
    PacketTemplate, RangeKind, IPV4_HEADER_SIZE, IPV4_MAX_TOTAL_LENGTH, UDP_HEADER_SIZE,
};

use pnet::util::MacAddr;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::time::Duration;

const LOOPBACK_DEVICE: &str = "lo";
const LOOPBACK_PACE: Duration = Duration::from_nanos(1000);

/// Everything needed to start a transmission. Built from the defaults, then a TOML file, then
/// the command line, each one overriding the previous.
///
/// ```toml
/// device = "eth1"
/// count = 1000
/// src_ip = "10.0.0.1-10"
/// dst_port = 2152
/// teid = "400-403"
/// order = ["teid", "sip"]
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub device: String,
    pub count: u64,
    pub src_mac: String,
    pub dst_mac: String,
    #[serde(deserialize_with = "range_expr")]
    pub src_ip: String,
    #[serde(deserialize_with = "range_expr")]
    pub dst_ip: String,
    #[serde(deserialize_with = "range_expr")]
    pub src_port: String,
    #[serde(deserialize_with = "range_expr")]
    pub dst_port: String,
    #[serde(deserialize_with = "opt_range_expr")]
    pub teid: Option<String>,
    pub order: Vec<RangeKind>,
    pub payload_len: usize,
    pub compute_checksums: bool,
    pub fix_lengths: bool,
    pub pace_ns: Option<u64>,
    pub gtp_message_type: u8,
    pub gtp_sequence: u16,
}

impl Default for Config {
    fn default() -> Self {
        let gtpu = GtpuHeader::default();
        Config {
            device: LOOPBACK_DEVICE.to_string(),
            count: 1,
            src_mac: "02:00:00:00:00:01".to_string(),
            dst_mac: "06:00:00:00:00:01".to_string(),
            src_ip: "127.0.0.2".to_string(),
            dst_ip: "10.0.1.11".to_string(),
            src_port: "9999".to_string(),
            dst_port: crate::gtp::GTPU_PORT.to_string(),
            teid: None,
            order: RangeKind::DEFAULT_ORDER.to_vec(),
            payload_len: 32,
            compute_checksums: false,
            fix_lengths: true,
            pace_ns: None,
            gtp_message_type: gtpu.message_type,
            gtp_sequence: gtpu.sequence_number,
        }
    }
}

// ranges may be written as plain TOML integers
#[derive(Deserialize)]
#[serde(untagged)]
enum RangeExpr {
    Number(u64),
    Text(String),
}

impl From<RangeExpr> for String {
    fn from(e: RangeExpr) -> String {
        match e {
            RangeExpr::Number(n) => n.to_string(),
            RangeExpr::Text(s) => s,
        }
    }
}

fn range_expr<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    RangeExpr::deserialize(d).map(String::from)
}

fn opt_range_expr<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<String>, D::Error> {
    Option::<RangeExpr>::deserialize(d).map(|e| e.map(String::from))
}

fn parse_mac(input: &str) -> Result<MacAddr> {
    input.parse().map_err(|_| Error::MacFormat {
        input: input.to_string(),
    })
}

impl Config {
    pub fn from_toml(config: &str, path: &str) -> Result<Self> {
        toml::from_str(config).map_err(|e| Error::Config {
            path: path.to_string(),
            reason: e.message().to_string(),
        })
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let config_str = fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Config::from_toml(&config_str, path)
    }

    /// Delay after each send. Loopback drops frames sent back to back, so it gets a short
    /// pause unless one is configured explicitly.
    pub fn pace(&self) -> Duration {
        match self.pace_ns {
            Some(ns) => Duration::from_nanos(ns),
            None if self.device == LOOPBACK_DEVICE => LOOPBACK_PACE,
            None => Duration::ZERO,
        }
    }

    /// Nesting order, outermost first. Kinds missing from the configured order are nested
    /// inside it, in the default order.
    pub fn resolved_order(&self) -> Result<Vec<RangeKind>> {
        let mut order: Vec<RangeKind> = Vec::with_capacity(RangeKind::DEFAULT_ORDER.len());
        for kind in self.order.iter() {
            if order.contains(kind) {
                return Err(Error::Order(format!("{kind} appears more than once")));
            }
            order.push(*kind);
        }
        for kind in RangeKind::DEFAULT_ORDER {
            if !order.contains(&kind) {
                order.push(kind);
            }
        }
        Ok(order)
    }

    pub fn compose_options(&self) -> ComposeOptions {
        ComposeOptions {
            fix_lengths: self.fix_lengths,
            compute_checksums: self.compute_checksums,
        }
    }

    /// Parses every address, port and TEID expression and sets up the session. Nothing is
    /// built if any of them is malformed.
    pub fn build_session(&self) -> Result<TransmissionSession> {
        let src_mac = parse_mac(&self.src_mac)?;
        let dst_mac = parse_mac(&self.dst_mac)?;
        let src_ip = parse_address_range(&self.src_ip)?;
        let dst_ip = parse_address_range(&self.dst_ip)?;
        let src_port = parse_port_range(&self.src_port)?;
        let dst_port = parse_port_range(&self.dst_port)?;
        let teid = self.teid.as_deref().map(parse_teid_range).transpose()?;
        let order = self.resolved_order()?;

        let gtpu = teid.map(|_| GtpuHeader {
            message_type: self.gtp_message_type,
            sequence_number: self.gtp_sequence,
            ..Default::default()
        });
        // checked before the payload is allocated
        let headers_len =
            IPV4_HEADER_SIZE + UDP_HEADER_SIZE + gtpu.as_ref().map_or(0, GtpuHeader::header_len);
        match headers_len.checked_add(self.payload_len) {
            Some(total) if total <= IPV4_MAX_TOTAL_LENGTH => (),
            _ => {
                return Err(Error::Serialize {
                    reason: format!(
                        "a payload of {} bytes exceeds the IPv4 total length limit of {IPV4_MAX_TOTAL_LENGTH}",
                        self.payload_len
                    ),
                })
            }
        }

        let mut template = PacketTemplate::new(src_mac, dst_mac, self.payload_len);
        if let Some(header) = gtpu {
            template = template.with_gtpu(header);
        }

        let mut dimensions = Vec::with_capacity(order.len());
        for kind in order {
            match kind {
                RangeKind::Sip => dimensions.push(Dimension::src_address(src_ip.clone())),
                RangeKind::Dip => dimensions.push(Dimension::dst_address(dst_ip.clone())),
                RangeKind::Sport => dimensions.push(Dimension::src_port(src_port)),
                RangeKind::Dport => dimensions.push(Dimension::dst_port(dst_port)),
                RangeKind::Teid => {
                    if let Some(teid) = teid {
                        dimensions.push(Dimension::teid(teid));
                    }
                }
            }
        }

        Ok(TransmissionSession::new(
            template,
            PacketComposer::new(self.compose_options()),
            dimensions,
            self.count,
            self.pace(),
        ))
    }
}
