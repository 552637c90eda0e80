use gtpgen::config::Config;
use gtpgen::error::Result;
use gtpgen::structs::RangeKind;

use clap::Parser;

/// Flags left unset keep the value from the configuration file, or the default.
#[derive(Debug, Parser, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(short, long, help = "TOML configuration file")]
    pub config: Option<String>,
    #[arg(long, help = "Device to inject packets on [default: lo]")]
    pub device: Option<String>,
    #[arg(short = 'n', long, help = "Number of packets to send [default: 1]")]
    pub count: Option<u64>,
    #[arg(long, help = "Source MAC address [default: 02:00:00:00:00:01]")]
    pub smac: Option<String>,
    #[arg(long, help = "Destination MAC address [default: 06:00:00:00:00:01]")]
    pub dmac: Option<String>,
    #[arg(
        long,
        help = "Source IPv4 address, each octet may be a range such as \"10.0.1-3.11\" [default: 127.0.0.2]"
    )]
    pub sip: Option<String>,
    #[arg(long, help = "Destination IPv4 address or range [default: 10.0.1.11]")]
    pub dip: Option<String>,
    #[arg(long, help = "Source UDP port or range such as \"11-13\" [default: 9999]")]
    pub sport: Option<String>,
    #[arg(long, help = "Destination UDP port or range [default: 2152]")]
    pub dport: Option<String>,
    #[arg(long, help = "TEID or TEID range; enables GTP-U encapsulation")]
    pub teid: Option<String>,
    #[arg(
        long,
        value_delimiter = ',',
        help = "Nesting order of the ranges, outermost first [default: sip,dip,sport,dport,teid]"
    )]
    pub order: Option<Vec<RangeKind>>,
    #[arg(long, help = "Payload size in bytes [default: 32]")]
    pub payload_len: Option<usize>,
    #[arg(
        long,
        default_value_t = false,
        overrides_with = "no_checksums",
        help = "Compute the IPv4 and UDP checksums"
    )]
    pub checksums: bool,
    #[arg(
        long,
        default_value_t = false,
        overrides_with = "checksums",
        help = "Leave the checksums at zero [default]"
    )]
    pub no_checksums: bool,
    #[arg(
        long,
        default_value_t = false,
        overrides_with = "no_fix_lengths",
        help = "Recompute the length fields of every packet [default]"
    )]
    pub fix_lengths: bool,
    #[arg(
        long,
        default_value_t = false,
        overrides_with = "fix_lengths",
        help = "Write the length fields as configured instead of recomputing them"
    )]
    pub no_fix_lengths: bool,
    #[arg(
        long,
        help = "Pause after each packet, in nanoseconds [default: 1000 on lo, 0 otherwise]"
    )]
    pub pace_ns: Option<u64>,
}

impl Args {
    /// Defaults, overridden by the configuration file, overridden by the flags actually given.
    pub fn resolve(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(device) = self.device {
            config.device = device;
        }
        if let Some(count) = self.count {
            config.count = count;
        }
        if let Some(smac) = self.smac {
            config.src_mac = smac;
        }
        if let Some(dmac) = self.dmac {
            config.dst_mac = dmac;
        }
        if let Some(sip) = self.sip {
            config.src_ip = sip;
        }
        if let Some(dip) = self.dip {
            config.dst_ip = dip;
        }
        if let Some(sport) = self.sport {
            config.src_port = sport;
        }
        if let Some(dport) = self.dport {
            config.dst_port = dport;
        }
        if self.teid.is_some() {
            config.teid = self.teid;
        }
        if let Some(order) = self.order {
            config.order = order;
        }
        if let Some(payload_len) = self.payload_len {
            config.payload_len = payload_len;
        }
        if self.checksums {
            config.compute_checksums = true;
        }
        if self.no_checksums {
            config.compute_checksums = false;
        }
        if self.fix_lengths {
            config.fix_lengths = true;
        }
        if self.no_fix_lengths {
            config.fix_lengths = false;
        }
        if self.pace_ns.is_some() {
            config.pace_ns = self.pace_ns;
        }
        Ok(config)
    }
}
