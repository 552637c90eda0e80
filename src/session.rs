use crate::compose::PacketComposer;
use crate::error::Result;
use crate::range::{AddressRange, ScalarRange};
use crate::sink::PacketSink;
use crate::structs::*;
use crate::ui::Stats;

use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    Address(AddressRange),
    Scalar { range: ScalarRange, current: u32 },
}

/// One axis of the cartesian product, with its current position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    kind: RangeKind,
    cursor: Cursor,
}

impl Dimension {
    fn address(kind: RangeKind, range: AddressRange) -> Self {
        Dimension {
            kind,
            cursor: Cursor::Address(range),
        }
    }

    fn scalar(kind: RangeKind, range: ScalarRange) -> Self {
        Dimension {
            kind,
            cursor: Cursor::Scalar {
                range,
                current: range.low,
            },
        }
    }

    pub fn src_address(range: AddressRange) -> Self {
        Dimension::address(RangeKind::Sip, range)
    }

    pub fn dst_address(range: AddressRange) -> Self {
        Dimension::address(RangeKind::Dip, range)
    }

    pub fn src_port(range: ScalarRange) -> Self {
        Dimension::scalar(RangeKind::Sport, range)
    }

    pub fn dst_port(range: ScalarRange) -> Self {
        Dimension::scalar(RangeKind::Dport, range)
    }

    pub fn teid(range: ScalarRange) -> Self {
        Dimension::scalar(RangeKind::Teid, range)
    }

    pub fn len(&self) -> u64 {
        match &self.cursor {
            Cursor::Address(range) => range.len(),
            Cursor::Scalar { range, .. } => range.len(),
        }
    }

    /// Moves to the next value; true when the dimension went back to its first value.
    fn advance(&mut self) -> bool {
        match &mut self.cursor {
            Cursor::Address(range) => range.advance(),
            Cursor::Scalar { range, current } => {
                let (next, wrapped) = range.step(*current);
                *current = next;
                wrapped
            }
        }
    }

    /// Writes the current value into the template field this dimension drives.
    fn apply(&self, template: &mut PacketTemplate) {
        match (&self.cursor, self.kind) {
            (Cursor::Address(range), RangeKind::Sip) => template.ipv4.src_ip = range.current(),
            (Cursor::Address(range), RangeKind::Dip) => template.ipv4.dst_ip = range.current(),
            (Cursor::Scalar { current, .. }, RangeKind::Sport) => {
                template.udp.src_port = *current as u16
            }
            (Cursor::Scalar { current, .. }, RangeKind::Dport) => {
                template.udp.dst_port = *current as u16
            }
            (Cursor::Scalar { current, .. }, RangeKind::Teid) => {
                if let Some(gtpu) = template.gtpu.as_mut() {
                    gtpu.teid = *current;
                }
            }
            // the constructors only pair addresses with sip/dip
            _ => unreachable!(),
        }
    }

    fn describe(&self) -> String {
        match &self.cursor {
            Cursor::Address(range) => format!("{}={range}", self.kind),
            Cursor::Scalar { range, .. } if range.is_single() => {
                format!("{}={}", self.kind, range.low)
            }
            Cursor::Scalar { range, .. } => format!("{}={}-{}", self.kind, range.low, range.high),
        }
    }
}

fn checksums_on_gtpu(composer: &PacketComposer, template: &PacketTemplate) -> bool {
    composer.options().compute_checksums && template.gtpu.is_some()
}

/// State of one run: the ranges being walked, the packet template they modify, and how many
/// packets are still to be sent.
///
/// Dimensions are stored outermost first. After each packet the innermost one advances, and
/// each dimension that wraps carries into the one before it. When all of them wrap the walk
/// starts over, so a count larger than the number of combinations just cycles.
pub struct TransmissionSession {
    dimensions: Vec<Dimension>,
    template: PacketTemplate,
    composer: PacketComposer,
    count: u64,
    sent: u64,
    pace: Duration,
    stats: Stats,
    buf: Vec<u8>,
}

impl TransmissionSession {
    pub fn new(
        template: PacketTemplate,
        composer: PacketComposer,
        dimensions: Vec<Dimension>,
        count: u64,
        pace: Duration,
    ) -> Self {
        if checksums_on_gtpu(&composer, &template) {
            log::warn!(
                "Checksums are computed on GTP-U traffic: this combination is known to produce malformed packets with some receivers"
            );
        }
        for d in dimensions.iter() {
            log::debug!("Range {} ({} values)", d.describe(), d.len());
        }
        TransmissionSession {
            dimensions,
            buf: Vec::with_capacity(template.frame_len()),
            template,
            composer,
            count,
            sent: 0,
            pace,
            stats: Stats::default(),
        }
    }

    /// Number of distinct combinations before the walk repeats.
    pub fn combinations(&self) -> u64 {
        self.dimensions
            .iter()
            .map(Dimension::len)
            .fold(1u64, u64::saturating_mul)
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn template(&self) -> &PacketTemplate {
        &self.template
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    fn apply_current(&mut self) {
        for d in self.dimensions.iter() {
            d.apply(&mut self.template);
        }
    }

    fn advance(&mut self) {
        for d in self.dimensions.iter_mut().rev() {
            if !d.advance() {
                return;
            }
        }
        log::trace!("All combinations sent, starting over");
    }

    /// Sends packets until the requested count is reached. The count is checked after every
    /// single send. The first error stops the run.
    pub fn run(&mut self, sink: &mut impl PacketSink) -> Result<u64> {
        log::info!(
            "Sending {} packets to {} ({} distinct combinations)",
            self.count,
            sink.name(),
            self.combinations()
        );
        while self.sent < self.count {
            self.apply_current();
            self.composer.compose_into(&self.template, &mut self.buf)?;
            sink.send(&self.buf)?;
            self.sent += 1;
            self.stats.increase(self.buf.len());
            log::trace!(
                "Packet {}: {}:{} -> {}:{}{}",
                self.sent,
                self.template.ipv4.src_ip,
                self.template.udp.src_port,
                self.template.ipv4.dst_ip,
                self.template.udp.dst_port,
                self.template
                    .gtpu
                    .as_ref()
                    .map(|g| format!(" teid {}", g.teid))
                    .unwrap_or_default()
            );
            if self.sent >= self.count {
                break;
            }
            // loopback devices drop frames written back to back
            if !self.pace.is_zero() {
                thread::sleep(self.pace);
            }
            self.stats.tick();
            self.advance();
        }
        log::info!("{}", self.stats.summary());
        Ok(self.sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::ComposeOptions;
    use crate::error::Error;
    use crate::gtp::GtpuHeader;
    use crate::range::{parse_address_range, parse_range};
    use crate::sink::MemorySink;
    use pnet::util::MacAddr;
    use pnet_packet::ethernet::EthernetPacket;
    use pnet_packet::ipv4::Ipv4Packet;
    use pnet_packet::udp::UdpPacket;
    use pnet_packet::Packet as _;
    use std::net::Ipv4Addr;
    use std::time::Instant;

    const TEID_OFFSET: usize = 14 + 20 + 8 + 4;

    fn template() -> PacketTemplate {
        PacketTemplate::new(MacAddr::zero(), MacAddr::broadcast(), 32)
    }

    fn teid_of(frame: &[u8]) -> u32 {
        u32::from_be_bytes(frame[TEID_OFFSET..TEID_OFFSET + 4].try_into().unwrap())
    }

    fn flow_of(frame: &[u8]) -> (Ipv4Addr, Ipv4Addr, u16, u16) {
        let eth = EthernetPacket::new(frame).unwrap();
        let ip = Ipv4Packet::new(eth.payload()).unwrap();
        let udp = UdpPacket::new(ip.payload()).unwrap();
        (
            ip.get_source(),
            ip.get_destination(),
            udp.get_source(),
            udp.get_destination(),
        )
    }

    #[test]
    fn test_teid_cycle_bounded_by_count() {
        let dims = vec![Dimension::teid(parse_range("400-403").unwrap())];
        let mut session = TransmissionSession::new(
            template().with_gtpu(GtpuHeader::default()),
            PacketComposer::default(),
            dims,
            7,
            Duration::ZERO,
        );
        assert_eq!(session.combinations(), 4);
        let mut sink = MemorySink::default();
        assert_eq!(session.run(&mut sink).unwrap(), 7);
        let teids: Vec<u32> = sink.frames.iter().map(|f| teid_of(f)).collect();
        assert_eq!(teids, vec![400, 401, 402, 403, 400, 401, 402]);
        assert_eq!(session.stats().packets_counter, 7);
        assert_eq!(session.stats().bytes_counter, 7 * (14 + 20 + 8 + 12 + 32));
    }

    #[test]
    fn test_zero_count_sends_nothing() {
        let mut session = TransmissionSession::new(
            template(),
            PacketComposer::default(),
            vec![],
            0,
            Duration::ZERO,
        );
        let mut sink = MemorySink::default();
        assert_eq!(session.run(&mut sink).unwrap(), 0);
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn test_nested_order_with_wraparound() {
        let dims = vec![
            Dimension::src_address(parse_address_range("10.0.0.1-2").unwrap()),
            Dimension::dst_address(parse_address_range("10.0.1.11").unwrap()),
            Dimension::src_port(parse_range("9999").unwrap()),
            Dimension::dst_port(parse_range("42-41").unwrap()),
        ];
        let mut session = TransmissionSession::new(
            template(),
            PacketComposer::default(),
            dims,
            6,
            Duration::ZERO,
        );
        assert_eq!(session.combinations(), 4);
        let mut sink = MemorySink::default();
        session.run(&mut sink).unwrap();

        let sip1 = Ipv4Addr::new(10, 0, 0, 1);
        let sip2 = Ipv4Addr::new(10, 0, 0, 2);
        let dip = Ipv4Addr::new(10, 0, 1, 11);
        let flows: Vec<_> = sink.frames.iter().map(|f| flow_of(f)).collect();
        assert_eq!(
            flows,
            vec![
                (sip1, dip, 9999, 41),
                (sip1, dip, 9999, 42),
                (sip2, dip, 9999, 41),
                (sip2, dip, 9999, 42),
                (sip1, dip, 9999, 41),
                (sip1, dip, 9999, 42),
            ]
        );
    }

    #[test]
    fn test_inner_address_order() {
        // ports outside, destination address innermost
        let dims = vec![
            Dimension::src_port(parse_range("1-2").unwrap()),
            Dimension::dst_address(parse_address_range("10.0.3-1.11").unwrap()),
        ];
        let mut session = TransmissionSession::new(
            template(),
            PacketComposer::default(),
            dims,
            4,
            Duration::ZERO,
        );
        let mut sink = MemorySink::default();
        session.run(&mut sink).unwrap();
        let flows: Vec<(Ipv4Addr, u16)> = sink
            .frames
            .iter()
            .map(|f| {
                let (_, dip, sport, _) = flow_of(f);
                (dip, sport)
            })
            .collect();
        assert_eq!(
            flows,
            vec![
                (Ipv4Addr::new(10, 0, 1, 11), 1),
                (Ipv4Addr::new(10, 0, 2, 11), 1),
                (Ipv4Addr::new(10, 0, 3, 11), 1),
                (Ipv4Addr::new(10, 0, 1, 11), 2),
            ]
        );
    }

    #[test]
    fn test_send_failure_stops_the_run() {
        let dims = vec![Dimension::dst_port(parse_range("1-100").unwrap())];
        let mut session = TransmissionSession::new(
            template(),
            PacketComposer::new(ComposeOptions {
                fix_lengths: true,
                compute_checksums: true,
            }),
            dims,
            10,
            Duration::ZERO,
        );
        let mut sink = MemorySink {
            fail_at: Some(2),
            ..Default::default()
        };
        assert!(matches!(session.run(&mut sink), Err(Error::Send { .. })));
        assert_eq!(sink.frames.len(), 2);
        assert_eq!(session.sent(), 2);
    }

    #[test]
    fn test_serialize_failure_sends_nothing() {
        let mut session = TransmissionSession::new(
            PacketTemplate::new(MacAddr::zero(), MacAddr::zero(), 70_000),
            PacketComposer::default(),
            vec![],
            3,
            Duration::ZERO,
        );
        let mut sink = MemorySink::default();
        assert!(matches!(session.run(&mut sink), Err(Error::Serialize { .. })));
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn test_no_pause_after_last_packet() {
        let pace = Duration::from_millis(500);
        let mut session =
            TransmissionSession::new(template(), PacketComposer::default(), vec![], 1, pace);
        let start = Instant::now();
        assert_eq!(session.run(&mut MemorySink::default()).unwrap(), 1);
        assert!(start.elapsed() < pace);
    }

    #[test]
    fn test_pause_between_packets() {
        let pace = Duration::from_millis(20);
        let mut session =
            TransmissionSession::new(template(), PacketComposer::default(), vec![], 3, pace);
        let start = Instant::now();
        assert_eq!(session.run(&mut MemorySink::default()).unwrap(), 3);
        assert!(start.elapsed() >= 2 * pace);
    }

    #[test]
    fn test_checksums_on_gtpu_detection() {
        let checksums = PacketComposer::new(ComposeOptions {
            fix_lengths: true,
            compute_checksums: true,
        });
        let gtpu = template().with_gtpu(GtpuHeader::default());
        assert!(checksums_on_gtpu(&checksums, &gtpu));
        assert!(!checksums_on_gtpu(&checksums, &template()));
        assert!(!checksums_on_gtpu(&PacketComposer::default(), &gtpu));
    }
}
