use std::time::{Duration, Instant};

const REPORT_PERIOD: Duration = Duration::new(5, 0);

/// Transmission statistics, reported periodically while sending and once at the end.
#[derive(Debug)]
pub struct Stats {
    pub start_time: Instant,
    last_report: Instant,
    pub packets_counter: u64,
    pub bytes_counter: u64,
}

impl Default for Stats {
    fn default() -> Self {
        let now = Instant::now();
        Stats {
            start_time: now,
            last_report: now,
            packets_counter: 0,
            bytes_counter: 0,
        }
    }
}

fn format_throughput(bytes: u64, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs == 0. {
        return "n/a".to_string();
    }
    let throughput = 8. * (bytes as f64) / secs / 1_000_000.;
    if throughput < 1. {
        format!("{:.2} kbps", throughput * 1000.)
    } else if throughput < 1000. {
        format!("{:.2} Mbps", throughput)
    } else {
        format!("{:.2} Gbps", throughput / 1000.)
    }
}

impl Stats {
    pub fn increase(&mut self, frame_len: usize) {
        self.packets_counter += 1;
        self.bytes_counter += frame_len as u64;
    }

    /// Logs the current throughput if the last report is old enough.
    pub fn tick(&mut self) {
        if self.last_report.elapsed() >= REPORT_PERIOD {
            self.last_report = Instant::now();
            log::debug!("{}", self.summary());
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} sent packets, {} bytes ({})",
            self.packets_counter,
            self.bytes_counter,
            format_throughput(self.bytes_counter, self.start_time.elapsed())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut stats = Stats::default();
        stats.increase(74);
        stats.increase(86);
        assert_eq!(stats.packets_counter, 2);
        assert_eq!(stats.bytes_counter, 160);
        assert!(stats.summary().starts_with("2 sent packets, 160 bytes"));
    }

    #[test]
    fn test_throughput_units() {
        assert_eq!(format_throughput(1000, Duration::from_secs(1)), "8.00 kbps");
        assert_eq!(format_throughput(1_000_000, Duration::from_secs(1)), "8.00 Mbps");
        assert_eq!(format_throughput(1_000_000_000, Duration::from_secs(2)), "4.00 Gbps");
        assert_eq!(format_throughput(10, Duration::ZERO), "n/a");
    }
}
