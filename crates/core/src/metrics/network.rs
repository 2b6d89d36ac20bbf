use crate::format;
use std::time::{Duration, Instant};
use sysinfo::Networks;

/// Aggregate throughput across all non-loopback interfaces
#[derive(Debug, Clone, PartialEq)]
pub struct Throughput {
    pub download: String,
    pub upload: String,
}

pub struct NetworkCollector {
    networks: Networks,
    sample: Duration,
}

/// `lo`, `lo0`, `lo1`... and the Windows loopback pseudo-interface
fn is_loopback(name: &str) -> bool {
    match name.strip_prefix("lo") {
        Some(rest) => rest.chars().all(|c| c.is_ascii_digit()),
        None => name.starts_with("Loopback"),
    }
}

impl NetworkCollector {
    pub fn new(sample: Duration) -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
            sample,
        }
    }

    /// Samples traffic over the configured interval. Blocks for that long.
    pub fn throughput(&mut self) -> Option<Throughput> {
        self.networks.refresh();
        let started = Instant::now();
        std::thread::sleep(self.sample);
        self.networks.refresh();
        let elapsed = started.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }

        let mut interfaces = 0usize;
        let (mut rx, mut tx) = (0u64, 0u64);
        for (name, data) in &self.networks {
            if is_loopback(name) {
                continue;
            }
            interfaces += 1;
            rx += data.received();
            tx += data.transmitted();
        }
        if interfaces == 0 {
            return None;
        }

        Some(Throughput {
            download: format::rate(rx as f64 / elapsed),
            upload: format::rate(tx as f64 / elapsed),
        })
    }

    /// Interface that has moved the most bytes since boot
    pub fn busiest_interface(&mut self) -> Option<String> {
        self.networks.refresh();
        let mut busiest: Option<(&String, u64)> = None;
        for (name, data) in &self.networks {
            let moved = data.total_received() + data.total_transmitted();
            if is_loopback(name) || moved == 0 {
                continue;
            }
            if busiest.map_or(true, |(_, best)| moved > best) {
                busiest = Some((name, moved));
            }
        }
        busiest.map(|(name, _)| name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::is_loopback;

    #[test]
    fn test_loopback_detection() {
        assert!(is_loopback("lo"));
        assert!(is_loopback("lo0"));
        assert!(is_loopback("Loopback Pseudo-Interface 1"));
        assert!(!is_loopback("eth0"));
        assert!(!is_loopback("wlan0"));
        assert!(!is_loopback("lowpan0"));
        assert!(!is_loopback("local"));
    }
}
