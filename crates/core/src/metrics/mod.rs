pub mod cpu;
pub mod disk;
pub mod memory;
pub mod network;
pub mod system;
pub mod temperature;

pub use cpu::CpuCollector;
pub use disk::DiskCollector;
pub use memory::MemoryCollector;
pub use network::{NetworkCollector, Throughput};
pub use system::SystemCollector;
pub use temperature::TemperatureCollector;

use crate::model::{not_available, CpuStats, NetworkStats, Stats};
use std::time::Duration;

/// sysinfo-backed metrics shared by every platform collector.
///
/// Each platform starts from [`MetricsCollector::collect`] and overrides the
/// fields it can answer more precisely with its own utilities.
pub struct MetricsCollector {
    pub cpu: CpuCollector,
    pub memory: MemoryCollector,
    pub disk: DiskCollector,
    pub network: NetworkCollector,
    pub temperature: TemperatureCollector,
}

impl MetricsCollector {
    pub fn new(network_sample: Duration) -> Self {
        Self {
            cpu: CpuCollector::new(),
            memory: MemoryCollector::new(),
            disk: DiskCollector::new(),
            network: NetworkCollector::new(network_sample),
            temperature: TemperatureCollector::new(),
        }
    }

    pub fn collect(&mut self, disk_mount: &str) -> Stats {
        let (memory, swap) = self.memory.collect();
        let throughput = self.network.throughput();

        Stats {
            cpu: CpuStats {
                usage: self.cpu.usage().unwrap_or_else(not_available),
                temperature: self
                    .temperature
                    .cpu_temperature()
                    .unwrap_or_else(not_available),
                cores: self.cpu.logical_cores().unwrap_or_else(not_available),
            },
            memory,
            swap,
            disk: self.disk.collect(disk_mount).unwrap_or_default(),
            network: NetworkStats {
                download: throughput
                    .as_ref()
                    .map(|t| t.download.clone())
                    .unwrap_or_else(not_available),
                upload: throughput
                    .map(|t| t.upload)
                    .unwrap_or_else(not_available),
                active: self
                    .network
                    .busiest_interface()
                    .unwrap_or_else(not_available),
            },
        }
    }
}
