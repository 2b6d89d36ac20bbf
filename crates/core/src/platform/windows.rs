use super::{field_or_na, Collector, CollectorOptions, LazyMetrics};
use crate::{
    command::CommandRunner,
    error::{CoreError, Result},
    metrics::SystemCollector,
    model::Stats,
};
use tracing::debug;

const ACTIVE_ADAPTER: &str =
    "Get-NetAdapter | Where-Object { $_.Status -eq 'Up' } | Select-Object -First 1 -ExpandProperty Name";

pub struct WindowsCollector {
    runner: CommandRunner,
    metrics: LazyMetrics,
}

impl WindowsCollector {
    pub fn new(options: &CollectorOptions) -> Self {
        Self {
            runner: CommandRunner::new(options.command_timeout),
            metrics: LazyMetrics::new(options.network_sample),
        }
    }

    /// `wmic os get <property>`, then the matching `systeminfo` line
    fn os_property(&self, wmic_property: &str, systeminfo_label: &str, field: &'static str) -> Result<String> {
        let wmic = self
            .runner
            .run("wmic", &["os", "get", wmic_property])
            .and_then(|out| {
                wmic_value(&out).ok_or_else(|| CoreError::field(field, "empty wmic output"))
            });
        match wmic {
            Ok(value) => Ok(value),
            Err(e) => {
                debug!(error = %e, "wmic unavailable, trying systeminfo");
                let out = self.runner.run("systeminfo", &[])?;
                systeminfo_value(&out, systeminfo_label)
                    .ok_or_else(|| CoreError::field(field, format!("{} not reported by systeminfo", systeminfo_label)))
            }
        }
    }
}

impl Collector for WindowsCollector {
    fn architecture(&self) -> String {
        SystemCollector::architecture().unwrap_or_else(|| std::env::consts::ARCH.to_string())
    }

    fn platform(&self) -> String {
        "win32".to_string()
    }

    fn os_name(&self) -> String {
        field_or_na("osName", self.os_property("Caption", "OS Name", "osName"))
    }

    fn os_version(&self) -> String {
        field_or_na("osVersion", self.os_property("Version", "OS Version", "osVersion"))
    }

    fn kernel(&self) -> Option<String> {
        SystemCollector::kernel()
    }

    fn stats(&self) -> Result<Stats> {
        let mut stats = self.metrics.with(|metrics| {
            let mut stats = metrics.collect("C:\\");
            // Windows reports cores the way Win32_Processor.NumberOfCores does
            if let Some(cores) = metrics.cpu.physical_cores() {
                stats.cpu.cores = cores;
            }
            stats
        });

        let adapter = self
            .runner
            .run("powershell", &["-NoProfile", "-Command", ACTIVE_ADAPTER])
            .and_then(|out| {
                first_line(&out).ok_or_else(|| CoreError::field("network.active", "no adapter is up"))
            });
        match adapter {
            Ok(name) => stats.network.active = name,
            Err(e) => debug!(error = %e, "Get-NetAdapter failed, keeping busiest interface"),
        }

        Ok(stats)
    }
}

fn first_line(out: &str) -> Option<String> {
    out.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// wmic prints a header line followed by the value
fn wmic_value(out: &str) -> Option<String> {
    out.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .nth(1)
        .map(str::to_string)
}

fn systeminfo_value(out: &str, label: &str) -> Option<String> {
    out.lines().find_map(|line| {
        let rest = line.trim_start().strip_prefix(label)?;
        let value = rest.trim_start().strip_prefix(':')?.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wmic_value_skips_header_and_blank_lines() {
        let out = "Caption\r\n\r\nMicrosoft Windows 11 Pro\r\n\r\n";
        assert_eq!(wmic_value(out).as_deref(), Some("Microsoft Windows 11 Pro"));
        assert_eq!(wmic_value("Caption\r\n"), None);
    }

    #[test]
    fn test_systeminfo_labels() {
        let out = "Host Name:                 DESKTOP-01\r\n\
                   OS Name:                   Microsoft Windows 10 Home\r\n\
                   OS Version:                10.0.19045 N/A Build 19045\r\n";
        assert_eq!(
            systeminfo_value(out, "OS Name").as_deref(),
            Some("Microsoft Windows 10 Home")
        );
        assert_eq!(
            systeminfo_value(out, "OS Version").as_deref(),
            Some("10.0.19045 N/A Build 19045")
        );
        assert_eq!(systeminfo_value(out, "BIOS Version"), None);
    }

    #[test]
    fn test_platform_is_stable_without_commands() {
        let collector = WindowsCollector::new(&CollectorOptions::default());
        assert_eq!(collector.platform(), "win32");
        assert!(!collector.architecture().is_empty());
    }
}
