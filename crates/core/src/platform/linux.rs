use super::{field_or_na, Collector, CollectorOptions, LazyMetrics};
use crate::{
    command::CommandRunner,
    error::{CoreError, Result},
    format,
    metrics::SystemCollector,
    model::Stats,
};
use serde::Deserialize;
use std::fs;
use tracing::debug;

const OS_RELEASE: &str = "/etc/os-release";
const THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

pub struct LinuxCollector {
    runner: CommandRunner,
    metrics: LazyMetrics,
}

/// Subset of one entry of `ip -j address`
#[derive(Debug, Deserialize)]
struct IpInterface {
    ifname: Option<String>,
    operstate: Option<String>,
}

impl LinuxCollector {
    pub fn new(options: &CollectorOptions) -> Self {
        Self {
            runner: CommandRunner::new(options.command_timeout),
            metrics: LazyMetrics::new(options.network_sample),
        }
    }

    /// `lsb_release` first, `/etc/os-release` second
    fn distro_field(&self, lsb_flag: &str, os_release_key: &str, field: &'static str) -> Result<String> {
        match self.runner.run("lsb_release", &[lsb_flag]) {
            Ok(out) => Ok(out.replace('"', "").trim().to_string()),
            Err(e) => {
                debug!(error = %e, "lsb_release unavailable, reading {}", OS_RELEASE);
                let contents = fs::read_to_string(OS_RELEASE)?;
                os_release_value(&contents, os_release_key)
                    .ok_or_else(|| CoreError::field(field, format!("{} missing from {}", os_release_key, OS_RELEASE)))
            }
        }
    }

    fn active_interface(&self) -> Result<String> {
        let out = self.runner.run("ip", &["-j", "address"])?;
        first_up_interface(&out)?
            .ok_or_else(|| CoreError::field("network.active", "no interface is UP"))
    }
}

impl Collector for LinuxCollector {
    fn architecture(&self) -> String {
        field_or_na(
            "architecture",
            self.runner
                .run("uname", &["-m"])
                .or_else(|e| SystemCollector::architecture().ok_or(e)),
        )
    }

    fn platform(&self) -> String {
        field_or_na("platform", self.runner.run("uname", &["-s"]))
    }

    fn os_name(&self) -> String {
        field_or_na("osName", self.distro_field("-ds", "PRETTY_NAME", "osName"))
    }

    fn os_version(&self) -> String {
        field_or_na("osVersion", self.distro_field("-rs", "VERSION_ID", "osVersion"))
    }

    fn kernel(&self) -> Option<String> {
        self.runner
            .run("uname", &["-r"])
            .ok()
            .or_else(SystemCollector::kernel)
    }

    fn stats(&self) -> Result<Stats> {
        let mut stats = self.metrics.with(|metrics| metrics.collect("/"));

        // The first thermal zone is what most SBCs and laptops expose for the CPU
        match read_thermal_zone() {
            Ok(temp) => stats.cpu.temperature = temp,
            Err(e) => debug!(error = %e, "thermal zone unavailable, keeping sensor reading"),
        }
        let nproc: &[&str] = &[];
        let getconf: &[&str] = &["_NPROCESSORS_ONLN"];
        if let Ok(cores) = self
            .runner
            .first_success(&[("nproc", nproc), ("getconf", getconf)])
        {
            stats.cpu.cores = cores;
        }
        match self.active_interface() {
            Ok(name) => stats.network.active = name,
            Err(e) => debug!(error = %e, "ip address query failed, keeping busiest interface"),
        }

        Ok(stats)
    }
}

fn read_thermal_zone() -> Result<String> {
    let raw = fs::read_to_string(THERMAL_ZONE)?;
    let millidegrees: i64 = raw
        .trim()
        .parse()
        .map_err(|_| CoreError::field("cpu.temperature", format!("unexpected value {:?}", raw.trim())))?;
    Ok(format::celsius(millidegrees as f32 / 1000.0))
}

/// Value of `key` in os-release(5) contents, with optional quoting removed
fn os_release_value(contents: &str, key: &str) -> Option<String> {
    contents.lines().find_map(|line| {
        let (k, v) = line.split_once('=')?;
        if k.trim() != key {
            return None;
        }
        let value = v.trim().trim_matches('"').trim_matches('\'').to_string();
        (!value.is_empty()).then_some(value)
    })
}

fn first_up_interface(ip_json: &str) -> Result<Option<String>> {
    let interfaces: Vec<IpInterface> = serde_json::from_str(ip_json)?;
    Ok(interfaces
        .into_iter()
        .filter(|iface| iface.operstate.as_deref() == Some("UP"))
        .find_map(|iface| iface.ifname))
}
