use super::{field_or_na, Collector, CollectorOptions, LazyMetrics};
use crate::{
    command::CommandRunner,
    error::{CoreError, Result},
    metrics::SystemCollector,
    model::Stats,
};
use tracing::debug;

pub struct MacosCollector {
    runner: CommandRunner,
    metrics: LazyMetrics,
}

impl MacosCollector {
    pub fn new(options: &CollectorOptions) -> Self {
        Self {
            runner: CommandRunner::new(options.command_timeout),
            metrics: LazyMetrics::new(options.network_sample),
        }
    }

    fn default_route_interface(&self) -> Result<String> {
        let out = self.runner.run("route", &["-n", "get", "default"])?;
        route_interface(&out)
            .ok_or_else(|| CoreError::field("network.active", "no default route"))
    }
}

impl Collector for MacosCollector {
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
        field_or_na(
            "osName",
            self.runner
                .run("sw_vers", &["-productName"])
                .or_else(|e| SystemCollector::os_name().ok_or(e)),
        )
    }

    fn os_version(&self) -> String {
        field_or_na(
            "osVersion",
            self.runner
                .run("sw_vers", &["-productVersion"])
                .or_else(|e| SystemCollector::os_version().ok_or(e)),
        )
    }

    fn kernel(&self) -> Option<String> {
        self.runner
            .run("uname", &["-r"])
            .ok()
            .or_else(SystemCollector::kernel)
    }

    fn stats(&self) -> Result<Stats> {
        let mut stats = self.metrics.with(|metrics| metrics.collect("/"));

        match self.default_route_interface() {
            Ok(name) => stats.network.active = name,
            Err(e) => debug!(error = %e, "route lookup failed, keeping busiest interface"),
        }

        Ok(stats)
    }
}

fn route_interface(out: &str) -> Option<String> {
    out.lines().find_map(|line| {
        let value = line.trim().strip_prefix("interface:")?.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}
