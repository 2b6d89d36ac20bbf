use crate::format;
use sysinfo::{System, MINIMUM_CPU_UPDATE_INTERVAL};

pub struct CpuCollector {
    sys: System,
    primed: bool,
}

impl CpuCollector {
    pub fn new() -> Self {
        Self {
            sys: System::new(),
            primed: false,
        }
    }

    /// Take the baseline measurement that usage is computed against.
    /// Blocks for sysinfo's minimum update interval.
    pub fn init(&mut self) {
        self.sys.refresh_cpu();
        std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
        self.primed = true;
    }

    /// Overall usage across all cores since the previous call
    pub fn usage(&mut self) -> Option<String> {
        if !self.primed {
            self.init();
        }
        self.sys.refresh_cpu();
        if self.sys.cpus().is_empty() {
            return None;
        }
        Some(format::cpu_percent(self.sys.global_cpu_info().cpu_usage()))
    }

    pub fn logical_cores(&mut self) -> Option<String> {
        if self.sys.cpus().is_empty() {
            self.sys.refresh_cpu();
        }
        match self.sys.cpus().len() {
            0 => None,
            n => Some(n.to_string()),
        }
    }

    pub fn physical_cores(&self) -> Option<String> {
        self.sys.physical_core_count().map(|n| n.to_string())
    }
}

impl Default for CpuCollector {
    fn default() -> Self {
        Self::new()
    }
}
