use crate::{format, model::UsageStats};
use sysinfo::System;

pub struct MemoryCollector {
    sys: System,
}

impl MemoryCollector {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }

    /// Returns `(memory, swap)`
    pub fn collect(&mut self) -> (UsageStats, UsageStats) {
        self.sys.refresh_memory();

        let total = self.sys.total_memory();
        let memory = if total == 0 {
            // sysinfo reports zero when it could not read the platform counters
            UsageStats::default()
        } else {
            let used = self.sys.used_memory();
            UsageStats {
                used: format::megabytes(used),
                total: format::megabytes(total),
                usage: format::percent(used, total),
            }
        };

        // No swap configured is a valid reading, not a missing one
        let swap_total = self.sys.total_swap();
        let swap_used = self.sys.used_swap();
        let swap = UsageStats {
            used: format::megabytes(swap_used),
            total: format::megabytes(swap_total),
            usage: format::percent(swap_used, swap_total),
        };

        (memory, swap)
    }
}

impl Default for MemoryCollector {
    fn default() -> Self {
        Self::new()
    }
}
