use crate::{format, model::UsageStats};
use std::path::Path;
use sysinfo::{Disk, Disks};

pub struct DiskCollector {
    disks: Disks,
}

impl DiskCollector {
    pub fn new() -> Self {
        Self {
            disks: Disks::new(),
        }
    }

    /// Usage of the volume mounted at `mount_point`, falling back to the
    /// largest volume when nothing is mounted there
    pub fn collect(&mut self, mount_point: &str) -> Option<UsageStats> {
        self.disks.refresh_list();

        let target = Path::new(mount_point);
        let disk = self
            .disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == target)
            .or_else(|| self.disks.list().iter().max_by_key(|disk| disk.total_space()))?;

        usage_of(disk)
    }
}

fn usage_of(disk: &Disk) -> Option<UsageStats> {
    let total = disk.total_space();
    if total == 0 {
        return None;
    }
    let used = total.saturating_sub(disk.available_space());
    Some(UsageStats {
        used: format::gigabytes(used),
        total: format::gigabytes(total),
        usage: format::percent(used, total),
    })
}

impl Default for DiskCollector {
    fn default() -> Self {
        Self::new()
    }
}
