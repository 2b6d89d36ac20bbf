use sysinfo::System;

/// Identity facts sysinfo can provide without shelling out. Used by the
/// platform collectors when their preferred utility is unavailable.
pub struct SystemCollector;

impl SystemCollector {
    pub fn architecture() -> Option<String> {
        System::cpu_arch().filter(|arch| !arch.is_empty())
    }

    pub fn os_name() -> Option<String> {
        System::long_os_version()
            .or_else(System::name)
            .filter(|name| !name.is_empty())
    }

    pub fn os_version() -> Option<String> {
        System::os_version().filter(|version| !version.is_empty())
    }

    pub fn kernel() -> Option<String> {
        System::kernel_version().filter(|kernel| !kernel.is_empty())
    }
}
