//! Human-readable renderings for the string fields of [`Stats`](crate::model::Stats).

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Whole-number percentage, `"0%"` when the total is zero
pub fn percent(used: u64, total: u64) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.0}%", used as f64 / total as f64 * 100.0)
}

/// CPU usage keeps one decimal, the way `top` reports it
pub fn cpu_percent(usage: f32) -> String {
    format!("{:.1}%", usage.clamp(0.0, 100.0))
}

pub fn megabytes(bytes: u64) -> String {
    format!("{:.0} MB", bytes as f64 / MIB)
}

pub fn gigabytes(bytes: u64) -> String {
    format!("{:.1} GB", bytes as f64 / GIB)
}

pub fn celsius(degrees: f32) -> String {
    format!("{:.1}°C", degrees)
}

pub fn rate(bytes_per_sec: f64) -> String {
    if bytes_per_sec >= MIB {
        format!("{:.1} MB/s", bytes_per_sec / MIB)
    } else if bytes_per_sec >= KIB {
        format!("{:.1} KB/s", bytes_per_sec / KIB)
    } else {
        format!("{:.0} B/s", bytes_per_sec)
    }
}
