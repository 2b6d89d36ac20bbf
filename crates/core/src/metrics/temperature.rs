use crate::format;
use sysinfo::Components;

pub struct TemperatureCollector {
    components: Components,
}

impl TemperatureCollector {
    pub fn new() -> Self {
        Self {
            components: Components::new_with_refreshed_list(),
        }
    }

    /// Hottest CPU-labelled sensor, or the hottest sensor of any kind
    pub fn cpu_temperature(&mut self) -> Option<String> {
        self.components.refresh();

        let mut readings = Vec::new();
        for component in &self.components {
            let temp = component.temperature();
            if temp.is_finite() && temp > 0.0 {
                readings.push((component.label().to_lowercase(), temp));
            }
        }

        hottest(readings.iter().filter(|(label, _)| is_cpu_sensor(label)).map(|(_, t)| *t))
            .or_else(|| hottest(readings.iter().map(|(_, t)| *t)))
            .map(format::celsius)
    }
}

fn hottest(temps: impl Iterator<Item = f32>) -> Option<f32> {
    temps.max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}

fn is_cpu_sensor(label: &str) -> bool {
    ["cpu", "core", "package", "k10temp", "tctl", "soc"]
        .iter()
        .any(|needle| label.contains(needle))
}

impl Default for TemperatureCollector {
    fn default() -> Self {
        Self::new()
    }
}
