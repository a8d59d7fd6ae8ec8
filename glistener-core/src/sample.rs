use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One device's measurement at one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSample {
    pub device_id: u32,
    pub uuid: String,
    pub utilization_fraction: f64, // 0.0 - 1.0
    pub memory_total_mb: f64,
    pub memory_used_mb: f64,
    pub memory_free_mb: f64,
    pub driver_version: String,
    pub name: String,
    pub serial: String,
    pub display_mode: String,
    pub display_active: String,
    pub temperature_c: f64,
}

impl DeviceSample {
    /// Fraction of device memory in use, NaN when the total is zero or unknown
    pub fn memory_utilization_fraction(&self) -> f64 {
        if self.memory_total_mb == 0.0 {
            return f64::NAN;
        }
        self.memory_used_mb / self.memory_total_mb
    }
}

/// One synchronized round of measurements across all devices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Offset from the start of the run, stamped by the scheduler
    pub elapsed: Duration,
    pub devices: Vec<DeviceSample>,
}

impl Tick {
    pub fn new(devices: Vec<DeviceSample>) -> Self {
        Self {
            elapsed: Duration::ZERO,
            devices,
        }
    }

    pub fn width(&self) -> usize {
        self.devices.len()
    }

    pub fn uuids(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.uuid.clone()).collect()
    }
}

/// The ordered ticks collected during one invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    ticks: Vec<Tick>,
}

impl Run {
    pub fn new(ticks: Vec<Tick>) -> Self {
        Self { ticks }
    }

    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Width of the first tick
    pub fn device_count(&self) -> usize {
        self.ticks.first().map(Tick::width).unwrap_or(0)
    }

    fn first_device(&self) -> Option<&DeviceSample> {
        self.ticks.first().and_then(|t| t.devices.first())
    }

    pub fn device_name(&self) -> Option<&str> {
        self.first_device().map(|d| d.name.as_str())
    }

    pub fn driver_version(&self) -> Option<&str> {
        self.first_device().map(|d| d.driver_version.as_str())
    }

    pub fn into_ticks(self) -> Vec<Tick> {
        self.ticks
    }
}

#[cfg(test)]
pub(crate) fn sample(device_id: u32, uuid: &str, utilization: f64) -> DeviceSample {
    DeviceSample {
        device_id,
        uuid: uuid.to_string(),
        utilization_fraction: utilization,
        memory_total_mb: 16384.0,
        memory_used_mb: 1024.0,
        memory_free_mb: 15360.0,
        driver_version: "535.104.05".to_string(),
        name: "Tesla T4".to_string(),
        serial: "1321020022261".to_string(),
        display_mode: "Disabled".to_string(),
        display_active: "Disabled".to_string(),
        temperature_c: 40.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_utilization() {
        let mut s = sample(0, "GPU-a", 0.5);
        s.memory_used_mb = 4096.0;
        assert_eq!(s.memory_utilization_fraction(), 0.25);

        s.memory_total_mb = 0.0;
        assert!(s.memory_utilization_fraction().is_nan());
    }

    #[test]
    fn test_run_metadata() {
        let run = Run::new(vec![
            Tick::new(vec![sample(0, "GPU-a", 0.1), sample(1, "GPU-b", 0.2)]),
            Tick::new(vec![sample(0, "GPU-a", 0.3), sample(1, "GPU-b", 0.4)]),
        ]);
        assert_eq!(run.len(), 2);
        assert_eq!(run.device_count(), 2);
        assert_eq!(run.device_name(), Some("Tesla T4"));
        assert_eq!(run.driver_version(), Some("535.104.05"));

        let empty = Run::default();
        assert!(empty.is_empty());
        assert_eq!(empty.device_count(), 0);
        assert_eq!(empty.device_name(), None);
    }
}
