//! Sample and aggregate data types produced by the monitor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One point-in-time snapshot taken by the sampler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    /// Seconds since the monitoring session started.
    pub timestamp_s: f64,
    pub cpu_usage_percent: f64,
    pub per_core_usage_percent: Vec<f64>,
    pub cpu_frequency_mhz: f64,
    pub thermal_throttling: bool,
    /// 0 when no sensor is available.
    pub cpu_temperature_c: f64,
    pub memory_used_mb: f64,
    pub memory_available_mb: f64,
    pub memory_usage_percent: f64,
    pub disk_read_mbps: f64,
    pub disk_write_mbps: f64,
    pub disk_operations: u64,
    pub network_rx_mbps: f64,
    pub network_tx_mbps: f64,
    pub tcp_retransmit_percent: f64,
    pub load_average_1min: f64,
    pub load_average_5min: f64,
    pub active_processes: u32,
    pub io_wait_percent: f64,
}

/// Mean or peak over a window of samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetrics {
    pub cpu_usage_percent: f64,
    #[serde(default)]
    pub per_core_usage_percent: Vec<f64>,
    pub cpu_frequency_mhz: f64,
    /// True if any sample in the window saw throttling.
    #[serde(rename = "thermal_throttling")]
    pub thermal_throttling_detected: bool,
    #[serde(default)]
    pub cpu_temperature_c: f64,
    pub memory_used_mb: f64,
    #[serde(default)]
    pub memory_available_mb: f64,
    pub memory_usage_percent: f64,
    pub disk_read_mbps: f64,
    pub disk_write_mbps: f64,
    #[serde(default)]
    pub disk_operations: f64,
    pub io_wait_percent: f64,
    pub network_rx_mbps: f64,
    pub network_tx_mbps: f64,
    #[serde(default)]
    pub tcp_retransmit_percent: f64,
    pub load_average_1min: f64,
    pub load_average_5min: f64,
    pub active_processes: f64,
    pub monitoring_duration_seconds: f64,
    pub sample_count: usize,
}

impl ResourceMetrics {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Flat numeric view for report renderers; booleans map to 0/1.
    pub fn to_flat_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("cpu_usage_percent", self.cpu_usage_percent),
            ("cpu_frequency_mhz", self.cpu_frequency_mhz),
            (
                "thermal_throttling",
                if self.thermal_throttling_detected { 1.0 } else { 0.0 },
            ),
            ("cpu_temperature_c", self.cpu_temperature_c),
            ("memory_used_mb", self.memory_used_mb),
            ("memory_available_mb", self.memory_available_mb),
            ("memory_usage_percent", self.memory_usage_percent),
            ("disk_read_mbps", self.disk_read_mbps),
            ("disk_write_mbps", self.disk_write_mbps),
            ("disk_operations", self.disk_operations),
            ("io_wait_percent", self.io_wait_percent),
            ("network_rx_mbps", self.network_rx_mbps),
            ("network_tx_mbps", self.network_tx_mbps),
            ("tcp_retransmit_percent", self.tcp_retransmit_percent),
            ("load_average_1min", self.load_average_1min),
            ("load_average_5min", self.load_average_5min),
            ("active_processes", self.active_processes),
            (
                "monitoring_duration_seconds",
                self.monitoring_duration_seconds,
            ),
            ("sample_count", self.sample_count as f64),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> ResourceMetrics {
        ResourceMetrics {
            cpu_usage_percent: 42.5,
            per_core_usage_percent: vec![40.0, 45.0],
            cpu_frequency_mhz: 3200.0,
            thermal_throttling_detected: true,
            memory_used_mb: 8192.0,
            memory_usage_percent: 50.0,
            disk_read_mbps: 12.25,
            io_wait_percent: 3.5,
            load_average_1min: 1.5,
            monitoring_duration_seconds: 10.0,
            sample_count: 40,
            ..Default::default()
        }
    }

    #[test]
    fn test_json_uses_stable_keys() {
        let value: serde_json::Value = serde_json::from_str(&metrics().to_json().unwrap()).unwrap();
        for key in [
            "cpu_usage_percent",
            "cpu_frequency_mhz",
            "thermal_throttling",
            "memory_used_mb",
            "memory_usage_percent",
            "disk_read_mbps",
            "disk_write_mbps",
            "io_wait_percent",
            "network_rx_mbps",
            "network_tx_mbps",
            "load_average_1min",
            "load_average_5min",
            "active_processes",
            "monitoring_duration_seconds",
            "sample_count",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(value["thermal_throttling"], serde_json::Value::Bool(true));
    }

    #[test]
    fn test_json_reparse_preserves_values() {
        let original = metrics();
        let parsed: ResourceMetrics = serde_json::from_str(&original.to_json().unwrap()).unwrap();
        assert!((parsed.cpu_usage_percent - original.cpu_usage_percent).abs() < 1e-9);
        assert!((parsed.disk_read_mbps - original.disk_read_mbps).abs() < 1e-9);
        assert_eq!(parsed.sample_count, 40);
        assert!(parsed.thermal_throttling_detected);
    }

    #[test]
    fn test_flat_map() {
        let flat = metrics().to_flat_map();
        assert_eq!(flat["thermal_throttling"], 1.0);
        assert_eq!(flat["sample_count"], 40.0);
        assert_eq!(flat["cpu_usage_percent"], 42.5);
    }
}
