//! Reduction of a sample window to mean and peak metrics.

use crate::model::{ResourceMetrics, ResourceSample};

/// Field-by-field arithmetic mean. Throttling is OR-reduced.
///
/// An empty window yields zeros with `sample_count = 0`.
pub fn average(samples: &[ResourceSample], duration_secs: f64) -> ResourceMetrics {
    let mut m = ResourceMetrics {
        monitoring_duration_seconds: duration_secs,
        sample_count: samples.len(),
        ..Default::default()
    };
    if samples.is_empty() {
        return m;
    }

    for s in samples {
        m.cpu_usage_percent += s.cpu_usage_percent;
        m.cpu_frequency_mhz += s.cpu_frequency_mhz;
        m.thermal_throttling_detected |= s.thermal_throttling;
        m.cpu_temperature_c += s.cpu_temperature_c;
        m.memory_used_mb += s.memory_used_mb;
        m.memory_available_mb += s.memory_available_mb;
        m.memory_usage_percent += s.memory_usage_percent;
        m.disk_read_mbps += s.disk_read_mbps;
        m.disk_write_mbps += s.disk_write_mbps;
        m.disk_operations += s.disk_operations as f64;
        m.io_wait_percent += s.io_wait_percent;
        m.network_rx_mbps += s.network_rx_mbps;
        m.network_tx_mbps += s.network_tx_mbps;
        m.tcp_retransmit_percent += s.tcp_retransmit_percent;
        m.load_average_1min += s.load_average_1min;
        m.load_average_5min += s.load_average_5min;
        m.active_processes += f64::from(s.active_processes);
    }

    let n = samples.len() as f64;
    m.cpu_usage_percent /= n;
    m.cpu_frequency_mhz /= n;
    m.cpu_temperature_c /= n;
    m.memory_used_mb /= n;
    m.memory_available_mb /= n;
    m.memory_usage_percent /= n;
    m.disk_read_mbps /= n;
    m.disk_write_mbps /= n;
    m.disk_operations /= n;
    m.io_wait_percent /= n;
    m.network_rx_mbps /= n;
    m.network_tx_mbps /= n;
    m.tcp_retransmit_percent /= n;
    m.load_average_1min /= n;
    m.load_average_5min /= n;
    m.active_processes /= n;

    m.per_core_usage_percent = per_core(samples, |acc, v| acc + v)
        .into_iter()
        .map(|(sum, count)| if count == 0 { 0.0 } else { sum / count as f64 })
        .collect();
    m
}

/// Field-by-field maximum. Throttling is OR-reduced.
///
/// An empty window yields zeros with `sample_count = 0`.
pub fn peak(samples: &[ResourceSample], duration_secs: f64) -> ResourceMetrics {
    let mut m = ResourceMetrics {
        monitoring_duration_seconds: duration_secs,
        sample_count: samples.len(),
        ..Default::default()
    };

    for s in samples {
        m.cpu_usage_percent = m.cpu_usage_percent.max(s.cpu_usage_percent);
        m.cpu_frequency_mhz = m.cpu_frequency_mhz.max(s.cpu_frequency_mhz);
        m.thermal_throttling_detected |= s.thermal_throttling;
        m.cpu_temperature_c = m.cpu_temperature_c.max(s.cpu_temperature_c);
        m.memory_used_mb = m.memory_used_mb.max(s.memory_used_mb);
        m.memory_available_mb = m.memory_available_mb.max(s.memory_available_mb);
        m.memory_usage_percent = m.memory_usage_percent.max(s.memory_usage_percent);
        m.disk_read_mbps = m.disk_read_mbps.max(s.disk_read_mbps);
        m.disk_write_mbps = m.disk_write_mbps.max(s.disk_write_mbps);
        m.disk_operations = m.disk_operations.max(s.disk_operations as f64);
        m.io_wait_percent = m.io_wait_percent.max(s.io_wait_percent);
        m.network_rx_mbps = m.network_rx_mbps.max(s.network_rx_mbps);
        m.network_tx_mbps = m.network_tx_mbps.max(s.network_tx_mbps);
        m.tcp_retransmit_percent = m.tcp_retransmit_percent.max(s.tcp_retransmit_percent);
        m.load_average_1min = m.load_average_1min.max(s.load_average_1min);
        m.load_average_5min = m.load_average_5min.max(s.load_average_5min);
        m.active_processes = m.active_processes.max(f64::from(s.active_processes));
    }

    m.per_core_usage_percent = per_core(samples, f64::max)
        .into_iter()
        .map(|(value, _)| value)
        .collect();
    m
}

/// Folds per-core values by core index. Cores missing from a sample are
/// skipped for that sample rather than counted as zero.
fn per_core(samples: &[ResourceSample], fold: impl Fn(f64, f64) -> f64) -> Vec<(f64, usize)> {
    let cores = samples
        .iter()
        .map(|s| s.per_core_usage_percent.len())
        .max()
        .unwrap_or(0);
    let mut out = vec![(0.0, 0usize); cores];
    for s in samples {
        for (slot, value) in out.iter_mut().zip(&s.per_core_usage_percent) {
            slot.0 = fold(slot.0, *value);
            slot.1 += 1;
        }
    }
    out
}
