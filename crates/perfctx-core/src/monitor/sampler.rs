//! One sampling tick: read counters, account deltas, build a sample.

use std::collections::BTreeSet;
use std::io;
use std::time::{Duration, Instant};

use tracing::{info, trace, warn};

use super::reader::ReadWorker;
use crate::collector::{CounterSource, RawReadings};
use crate::config::MonitorConfig;
use crate::model::ResourceSample;
use crate::rates::{DeltaAccountant, TickRates};

const KB_PER_MB: f64 = 1024.0;

/// Per-session sampling state. Created fresh for every monitoring session,
/// so no delta baseline survives from one session to the next.
pub struct Sampler {
    reader: ReadWorker,
    accountant: DeltaAccountant,
    read_timeout: Duration,
    thermal_limit_c: f64,
    started: Instant,
    /// Families whose last read failed, for logging transitions only once.
    failing: BTreeSet<&'static str>,
}

impl Sampler {
    pub fn new(
        source: Box<dyn CounterSource + Send>,
        config: &MonitorConfig,
        started: Instant,
    ) -> io::Result<Self> {
        Ok(Self {
            reader: ReadWorker::spawn(source, config.families)?,
            accountant: DeltaAccountant::new(),
            read_timeout: config.read_timeout,
            thermal_limit_c: config.thresholds.thermal_celsius,
            started,
            failing: BTreeSet::new(),
        })
    }

    /// Baseline read that seeds the delta state. Nothing is recorded.
    pub fn prime(&mut self) {
        if let Some((at, raw)) = self.read() {
            self.accountant.account(&raw, at);
        }
    }

    /// Takes one sample.
    ///
    /// A read that misses the timeout yields an all-zero sample stamped with
    /// the current time; delta baselines are kept, so the next good tick
    /// reports the rate over the whole gap.
    pub fn sample_once(&mut self) -> ResourceSample {
        let Some((at, raw)) = self.read() else {
            warn!(timeout_ms = self.read_timeout.as_millis() as u64, "counter read timed out");
            return ResourceSample {
                timestamp_s: self.elapsed(Instant::now()),
                ..Default::default()
            };
        };

        let rates = self.accountant.account(&raw, at);
        let sample = build_sample(self.elapsed(at), &raw, &rates, self.thermal_limit_c);
        trace!(
            t = sample.timestamp_s,
            cpu = sample.cpu_usage_percent,
            mem = sample.memory_usage_percent,
            "sample"
        );
        sample
    }

    fn read(&mut self) -> Option<(Instant, RawReadings)> {
        let reading = self.reader.read(self.read_timeout)?;
        self.track_failures(&reading.1);
        Some(reading)
    }

    fn track_failures(&mut self, raw: &RawReadings) {
        let now_failing: BTreeSet<&'static str> = raw.failed.iter().map(|(f, _)| *f).collect();
        for (family, error) in &raw.failed {
            if !self.failing.contains(family) {
                warn!(family, %error, "counter family unavailable, recording zeros");
            }
        }
        for family in self.failing.difference(&now_failing) {
            info!(family, "counter family recovered");
        }
        self.failing = now_failing;
    }

    fn elapsed(&self, at: Instant) -> f64 {
        at.saturating_duration_since(self.started).as_secs_f64()
    }
}

/// Combines absolute readings and per-tick rates into one sample.
pub fn build_sample(
    timestamp_s: f64,
    raw: &RawReadings,
    rates: &TickRates,
    thermal_limit_c: f64,
) -> ResourceSample {
    let mut sample = ResourceSample {
        timestamp_s,
        cpu_usage_percent: rates.cpu_usage_percent,
        per_core_usage_percent: rates.per_core_usage_percent.clone(),
        cpu_frequency_mhz: raw.frequency_mhz.unwrap_or(0.0),
        disk_read_mbps: rates.disk_read_mbps,
        disk_write_mbps: rates.disk_write_mbps,
        disk_operations: rates.disk_operations,
        network_rx_mbps: rates.network_rx_mbps,
        network_tx_mbps: rates.network_tx_mbps,
        tcp_retransmit_percent: rates.tcp_retransmit_percent,
        io_wait_percent: rates.io_wait_percent,
        ..Default::default()
    };

    if let Some(mem) = raw.memory {
        let available = mem.mem_available_kb.min(mem.mem_total_kb);
        let used = mem.mem_total_kb - available;
        sample.memory_used_mb = used as f64 / KB_PER_MB;
        sample.memory_available_mb = available as f64 / KB_PER_MB;
        sample.memory_usage_percent = used as f64 / mem.mem_total_kb as f64 * 100.0;
    }

    if let Some(load) = raw.load {
        sample.load_average_1min = load.load1;
        sample.load_average_5min = load.load5;
        sample.active_processes = load.total;
    }

    if let Some(thermal) = raw.thermal {
        let temp = thermal.temperature_c.unwrap_or(0.0);
        sample.cpu_temperature_c = temp;
        sample.thermal_throttling = temp > thermal_limit_c || rates.throttle_events > 0;
    }

    sample
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::parser::{LoadAvg, MemInfo};
    use crate::collector::{MockFs, ProcfsSource, ThermalReading};

    #[test]
    fn test_build_sample_memory_and_load() {
        let raw = RawReadings {
            memory: Some(MemInfo {
                mem_total_kb: 16 * 1024 * 1024,
                mem_free_kb: 0,
                mem_available_kb: 4 * 1024 * 1024,
            }),
            load: Some(LoadAvg {
                load1: 1.5,
                load5: 1.0,
                load15: 0.5,
                running: 2,
                total: 321,
            }),
            ..Default::default()
        };
        let sample = build_sample(1.0, &raw, &TickRates::default(), 85.0);
        assert_eq!(sample.memory_used_mb, 12.0 * 1024.0);
        assert_eq!(sample.memory_available_mb, 4.0 * 1024.0);
        assert!((sample.memory_usage_percent - 75.0).abs() < 1e-9);
        assert_eq!(sample.active_processes, 321);
        assert_eq!(sample.load_average_5min, 1.0);
    }

    #[test]
    fn test_build_sample_thermal() {
        let hot = RawReadings {
            thermal: Some(ThermalReading {
                temperature_c: Some(90.0),
                throttle_count: None,
            }),
            ..Default::default()
        };
        assert!(build_sample(0.0, &hot, &TickRates::default(), 85.0).thermal_throttling);

        let cool = RawReadings {
            thermal: Some(ThermalReading {
                temperature_c: Some(50.0),
                throttle_count: Some(10),
            }),
            ..Default::default()
        };
        assert!(!build_sample(0.0, &cool, &TickRates::default(), 85.0).thermal_throttling);

        let events = TickRates {
            throttle_events: 2,
            ..Default::default()
        };
        assert!(build_sample(0.0, &cool, &events, 85.0).thermal_throttling);
    }

    #[test]
    fn test_missing_families_are_zero() {
        let sample = build_sample(2.0, &RawReadings::default(), &TickRates::default(), 85.0);
        assert_eq!(
            sample,
            ResourceSample {
                timestamp_s: 2.0,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_sampler_with_mock_procfs() {
        let source = ProcfsSource::new(MockFs::typical_system(), "/proc", "/sys");
        let config = MonitorConfig {
            read_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let mut sampler = Sampler::new(Box::new(source), &config, Instant::now()).unwrap();
        sampler.prime();

        // Counters did not move: rates are zero, absolute values are real.
        let sample = sampler.sample_once();
        assert_eq!(sample.cpu_usage_percent, 0.0);
        assert_eq!(sample.per_core_usage_percent.len(), 4);
        assert!(sample.memory_usage_percent > 20.0 && sample.memory_usage_percent < 30.0);
        assert!((sample.cpu_frequency_mhz - 2400.0).abs() < 1e-6);
        assert!((sample.cpu_temperature_c - 45.0).abs() < 1e-9);
        assert!(!sample.thermal_throttling);
        assert_eq!(sample.active_processes, 150);
    }
}
