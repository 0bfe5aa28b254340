//! Delta accounting: turns cumulative OS counters into per-tick rates.
//!
//! Every counter source (core id, block device, interface) keeps its own
//! previous snapshot. A rate exists only once the same source has been seen on
//! two consecutive ticks; regressions (wrap, device reset) clamp to zero.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

use crate::collector::parser::{CpuTimes, DiskCounters, NetCounters, TcpCounters};
use crate::collector::RawReadings;

const SECTOR_BYTES: f64 = 512.0;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

// ---------------------------------------------------------------------------
// Monotonic counters
// ---------------------------------------------------------------------------

/// A snapshot of monotonically increasing counters that can be turned into a
/// rate against an earlier snapshot of the same source.
pub trait Monotonic: Copy {
    type Rate: Copy + Default;

    /// `elapsed_secs` is always > 0.
    fn rate_since(&self, prev: &Self, elapsed_secs: f64) -> Self::Rate;
}

/// CPU busy and iowait shares over one interval, both in [0, 100].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuUsage {
    pub usage_percent: f64,
    pub iowait_percent: f64,
}

impl Monotonic for CpuTimes {
    type Rate = CpuUsage;

    fn rate_since(&self, prev: &Self, _elapsed_secs: f64) -> CpuUsage {
        let total = self.total().saturating_sub(prev.total());
        if total == 0 {
            return CpuUsage::default();
        }
        let active = self.active().saturating_sub(prev.active());
        let iowait = self.iowait.saturating_sub(prev.iowait);
        CpuUsage {
            usage_percent: percent(active, total),
            iowait_percent: percent(iowait, total),
        }
    }
}

/// Block device throughput.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiskRate {
    pub read_mbps: f64,
    pub write_mbps: f64,
    /// Reads plus writes completed during the interval.
    pub operations: u64,
}

impl Monotonic for DiskCounters {
    type Rate = DiskRate;

    fn rate_since(&self, prev: &Self, elapsed_secs: f64) -> DiskRate {
        let read_bytes = self.read_sectors.saturating_sub(prev.read_sectors) as f64 * SECTOR_BYTES;
        let write_bytes =
            self.write_sectors.saturating_sub(prev.write_sectors) as f64 * SECTOR_BYTES;
        DiskRate {
            read_mbps: read_bytes / BYTES_PER_MB / elapsed_secs,
            write_mbps: write_bytes / BYTES_PER_MB / elapsed_secs,
            operations: self.reads.saturating_sub(prev.reads)
                + self.writes.saturating_sub(prev.writes),
        }
    }
}

/// Interface throughput.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetRate {
    pub rx_mbps: f64,
    pub tx_mbps: f64,
}

impl Monotonic for NetCounters {
    type Rate = NetRate;

    fn rate_since(&self, prev: &Self, elapsed_secs: f64) -> NetRate {
        NetRate {
            rx_mbps: self.rx_bytes.saturating_sub(prev.rx_bytes) as f64
                / BYTES_PER_MB
                / elapsed_secs,
            tx_mbps: self.tx_bytes.saturating_sub(prev.tx_bytes) as f64
                / BYTES_PER_MB
                / elapsed_secs,
        }
    }
}

impl Monotonic for TcpCounters {
    /// Retransmitted segments as a percentage of segments sent.
    type Rate = f64;

    fn rate_since(&self, prev: &Self, _elapsed_secs: f64) -> f64 {
        let out = self.out_segs.saturating_sub(prev.out_segs);
        if out == 0 {
            return 0.0;
        }
        percent(self.retrans_segs.saturating_sub(prev.retrans_segs), out)
    }
}

/// Plain event counter, e.g. thermal throttle events. Rate is the raw delta.
impl Monotonic for u64 {
    type Rate = u64;

    fn rate_since(&self, prev: &Self, _elapsed_secs: f64) -> u64 {
        self.saturating_sub(*prev)
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    (part as f64 / whole as f64 * 100.0).clamp(0.0, 100.0)
}

// ---------------------------------------------------------------------------
// Per-source rate tracker
// ---------------------------------------------------------------------------

/// Previous-snapshot state for one family of counter sources.
#[derive(Debug)]
pub struct RateTracker<K, S> {
    prev_sample: HashMap<K, (S, Instant)>,
}

impl<K, S> Default for RateTracker<K, S> {
    fn default() -> Self {
        Self {
            prev_sample: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, S: Monotonic> RateTracker<K, S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `snap` for `id` and returns the rate against its previous
    /// snapshot.
    ///
    /// Returns `None` on the first observation of `id`, or when no time has
    /// passed since the previous one.
    pub fn update(&mut self, id: K, snap: S, at: Instant) -> Option<S::Rate> {
        let prev = self.prev_sample.insert(id, (snap, at));
        let (prev_snap, prev_at) = prev?;
        let elapsed = at.saturating_duration_since(prev_at).as_secs_f64();
        (elapsed > 0.0).then(|| snap.rate_since(&prev_snap, elapsed))
    }

    /// Updates with the full set of sources observed this tick.
    ///
    /// Sources absent from `items` lose their baseline, so one that
    /// reappears later counts as first seen. Each returned entry is `None`
    /// when no rate is available yet for that source.
    pub fn update_tick(
        &mut self,
        items: impl IntoIterator<Item = (K, S)>,
        at: Instant,
    ) -> Vec<(K, Option<S::Rate>)>
    where
        K: Clone,
    {
        let mut previous = std::mem::take(&mut self.prev_sample);
        let mut out = Vec::new();
        for (id, snap) in items {
            let rate = previous.remove(&id).and_then(|(prev_snap, prev_at)| {
                let elapsed = at.saturating_duration_since(prev_at).as_secs_f64();
                (elapsed > 0.0).then(|| snap.rate_since(&prev_snap, elapsed))
            });
            self.prev_sample.insert(id.clone(), (snap, at));
            out.push((id, rate));
        }
        out
    }

    pub fn len(&self) -> usize {
        self.prev_sample.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prev_sample.is_empty()
    }

    pub fn reset(&mut self) {
        self.prev_sample.clear();
    }
}

// ---------------------------------------------------------------------------
// Delta accountant
// ---------------------------------------------------------------------------

/// Rates derived from one tick of raw readings. Unavailable values are zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickRates {
    pub cpu_usage_percent: f64,
    /// Indexed by core id; a newly seen core reports 0.
    pub per_core_usage_percent: Vec<f64>,
    pub io_wait_percent: f64,
    pub disk_read_mbps: f64,
    pub disk_write_mbps: f64,
    pub disk_operations: u64,
    pub network_rx_mbps: f64,
    pub network_tx_mbps: f64,
    pub tcp_retransmit_percent: f64,
    /// Throttle events since the previous tick.
    pub throttle_events: u64,
}

/// Owns the previous-snapshot state of every counter family.
#[derive(Debug, Default)]
pub struct DeltaAccountant {
    cpu_total: RateTracker<(), CpuTimes>,
    cpu_cores: RateTracker<u32, CpuTimes>,
    disks: RateTracker<String, DiskCounters>,
    interfaces: RateTracker<String, NetCounters>,
    tcp: RateTracker<(), TcpCounters>,
    throttle: RateTracker<(), u64>,
}

impl DeltaAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts one tick of raw readings into rates.
    ///
    /// A family missing from `raw` counts as "no sources seen": its baseline
    /// is dropped and it reports zero until two good ticks follow.
    pub fn account(&mut self, raw: &RawReadings, at: Instant) -> TickRates {
        let mut rates = TickRates::default();

        let cpu = raw.cpu.as_ref();
        let total = self
            .cpu_total
            .update_tick(cpu.map(|c| ((), c.aggregate)), at);
        if let Some((_, Some(usage))) = total.first() {
            rates.cpu_usage_percent = usage.usage_percent;
            rates.io_wait_percent = usage.iowait_percent;
        }

        let cores = self
            .cpu_cores
            .update_tick(cpu.into_iter().flat_map(|c| c.cores.iter().copied()), at);
        if let Some(max_id) = cores.iter().map(|(id, _)| *id).max() {
            rates.per_core_usage_percent = vec![0.0; max_id as usize + 1];
            for (id, usage) in cores {
                rates.per_core_usage_percent[id as usize] =
                    usage.map(|u| u.usage_percent).unwrap_or(0.0);
            }
        }

        let disks = raw.disks.iter().flatten().cloned();
        for (_, rate) in self.disks.update_tick(disks, at) {
            let rate = rate.unwrap_or_default();
            rates.disk_read_mbps += rate.read_mbps;
            rates.disk_write_mbps += rate.write_mbps;
            rates.disk_operations += rate.operations;
        }

        let network = raw.network.as_ref();
        let interfaces = network.into_iter().flat_map(|n| n.interfaces.iter().cloned());
        for (_, rate) in self.interfaces.update_tick(interfaces, at) {
            let rate = rate.unwrap_or_default();
            rates.network_rx_mbps += rate.rx_mbps;
            rates.network_tx_mbps += rate.tx_mbps;
        }

        let tcp = network.and_then(|n| n.tcp).map(|t| ((), t));
        if let Some((_, Some(pct))) = self.tcp.update_tick(tcp, at).first() {
            rates.tcp_retransmit_percent = *pct;
        }

        let throttle = raw
            .thermal
            .and_then(|t| t.throttle_count)
            .map(|count| ((), count));
        if let Some((_, Some(events))) = self.throttle.update_tick(throttle, at).first() {
            rates.throttle_events = *events;
        }

        rates
    }

    /// Forgets every previous snapshot.
    pub fn reset(&mut self) {
        self.cpu_total.reset();
        self.cpu_cores.reset();
        self.disks.reset();
        self.interfaces.reset();
        self.tcp.reset();
        self.throttle.reset();
    }

    /// True when no family holds a baseline.
    pub fn is_empty(&self) -> bool {
        self.cpu_total.is_empty()
            && self.cpu_cores.is_empty()
            && self.disks.is_empty()
            && self.interfaces.is_empty()
            && self.tcp.is_empty()
            && self.throttle.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::parser::CpuStatLines;
    use crate::collector::NetworkReading;
    use std::time::Duration;

    fn cpu(user: u64, idle: u64, iowait: u64) -> CpuTimes {
        CpuTimes {
            user,
            idle,
            iowait,
            ..Default::default()
        }
    }

    fn disk(sectors: u64, ops: u64) -> DiskCounters {
        DiskCounters {
            reads: ops,
            read_sectors: sectors,
            writes: ops,
            write_sectors: sectors,
        }
    }

    #[test]
    fn test_first_observation_has_no_rate() {
        let mut tracker: RateTracker<&str, DiskCounters> = RateTracker::new();
        assert!(tracker.update("sda", disk(100, 1), Instant::now()).is_none());
    }

    #[test]
    fn test_identical_snapshots_yield_zero() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        tracker.update("sda", disk(1000, 10), t0);
        let rate = tracker
            .update("sda", disk(1000, 10), t0 + Duration::from_secs(1))
            .unwrap();
        assert_eq!(rate, DiskRate::default());
    }

    #[test]
    fn test_regression_clamps_to_zero() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        tracker.update("eth0", NetCounters { rx_bytes: 5_000_000, tx_bytes: 9_000_000 }, t0);
        let rate = tracker
            .update(
                "eth0",
                NetCounters {
                    rx_bytes: 100,
                    tx_bytes: 9_000_000 + 1024 * 1024,
                },
                t0 + Duration::from_secs(1),
            )
            .unwrap();
        assert_eq!(rate.rx_mbps, 0.0);
        assert!((rate.tx_mbps - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_elapsed_has_no_rate() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        tracker.update(0u32, cpu(10, 10, 0), t0);
        assert!(tracker.update(0u32, cpu(20, 20, 0), t0).is_none());
    }

    #[test]
    fn test_disk_rate_units() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        tracker.update("sda", disk(0, 0), t0);
        // 4096 sectors * 512 B = 2 MiB over 2 s.
        let rate = tracker
            .update("sda", disk(4096, 50), t0 + Duration::from_secs(2))
            .unwrap();
        assert!((rate.read_mbps - 1.0).abs() < 1e-9);
        assert!((rate.write_mbps - 1.0).abs() < 1e-9);
        assert_eq!(rate.operations, 100);
    }

    #[test]
    fn test_cpu_usage_and_iowait() {
        let prev = cpu(100, 100, 0);
        let curr = cpu(160, 120, 20);
        let usage = curr.rate_since(&prev, 0.25);
        assert!((usage.usage_percent - 60.0).abs() < 1e-9);
        assert!((usage.iowait_percent - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_cpu_no_ticks_is_zero() {
        let t = cpu(100, 100, 0);
        assert_eq!(t.rate_since(&t, 1.0), CpuUsage::default());
    }

    #[test]
    fn test_tcp_retransmit_percent() {
        let prev = TcpCounters { out_segs: 1000, retrans_segs: 10 };
        let curr = TcpCounters { out_segs: 2000, retrans_segs: 110 };
        assert!((curr.rate_since(&prev, 1.0) - 10.0).abs() < 1e-9);
        assert_eq!(prev.rate_since(&prev, 1.0), 0.0);
    }

    #[test]
    fn test_update_tick_drops_unseen_sources() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(1);
        let t2 = t1 + Duration::from_secs(1);

        tracker.update_tick(vec![("sda".to_string(), disk(0, 0)), ("sdb".to_string(), disk(0, 0))], t0);
        let second = tracker.update_tick(vec![("sda".to_string(), disk(2048, 1))], t1);
        assert_eq!(second.len(), 1);
        assert!(second[0].1.is_some());
        assert_eq!(tracker.len(), 1);

        // sdb returns with a much larger counter: first seen, no spurious spike.
        let third = tracker.update_tick(
            vec![("sda".to_string(), disk(2048, 1)), ("sdb".to_string(), disk(999_999, 9))],
            t2,
        );
        assert_eq!(third[0].1.unwrap(), DiskRate::default());
        assert!(third[1].1.is_none());
    }

    fn raw_tick(cores: &[CpuTimes], disks: &[(&str, DiskCounters)]) -> RawReadings {
        let aggregate = cores.iter().fold(CpuTimes::default(), |acc, c| CpuTimes {
            user: acc.user + c.user,
            idle: acc.idle + c.idle,
            iowait: acc.iowait + c.iowait,
            ..Default::default()
        });
        RawReadings {
            cpu: Some(CpuStatLines {
                aggregate,
                cores: cores.iter().copied().enumerate().map(|(i, c)| (i as u32, c)).collect(),
            }),
            disks: Some(disks.iter().map(|(n, d)| (n.to_string(), *d)).collect()),
            network: Some(NetworkReading::default()),
            ..Default::default()
        }
    }

    #[test]
    fn test_accountant_first_tick_is_zero() {
        let mut acc = DeltaAccountant::new();
        let rates = acc.account(&raw_tick(&[cpu(10, 10, 0)], &[("sda", disk(10, 1))]), Instant::now());
        assert_eq!(rates.cpu_usage_percent, 0.0);
        assert_eq!(rates.per_core_usage_percent, vec![0.0]);
        assert_eq!(rates.disk_operations, 0);
        assert!(!acc.is_empty());
    }

    #[test]
    fn test_accountant_second_tick_has_rates() {
        let mut acc = DeltaAccountant::new();
        let t0 = Instant::now();
        acc.account(
            &raw_tick(&[cpu(0, 0, 0), cpu(0, 0, 0)], &[("sda", disk(0, 0))]),
            t0,
        );
        let rates = acc.account(
            &raw_tick(
                &[cpu(75, 25, 0), cpu(25, 50, 25)],
                &[("sda", disk(2048, 5))],
            ),
            t0 + Duration::from_secs(1),
        );
        assert!((rates.cpu_usage_percent - 50.0).abs() < 1e-9);
        assert!((rates.io_wait_percent - 12.5).abs() < 1e-9);
        assert!((rates.per_core_usage_percent[0] - 75.0).abs() < 1e-9);
        assert!((rates.per_core_usage_percent[1] - 25.0).abs() < 1e-9);
        assert!((rates.disk_read_mbps - 1.0).abs() < 1e-9);
        assert_eq!(rates.disk_operations, 10);
    }

    #[test]
    fn test_accountant_new_core_reports_zero() {
        let mut acc = DeltaAccountant::new();
        let t0 = Instant::now();
        acc.account(&raw_tick(&[cpu(0, 0, 0)], &[]), t0);
        let rates = acc.account(
            &raw_tick(&[cpu(50, 50, 0), cpu(100, 0, 0)], &[]),
            t0 + Duration::from_secs(1),
        );
        assert!((rates.per_core_usage_percent[0] - 50.0).abs() < 1e-9);
        assert_eq!(rates.per_core_usage_percent[1], 0.0);
    }

    #[test]
    fn test_accountant_failed_family_drops_baseline() {
        let mut acc = DeltaAccountant::new();
        let t0 = Instant::now();
        acc.account(&raw_tick(&[cpu(0, 0, 0)], &[("sda", disk(0, 0))]), t0);

        let mut failed = raw_tick(&[cpu(10, 10, 0)], &[]);
        failed.disks = None;
        let rates = acc.account(&failed, t0 + Duration::from_secs(1));
        assert_eq!(rates.disk_read_mbps, 0.0);

        let rates = acc.account(
            &raw_tick(&[cpu(20, 20, 0)], &[("sda", disk(4096, 1))]),
            t0 + Duration::from_secs(2),
        );
        assert_eq!(rates.disk_read_mbps, 0.0);
    }

    #[test]
    fn test_accountant_reset() {
        let mut acc = DeltaAccountant::new();
        acc.account(&raw_tick(&[cpu(1, 1, 0)], &[("sda", disk(1, 1))]), Instant::now());
        acc.reset();
        assert!(acc.is_empty());
    }
}
