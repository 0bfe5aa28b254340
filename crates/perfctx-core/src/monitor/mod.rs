//! Background resource monitor.
//!
//! A [`Monitor`] brackets a workload: `start()` spawns one sampling thread,
//! `stop()` joins it. Samples go to a mutex-guarded buffer that can be
//! aggregated at any time, including while sampling is in progress.
//!
//! ```text
//!  caller ──start()──► sampling thread ──request──► reader thread
//!                         │   ▲                        │ CounterSource
//!                         │   └──── RawReadings ◄──────┘ (timeout-bounded)
//!                         ▼
//!                DeltaAccountant ──► ResourceSample ──► Arc<Mutex<Vec<_>>>
//! ```

pub mod aggregate;
pub mod reader;
pub mod sampler;

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::analysis::{InterferenceDetector, InterferenceReport};
use crate::collector::{default_counter_source, CounterSource};
use crate::config::MonitorConfig;
use crate::export::{self, ExportError};
use crate::model::{ResourceMetrics, ResourceSample};
use crate::platform;
use sampler::Sampler;

/// Longest uninterrupted sleep inside the sampling loop.
const STOP_POLL: Duration = Duration::from_millis(50);

/// Builds the counter source for a new session.
pub type SourceFactory = Box<dyn FnMut() -> Box<dyn CounterSource + Send> + Send>;

/// Start/stop controller around the sampling thread and its sample buffer.
pub struct Monitor {
    config: MonitorConfig,
    factory: SourceFactory,
    samples: Arc<Mutex<Vec<ResourceSample>>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    started: Option<Instant>,
    stopped: Option<Instant>,
}

impl Monitor {
    /// Monitor reading the platform's native counters.
    pub fn new(config: MonitorConfig) -> Self {
        let proc_path = config.proc_path.clone();
        let sys_path = config.sys_path.clone();
        Self::with_source_factory(
            config,
            Box::new(move || default_counter_source(&proc_path, &sys_path)),
        )
    }

    /// Monitor reading from sources produced by `factory`, one per session.
    pub fn with_source_factory(config: MonitorConfig, factory: SourceFactory) -> Self {
        Self {
            config,
            factory,
            samples: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
            started: None,
            stopped: None,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Starts a new session. Returns immediately; a no-op if already running.
    ///
    /// Clears the buffer. Delta state lives in the per-session sampler, so
    /// nothing carries over from the previous session. An invalid config
    /// (zero interval or read timeout) is rejected with `InvalidInput`.
    pub fn start(&mut self) -> io::Result<()> {
        if self.handle.is_some() {
            debug!("monitor already running, start ignored");
            return Ok(());
        }
        self.config
            .validate()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        self.reset();
        let started = Instant::now();
        let mut sampler = Sampler::new((self.factory)(), &self.config, started)?;

        let samples = Arc::clone(&self.samples);
        let running = Arc::clone(&self.running);
        let interval = self.config.interval;
        running.store(true, Ordering::SeqCst);

        let spawned = thread::Builder::new()
            .name("perfctx-sampler".into())
            .spawn(move || {
                sampler.prime();
                let mut tick = 0;
                loop {
                    let next = next_tick(started, interval, tick, Instant::now());
                    if next > tick + 1 {
                        debug!(missed = next - tick - 1, "sampling fell behind, skipping ticks");
                    }
                    tick = next;
                    if !sleep_until(started + interval * tick, &running) {
                        break;
                    }
                    let sample = sampler.sample_once();
                    lock(&samples).push(sample);
                }
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                self.started = Some(started);
                self.stopped = None;
                info!(interval_ms = interval.as_millis() as u64, "monitoring started");
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Stops the session and waits for the sampling thread to exit.
    ///
    /// No sample is appended after this returns. A no-op when idle.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.running.store(false, Ordering::SeqCst);
        if handle.join().is_err() {
            error!("sampling thread panicked");
        }
        self.stopped = Some(Instant::now());
        info!(samples = self.sample_count(), "monitoring stopped");
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Clears the sample buffer and the session clock. Ignored while a
    /// session is running.
    pub fn reset(&mut self) {
        if self.is_running() {
            debug!("monitor running, reset ignored");
            return;
        }
        lock(&self.samples).clear();
        self.started = None;
        self.stopped = None;
    }

    /// Seconds between `start()` and `stop()`, or until now while running.
    pub fn monitoring_duration_secs(&self) -> f64 {
        match (self.started, self.stopped) {
            (Some(start), Some(stop)) => stop.saturating_duration_since(start).as_secs_f64(),
            (Some(start), None) => start.elapsed().as_secs_f64(),
            _ => 0.0,
        }
    }

    pub fn sample_count(&self) -> usize {
        lock(&self.samples).len()
    }

    /// Copy of every sample recorded in the current session.
    pub fn all_samples(&self) -> Vec<ResourceSample> {
        lock(&self.samples).clone()
    }

    pub fn average_metrics(&self) -> ResourceMetrics {
        let duration = self.monitoring_duration_secs();
        aggregate::average(&lock(&self.samples), duration)
    }

    pub fn peak_metrics(&self) -> ResourceMetrics {
        let duration = self.monitoring_duration_secs();
        aggregate::peak(&lock(&self.samples), duration)
    }

    /// Interference verdict over the session's average metrics.
    pub fn analyze_interference(&self) -> InterferenceReport {
        InterferenceDetector::new(self.config.thresholds)
            .detect(&self.average_metrics(), platform::core_count())
    }

    /// Writes the recorded samples as JSON or CSV, chosen by extension.
    pub fn write_samples(&self, path: &Path) -> Result<(), ExportError> {
        export::write_samples(path, &lock(&self.samples))
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(samples: &Mutex<Vec<ResourceSample>>) -> MutexGuard<'_, Vec<ResourceSample>> {
    // A panic while holding the lock cannot leave a half-written sample.
    samples.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Index of the next tick to sample, counted from the session start.
///
/// Deadlines are `started + n * interval`, so a slow tick does not push the
/// following ones back. Ticks whose deadline already passed are skipped.
fn next_tick(started: Instant, interval: Duration, tick: u32, now: Instant) -> u32 {
    let elapsed = now.saturating_duration_since(started).as_nanos();
    let due = u32::try_from(elapsed / interval.as_nanos().max(1)).unwrap_or(u32::MAX);
    due.saturating_add(1).max(tick.saturating_add(1))
}

/// Sleeps until `deadline` in slices of at most [`STOP_POLL`].
///
/// Returns `false` as soon as `running` is cleared.
fn sleep_until(deadline: Instant, running: &AtomicBool) -> bool {
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return true;
        }
        thread::sleep(remaining.min(STOP_POLL));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{MockFs, ProcfsSource};

    fn mock_monitor(interval_ms: u64) -> Monitor {
        let config = MonitorConfig {
            interval: Duration::from_millis(interval_ms),
            read_timeout: Duration::from_secs(1),
            ..Default::default()
        };
        Monitor::with_source_factory(
            config,
            Box::new(|| -> Box<dyn CounterSource + Send> {
                Box::new(ProcfsSource::new(MockFs::typical_system(), "/proc", "/sys"))
            }),
        )
    }

    #[test]
    fn test_idle_monitor() {
        let mut monitor = mock_monitor(10);
        assert!(!monitor.is_running());
        monitor.stop();
        assert_eq!(monitor.sample_count(), 0);
        assert_eq!(monitor.monitoring_duration_secs(), 0.0);
        assert_eq!(monitor.average_metrics().sample_count, 0);
    }

    #[test]
    fn test_start_collects_and_stop_is_a_barrier() {
        let mut monitor = mock_monitor(10);
        monitor.start().unwrap();
        assert!(monitor.is_running());
        thread::sleep(Duration::from_millis(150));
        monitor.stop();
        assert!(!monitor.is_running());

        let count = monitor.sample_count();
        assert!(count > 0);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(monitor.sample_count(), count);

        let samples = monitor.all_samples();
        assert!(samples.windows(2).all(|w| w[0].timestamp_s < w[1].timestamp_s));
        assert!(monitor.monitoring_duration_secs() > 0.1);
    }

    #[test]
    fn test_restart_clears_buffer() {
        let mut monitor = mock_monitor(10);
        monitor.start().unwrap();
        thread::sleep(Duration::from_millis(80));
        monitor.stop();
        assert!(monitor.sample_count() > 0);

        monitor.start().unwrap();
        monitor.stop();
        let samples = monitor.all_samples();
        assert!(samples.iter().all(|s| s.timestamp_s < 0.08));
    }

    #[test]
    fn test_stop_latency_bounded_by_poll() {
        let mut monitor = mock_monitor(10_000);
        monitor.start().unwrap();
        thread::sleep(Duration::from_millis(20));
        let begin = Instant::now();
        monitor.stop();
        assert!(begin.elapsed() < Duration::from_millis(500));
        assert_eq!(monitor.sample_count(), 0);
    }

    #[test]
    fn test_aggregation_while_running() {
        let mut monitor = mock_monitor(5);
        monitor.start().unwrap();
        thread::sleep(Duration::from_millis(60));
        let avg = monitor.average_metrics();
        assert!(avg.memory_usage_percent > 0.0 || avg.sample_count == 0);
        monitor.stop();
        assert!(monitor.peak_metrics().memory_usage_percent > 20.0);
    }

    #[test]
    fn test_sleep_until_returns_false_when_cleared() {
        let running = AtomicBool::new(false);
        assert!(!sleep_until(Instant::now() + Duration::from_secs(10), &running));
        running.store(true, Ordering::SeqCst);
        assert!(sleep_until(Instant::now() + Duration::from_millis(1), &running));
        assert!(sleep_until(Instant::now() - Duration::from_millis(1), &running));
    }

    #[test]
    fn test_next_tick_anchored_to_session_start() {
        let started = Instant::now();
        let interval = Duration::from_millis(250);

        assert_eq!(next_tick(started, interval, 0, started), 1);
        // A tick that finished late still aims at the next grid point.
        assert_eq!(next_tick(started, interval, 1, started + Duration::from_millis(256)), 2);
        assert_eq!(next_tick(started, interval, 7, started + Duration::from_millis(1790)), 8);
        // A tick that overran two deadlines skips them.
        assert_eq!(next_tick(started, interval, 2, started + Duration::from_millis(1010)), 5);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut monitor = mock_monitor(0);
        let err = monitor.start().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(!monitor.is_running());
        thread::sleep(Duration::from_millis(20));
        assert_eq!(monitor.sample_count(), 0);
    }

    #[test]
    fn test_reset_ignored_while_running() {
        let mut monitor = mock_monitor(10);
        monitor.start().unwrap();
        thread::sleep(Duration::from_millis(60));
        monitor.reset();
        assert!(monitor.monitoring_duration_secs() > 0.05);
        assert!(monitor.sample_count() > 0);
        monitor.stop();

        monitor.reset();
        assert_eq!(monitor.sample_count(), 0);
        assert_eq!(monitor.monitoring_duration_secs(), 0.0);
    }
}
