//! perfctx-core - resource telemetry and interference analysis for benchmarks.
//!
//! Provides:
//! - `collector` - OS counter readers (`/proc`, `/sys`) behind a `CounterSource` trait
//! - `rates` - delta accounting from cumulative counters to per-tick rates
//! - `monitor` - background sampler with start/stop lifecycle and aggregation
//! - `analysis` - interference rules, reliability and environment scoring
//! - `platform` - platform snapshot, performance score, tuning advice
//! - `context` - benchmark runs wrapped in a monitoring window
//! - `export` - raw sample export (JSON/CSV)

pub mod analysis;
pub mod benchmark;
pub mod collector;
pub mod config;
pub mod context;
pub mod export;
pub mod model;
pub mod monitor;
pub mod platform;
pub mod rates;

pub use analysis::{InterferenceDetector, InterferenceKind, InterferenceReport, ReliabilityAssessment};
pub use benchmark::{Benchmark, BenchmarkResult};
pub use config::{MonitorConfig, RunConfig};
pub use context::{ContextRunner, ContextualBenchmarkResult, PerformanceEnvironment};
pub use model::{ResourceMetrics, ResourceSample};
pub use monitor::Monitor;
pub use platform::PlatformInfo;
