//! Runs a benchmark inside a monitoring window and bundles the result with
//! its telemetry, interference verdict, platform snapshot and reliability.

use std::hint::black_box;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::{
    environment_score, interpret_reliability_score, is_optimal_environment, InterferenceReport,
    ReliabilityAnalyzer,
};
use crate::benchmark::{Benchmark, BenchmarkResult};
use crate::collector::RealFs;
use crate::config::{MonitorConfig, RunConfig};
use crate::model::ResourceMetrics;
use crate::monitor::Monitor;
use crate::platform::{
    self, are_comparable_platforms, CachedPlatform, PlatformInfo, PlatformSource,
    ProcPlatformSource,
};

/// Minimum reliability for two results to be compared directly.
const COMPARABLE_RELIABILITY: f64 = 50.0;
const LOW_RELIABILITY: f64 = 70.0;

/// A benchmark result with everything needed to judge it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextualBenchmarkResult {
    pub benchmark_result: BenchmarkResult,
    pub average_metrics: ResourceMetrics,
    pub peak_metrics: ResourceMetrics,
    pub interference: InterferenceReport,
    pub platform: PlatformInfo,
    pub reliability_score: f64,
    pub reliability_warnings: Vec<String>,
    pub optimization_suggestions: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl ContextualBenchmarkResult {
    pub fn reliability_interpretation(&self) -> &'static str {
        interpret_reliability_score(self.reliability_score)
    }

    /// Pretty JSON with the derived interference verdict inlined.
    pub fn to_json_with_context(&self) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "interference_detected".into(),
                self.interference.has_interference().into(),
            );
            obj.insert(
                "interference_summary".into(),
                self.interference.summary().into(),
            );
            obj.insert(
                "reliability_interpretation".into(),
                self.reliability_interpretation().into(),
            );
        }
        serde_json::to_string_pretty(&value)
    }
}

/// Fitness of the machine for benchmarking, measured before any run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceEnvironment {
    pub platform: PlatformInfo,
    pub current_interference: InterferenceReport,
    pub environment_score: f64,
    pub is_optimal_for_benchmarking: bool,
    pub environment_issues: Vec<String>,
    pub pre_benchmark_recommendations: Vec<String>,
}

impl PerformanceEnvironment {
    pub fn summary(&self) -> String {
        let verdict = if self.is_optimal_for_benchmarking {
            "optimal for benchmarking"
        } else {
            "not optimal for benchmarking"
        };
        format!(
            "Environment score {:.0}/100 ({}): {}",
            self.environment_score,
            verdict,
            self.platform.summary()
        )
    }
}

/// Verdict on whether a set of results may be compared directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextualComparison {
    pub platforms_comparable: bool,
    pub comparison_validity: String,
    pub caveats: Vec<String>,
}

/// Owns a [`Monitor`] and a cached platform snapshot.
pub struct ContextRunner<P: PlatformSource = ProcPlatformSource<RealFs>> {
    monitor: Monitor,
    platform: CachedPlatform<P>,
}

impl ContextRunner {
    /// Runner over the native counters and platform probes.
    pub fn new(config: MonitorConfig) -> Self {
        let platform = ProcPlatformSource::new(
            RealFs::new(),
            config.proc_path.clone(),
            config.sys_path.clone(),
        );
        Self::with_parts(Monitor::new(config), platform)
    }
}

impl<P: PlatformSource> ContextRunner<P> {
    pub fn with_parts(monitor: Monitor, platform: P) -> Self {
        Self {
            monitor,
            platform: CachedPlatform::new(platform),
        }
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn platform(&mut self) -> &PlatformInfo {
        self.platform.get()
    }

    pub fn refresh_platform(&mut self) -> &PlatformInfo {
        self.platform.refresh()
    }

    /// Warmup, monitored run, cooldown, analysis.
    ///
    /// `None` yields an `error` result rather than a panic. A monitor that
    /// fails to start degrades to an empty telemetry window.
    pub fn run_with_context(
        &mut self,
        benchmark: Option<&mut dyn Benchmark>,
        run: &RunConfig,
    ) -> ContextualBenchmarkResult {
        let Some(benchmark) = benchmark else {
            warn!("context run requested without a benchmark");
            return self.analyze_result(BenchmarkResult::error("No benchmark provided"));
        };

        info!(
            benchmark = benchmark.name(),
            duration_secs = run.duration_secs,
            iterations = run.iterations,
            "context run starting"
        );
        warm_up(run.warmup);

        if let Err(e) = self.monitor.start() {
            warn!(error = %e, "monitor failed to start, running without telemetry");
        }
        let result = benchmark.run(run.duration_secs, run.iterations, run.verbose);
        self.monitor.stop();

        thread::sleep(run.cooldown);

        let contextual = self.analyze_result(result);
        info!(
            benchmark = %contextual.benchmark_result.name,
            score = contextual.reliability_score,
            interference = contextual.interference.has_interference(),
            "context run finished"
        );
        contextual
    }

    /// Combines `result` with the monitor's current window.
    pub fn analyze_result(&mut self, result: BenchmarkResult) -> ContextualBenchmarkResult {
        let average_metrics = self.monitor.average_metrics();
        let peak_metrics = self.monitor.peak_metrics();
        let interference = self.monitor.analyze_interference();
        let platform = self.platform.get().clone();

        let assessment = ReliabilityAnalyzer::new(platform::core_count()).assess(
            &result,
            &average_metrics,
            &interference,
            &platform,
        );

        ContextualBenchmarkResult {
            benchmark_result: result,
            average_metrics,
            peak_metrics,
            interference,
            platform,
            reliability_score: assessment.score,
            reliability_warnings: assessment.warnings,
            optimization_suggestions: assessment.suggestions,
            generated_at: Utc::now(),
        }
    }

    /// Monitors an idle `window` and scores the environment.
    pub fn analyze_environment(&mut self, window: Duration) -> PerformanceEnvironment {
        if let Err(e) = self.monitor.start() {
            warn!(error = %e, "monitor failed to start, environment scored without telemetry");
        }
        thread::sleep(window);
        self.monitor.stop();

        let current_interference = self.monitor.analyze_interference();
        let platform = self.platform.get().clone();
        let score = environment_score(&platform, &current_interference);

        let mut environment_issues = Vec::new();
        if current_interference.has_interference() {
            environment_issues.push("System interference detected".to_string());
        }
        if platform.performance_score() < 50.0 {
            environment_issues.push("Low-performance hardware".to_string());
        }
        environment_issues.extend(platform.performance_issues.iter().cloned());

        let recommendations = platform.optimization_recommendations();
        let pre_benchmark_recommendations = if recommendations.has_recommendations() {
            recommendations.all()
        } else {
            vec!["System appears optimally configured".to_string()]
        };

        PerformanceEnvironment {
            platform,
            current_interference,
            environment_score: score,
            is_optimal_for_benchmarking: is_optimal_environment(score),
            environment_issues,
            pre_benchmark_recommendations,
        }
    }
}

/// Light CPU activity with frequent yields, so frequency scaling settles
/// before measurement starts.
fn warm_up(duration: Duration) {
    if duration.is_zero() {
        return;
    }
    let deadline = Instant::now() + duration;
    let mut acc = 0u64;
    while Instant::now() < deadline {
        for i in 0..1000u64 {
            acc = black_box(acc.wrapping_add(i * i));
        }
        thread::sleep(Duration::from_micros(100));
    }
}

/// Two results can be compared directly when their platforms are close,
/// both are reasonably reliable and they saw the same interference state.
pub fn are_results_comparable(a: &ContextualBenchmarkResult, b: &ContextualBenchmarkResult) -> bool {
    are_comparable_platforms(&a.platform, &b.platform)
        && a.reliability_score >= COMPARABLE_RELIABILITY
        && b.reliability_score >= COMPARABLE_RELIABILITY
        && a.interference.has_interference() == b.interference.has_interference()
}

/// Compares every result's platform against the first one. Fewer than two
/// results yield an empty verdict.
pub fn compare_results(results: &[ContextualBenchmarkResult]) -> ContextualComparison {
    let [first, rest @ ..] = results else {
        return ContextualComparison::default();
    };
    if rest.is_empty() {
        return ContextualComparison::default();
    }
    let platforms_comparable = rest
        .iter()
        .all(|r| are_comparable_platforms(&first.platform, &r.platform));

    let comparison_validity = if platforms_comparable {
        "Platforms are comparable for direct performance comparison"
    } else {
        "Significant platform differences detected - comparison requires adjustment"
    }
    .to_string();

    let mut caveats = Vec::new();
    if results.iter().any(|r| r.platform.is_virtualized) {
        caveats.push(
            "Some platforms are virtualized - performance may not reflect bare metal capability"
                .to_string(),
        );
    }
    if results.iter().any(|r| r.interference.has_interference()) {
        caveats.push("System interference detected on some platforms during testing".to_string());
    }
    if results.iter().any(|r| r.reliability_score < LOW_RELIABILITY) {
        caveats.push("Some benchmark results have low reliability scores".to_string());
    }

    ContextualComparison {
        platforms_comparable,
        comparison_validity,
        caveats,
    }
}
