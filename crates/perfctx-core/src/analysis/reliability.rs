//! Per-run reliability score, warnings and suggestions.

use serde::{Deserialize, Serialize};

use super::{InterferenceKind, InterferenceReport};
use crate::benchmark::BenchmarkResult;
use crate::model::ResourceMetrics;
use crate::platform::{PlatformInfo, StorageKind};

/// Penalty subtracted from the score for each active flag.
fn flag_penalty(kind: InterferenceKind) -> f64 {
    match kind {
        InterferenceKind::BackgroundCpu => 20.0,
        InterferenceKind::MemoryPressure => 15.0,
        InterferenceKind::IoWait => 25.0,
        InterferenceKind::ThermalThrottling => 30.0,
        InterferenceKind::NetworkCongestion => 10.0,
    }
}

const MIN_SAMPLES: usize = 10;
const MIN_WINDOW_SECS: f64 = 3.0;
const SHORT_RUN_WARNING_SECS: f64 = 5.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityAssessment {
    pub score: f64,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Scores a finished run against the telemetry recorded around it.
#[derive(Debug, Clone, Copy)]
pub struct ReliabilityAnalyzer {
    core_count: usize,
}

impl ReliabilityAnalyzer {
    /// `core_count` scales the system-load penalty.
    pub fn new(core_count: usize) -> Self {
        Self { core_count }
    }

    pub fn assess(
        &self,
        result: &BenchmarkResult,
        metrics: &ResourceMetrics,
        interference: &InterferenceReport,
        platform: &PlatformInfo,
    ) -> ReliabilityAssessment {
        ReliabilityAssessment {
            score: self.score(result, metrics, interference),
            warnings: self.warnings(result, metrics, interference, platform),
            suggestions: self.suggestions(result, metrics, platform),
        }
    }

    /// Additive penalties from 100, clamped to [0, 100]. Exactly 0 for a
    /// run that did not succeed.
    pub fn score(
        &self,
        result: &BenchmarkResult,
        metrics: &ResourceMetrics,
        interference: &InterferenceReport,
    ) -> f64 {
        if !result.is_success() {
            return 0.0;
        }

        let mut score = 100.0;
        for kind in interference.active() {
            score -= flag_penalty(kind);
        }
        if metrics.sample_count < MIN_SAMPLES {
            score -= 10.0;
        }
        if metrics.monitoring_duration_seconds < MIN_WINDOW_SECS {
            score -= 15.0;
        }
        if metrics.load_average_1min > self.core_count as f64 * 0.8 {
            score -= 10.0;
        }
        score.clamp(0.0, 100.0)
    }

    /// Status, then interference, then platform, then duration, then
    /// resource-specific conditions.
    pub fn warnings(
        &self,
        result: &BenchmarkResult,
        metrics: &ResourceMetrics,
        interference: &InterferenceReport,
        platform: &PlatformInfo,
    ) -> Vec<String> {
        let checks = [
            (
                !result.is_success(),
                "Benchmark failed to complete successfully",
            ),
            (
                interference.has_interference(),
                "System interference detected during benchmark",
            ),
            (
                platform.is_virtualized,
                "Running in virtualized environment - results may not reflect bare metal performance",
            ),
            (
                platform.is_power_saving(),
                "CPU governor set to power saving mode - performance may be reduced",
            ),
            (
                !platform.turbo_boost_enabled,
                "CPU turbo boost disabled - peak performance unavailable",
            ),
            (
                metrics.monitoring_duration_seconds < SHORT_RUN_WARNING_SECS,
                "Short benchmark duration - results may be less reliable",
            ),
            (
                metrics.thermal_throttling_detected,
                "CPU thermal throttling detected - performance limited by temperature",
            ),
            (
                metrics.memory_usage_percent > 90.0,
                "High memory usage - potential memory pressure affecting performance",
            ),
            (
                metrics.io_wait_percent > 20.0,
                "High I/O wait time - storage bottleneck detected",
            ),
        ];
        collect_hits(&checks)
    }

    pub fn suggestions(
        &self,
        result: &BenchmarkResult,
        metrics: &ResourceMetrics,
        platform: &PlatformInfo,
    ) -> Vec<String> {
        let name = result.name.as_str();
        let checks = [
            (
                platform.is_power_saving(),
                "Set CPU governor to 'performance' for maximum benchmark accuracy",
            ),
            (
                !platform.turbo_boost_enabled,
                "Enable CPU turbo boost for peak performance testing",
            ),
            (
                metrics.memory_usage_percent > 80.0,
                "Close unnecessary applications to free memory",
            ),
            (
                metrics.load_average_1min > self.core_count as f64 * 0.5,
                "Reduce background system load for more accurate benchmarks",
            ),
            (
                platform.primary_storage_type == StorageKind::Hdd,
                "Consider running I/O benchmarks on SSD for better performance baseline",
            ),
            (
                platform.is_virtualized,
                "Run benchmarks on bare metal for most accurate hardware performance measurement",
            ),
            (
                name.contains("CPU"),
                "Pin benchmark threads to specific CPU cores for consistent results",
            ),
            (
                name.contains("Memory") && platform.numa_enabled,
                "Consider NUMA-aware memory allocation for multi-socket systems",
            ),
            (
                name.contains("Disk") && metrics.io_wait_percent > 10.0,
                "Ensure disk benchmarks run on dedicated storage to avoid interference",
            ),
        ];
        collect_hits(&checks)
    }
}

fn collect_hits(checks: &[(bool, &str)]) -> Vec<String> {
    checks
        .iter()
        .filter(|(hit, _)| *hit)
        .map(|(_, msg)| msg.to_string())
        .collect()
}

/// Verbal band for a reliability score.
pub fn interpret_reliability_score(score: f64) -> &'static str {
    if score >= 90.0 {
        "Excellent - Results highly reliable"
    } else if score >= 75.0 {
        "Good - Results generally reliable"
    } else if score >= 60.0 {
        "Fair - Results may have some variability"
    } else if score >= 40.0 {
        "Poor - Results may be significantly affected by system conditions"
    } else {
        "Very Poor - Results likely unreliable due to system interference"
    }
}
