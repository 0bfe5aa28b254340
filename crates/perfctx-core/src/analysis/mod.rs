//! Interference detection and reliability scoring over aggregated metrics.
//!
//! Everything here is a pure function of its inputs: a report or assessment
//! is rebuilt on every query and holds no reference back into the monitor.

pub mod environment;
pub mod reliability;
pub mod rules;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::InterferenceThresholds;
use crate::model::ResourceMetrics;
use rules::{all_rules, InterferenceRule, RuleContext};

pub use environment::{environment_score, is_optimal_environment};
pub use reliability::{interpret_reliability_score, ReliabilityAnalyzer, ReliabilityAssessment};

/// Kinds of background interference that invalidate a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterferenceKind {
    BackgroundCpu,
    MemoryPressure,
    IoWait,
    NetworkCongestion,
    ThermalThrottling,
}

impl InterferenceKind {
    /// All kinds, in reporting order.
    pub const ALL: [InterferenceKind; 5] = [
        InterferenceKind::BackgroundCpu,
        InterferenceKind::MemoryPressure,
        InterferenceKind::IoWait,
        InterferenceKind::NetworkCongestion,
        InterferenceKind::ThermalThrottling,
    ];

    /// Phrase used in [`InterferenceReport::summary`].
    pub fn label(self) -> &'static str {
        match self {
            InterferenceKind::BackgroundCpu => "high background CPU usage",
            InterferenceKind::MemoryPressure => "memory pressure",
            InterferenceKind::IoWait => "high I/O wait",
            InterferenceKind::NetworkCongestion => "network congestion",
            InterferenceKind::ThermalThrottling => "thermal throttling",
        }
    }

    fn remediation(self) -> &'static [&'static str] {
        match self {
            InterferenceKind::BackgroundCpu => &[
                "Close unnecessary applications to reduce background CPU usage",
                "Check for resource-intensive processes with 'top' or 'htop'",
            ],
            InterferenceKind::MemoryPressure => &[
                "Close memory-intensive applications",
                "Consider increasing system RAM or enabling swap",
            ],
            InterferenceKind::IoWait => &[
                "Check for disk-intensive processes",
                "Consider using faster storage (SSD vs HDD)",
                "Verify disk health and available space",
            ],
            InterferenceKind::NetworkCongestion => &[
                "Check network links for packet loss and retransmissions",
                "Avoid concurrent network transfers while benchmarking",
            ],
            InterferenceKind::ThermalThrottling => &[
                "Check CPU cooling and reduce ambient temperature",
                "Clean dust from cooling system",
            ],
        }
    }
}

/// Five independent interference flags plus quantified warnings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterferenceReport {
    pub high_background_cpu_usage: bool,
    pub memory_pressure: bool,
    pub high_io_wait: bool,
    pub network_congestion: bool,
    pub thermal_throttling: bool,
    pub performance_warnings: Vec<String>,
}

impl InterferenceReport {
    pub fn is_set(&self, kind: InterferenceKind) -> bool {
        match kind {
            InterferenceKind::BackgroundCpu => self.high_background_cpu_usage,
            InterferenceKind::MemoryPressure => self.memory_pressure,
            InterferenceKind::IoWait => self.high_io_wait,
            InterferenceKind::NetworkCongestion => self.network_congestion,
            InterferenceKind::ThermalThrottling => self.thermal_throttling,
        }
    }

    pub fn set(&mut self, kind: InterferenceKind) {
        match kind {
            InterferenceKind::BackgroundCpu => self.high_background_cpu_usage = true,
            InterferenceKind::MemoryPressure => self.memory_pressure = true,
            InterferenceKind::IoWait => self.high_io_wait = true,
            InterferenceKind::NetworkCongestion => self.network_congestion = true,
            InterferenceKind::ThermalThrottling => self.thermal_throttling = true,
        }
    }

    pub fn active(&self) -> Vec<InterferenceKind> {
        InterferenceKind::ALL
            .into_iter()
            .filter(|k| self.is_set(*k))
            .collect()
    }

    pub fn has_interference(&self) -> bool {
        InterferenceKind::ALL.into_iter().any(|k| self.is_set(k))
    }

    /// One sentence naming the active flags, e.g.
    /// "Performance interference detected: memory pressure and high I/O wait".
    pub fn summary(&self) -> String {
        let labels: Vec<&str> = self.active().into_iter().map(InterferenceKind::label).collect();
        let Some((last, rest)) = labels.split_last() else {
            return "No significant system interference detected".to_string();
        };
        let list = if rest.is_empty() {
            (*last).to_string()
        } else {
            format!("{} and {}", rest.join(", "), last)
        };
        format!("Performance interference detected: {list}")
    }

    /// Remediation steps for every active flag, then general advice.
    pub fn recommendations(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .active()
            .into_iter()
            .flat_map(|k| k.remediation().iter().map(|s| s.to_string()))
            .collect();
        out.push("Run benchmarks with minimal background activity".to_string());
        out.push("Ensure consistent power settings (performance mode)".to_string());
        out
    }
}

/// Applies the interference rules with a fixed set of thresholds.
pub struct InterferenceDetector {
    thresholds: InterferenceThresholds,
    rules: Vec<Box<dyn InterferenceRule>>,
}

impl InterferenceDetector {
    pub fn new(thresholds: InterferenceThresholds) -> Self {
        Self {
            thresholds,
            rules: all_rules(),
        }
    }

    /// `core_count` scales the system-load check.
    pub fn detect(&self, metrics: &ResourceMetrics, core_count: usize) -> InterferenceReport {
        let ctx = RuleContext {
            metrics,
            thresholds: &self.thresholds,
            core_count,
        };
        let mut report = InterferenceReport::default();
        for rule in &self.rules {
            if let Some(finding) = rule.evaluate(&ctx) {
                debug!(rule = rule.id(), warning = %finding.warning, "interference rule fired");
                if let Some(kind) = finding.kind {
                    report.set(kind);
                }
                report.performance_warnings.push(finding.warning);
            }
        }
        report
    }
}

impl Default for InterferenceDetector {
    fn default() -> Self {
        Self::new(InterferenceThresholds::default())
    }
}
