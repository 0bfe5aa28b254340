use crate::config::InterferenceThresholds;
use crate::model::ResourceMetrics;

use super::InterferenceKind;

/// Inputs shared by every interference rule.
pub struct RuleContext<'a> {
    pub metrics: &'a ResourceMetrics,
    pub thresholds: &'a InterferenceThresholds,
    pub core_count: usize,
}

/// Outcome of one rule that fired.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    /// Flag to raise, or `None` for an advisory-only warning.
    pub kind: Option<InterferenceKind>,
    pub warning: String,
}

pub trait InterferenceRule: Send + Sync {
    fn id(&self) -> &'static str;
    fn evaluate(&self, ctx: &RuleContext) -> Option<Finding>;
}

pub fn all_rules() -> Vec<Box<dyn InterferenceRule>> {
    vec![
        Box::new(BackgroundCpuRule),
        Box::new(MemoryPressureRule),
        Box::new(IoWaitRule),
        Box::new(ThermalThrottlingRule),
        Box::new(NetworkCongestionRule),
        Box::new(SystemLoadRule),
    ]
}

fn flagged(kind: InterferenceKind, warning: String) -> Option<Finding> {
    Some(Finding {
        kind: Some(kind),
        warning,
    })
}

// ============================================================
// Flag rules
// ============================================================

pub struct BackgroundCpuRule;

impl InterferenceRule for BackgroundCpuRule {
    fn id(&self) -> &'static str {
        "background_cpu"
    }

    fn evaluate(&self, ctx: &RuleContext) -> Option<Finding> {
        let pct = ctx.metrics.cpu_usage_percent;
        if pct <= ctx.thresholds.cpu_usage_percent {
            return None;
        }
        flagged(
            InterferenceKind::BackgroundCpu,
            format!("High background CPU usage detected ({}%)", pct as i64),
        )
    }
}

pub struct MemoryPressureRule;

impl InterferenceRule for MemoryPressureRule {
    fn id(&self) -> &'static str {
        "memory_pressure"
    }

    fn evaluate(&self, ctx: &RuleContext) -> Option<Finding> {
        let pct = ctx.metrics.memory_usage_percent;
        if pct <= ctx.thresholds.memory_usage_percent {
            return None;
        }
        flagged(
            InterferenceKind::MemoryPressure,
            format!("High memory usage detected ({}%)", pct as i64),
        )
    }
}

pub struct IoWaitRule;

impl InterferenceRule for IoWaitRule {
    fn id(&self) -> &'static str {
        "io_wait"
    }

    fn evaluate(&self, ctx: &RuleContext) -> Option<Finding> {
        let pct = ctx.metrics.io_wait_percent;
        if pct <= ctx.thresholds.io_wait_percent {
            return None;
        }
        flagged(
            InterferenceKind::IoWait,
            format!("High I/O wait detected ({}%)", pct as i64),
        )
    }
}

/// Relies on the aggregate's OR-reduced flag; the temperature threshold is
/// applied per sample by the sampler.
pub struct ThermalThrottlingRule;

impl InterferenceRule for ThermalThrottlingRule {
    fn id(&self) -> &'static str {
        "thermal_throttling"
    }

    fn evaluate(&self, ctx: &RuleContext) -> Option<Finding> {
        if !ctx.metrics.thermal_throttling_detected {
            return None;
        }
        flagged(
            InterferenceKind::ThermalThrottling,
            "CPU thermal throttling detected".to_string(),
        )
    }
}

pub struct NetworkCongestionRule;

impl InterferenceRule for NetworkCongestionRule {
    fn id(&self) -> &'static str {
        "network_congestion"
    }

    fn evaluate(&self, ctx: &RuleContext) -> Option<Finding> {
        let pct = ctx.metrics.tcp_retransmit_percent;
        if pct <= ctx.thresholds.tcp_retransmit_percent {
            return None;
        }
        flagged(
            InterferenceKind::NetworkCongestion,
            format!("High TCP retransmission rate detected ({pct:.1}%)"),
        )
    }
}

// ============================================================
// Advisory rules
// ============================================================

/// 1-minute load above 80% of the logical cores. Warns without a flag.
pub struct SystemLoadRule;

impl InterferenceRule for SystemLoadRule {
    fn id(&self) -> &'static str {
        "system_load"
    }

    fn evaluate(&self, ctx: &RuleContext) -> Option<Finding> {
        let load = ctx.metrics.load_average_1min;
        if load <= ctx.core_count as f64 * 0.8 {
            return None;
        }
        Some(Finding {
            kind: None,
            warning: format!("High system load detected ({load:.2})"),
        })
    }
}
