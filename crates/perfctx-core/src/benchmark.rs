//! The workload seam: anything that can be run for a duration and report a
//! [`BenchmarkResult`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAILED: &str = "failed";
pub const STATUS_ERROR: &str = "error";

/// A runnable workload.
pub trait Benchmark: Send {
    fn name(&self) -> &str;
    fn run(&mut self, duration_secs: u64, iterations: u32, verbose: bool) -> BenchmarkResult;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkResult {
    pub name: String,
    /// `success` for a completed run; anything else counts as a failure.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    pub throughput: f64,
    pub throughput_unit: String,

    pub avg_latency: f64,
    pub min_latency: f64,
    pub max_latency: f64,
    pub p50_latency: f64,
    pub p90_latency: f64,
    pub p99_latency: f64,
    pub latency_unit: String,

    pub extra_metrics: BTreeMap<String, f64>,
}

impl BenchmarkResult {
    pub fn success(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: STATUS_SUCCESS.to_string(),
            ..Default::default()
        }
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: STATUS_FAILED.to_string(),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Placeholder for a run that never reached the workload.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            name: "unknown".to_string(),
            status: STATUS_ERROR.to_string(),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert!(BenchmarkResult::success("CPU Integer").is_success());
        let failed = BenchmarkResult::failed("Disk", "ENOSPC");
        assert!(!failed.is_success());
        assert_eq!(failed.error_message.as_deref(), Some("ENOSPC"));
        assert_eq!(BenchmarkResult::error("no benchmark").status, "error");
    }

    #[test]
    fn test_error_message_omitted_when_absent() {
        let json = serde_json::to_string(&BenchmarkResult::success("x")).unwrap();
        assert!(!json.contains("error_message"));
    }
}
