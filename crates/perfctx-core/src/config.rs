//! Monitor and context-run configuration.
//!
//! Everything has a working default; a JSON file may override any subset:
//!
//! ```json
//! { "interval_ms": 500, "families": { "network": false },
//!   "thresholds": { "cpu_usage_percent": 30.0 } }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    /// A value is out of range; the message names the field.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read config: {}", e),
            ConfigError::Json(e) => write!(f, "invalid config JSON: {}", e),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Json(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

/// Which counter families the sampler reads. Disabled families stay zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterFamilies {
    /// CPU time and frequency.
    pub cpu: bool,
    pub memory: bool,
    pub disk: bool,
    /// Interface bytes and TCP segments.
    pub network: bool,
    pub load: bool,
    pub thermal: bool,
}

impl Default for CounterFamilies {
    fn default() -> Self {
        Self {
            cpu: true,
            memory: true,
            disk: true,
            network: true,
            load: true,
            thermal: true,
        }
    }
}

/// Limits above which a metric counts as interference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterferenceThresholds {
    pub cpu_usage_percent: f64,
    pub memory_usage_percent: f64,
    pub io_wait_percent: f64,
    /// Package temperature treated as throttling even without throttle events.
    pub thermal_celsius: f64,
    pub tcp_retransmit_percent: f64,
}

impl Default for InterferenceThresholds {
    fn default() -> Self {
        Self {
            cpu_usage_percent: 20.0,
            memory_usage_percent: 80.0,
            io_wait_percent: 10.0,
            thermal_celsius: 85.0,
            tcp_retransmit_percent: 5.0,
        }
    }
}

impl InterferenceThresholds {
    fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("cpu_usage_percent", self.cpu_usage_percent),
            ("memory_usage_percent", self.memory_usage_percent),
            ("io_wait_percent", self.io_wait_percent),
            ("thermal_celsius", self.thermal_celsius),
            ("tcp_retransmit_percent", self.tcp_retransmit_percent),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "thresholds.{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Configuration of one [`crate::monitor::Monitor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Sleep between samples.
    #[serde(rename = "interval_ms", with = "millis")]
    pub interval: Duration,
    /// How long a tick waits for the reader worker before recording zeros.
    #[serde(rename = "read_timeout_ms", with = "millis")]
    pub read_timeout: Duration,
    pub families: CounterFamilies,
    pub thresholds: InterferenceThresholds,
    pub proc_path: PathBuf,
    pub sys_path: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
            read_timeout: Duration::from_millis(200),
            families: CounterFamilies::default(),
            thresholds: InterferenceThresholds::default(),
            proc_path: PathBuf::from("/proc"),
            sys_path: PathBuf::from("/sys"),
        }
    }
}

impl MonitorConfig {
    /// Loads a JSON config file; missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: MonitorConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::Invalid("interval_ms must be > 0".into()));
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::Invalid("read_timeout_ms must be > 0".into()));
        }
        self.thresholds.validate()
    }
}

/// Parameters of a context run around one benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub duration_secs: u64,
    pub iterations: u32,
    pub verbose: bool,
    /// Idle time before monitoring starts, to let the system settle.
    #[serde(rename = "warmup_ms", with = "millis")]
    pub warmup: Duration,
    #[serde(rename = "cooldown_ms", with = "millis")]
    pub cooldown: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration_secs: 10,
            iterations: 1,
            verbose: false,
            warmup: Duration::from_secs(3),
            cooldown: Duration::from_secs(2),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
