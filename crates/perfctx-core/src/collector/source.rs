//! Counter readers: one call returns the current raw counters for one metric
//! family. Readers hold no delta state; that lives in [`crate::rates`].

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::parser::{
    self, CpuStatLines, DiskCounters, LoadAvg, MemInfo, NetCounters, ParseError, TcpCounters,
};
use super::traits::{FileSystem, RealFs};
use crate::config::CounterFamilies;

/// Errors that can occur while reading one counter family.
#[derive(Debug)]
pub enum CollectError {
    /// I/O error reading a counter file.
    Io(std::io::Error),
    /// Counter file had unexpected contents.
    Parse(String),
    /// The family cannot be read on this platform.
    Unsupported(&'static str),
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::Io(e) => write!(f, "I/O error: {}", e),
            CollectError::Parse(msg) => write!(f, "parse error: {}", msg),
            CollectError::Unsupported(what) => write!(f, "{} not supported on this platform", what),
        }
    }
}

impl std::error::Error for CollectError {}

impl From<std::io::Error> for CollectError {
    fn from(e: std::io::Error) -> Self {
        CollectError::Io(e)
    }
}

impl From<ParseError> for CollectError {
    fn from(e: ParseError) -> Self {
        CollectError::Parse(e.message)
    }
}

/// Thermal state of the package.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThermalReading {
    /// Temperature of the first thermal zone, when a sensor exists.
    pub temperature_c: Option<f64>,
    /// Sum of per-core throttle event counters, when the kernel exposes them.
    pub throttle_count: Option<u64>,
}

/// Network counters: per-interface bytes plus global TCP segments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkReading {
    pub interfaces: Vec<(String, NetCounters)>,
    pub tcp: Option<TcpCounters>,
}

/// Platform-specific source of raw OS counters.
///
/// Each method reads one family once. Implementations must not block for
/// long, but the sampler tolerates it: reads run on a worker thread with a
/// per-tick timeout.
pub trait CounterSource: Send {
    fn read_cpu_times(&mut self) -> Result<CpuStatLines, CollectError>;

    /// Current average core frequency, `None` when the platform does not report it.
    fn read_cpu_frequency_mhz(&mut self) -> Result<Option<f64>, CollectError>;

    fn read_thermal(&mut self) -> Result<ThermalReading, CollectError>;

    fn read_memory(&mut self) -> Result<MemInfo, CollectError>;

    /// Block devices worth accounting for (whole disks, no loop/ram devices).
    fn read_disks(&mut self) -> Result<Vec<(String, DiskCounters)>, CollectError>;

    /// Network interfaces except loopback, plus TCP segment counters.
    fn read_network(&mut self) -> Result<NetworkReading, CollectError>;

    fn read_load(&mut self) -> Result<LoadAvg, CollectError>;
}

/// Readings of every enabled family for one tick.
///
/// `None` means the family is disabled or its read failed this tick; failed
/// families are listed in `failed` with the error text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReadings {
    pub cpu: Option<CpuStatLines>,
    pub frequency_mhz: Option<f64>,
    pub thermal: Option<ThermalReading>,
    pub memory: Option<MemInfo>,
    pub disks: Option<Vec<(String, DiskCounters)>>,
    pub network: Option<NetworkReading>,
    pub load: Option<LoadAvg>,
    pub failed: Vec<(&'static str, String)>,
}

impl RawReadings {
    /// Reads every family enabled in `families`. A failing family never
    /// prevents the others from being read.
    pub fn read_all(source: &mut dyn CounterSource, families: &CounterFamilies) -> Self {
        let mut out = RawReadings::default();
        let failed = &mut out.failed;
        if families.cpu {
            out.cpu = keep(failed, "cpu", source.read_cpu_times());
            out.frequency_mhz =
                keep(failed, "cpu frequency", source.read_cpu_frequency_mhz()).flatten();
        }
        if families.thermal {
            out.thermal = keep(failed, "thermal", source.read_thermal());
        }
        if families.memory {
            out.memory = keep(failed, "memory", source.read_memory());
        }
        if families.disk {
            out.disks = keep(failed, "disk", source.read_disks());
        }
        if families.network {
            out.network = keep(failed, "network", source.read_network());
        }
        if families.load {
            out.load = keep(failed, "load", source.read_load());
        }
        out
    }
}

fn keep<T>(
    failed: &mut Vec<(&'static str, String)>,
    family: &'static str,
    result: Result<T, CollectError>,
) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(family, error = %e, "counter read failed");
            failed.push((family, e.to_string()));
            None
        }
    }
}

/// Whether a block device should contribute to disk rates.
///
/// Skips loop/ram devices and partitions (name ending in a digit, except
/// nvme namespaces such as `nvme0n1`, and nvme partitions `nvme0n1p1`).
pub fn is_relevant_disk(name: &str) -> bool {
    if name.starts_with("loop") || name.starts_with("ram") {
        return false;
    }
    if name.starts_with("nvme") {
        return !name.contains('p');
    }
    if name.starts_with("mmcblk") {
        return !name.contains('p');
    }
    !name.chars().last().is_some_and(|c| c.is_ascii_digit())
}

// ============ Linux procfs source ============

/// Reads counters from `/proc` and `/sys` through a [`FileSystem`].
pub struct ProcfsSource<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
    sys_path: PathBuf,
}

impl<F: FileSystem> ProcfsSource<F> {
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    /// * `sys_path` - Base path to sysfs (usually "/sys")
    pub fn new(fs: F, proc_path: impl Into<PathBuf>, sys_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            sys_path: sys_path.into(),
        }
    }

    /// Mutable access to the filesystem, for advancing mock counters in tests.
    pub fn fs_mut(&mut self) -> &mut F {
        &mut self.fs
    }

    fn read_proc(&self, name: &str) -> Result<String, CollectError> {
        Ok(self.fs.read_to_string(&self.proc_path.join(name))?)
    }

    fn throttle_count(&self) -> Option<u64> {
        let cpu_dir = self.sys_path.join("devices/system/cpu");
        let names = self.fs.child_names(&cpu_dir).ok()?;

        let mut total = None;
        for name in names {
            let is_cpu = name
                .strip_prefix("cpu")
                .is_some_and(|id| id.parse::<u32>().is_ok());
            if !is_cpu {
                continue;
            }
            let path = cpu_dir.join(&name).join("thermal_throttle/core_throttle_count");
            let Ok(content) = self.fs.read_to_string(&path) else {
                continue;
            };
            match parser::parse_u64_value(&content) {
                Ok(v) => total = Some(total.unwrap_or(0u64).saturating_add(v)),
                Err(e) => debug!(path = %path.display(), error = %e, "skipping throttle counter"),
            }
        }
        total
    }
}

impl<F: FileSystem> CounterSource for ProcfsSource<F> {
    fn read_cpu_times(&mut self) -> Result<CpuStatLines, CollectError> {
        Ok(parser::parse_cpu_stat(&self.read_proc("stat")?)?)
    }

    fn read_cpu_frequency_mhz(&mut self) -> Result<Option<f64>, CollectError> {
        Ok(parser::parse_cpuinfo_mhz(&self.read_proc("cpuinfo")?)?)
    }

    fn read_thermal(&mut self) -> Result<ThermalReading, CollectError> {
        let zone = self.sys_path.join("class/thermal/thermal_zone0/temp");
        let temperature_c = if self.fs.exists(&zone) {
            Some(parser::parse_millidegrees(&self.fs.read_to_string(&zone)?)?)
        } else {
            None
        };
        Ok(ThermalReading {
            temperature_c,
            throttle_count: self.throttle_count(),
        })
    }

    fn read_memory(&mut self) -> Result<MemInfo, CollectError> {
        Ok(parser::parse_meminfo(&self.read_proc("meminfo")?)?)
    }

    fn read_disks(&mut self) -> Result<Vec<(String, DiskCounters)>, CollectError> {
        let mut disks = parser::parse_diskstats(&self.read_proc("diskstats")?)?;
        disks.retain(|(name, _)| is_relevant_disk(name));
        Ok(disks)
    }

    fn read_network(&mut self) -> Result<NetworkReading, CollectError> {
        let mut interfaces = parser::parse_net_dev(&self.read_proc("net/dev")?)?;
        interfaces.retain(|(name, _)| name != "lo");

        // Missing snmp only disables the congestion signal.
        let tcp = match self.read_proc("net/snmp") {
            Ok(content) => Some(parser::parse_net_snmp_tcp(&content)?),
            Err(e) => {
                debug!(error = %e, "net/snmp unavailable");
                None
            }
        };
        Ok(NetworkReading { interfaces, tcp })
    }

    fn read_load(&mut self) -> Result<LoadAvg, CollectError> {
        Ok(parser::parse_loadavg(&self.read_proc("loadavg")?)?)
    }
}

// ============ Fallback ============

/// Source for platforms without a counter backend: every family fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedSource;

impl CounterSource for UnsupportedSource {
    fn read_cpu_times(&mut self) -> Result<CpuStatLines, CollectError> {
        Err(CollectError::Unsupported("cpu counters"))
    }

    fn read_cpu_frequency_mhz(&mut self) -> Result<Option<f64>, CollectError> {
        Ok(None)
    }

    fn read_thermal(&mut self) -> Result<ThermalReading, CollectError> {
        Ok(ThermalReading::default())
    }

    fn read_memory(&mut self) -> Result<MemInfo, CollectError> {
        Err(CollectError::Unsupported("memory counters"))
    }

    fn read_disks(&mut self) -> Result<Vec<(String, DiskCounters)>, CollectError> {
        Err(CollectError::Unsupported("disk counters"))
    }

    fn read_network(&mut self) -> Result<NetworkReading, CollectError> {
        Err(CollectError::Unsupported("network counters"))
    }

    fn read_load(&mut self) -> Result<LoadAvg, CollectError> {
        Err(CollectError::Unsupported("load average"))
    }
}

/// Picks the counter backend for the running platform.
pub fn default_counter_source(
    proc_path: &Path,
    sys_path: &Path,
) -> Box<dyn CounterSource + Send> {
    if cfg!(target_os = "linux") && RealFs.exists(&proc_path.join("stat")) {
        Box::new(ProcfsSource::new(RealFs::new(), proc_path, sys_path))
    } else {
        warn!(proc = %proc_path.display(), "no counter backend available, samples will be zero");
        Box::new(UnsupportedSource)
    }
}
