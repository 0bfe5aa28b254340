//! Static platform snapshot consumed by reliability and environment scoring.
//!
//! Detection is best-effort: anything that cannot be read keeps its default.
//! Full hardware fingerprinting (DMI tables, memory timings) is out of reach
//! of `/proc` and `/sys` and stays at zero/unknown.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collector::{is_relevant_disk, parser, FileSystem, RealFs};

/// Logical CPUs available to this process.
pub fn core_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Class of the primary storage device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageKind {
    #[serde(rename = "NVMe")]
    Nvme,
    #[serde(rename = "SATA SSD")]
    SataSsd,
    #[serde(rename = "HDD")]
    Hdd,
    #[default]
    Unknown,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StorageKind::Nvme => "NVMe",
            StorageKind::SataSsd => "SATA SSD",
            StorageKind::Hdd => "HDD",
            StorageKind::Unknown => "Unknown",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformInfo {
    pub cpu_model: String,
    pub cpu_cores: u32,
    pub cpu_threads: u32,
    pub cpu_base_frequency_ghz: f64,
    pub cpu_max_frequency_ghz: f64,
    pub cpu_architecture: String,
    pub hyperthreading_enabled: bool,
    /// Linux cpufreq governor, e.g. `performance` or `powersave`.
    pub cpu_governor: String,

    pub l1_cache_size_kb: u32,
    pub l2_cache_size_kb: u32,
    pub l3_cache_size_kb: u32,

    pub total_memory_gb: f64,
    pub memory_frequency_mhz: f64,
    pub numa_enabled: bool,
    pub numa_nodes: u32,

    pub primary_storage_type: StorageKind,

    pub os_name: String,
    pub os_version: String,
    pub kernel_version: String,

    pub is_virtualized: bool,
    pub virtualization_type: String,

    pub turbo_boost_enabled: bool,
    pub power_profile: String,
    pub performance_issues: Vec<String>,
}

impl PlatformInfo {
    pub fn is_power_saving(&self) -> bool {
        self.cpu_governor == "powersave"
    }

    /// Relative performance estimate in [0, 100].
    ///
    /// Base 50 plus capped contributions for cores, frequency, memory size
    /// and speed, storage class and caches; then multiplied down for
    /// virtualization (×0.8), disabled turbo (×0.9) and powersave (×0.7).
    pub fn performance_score(&self) -> f64 {
        let mut score = 50.0;

        if self.cpu_cores > 0 {
            score += (f64::from(self.cpu_cores) * 2.5).min(20.0);
        }
        if self.cpu_max_frequency_ghz > 0.0 {
            score += ((self.cpu_max_frequency_ghz - 1.0) * 10.0).min(20.0);
        }
        if self.total_memory_gb > 0.0 {
            score += (self.total_memory_gb / 2.0).min(20.0);
        }
        if self.memory_frequency_mhz > 0.0 {
            score += ((self.memory_frequency_mhz - 1600.0) / 400.0).min(10.0);
        }
        score += match self.primary_storage_type {
            StorageKind::Nvme => 15.0,
            StorageKind::SataSsd => 10.0,
            StorageKind::Hdd => 2.0,
            StorageKind::Unknown => 0.0,
        };
        if self.l3_cache_size_kb > 0 {
            score += (f64::from(self.l3_cache_size_kb) / 1024.0).min(5.0);
        }
        if self.l2_cache_size_kb > 0 {
            score += (f64::from(self.l2_cache_size_kb) / 512.0).min(5.0);
        }

        if self.is_virtualized {
            score *= 0.8;
        }
        if !self.turbo_boost_enabled {
            score *= 0.9;
        }
        if self.is_power_saving() {
            score *= 0.7;
        }
        score.clamp(0.0, 100.0)
    }

    pub fn performance_class(&self) -> &'static str {
        let score = self.performance_score();
        if score >= 80.0 {
            "High Performance"
        } else if score >= 60.0 {
            "Medium Performance"
        } else if score >= 40.0 {
            "Low Performance"
        } else {
            "Very Low Performance"
        }
    }

    /// One-line description, e.g.
    /// "Intel Xeon (8/16 cores) @ 3.5 GHz, 32 GB RAM, NVMe on Linux".
    pub fn summary(&self) -> String {
        let mut s = self.cpu_model.clone();
        if self.cpu_cores > 0 {
            if self.cpu_threads > self.cpu_cores {
                s.push_str(&format!(" ({}/{} cores)", self.cpu_cores, self.cpu_threads));
            } else {
                s.push_str(&format!(" ({} cores)", self.cpu_cores));
            }
        }
        if self.cpu_max_frequency_ghz > 0.0 {
            s.push_str(&format!(" @ {:.1} GHz", self.cpu_max_frequency_ghz));
        }
        if self.total_memory_gb > 0.0 {
            s.push_str(&format!(", {:.0} GB RAM", self.total_memory_gb));
        }
        if self.primary_storage_type != StorageKind::Unknown {
            s.push_str(&format!(", {}", self.primary_storage_type));
        }
        if !self.os_name.is_empty() {
            s.push_str(&format!(" on {}", self.os_name));
        }
        if self.is_virtualized {
            s.push_str(" (Virtualized)");
        }
        s
    }

    /// Configuration problems that degrade benchmark results.
    pub fn detect_issues(&self) -> Vec<String> {
        let checks = [
            (self.is_power_saving(), "CPU governor set to 'powersave' mode"),
            (!self.turbo_boost_enabled, "CPU turbo boost is disabled"),
            (self.is_virtualized, "Running in virtualized environment"),
            (self.total_memory_gb < 8.0, "Low system memory (< 8GB)"),
            (
                self.primary_storage_type == StorageKind::Hdd,
                "Using traditional hard drive storage",
            ),
            (self.cpu_cores < 4, "Low CPU core count (< 4 cores)"),
            (self.cpu_max_frequency_ghz < 2.0, "Low CPU frequency (< 2.0 GHz)"),
        ];
        checks
            .into_iter()
            .filter(|(hit, _)| *hit)
            .map(|(_, msg)| msg.to_string())
            .collect()
    }

    pub fn optimization_recommendations(&self) -> OptimizationRecommendations {
        let mut rec = OptimizationRecommendations::default();

        if self.is_power_saving() {
            rec.cpu.push("Set CPU governor to 'performance' mode".into());
            rec.cpu.push("sudo cpupower frequency-set -g performance".into());
        }
        if !self.turbo_boost_enabled {
            rec.cpu.push("Enable CPU turbo boost".into());
            rec.cpu
                .push("echo 0 | sudo tee /sys/devices/system/cpu/intel_pstate/no_turbo".into());
        }
        if self.total_memory_gb < 8.0 {
            rec.memory
                .push("Consider upgrading system memory to 8GB or more".into());
        }
        if self.numa_enabled && self.numa_nodes > 1 {
            rec.memory.push("Consider NUMA-aware application tuning".into());
            rec.memory
                .push("Use 'numactl' for memory binding in benchmarks".into());
        }
        if self.primary_storage_type == StorageKind::Hdd {
            rec.storage
                .push("Consider upgrading to SSD storage for better I/O performance".into());
        }
        if self.is_virtualized {
            rec.system
                .push("For best performance, run benchmarks on bare metal".into());
            rec.system
                .push("Ensure VM has adequate CPU and memory allocation".into());
        }
        rec.system
            .push("Disable unnecessary services during benchmarking".into());
        rec.system
            .push("Set CPU affinity for benchmark processes".into());
        rec
    }
}

/// Platforms whose performance scores differ by at most 20 points.
pub fn are_comparable_platforms(a: &PlatformInfo, b: &PlatformInfo) -> bool {
    (a.performance_score() - b.performance_score()).abs() <= 20.0
}

/// Human-readable capability comparison of two platforms.
pub fn compare_capability(a: &PlatformInfo, b: &PlatformInfo) -> String {
    let diff = a.performance_score() - b.performance_score();
    if diff.abs() < 5.0 {
        "Platforms have similar performance capability".to_string()
    } else if diff > 0.0 {
        format!("Platform 1 is approximately {}% more capable", diff as i64)
    } else {
        format!("Platform 2 is approximately {}% more capable", (-diff) as i64)
    }
}

/// Tuning advice grouped by subsystem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRecommendations {
    pub cpu: Vec<String>,
    pub memory: Vec<String>,
    pub storage: Vec<String>,
    pub system: Vec<String>,
}

impl OptimizationRecommendations {
    pub fn all(&self) -> Vec<String> {
        self.cpu
            .iter()
            .chain(&self.memory)
            .chain(&self.storage)
            .chain(&self.system)
            .cloned()
            .collect()
    }

    pub fn has_recommendations(&self) -> bool {
        !(self.cpu.is_empty()
            && self.memory.is_empty()
            && self.storage.is_empty()
            && self.system.is_empty())
    }
}

// ============================================================
// Sources
// ============================================================

/// Supplies a platform snapshot.
pub trait PlatformSource: Send {
    fn detect(&mut self) -> PlatformInfo;
}

/// Fixed snapshot, for tests and for results loaded from disk.
impl PlatformSource for PlatformInfo {
    fn detect(&mut self) -> PlatformInfo {
        self.clone()
    }
}

/// Detects once and serves the cached snapshot until [`refresh`](Self::refresh).
pub struct CachedPlatform<S: PlatformSource> {
    source: S,
    cached: Option<PlatformInfo>,
}

impl<S: PlatformSource> CachedPlatform<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cached: None,
        }
    }

    pub fn get(&mut self) -> &PlatformInfo {
        self.cached.get_or_insert_with(|| self.source.detect())
    }

    /// Discards the cache and detects again.
    pub fn refresh(&mut self) -> &PlatformInfo {
        self.cached = None;
        self.get()
    }
}

/// Best-effort detection from `/proc`, `/sys` and `/etc/os-release`.
pub struct ProcPlatformSource<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
    sys_path: PathBuf,
    os_release: PathBuf,
}

impl ProcPlatformSource<RealFs> {
    pub fn system() -> Self {
        Self::new(RealFs::new(), "/proc", "/sys")
    }
}

impl<F: FileSystem> ProcPlatformSource<F> {
    pub fn new(fs: F, proc_path: impl Into<PathBuf>, sys_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            sys_path: sys_path.into(),
            os_release: PathBuf::from("/etc/os-release"),
        }
    }

    fn read(&self, path: &Path) -> Option<String> {
        match self.fs.read_to_string(path) {
            Ok(s) => Some(s),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "platform probe unavailable");
                None
            }
        }
    }

    fn read_sys(&self, rel: &str) -> Option<String> {
        self.read(&self.sys_path.join(rel)).map(|s| s.trim().to_string())
    }

    fn detect_cpu(&self, info: &mut PlatformInfo) {
        if let Some(cpuinfo) = self.read(&self.proc_path.join("cpuinfo")) {
            apply_cpuinfo(&cpuinfo, info);
        }

        if let Some(gov) = self.read_sys("devices/system/cpu/cpu0/cpufreq/scaling_governor") {
            info.cpu_governor = gov;
        }
        info.cpu_max_frequency_ghz = self
            .read_sys("devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq")
            .and_then(|khz| khz.parse::<f64>().ok())
            .map(|khz| khz / 1_000_000.0)
            .unwrap_or(info.cpu_base_frequency_ghz);

        if let Some(size) = self.read_sys("devices/system/cpu/cpu0/cache/index0/size") {
            info.l1_cache_size_kb = parse_cache_size_kb(&size).unwrap_or(0);
        }
        if let Some(size) = self.read_sys("devices/system/cpu/cpu0/cache/index2/size") {
            info.l2_cache_size_kb = parse_cache_size_kb(&size).unwrap_or(0);
        }
        if let Some(size) = self.read_sys("devices/system/cpu/cpu0/cache/index3/size") {
            info.l3_cache_size_kb = parse_cache_size_kb(&size).unwrap_or(info.l3_cache_size_kb);
        }

        info.turbo_boost_enabled = match (
            self.read_sys("devices/system/cpu/intel_pstate/no_turbo"),
            self.read_sys("devices/system/cpu/cpufreq/boost"),
        ) {
            (Some(no_turbo), _) => no_turbo != "1",
            (None, Some(boost)) => boost != "0",
            (None, None) => true,
        };
        info.power_profile = match info.cpu_governor.as_str() {
            "performance" => "Performance",
            "powersave" => "Power Saving",
            _ => "Balanced",
        }
        .to_string();
    }

    fn detect_memory(&self, info: &mut PlatformInfo) {
        if let Some(mem) = self
            .read(&self.proc_path.join("meminfo"))
            .and_then(|c| parser::parse_meminfo(&c).ok())
        {
            info.total_memory_gb = mem.mem_total_kb as f64 / (1024.0 * 1024.0);
        }

        let node_dir = self.sys_path.join("devices/system/node");
        let nodes = self
            .fs
            .child_names(&node_dir)
            .map(|names| {
                names
                    .iter()
                    .filter(|n| n.strip_prefix("node").is_some_and(|id| id.parse::<u32>().is_ok()))
                    .count() as u32
            })
            .unwrap_or(0);
        info.numa_nodes = nodes.max(1);
        info.numa_enabled = nodes > 1;
    }

    fn detect_storage(&self, info: &mut PlatformInfo) {
        let Ok(mut disks) = self.fs.child_names(&self.sys_path.join("block")) else {
            return;
        };
        disks.retain(|n| is_relevant_disk(n));

        let Some(first) = disks.first() else {
            return;
        };
        let rotational = self.read_sys(&format!("block/{first}/queue/rotational"));
        info.primary_storage_type = match rotational.as_deref() {
            Some("1") => StorageKind::Hdd,
            Some(_) if disks.iter().any(|d| d.starts_with("nvme")) => StorageKind::Nvme,
            Some(_) => StorageKind::SataSsd,
            None => StorageKind::Unknown,
        };
    }

    fn detect_os(&self, info: &mut PlatformInfo) {
        info.os_name = "Linux".to_string();
        info.cpu_architecture = std::env::consts::ARCH.to_string();
        if let Some(release) = self.read(&self.proc_path.join("sys/kernel/osrelease")) {
            info.kernel_version = release.trim().to_string();
        }
        if let Some(os_release) = self.read(&self.os_release) {
            info.os_version = parse_pretty_name(&os_release).unwrap_or_default();
        }
    }

    fn detect_virtualization(&self, info: &mut PlatformInfo) {
        if let Some(vendor) = self.read_sys("class/dmi/id/sys_vendor") {
            let kind = [
                ("VMware", "VMware"),
                ("QEMU", "QEMU/KVM"),
                ("VirtualBox", "VirtualBox"),
                ("Microsoft", "Hyper-V"),
            ]
            .into_iter()
            .find(|(needle, _)| vendor.contains(needle));
            if let Some((_, kind)) = kind {
                info.is_virtualized = true;
                info.virtualization_type = kind.to_string();
            }
        }
        if let Some(cgroup) = self.read(&self.proc_path.join("1/cgroup"))
            && (cgroup.contains("docker") || cgroup.contains("containerd"))
        {
            info.is_virtualized = true;
            info.virtualization_type = "Container".to_string();
        }
    }
}

impl<F: FileSystem> PlatformSource for ProcPlatformSource<F> {
    fn detect(&mut self) -> PlatformInfo {
        let mut info = PlatformInfo::default();
        self.detect_cpu(&mut info);
        self.detect_memory(&mut info);
        self.detect_storage(&mut info);
        self.detect_os(&mut info);
        self.detect_virtualization(&mut info);
        info.performance_issues = info.detect_issues();
        debug!(summary = %info.summary(), score = info.performance_score(), "platform detected");
        info
    }
}

/// Fills model, thread/core counts, base frequency, L3 size and the
/// hypervisor flag from `/proc/cpuinfo`.
fn apply_cpuinfo(content: &str, info: &mut PlatformInfo) {
    let mut threads = 0u32;
    let mut cores = HashSet::new();
    let mut physical_id = "";

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "processor" => threads += 1,
            "model name" if info.cpu_model.is_empty() => info.cpu_model = value.to_string(),
            "physical id" => physical_id = value,
            "core id" => {
                cores.insert((physical_id, value));
            }
            "cache size" => {
                if let Some(kb) = parse_cache_size_kb(value) {
                    info.l3_cache_size_kb = kb;
                }
            }
            "flags" if value.split_whitespace().any(|f| f == "hypervisor") => {
                info.is_virtualized = true;
                info.virtualization_type = "Hypervisor".to_string();
            }
            _ => {}
        }
    }

    if let Ok(Some(mhz)) = parser::parse_cpuinfo_mhz(content) {
        info.cpu_base_frequency_ghz = mhz / 1000.0;
    }
    info.cpu_threads = threads;
    info.cpu_cores = if cores.is_empty() {
        threads
    } else {
        cores.len() as u32
    };
    info.hyperthreading_enabled = info.cpu_threads > info.cpu_cores;
}

/// Parses sizes like `32K`, `1024K`, `12288 KB` or `8M` into kB.
fn parse_cache_size_kb(s: &str) -> Option<u32> {
    let s = s.trim();
    let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let value: u32 = s[..digits_end].parse().ok()?;
    match s[digits_end..].trim().to_ascii_uppercase().as_str() {
        "" | "K" | "KB" => Some(value),
        "M" | "MB" => Some(value * 1024),
        _ => None,
    }
}

fn parse_pretty_name(os_release: &str) -> Option<String> {
    os_release.lines().find_map(|line| {
        line.strip_prefix("PRETTY_NAME=")
            .map(|v| v.trim().trim_matches('"').to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockFs;

    fn workstation() -> PlatformInfo {
        PlatformInfo {
            cpu_model: "Test CPU".into(),
            cpu_cores: 8,
            cpu_threads: 16,
            cpu_max_frequency_ghz: 4.0,
            total_memory_gb: 32.0,
            memory_frequency_mhz: 3200.0,
            primary_storage_type: StorageKind::Nvme,
            l3_cache_size_kb: 16384,
            l2_cache_size_kb: 1024,
            turbo_boost_enabled: true,
            cpu_governor: "performance".into(),
            os_name: "Linux".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_performance_score_caps_at_100() {
        // 50 + 20 + 20 + 16 + 4 + 15 + 5 + 2 = 132 -> 100
        assert_eq!(workstation().performance_score(), 100.0);
    }

    #[test]
    fn test_performance_score_components() {
        let p = PlatformInfo {
            cpu_cores: 2,
            cpu_max_frequency_ghz: 2.0,
            total_memory_gb: 8.0,
            primary_storage_type: StorageKind::Hdd,
            turbo_boost_enabled: true,
            ..Default::default()
        };
        // 50 + 5 + 10 + 4 + 2
        assert!((p.performance_score() - 71.0).abs() < 1e-9);
    }

    #[test]
    fn test_performance_score_penalties_multiply() {
        let p = PlatformInfo {
            cpu_cores: 2,
            cpu_max_frequency_ghz: 2.0,
            total_memory_gb: 8.0,
            primary_storage_type: StorageKind::Hdd,
            turbo_boost_enabled: false,
            is_virtualized: true,
            cpu_governor: "powersave".into(),
            ..Default::default()
        };
        assert!((p.performance_score() - 71.0 * 0.8 * 0.9 * 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_detect_issues() {
        let mut p = workstation();
        assert!(p.detect_issues().is_empty());
        p.cpu_governor = "powersave".into();
        p.primary_storage_type = StorageKind::Hdd;
        assert_eq!(
            p.detect_issues(),
            vec![
                "CPU governor set to 'powersave' mode".to_string(),
                "Using traditional hard drive storage".to_string(),
            ]
        );
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            workstation().summary(),
            "Test CPU (8/16 cores) @ 4.0 GHz, 32 GB RAM, NVMe on Linux"
        );
    }

    #[test]
    fn test_comparable_platforms() {
        let a = workstation();
        let mut b = workstation();
        assert!(are_comparable_platforms(&a, &b));
        assert_eq!(compare_capability(&a, &b), "Platforms have similar performance capability");

        // 132 raw points * 0.8 * 0.9 * 0.7 = 66.5
        b.cpu_governor = "powersave".into();
        b.turbo_boost_enabled = false;
        b.is_virtualized = true;
        assert!(!are_comparable_platforms(&a, &b));
        assert_eq!(compare_capability(&a, &b), "Platform 1 is approximately 33% more capable");
        assert_eq!(compare_capability(&b, &a), "Platform 2 is approximately 33% more capable");
    }

    #[test]
    fn test_recommendations_always_have_system_advice() {
        let rec = workstation().optimization_recommendations();
        assert!(rec.has_recommendations());
        assert!(rec.cpu.is_empty());
        assert_eq!(rec.all().len(), 2);
    }

    #[test]
    fn test_cached_platform_refresh() {
        struct Counting(u32);
        impl PlatformSource for Counting {
            fn detect(&mut self) -> PlatformInfo {
                self.0 += 1;
                PlatformInfo {
                    cpu_cores: self.0,
                    ..Default::default()
                }
            }
        }

        let mut cached = CachedPlatform::new(Counting(0));
        assert_eq!(cached.get().cpu_cores, 1);
        assert_eq!(cached.get().cpu_cores, 1);
        assert_eq!(cached.refresh().cpu_cores, 2);
    }

    #[test]
    fn test_parse_cache_size() {
        assert_eq!(parse_cache_size_kb("32K"), Some(32));
        assert_eq!(parse_cache_size_kb("12288 KB"), Some(12288));
        assert_eq!(parse_cache_size_kb("8M"), Some(8192));
        assert_eq!(parse_cache_size_kb("big"), None);
    }

    #[test]
    fn test_proc_platform_source_typical_system() {
        let mut fs = MockFs::typical_system();
        fs.add_file("/etc/os-release", "NAME=\"Ubuntu\"\nPRETTY_NAME=\"Ubuntu 24.04 LTS\"\n");
        fs.add_file("/proc/sys/kernel/osrelease", "6.8.0-31-generic\n");
        fs.add_file("/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq", "4600000\n");
        fs.add_file("/sys/devices/system/cpu/cpu0/cache/index2/size", "256K\n");
        fs.add_dir("/sys/devices/system/node/node0");

        let info = ProcPlatformSource::new(fs, "/proc", "/sys").detect();
        assert_eq!(info.cpu_model, "Intel(R) Core(TM) i7-8700 CPU @ 3.20GHz");
        assert_eq!(info.cpu_threads, 4);
        assert_eq!(info.cpu_cores, 4);
        assert!((info.cpu_max_frequency_ghz - 4.6).abs() < 1e-9);
        assert!((info.cpu_base_frequency_ghz - 2.4).abs() < 1e-9);
        assert_eq!(info.l2_cache_size_kb, 256);
        assert_eq!(info.l3_cache_size_kb, 12288);
        assert_eq!(info.cpu_governor, "performance");
        assert!(info.turbo_boost_enabled);
        // nvme0n1 sorts before sda and is non-rotational.
        assert_eq!(info.primary_storage_type, StorageKind::Nvme);
        assert_eq!(info.numa_nodes, 1);
        assert!(!info.numa_enabled);
        assert_eq!(info.os_version, "Ubuntu 24.04 LTS");
        assert_eq!(info.kernel_version, "6.8.0-31-generic");
        assert!(!info.is_virtualized);
        assert!(info.performance_issues.is_empty());
    }

    #[test]
    fn test_proc_platform_source_rotational_disk() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/block/sda/queue/rotational", "1\n");
        fs.add_file("/sys/block/sda1/queue/rotational", "1\n");
        let info = ProcPlatformSource::new(fs, "/proc", "/sys").detect();
        assert_eq!(info.primary_storage_type, StorageKind::Hdd);
        assert!(info
            .performance_issues
            .contains(&"Using traditional hard drive storage".to_string()));
    }

    #[test]
    fn test_proc_platform_source_detects_container_and_no_turbo() {
        let mut fs = MockFs::typical_system();
        fs.add_file("/proc/1/cgroup", "0::/system.slice/docker-abc.scope\n");
        fs.add_file("/sys/devices/system/cpu/intel_pstate/no_turbo", "1\n");
        let info = ProcPlatformSource::new(fs, "/proc", "/sys").detect();
        assert!(info.is_virtualized);
        assert_eq!(info.virtualization_type, "Container");
        assert!(!info.turbo_boost_enabled);
    }
}
