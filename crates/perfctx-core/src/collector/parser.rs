//! Parsers for the `/proc` and `/sys` files the counter readers consume.
//!
//! Pure functions over string contents, so every format quirk is testable
//! without touching a real kernel.

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

fn field_u64(parts: &[&str], idx: usize) -> u64 {
    parts.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0)
}

// ============ /proc/stat ============

/// Cumulative CPU tick counters for one CPU line of `/proc/stat`.
///
/// `guest` and `guest_nice` are already folded into `user`/`nice` by the
/// kernel and are not tracked separately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    pub fn total(&self) -> u64 {
        self.user
            .saturating_add(self.nice)
            .saturating_add(self.system)
            .saturating_add(self.idle)
            .saturating_add(self.iowait)
            .saturating_add(self.irq)
            .saturating_add(self.softirq)
            .saturating_add(self.steal)
    }

    /// Ticks spent doing work: everything except idle and iowait.
    pub fn active(&self) -> u64 {
        self.total()
            .saturating_sub(self.idle)
            .saturating_sub(self.iowait)
    }
}

/// CPU lines of `/proc/stat`: the aggregate `cpu` line plus one entry per core.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuStatLines {
    pub aggregate: CpuTimes,
    /// `(core id, counters)` in file order.
    pub cores: Vec<(u32, CpuTimes)>,
}

/// Parses the `cpu*` lines of `/proc/stat`.
///
/// Fails when no aggregate `cpu` line is present; other lines are ignored.
pub fn parse_cpu_stat(content: &str) -> Result<CpuStatLines, ParseError> {
    let mut aggregate = None;
    let mut cores = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(label) = parts.first() else {
            continue;
        };
        let Some(suffix) = label.strip_prefix("cpu") else {
            continue;
        };
        if parts.len() < 5 {
            return Err(ParseError::new(format!("truncated cpu line: {line}")));
        }

        let times = CpuTimes {
            user: field_u64(&parts, 1),
            nice: field_u64(&parts, 2),
            system: field_u64(&parts, 3),
            idle: field_u64(&parts, 4),
            iowait: field_u64(&parts, 5),
            irq: field_u64(&parts, 6),
            softirq: field_u64(&parts, 7),
            steal: field_u64(&parts, 8),
        };

        if suffix.is_empty() {
            aggregate = Some(times);
        } else if let Ok(id) = suffix.parse::<u32>() {
            cores.push((id, times));
        }
    }

    let aggregate = aggregate.ok_or_else(|| ParseError::new("missing aggregate cpu line"))?;
    Ok(CpuStatLines { aggregate, cores })
}

// ============ /proc/meminfo ============

/// Memory figures from `/proc/meminfo`, in kB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub mem_total_kb: u64,
    pub mem_free_kb: u64,
    pub mem_available_kb: u64,
}

/// Parses `/proc/meminfo` content.
///
/// Older kernels lack `MemAvailable`; `MemFree` is used in its place.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let mut info = MemInfo::default();
    let mut saw_available = false;

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let value = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        match key {
            "MemTotal" => info.mem_total_kb = value,
            "MemFree" => info.mem_free_kb = value,
            "MemAvailable" => {
                info.mem_available_kb = value;
                saw_available = true;
            }
            _ => {}
        }
    }

    if info.mem_total_kb == 0 {
        return Err(ParseError::new("MemTotal missing or zero"));
    }
    if !saw_available {
        info.mem_available_kb = info.mem_free_kb;
    }
    Ok(info)
}

// ============ /proc/loadavg ============

/// Parsed data from `/proc/loadavg`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadAvg {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
    pub running: u32,
    /// Total scheduling entities (processes and threads) on the system.
    pub total: u32,
}

/// Parses `/proc/loadavg` content, e.g. `0.52 0.58 0.59 2/1345 98765`.
pub fn parse_loadavg(content: &str) -> Result<LoadAvg, ParseError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 4 {
        return Err(ParseError::new("invalid loadavg format"));
    }

    let load = |idx: usize, name: &str| -> Result<f64, ParseError> {
        parts[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {name}")))
    };

    let (running, total) = parts[3]
        .split_once('/')
        .map(|(r, t)| (r.parse().unwrap_or(0), t.parse().unwrap_or(0)))
        .unwrap_or((0, 0));

    Ok(LoadAvg {
        load1: load(0, "load1")?,
        load5: load(1, "load5")?,
        load15: load(2, "load15")?,
        running,
        total,
    })
}

// ============ /proc/diskstats ============

/// Cumulative counters for one block device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskCounters {
    pub reads: u64,
    pub read_sectors: u64,
    pub writes: u64,
    pub write_sectors: u64,
}

/// Parses `/proc/diskstats` into `(device name, counters)` pairs.
///
/// Lines with fewer than the 14 classic columns are skipped.
pub fn parse_diskstats(content: &str) -> Result<Vec<(String, DiskCounters)>, ParseError> {
    let mut disks = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 {
            continue;
        }
        disks.push((
            parts[2].to_string(),
            DiskCounters {
                reads: field_u64(&parts, 3),
                read_sectors: field_u64(&parts, 5),
                writes: field_u64(&parts, 7),
                write_sectors: field_u64(&parts, 9),
            },
        ));
    }

    Ok(disks)
}

// ============ /proc/net/dev ============

/// Cumulative byte counters for one network interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Parses `/proc/net/dev` into `(interface, counters)` pairs.
///
/// ```text
/// Inter-|   Receive                            |  Transmit
///  face |bytes    packets errs drop fifo frame ...|bytes    packets ...
///  eth0: 1234567     1234    0    0    0     0 ...  7654321     4321 ...
/// ```
pub fn parse_net_dev(content: &str) -> Result<Vec<(String, NetCounters)>, ParseError> {
    let mut interfaces = Vec::new();

    for line in content.lines() {
        if line.contains('|') {
            continue;
        }
        let Some((name, values)) = line.split_once(':') else {
            continue;
        };
        let values: Vec<&str> = values.split_whitespace().collect();
        if values.len() < 16 {
            continue;
        }
        interfaces.push((
            name.trim().to_string(),
            NetCounters {
                rx_bytes: field_u64(&values, 0),
                tx_bytes: field_u64(&values, 8),
            },
        ));
    }

    Ok(interfaces)
}

// ============ /proc/net/snmp ============

/// Cumulative TCP segment counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcpCounters {
    pub out_segs: u64,
    pub retrans_segs: u64,
}

/// Extracts TCP segment counters from `/proc/net/snmp`.
///
/// Each protocol occupies a header line of field names followed by a line of
/// values with the same `Proto:` prefix.
pub fn parse_net_snmp_tcp(content: &str) -> Result<TcpCounters, ParseError> {
    let mut lines = content.lines().filter(|l| l.starts_with("Tcp:"));
    let (Some(header), Some(values)) = (lines.next(), lines.next()) else {
        return Err(ParseError::new("no Tcp section in snmp"));
    };

    let mut counters = TcpCounters::default();
    for (key, value) in header
        .split_whitespace()
        .skip(1)
        .zip(values.split_whitespace().skip(1))
    {
        let value = value.parse::<u64>().unwrap_or(0);
        match key {
            "OutSegs" => counters.out_segs = value,
            "RetransSegs" => counters.retrans_segs = value,
            _ => {}
        }
    }
    Ok(counters)
}

// ============ /proc/cpuinfo ============

/// Averages every `cpu MHz` line of `/proc/cpuinfo`.
///
/// Returns `Ok(None)` when the file has no such lines (common on ARM).
pub fn parse_cpuinfo_mhz(content: &str) -> Result<Option<f64>, ParseError> {
    let mut sum = 0.0;
    let mut count = 0u32;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if key.trim() != "cpu MHz" {
            continue;
        }
        let mhz: f64 = value
            .trim()
            .parse()
            .map_err(|_| ParseError::new(format!("invalid cpu MHz value: {}", value.trim())))?;
        sum += mhz;
        count += 1;
    }

    Ok((count > 0).then(|| sum / f64::from(count)))
}

// ============ /sys single-value files ============

/// Parses a thermal zone `temp` file (millidegrees Celsius) into degrees.
pub fn parse_millidegrees(content: &str) -> Result<f64, ParseError> {
    let raw: i64 = content
        .trim()
        .parse()
        .map_err(|_| ParseError::new(format!("invalid temperature: {}", content.trim())))?;
    Ok(raw as f64 / 1000.0)
}

/// Parses a single unsigned counter such as `thermal_throttle/core_throttle_count`.
pub fn parse_u64_value(content: &str) -> Result<u64, ParseError> {
    content
        .trim()
        .parse()
        .map_err(|_| ParseError::new(format!("invalid counter value: {}", content.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROC_STAT: &str = "\
cpu  10132153 290696 3084719 46828483 16683 0 25195 0 175628 0
cpu0 1393280 32966 572056 13343292 6130 0 17875 0 23933 0
cpu1 1335302 29285 537470 13422054 6113 0 3052 0 34566 0
intr 199292 0 9 0 0 0 0 3 0 1 0
ctxt 12345678
btime 1700000000
procs_running 2
";

    #[test]
    fn test_parse_cpu_stat() {
        let stat = parse_cpu_stat(PROC_STAT).unwrap();
        assert_eq!(stat.aggregate.user, 10132153);
        assert_eq!(stat.aggregate.iowait, 16683);
        assert_eq!(stat.cores.len(), 2);
        assert_eq!(stat.cores[1].0, 1);
        assert_eq!(stat.cores[1].1.idle, 13422054);
    }

    #[test]
    fn test_cpu_times_active_excludes_idle_and_iowait() {
        let t = CpuTimes {
            user: 50,
            system: 20,
            idle: 100,
            iowait: 30,
            ..Default::default()
        };
        assert_eq!(t.total(), 200);
        assert_eq!(t.active(), 70);
    }

    #[test]
    fn test_parse_cpu_stat_short_line_tolerated() {
        // Pre-2.6 kernels only have four counters.
        let stat = parse_cpu_stat("cpu 1 2 3 4\ncpu0 1 2 3 4\n").unwrap();
        assert_eq!(stat.aggregate.idle, 4);
        assert_eq!(stat.aggregate.iowait, 0);
    }

    #[test]
    fn test_parse_cpu_stat_missing_aggregate() {
        assert!(parse_cpu_stat("cpu0 1 2 3 4 5\n").is_err());
        assert!(parse_cpu_stat("").is_err());
    }

    #[test]
    fn test_parse_meminfo() {
        let content = "\
MemTotal:       16384000 kB
MemFree:         2048000 kB
MemAvailable:    8192000 kB
Buffers:          512000 kB
";
        let info = parse_meminfo(content).unwrap();
        assert_eq!(info.mem_total_kb, 16384000);
        assert_eq!(info.mem_available_kb, 8192000);
    }

    #[test]
    fn test_parse_meminfo_without_available_falls_back_to_free() {
        let info = parse_meminfo("MemTotal: 1000 kB\nMemFree: 400 kB\n").unwrap();
        assert_eq!(info.mem_available_kb, 400);
    }

    #[test]
    fn test_parse_meminfo_empty() {
        assert!(parse_meminfo("").is_err());
    }

    #[test]
    fn test_parse_loadavg() {
        let avg = parse_loadavg("0.52 0.58 0.59 2/1345 98765\n").unwrap();
        assert!((avg.load1 - 0.52).abs() < 1e-9);
        assert!((avg.load5 - 0.58).abs() < 1e-9);
        assert_eq!(avg.running, 2);
        assert_eq!(avg.total, 1345);
    }

    #[test]
    fn test_parse_loadavg_invalid() {
        assert!(parse_loadavg("0.5 0.5").is_err());
        assert!(parse_loadavg("abc 0.5 0.5 1/2 3").is_err());
    }

    #[test]
    fn test_parse_diskstats() {
        let content = "\
   8       0 sda 12345 100 987654 5000 6789 200 456789 3000 0 7000 8000
   8       1 sda1 100 0 2000 10 50 0 1000 5 0 15 15
   7       0 loop0 10 0 20 0 0 0 0 0 0 0 0
 259       0 nvme0n1 1 2 3
";
        let disks = parse_diskstats(content).unwrap();
        assert_eq!(disks.len(), 3);
        assert_eq!(disks[0].0, "sda");
        assert_eq!(disks[0].1.reads, 12345);
        assert_eq!(disks[0].1.read_sectors, 987654);
        assert_eq!(disks[0].1.writes, 6789);
        assert_eq!(disks[0].1.write_sectors, 456789);
    }

    #[test]
    fn test_parse_net_dev() {
        let content = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 1000 10 0 0 0 0 0 0 1000 10 0 0 0 0 0 0
  eth0: 5000000 4000 0 0 0 0 0 0 2000000 3000 0 0 0 0 0 0
";
        let ifaces = parse_net_dev(content).unwrap();
        assert_eq!(ifaces.len(), 2);
        assert_eq!(ifaces[1].0, "eth0");
        assert_eq!(ifaces[1].1.rx_bytes, 5000000);
        assert_eq!(ifaces[1].1.tx_bytes, 2000000);
    }

    #[test]
    fn test_parse_net_snmp_tcp() {
        let content = "\
Ip: Forwarding DefaultTTL
Ip: 1 64
Tcp: RtoAlgorithm RtoMin RtoMax MaxConn ActiveOpens PassiveOpens AttemptFails EstabResets CurrEstab InSegs OutSegs RetransSegs InErrs OutRsts
Tcp: 1 200 120000 -1 100 50 1 2 10 50000 40000 120 0 5
Udp: InDatagrams NoPorts
Udp: 10 0
";
        let tcp = parse_net_snmp_tcp(content).unwrap();
        assert_eq!(tcp.out_segs, 40000);
        assert_eq!(tcp.retrans_segs, 120);
    }

    #[test]
    fn test_parse_net_snmp_without_tcp() {
        assert!(parse_net_snmp_tcp("Ip: Forwarding\nIp: 1\n").is_err());
    }

    #[test]
    fn test_parse_cpuinfo_mhz_averages_cores() {
        let content = "\
processor\t: 0
cpu MHz\t\t: 2000.000
processor\t: 1
cpu MHz\t\t: 3000.000
";
        let mhz = parse_cpuinfo_mhz(content).unwrap().unwrap();
        assert!((mhz - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_cpuinfo_mhz_absent() {
        assert_eq!(parse_cpuinfo_mhz("processor : 0\nBogoMIPS : 50.00\n").unwrap(), None);
    }

    #[test]
    fn test_parse_millidegrees() {
        assert!((parse_millidegrees("45500\n").unwrap() - 45.5).abs() < 1e-9);
        assert!(parse_millidegrees("hot").is_err());
    }

    #[test]
    fn test_parse_u64_value() {
        assert_eq!(parse_u64_value(" 17\n").unwrap(), 17);
        assert!(parse_u64_value("-1").is_err());
    }
}
