//! Pre-built mock filesystem scenarios for testing.
//!
//! Besides static snapshots of a machine, the `set_*` helpers rewrite a
//! counter file in place so a test can advance counters between two ticks.

use super::filesystem::MockFs;
use crate::collector::parser::{CpuTimes, DiskCounters, NetCounters};

const NET_DEV_HEADER: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
";

const SNMP_TCP_HEADER: &str = "Tcp: RtoAlgorithm RtoMin RtoMax MaxConn ActiveOpens PassiveOpens AttemptFails EstabResets CurrEstab InSegs OutSegs RetransSegs InErrs OutRsts";

impl MockFs {
    /// A quiet 4-core machine with 16 GB RAM, one SATA HDD, one NVMe drive and
    /// one ethernet interface.
    pub fn typical_system() -> Self {
        let mut fs = Self::new();

        let core = CpuTimes {
            user: 2500,
            nice: 125,
            system: 750,
            idle: 20000,
            iowait: 250,
            irq: 50,
            softirq: 25,
            steal: 0,
        };
        fs.set_cpu_stat(&[core; 4]);
        fs.set_meminfo(16384000, 12000000);
        fs.set_loadavg(0.15, 0.10, 0.05, 1, 150);
        fs.set_diskstats(&[
            (
                "sda",
                DiskCounters {
                    reads: 5000,
                    read_sectors: 400000,
                    writes: 3000,
                    write_sectors: 200000,
                },
            ),
            (
                "nvme0n1",
                DiskCounters {
                    reads: 9000,
                    read_sectors: 900000,
                    writes: 7000,
                    write_sectors: 600000,
                },
            ),
        ]);
        // Partition and loop device, both filtered out by the disk reader.
        let mut diskstats = fs.read_raw("/proc/diskstats");
        diskstats.push_str("   8       1 sda1 100 0 2000 10 50 0 1000 5 0 15 15\n");
        diskstats.push_str("   7       0 loop0 10 0 20 0 0 0 0 0 0 0 0\n");
        fs.add_file("/proc/diskstats", diskstats);
        fs.set_net_dev(&[
            (
                "lo",
                NetCounters {
                    rx_bytes: 100000,
                    tx_bytes: 100000,
                },
            ),
            (
                "eth0",
                NetCounters {
                    rx_bytes: 50_000_000,
                    tx_bytes: 20_000_000,
                },
            ),
        ]);
        fs.set_tcp_segments(40000, 40);
        fs.add_file(
            "/proc/cpuinfo",
            "\
processor\t: 0
model name\t: Intel(R) Core(TM) i7-8700 CPU @ 3.20GHz
cpu MHz\t\t: 2400.000
cache size\t: 12288 KB
processor\t: 1
cpu MHz\t\t: 2400.000
processor\t: 2
cpu MHz\t\t: 2400.000
processor\t: 3
cpu MHz\t\t: 2400.000
",
        );

        fs.set_temperature_millideg(45000);
        for cpu in 0..4 {
            fs.add_file(
                format!("/sys/devices/system/cpu/cpu{cpu}/thermal_throttle/core_throttle_count"),
                "0\n",
            );
            fs.add_file(
                format!("/sys/devices/system/cpu/cpu{cpu}/cpufreq/scaling_governor"),
                "performance\n",
            );
        }
        fs.add_file("/sys/devices/system/cpu/cpufreq/boost", "1\n");
        fs.add_file("/sys/block/sda/queue/rotational", "1\n");
        fs.add_file("/sys/block/nvme0n1/queue/rotational", "0\n");
        fs.add_dir("/sys/block/loop0");

        fs
    }

    /// Same machine under heavy load: busy loadavg and a warm CPU.
    pub fn high_cpu_load() -> Self {
        let mut fs = Self::typical_system();
        fs.set_loadavg(7.80, 6.20, 4.10, 9, 420);
        fs.set_temperature_millideg(82000);
        fs
    }

    /// Same machine with only ~5% of memory available.
    pub fn memory_pressure() -> Self {
        let mut fs = Self::typical_system();
        fs.set_meminfo(16384000, 800000);
        fs
    }

    // ============ Counter writers ============

    /// Rewrites `/proc/stat` from per-core counters; the aggregate line is the sum.
    pub fn set_cpu_stat(&mut self, cores: &[CpuTimes]) {
        let sum = cores.iter().fold(CpuTimes::default(), |acc, c| CpuTimes {
            user: acc.user + c.user,
            nice: acc.nice + c.nice,
            system: acc.system + c.system,
            idle: acc.idle + c.idle,
            iowait: acc.iowait + c.iowait,
            irq: acc.irq + c.irq,
            softirq: acc.softirq + c.softirq,
            steal: acc.steal + c.steal,
        });

        let line = |label: String, t: &CpuTimes| {
            format!(
                "{label} {} {} {} {} {} {} {} {} 0 0\n",
                t.user, t.nice, t.system, t.idle, t.iowait, t.irq, t.softirq, t.steal
            )
        };

        let mut content = line("cpu ".to_string(), &sum);
        for (id, core) in cores.iter().enumerate() {
            content.push_str(&line(format!("cpu{id}"), core));
        }
        content.push_str("ctxt 500000\nbtime 1700000000\nprocesses 10000\n");
        self.add_file("/proc/stat", content);
    }

    pub fn set_meminfo(&mut self, total_kb: u64, available_kb: u64) {
        self.add_file(
            "/proc/meminfo",
            format!(
                "MemTotal:       {total_kb} kB\nMemFree:        {} kB\nMemAvailable:   {available_kb} kB\n",
                available_kb / 2
            ),
        );
    }

    pub fn set_loadavg(&mut self, load1: f64, load5: f64, load15: f64, running: u32, total: u32) {
        self.add_file(
            "/proc/loadavg",
            format!("{load1:.2} {load5:.2} {load15:.2} {running}/{total} 12345\n"),
        );
    }

    /// Rewrites `/proc/diskstats` with whole-disk entries (major 8).
    pub fn set_diskstats(&mut self, disks: &[(&str, DiskCounters)]) {
        let mut content = String::new();
        for (minor, (name, d)) in disks.iter().enumerate() {
            content.push_str(&format!(
                "   8 {:7} {} {} 0 {} 0 {} 0 {} 0 0 0 0\n",
                minor * 16,
                name,
                d.reads,
                d.read_sectors,
                d.writes,
                d.write_sectors
            ));
        }
        self.add_file("/proc/diskstats", content);
    }

    pub fn set_net_dev(&mut self, interfaces: &[(&str, NetCounters)]) {
        let mut content = NET_DEV_HEADER.to_string();
        for (name, n) in interfaces {
            content.push_str(&format!(
                "{name:>6}: {} 0 0 0 0 0 0 0 {} 0 0 0 0 0 0 0\n",
                n.rx_bytes, n.tx_bytes
            ));
        }
        self.add_file("/proc/net/dev", content);
    }

    pub fn set_tcp_segments(&mut self, out_segs: u64, retrans_segs: u64) {
        self.add_file(
            "/proc/net/snmp",
            format!(
                "Ip: Forwarding DefaultTTL\nIp: 1 64\n{SNMP_TCP_HEADER}\nTcp: 1 200 120000 -1 100 50 1 2 10 50000 {out_segs} {retrans_segs} 0 5\n"
            ),
        );
    }

    pub fn set_temperature_millideg(&mut self, millideg: i64) {
        self.add_file(
            "/sys/class/thermal/thermal_zone0/temp",
            format!("{millideg}\n"),
        );
    }

    fn read_raw(&self, path: &str) -> String {
        use crate::collector::traits::FileSystem;
        self.read_to_string(std::path::Path::new(path))
            .unwrap_or_default()
    }
}
