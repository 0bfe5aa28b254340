//! perfctx - benchmark environment monitor.
//!
//! Samples system resources while a workload runs, flags background
//! interference and scores how far the results can be trusted.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::error::Error;
use std::hint::black_box;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use perfctx_core::collector::RealFs;
use perfctx_core::platform::{PlatformSource, ProcPlatformSource};
use perfctx_core::{Benchmark, BenchmarkResult, ContextRunner, Monitor, MonitorConfig, RunConfig};

/// Benchmark environment monitor.
#[derive(Parser)]
#[command(name = "perfctx", about = "Benchmark environment monitor", version)]
struct Args {
    /// JSON config file overriding monitor defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Sampling interval in milliseconds (overrides config).
    #[arg(short, long, global = true)]
    interval: Option<u64>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sample resources for a while and report averages, peaks and interference.
    Monitor {
        /// Seconds to monitor; Ctrl-C stops early.
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Write raw samples here (.json for JSON, CSV otherwise).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Score the current environment for benchmarking.
    Env {
        /// Observation window in milliseconds.
        #[arg(long, default_value = "3000")]
        window_ms: u64,
    },
    /// Print the detected platform.
    Platform,
    /// Run a built-in CPU spin workload inside a monitoring window.
    Run {
        #[arg(short, long, default_value = "10")]
        duration: u64,

        #[arg(long, default_value = "1")]
        iterations: u32,

        /// Skip the warmup and cooldown phases.
        #[arg(long)]
        no_settle: bool,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("perfctx={level},perfctx_core={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<MonitorConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => MonitorConfig::from_json_file(path)?,
        None => MonitorConfig::default(),
    };
    if let Some(ms) = args.interval {
        config.interval = Duration::from_millis(ms);
    }
    config.validate()?;
    Ok(config)
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args)?;

    match args.command {
        Command::Monitor { duration, output } => monitor(config, duration, output),
        Command::Env { window_ms } => {
            let mut runner = ContextRunner::new(config);
            let env = runner.analyze_environment(Duration::from_millis(window_ms));
            info!("{}", env.summary());
            println!("{}", serde_json::to_string_pretty(&env)?);
            Ok(())
        }
        Command::Platform => {
            let mut source =
                ProcPlatformSource::new(RealFs::new(), config.proc_path.clone(), config.sys_path.clone());
            let platform = source.detect();
            let out = json!({
                "platform": platform,
                "summary": platform.summary(),
                "performance_score": platform.performance_score(),
                "performance_class": platform.performance_class(),
                "optimization_recommendations": platform.optimization_recommendations(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        Command::Run {
            duration,
            iterations,
            no_settle,
        } => {
            let mut run = RunConfig {
                duration_secs: duration,
                iterations,
                verbose: args.verbose > 0,
                ..Default::default()
            };
            if no_settle {
                run.warmup = Duration::ZERO;
                run.cooldown = Duration::ZERO;
            }
            let mut runner = ContextRunner::new(config);
            let mut bench = CpuSpin;
            let result = runner.run_with_context(Some(&mut bench), &run);
            info!(
                score = result.reliability_score,
                "{}",
                result.reliability_interpretation()
            );
            println!("{}", result.to_json_with_context()?);
            Ok(())
        }
    }
}

fn monitor(config: MonitorConfig, duration: u64, output: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let mut monitor = Monitor::new(config);
    monitor.start()?;

    let deadline = Instant::now() + Duration::from_secs(duration);
    while running.load(Ordering::SeqCst) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(100));
    }
    monitor.stop();

    if let Some(path) = output {
        monitor.write_samples(&path)?;
    }

    let interference = monitor.analyze_interference();
    info!("{}", interference.summary());
    let out = json!({
        "average": monitor.average_metrics(),
        "peak": monitor.peak_metrics(),
        "interference": interference,
        "interference_detected": interference.has_interference(),
        "summary": interference.summary(),
        "recommendations": interference.recommendations(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// Single-threaded integer loop, reports iterations per second.
struct CpuSpin;

impl Benchmark for CpuSpin {
    fn name(&self) -> &str {
        "CPU Spin"
    }

    fn run(&mut self, duration_secs: u64, iterations: u32, _verbose: bool) -> BenchmarkResult {
        let mut result = BenchmarkResult::success(self.name());
        let mut rates = Vec::with_capacity(iterations as usize);
        let per_iteration = Duration::from_secs(duration_secs) / iterations.max(1);

        for _ in 0..iterations.max(1) {
            let start = Instant::now();
            let mut ops = 0u64;
            let mut acc = 0u64;
            while start.elapsed() < per_iteration {
                for i in 0..10_000u64 {
                    acc = black_box(acc.wrapping_mul(31).wrapping_add(i));
                }
                ops += 10_000;
            }
            let secs = start.elapsed().as_secs_f64();
            if secs > 0.0 {
                rates.push(ops as f64 / secs);
            }
        }

        if rates.is_empty() {
            return BenchmarkResult::failed(self.name(), "no iteration completed");
        }
        result.throughput = rates.iter().sum::<f64>() / rates.len() as f64;
        result.throughput_unit = "ops/s".to_string();
        result
            .extra_metrics
            .insert("iterations".to_string(), rates.len() as f64);
        result
    }
}
