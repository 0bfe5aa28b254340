//! Raw sample export: JSON array for `.json` paths, CSV otherwise.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::model::ResourceSample;

#[derive(Debug)]
pub enum ExportError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(e) => write!(f, "cannot write samples: {}", e),
            ExportError::Json(e) => write!(f, "cannot encode samples: {}", e),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(e) => Some(e),
            ExportError::Json(e) => Some(e),
        }
    }
}

impl From<io::Error> for ExportError {
    fn from(e: io::Error) -> Self {
        ExportError::Io(e)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        ExportError::Json(e)
    }
}

const CSV_HEADER: &str = "index,timestamp_s,cpu_usage_percent,cpu_frequency_mhz,io_wait_percent,\
memory_used_mb,memory_available_mb,memory_usage_percent,disk_read_mbps,disk_write_mbps,\
network_rx_mbps,network_tx_mbps,load_average_1min,load_average_5min,thermal_throttling";

#[derive(Serialize)]
struct IndexedSample<'a> {
    index: usize,
    #[serde(flatten)]
    sample: &'a ResourceSample,
}

/// Writes `samples` to `path`, replacing any existing file.
pub fn write_samples(path: &Path, samples: &[ResourceSample]) -> Result<(), ExportError> {
    let mut out = BufWriter::new(File::create(path)?);
    if is_json(path) {
        let indexed: Vec<IndexedSample> = samples
            .iter()
            .enumerate()
            .map(|(index, sample)| IndexedSample { index, sample })
            .collect();
        serde_json::to_writer_pretty(&mut out, &indexed)?;
        writeln!(out)?;
    } else {
        write_csv(&mut out, samples)?;
    }
    out.flush()?;
    info!(path = %path.display(), samples = samples.len(), "samples exported");
    Ok(())
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

fn write_csv<W: Write>(out: &mut W, samples: &[ResourceSample]) -> io::Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for (i, s) in samples.iter().enumerate() {
        writeln!(
            out,
            "{},{:.3},{:.2},{:.1},{:.2},{:.1},{:.1},{:.2},{:.3},{:.3},{:.3},{:.3},{:.2},{:.2},{}",
            i,
            s.timestamp_s,
            s.cpu_usage_percent,
            s.cpu_frequency_mhz,
            s.io_wait_percent,
            s.memory_used_mb,
            s.memory_available_mb,
            s.memory_usage_percent,
            s.disk_read_mbps,
            s.disk_write_mbps,
            s.network_rx_mbps,
            s.network_tx_mbps,
            s.load_average_1min,
            s.load_average_5min,
            u8::from(s.thermal_throttling),
        )?;
    }
    Ok(())
}
