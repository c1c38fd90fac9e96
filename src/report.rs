//! Serializable run result plus file helpers for the binaries.

use crate::decoder::StreamEnd;
use crate::error::{PipelineWarning, Result};
use crate::metrics::FlightMetrics;
use crate::timeline::CorrectionSummary;
use crate::types::{BarometricTrack, DenoisedChannel, FilteredInertial, FlightInterval};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

/// Per-pass diagnostics of the altitude/velocity chain
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChannelSummary {
    pub samples: usize,
    pub sampling_rate_hz: f64,
    pub savgol_window: usize,
    /// Times of the samples replaced by the despiker
    pub spike_times_s: Vec<f64>,
}

impl From<&DenoisedChannel> for ChannelSummary {
    fn from(channel: &DenoisedChannel) -> Self {
        Self {
            samples: channel.len(),
            sampling_rate_hz: channel.sampling_rate_hz,
            savgol_window: channel.savgol_window,
            spike_times_s: channel
                .spike_indices
                .iter()
                .filter_map(|&i| channel.time_s.get(i).copied())
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct FlightReport {
    pub stream_end: StreamEnd,
    pub clock_corrections: CorrectionSummary,
    pub altitude_pass: ChannelSummary,
    pub velocity_pass: ChannelSummary,
    /// In the pre-trim barometric timebase
    pub interval: FlightInterval,
    pub metrics: FlightMetrics,
    pub warnings: Vec<PipelineWarning>,
    /// Trimmed and re-based
    pub barometric: BarometricTrack,
    /// Trimmed and re-based
    pub inertial: FilteredInertial,
}

fn is_gz(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

impl FlightReport {
    /// Write the report as JSON; a `.gz` extension gzips it
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let file = BufWriter::new(File::create(path)?);
        if is_gz(path) {
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder.write_all(json.as_bytes())?;
            encoder.finish()?.flush()?;
        } else {
            let mut file = file;
            file.write_all(json.as_bytes())?;
            file.flush()?;
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        let m = &self.metrics;
        let mut lines = vec![
            format!(
                "Segment: {:.2}s .. {:.2}s ({:.2}s){}",
                self.interval.t_start,
                self.interval.t_end,
                self.interval.duration(),
                if self.interval.degenerate {
                    " [no launch detected]"
                } else {
                    ""
                }
            ),
            format!(
                "Samples: {} barometric, {} inertial",
                self.barometric.len(),
                self.inertial.len()
            ),
            format!(
                "Apogee: {:.2} m at t={:.2}s (raw peak at t={:.2}s)",
                m.apogee.value, m.apogee.time_s, m.raw_peak_time_s
            ),
            format!(
                "Max ascent: {:.2} m/s at t={:.2}s",
                m.max_ascent_velocity.value, m.max_ascent_velocity.time_s
            ),
            format!(
                "Max descent: {:.2} m/s at t={:.2}s",
                m.max_descent_velocity.value, m.max_descent_velocity.time_s
            ),
        ];
        if self.clock_corrections.jumps > 0 {
            lines.push(format!(
                "Clock jumps: {} ({:.3}s removed)",
                self.clock_corrections.jumps, self.clock_corrections.total_correction_s
            ));
        }
        for warning in &self.warnings {
            lines.push(format!("Warning: {}", warning));
        }
        lines.join("\n")
    }
}

/// Read a raw log; a `.gz` extension is decompressed transparently
pub fn load_log_bytes(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut bytes = Vec::new();
    if is_gz(path) {
        GzDecoder::new(file).read_to_end(&mut bytes)?;
    } else {
        let mut file = file;
        file.read_to_end(&mut bytes)?;
    }
    Ok(bytes)
}
