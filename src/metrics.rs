//! Headline numbers for a trimmed flight.

use crate::error::{PipelineError, Result};
use crate::types::BarometricTrack;
use serde::Serialize;

/// A value and the (re-based) time it occurred at
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TimedValue {
    pub value: f64,
    pub time_s: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlightMetrics {
    /// Maximum of the denoised altitude [m]
    pub apogee: TimedValue,
    /// Maximum of the denoised velocity [m/s]
    pub max_ascent_velocity: TimedValue,
    /// Minimum of the denoised velocity [m/s]
    pub max_descent_velocity: TimedValue,
    /// Peak of the raw altitude, spikes included
    pub raw_peak_time_s: f64,
    pub duration_s: f64,
}

/// First occurrence of the extreme selected by `better`
fn extreme_by<F>(times: &[f64], values: &[f64], better: F) -> Option<TimedValue>
where
    F: Fn(f64, f64) -> bool,
{
    let mut best: Option<TimedValue> = None;
    for (&time_s, &value) in times.iter().zip(values) {
        match best {
            Some(b) if !better(value, b.value) => {}
            _ => best = Some(TimedValue { value, time_s }),
        }
    }
    best
}

impl FlightMetrics {
    pub fn from_track(track: &BarometricTrack) -> Result<Self> {
        let empty = || PipelineError::EmptySeries {
            stage: "metrics".to_string(),
            input_len: 0,
        };

        let times = track.times();
        let altitude = track.altitude_kalman();
        let velocity: Vec<f64> = track.rows.iter().map(|r| r.velocity_kalman).collect();
        let raw: Vec<f64> = track.rows.iter().map(|r| r.altitude_raw).collect();

        let apogee = extreme_by(&times, &altitude, |a, b| a > b).ok_or_else(empty)?;
        let max_ascent_velocity = extreme_by(&times, &velocity, |a, b| a > b).ok_or_else(empty)?;
        let max_descent_velocity =
            extreme_by(&times, &velocity, |a, b| a < b).ok_or_else(empty)?;
        let raw_peak = extreme_by(&times, &raw, |a, b| a > b).ok_or_else(empty)?;

        let duration_s = times.last().zip(times.first()).map_or(0.0, |(l, f)| l - f);

        Ok(Self {
            apogee,
            max_ascent_velocity,
            max_descent_velocity,
            raw_peak_time_s: raw_peak.time_s,
            duration_s,
        })
    }
}
