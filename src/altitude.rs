//! Altitude/velocity filter stage.
//!
//! One scalar channel runs through a fixed chain: monotonic-time filter, despike,
//! offset removal, zero-phase Butterworth, Savitzky-Golay and a seeded Kalman pass.
//! Velocity is the derivative of the denoised altitude, fed through the same chain.

use crate::config::ChannelFilterConfig;
use crate::error::{PipelineError, Result};
use crate::filters::{
    despike, empirical_rate, gradient, ButterworthLowpass, SavitzkyGolay, ScalarKalman,
};
use crate::types::{BarometricTable, BarometricTrack, DenoisedChannel, TrackRow};

/// Samples whose time strictly advances past the previously retained sample.
/// The first sample is always dropped.
fn retain_increasing(times: &[f64]) -> Vec<usize> {
    let mut kept = Vec::with_capacity(times.len());
    let mut last = match times.first() {
        Some(&t) => t,
        None => return kept,
    };
    for (i, &t) in times.iter().enumerate().skip(1) {
        if t > last {
            kept.push(i);
            last = t;
        }
    }
    kept
}

/// Run the full denoising chain over one channel
pub fn filter_channel(
    name: &str,
    times: &[f64],
    values: &[f64],
    config: &ChannelFilterConfig,
) -> Result<DenoisedChannel> {
    if times.len() != values.len() {
        return Err(PipelineError::InvalidConfig(format!(
            "{}: {} values against {} timestamps",
            name,
            values.len(),
            times.len()
        )));
    }

    let source_index = retain_increasing(times);
    if source_index.is_empty() {
        return Err(PipelineError::EmptySeries {
            stage: name.to_string(),
            input_len: times.len(),
        });
    }
    let time_s: Vec<f64> = source_index.iter().map(|&i| times[i]).collect();
    let raw: Vec<f64> = source_index.iter().map(|&i| values[i]).collect();
    let dropped = times.len() - source_index.len();
    if dropped > 1 {
        log::debug!("{}: dropped {} non-increasing samples", name, dropped - 1);
    }

    let spikes = despike(&raw, config.despike_half_width, config.despike_threshold);
    if !spikes.replaced.is_empty() {
        log::debug!(
            "{}: replaced {} spikes at {:?}",
            name,
            spikes.replaced.len(),
            spikes.replaced
        );
    }

    let offset_samples: Vec<f64> = time_s
        .iter()
        .zip(&spikes.values)
        .filter(|(t, _)| **t <= config.offset_window_s)
        .map(|(_, v)| *v)
        .collect();
    if offset_samples.is_empty() {
        return Err(PipelineError::EmptySeries {
            stage: format!("{} offset (window {:.2}s)", name, config.offset_window_s),
            input_len: time_s.len(),
        });
    }
    let offset = offset_samples.iter().sum::<f64>() / offset_samples.len() as f64;
    let corrected: Vec<f64> = spikes.values.iter().map(|v| v - offset).collect();

    let sampling_rate_hz =
        empirical_rate(&time_s).ok_or_else(|| PipelineError::InsufficientSamples {
            stage: name.to_string(),
            parameter: "sampling_rate_hz",
            required: 2,
            available: time_s.len(),
        })?;

    let lowpass =
        ButterworthLowpass::design(config.butter_order, config.cutoff_hz, sampling_rate_hz, name)?;
    let lowpassed = lowpass.filtfilt(&corrected, name)?;

    let savgol_window = SavitzkyGolay::window_for(config.savgol_window_s, sampling_rate_hz);
    let savgol = SavitzkyGolay::new(savgol_window, config.savgol_poly_order, name)?;
    let smoothed = savgol.apply(&lowpassed, name)?;

    let denoised = ScalarKalman::new(config.kalman_q, config.kalman_r).smooth_seeded(&smoothed);

    log::info!(
        "{}: {} samples at {:.2} Hz, offset {:.3}, {} spikes, low-pass {:.2} Hz order {}, SG window {} order {}",
        name,
        time_s.len(),
        lowpass.sample_rate_hz(),
        offset,
        spikes.replaced.len(),
        lowpass.cutoff_hz(),
        lowpass.order(),
        savgol.window(),
        savgol.poly_order()
    );

    Ok(DenoisedChannel {
        name: name.to_string(),
        time_s,
        raw,
        corrected,
        denoised,
        source_index,
        spike_indices: spikes.replaced,
        sampling_rate_hz,
        savgol_window,
    })
}

/// Denoise the (corrected) barometric altitude
pub fn filter_altitude(
    table: &BarometricTable,
    config: &ChannelFilterConfig,
) -> Result<DenoisedChannel> {
    filter_channel("altitude", &table.times(), &table.altitudes(), config)
}

/// Differentiate the denoised altitude and denoise the result
pub fn filter_velocity(
    altitude: &DenoisedChannel,
    config: &ChannelFilterConfig,
) -> Result<DenoisedChannel> {
    let raw_velocity = gradient(&altitude.denoised, &altitude.time_s, "velocity")?;
    filter_channel("velocity", &altitude.time_s, &raw_velocity, config)
}

/// Join both passes on the samples the velocity pass retained
pub fn build_track(altitude: &DenoisedChannel, velocity: &DenoisedChannel) -> BarometricTrack {
    let rows = velocity
        .source_index
        .iter()
        .enumerate()
        .filter_map(|(j, &k)| {
            Some(TrackRow {
                time_s: velocity.time_s[j],
                altitude_raw: *altitude.raw.get(k)?,
                altitude: *altitude.corrected.get(k)?,
                altitude_kalman: *altitude.denoised.get(k)?,
                velocity_raw: velocity.raw[j],
                velocity: velocity.corrected[j],
                velocity_kalman: velocity.denoised[j],
            })
        })
        .collect();
    BarometricTrack { rows }
}

/// Altitude pass, velocity pass and the joined track
pub fn process(
    table: &BarometricTable,
    altitude_config: &ChannelFilterConfig,
    velocity_config: &ChannelFilterConfig,
) -> Result<(DenoisedChannel, DenoisedChannel, BarometricTrack)> {
    let altitude = filter_altitude(table, altitude_config)?;
    let velocity = filter_velocity(&altitude, velocity_config)?;
    let track = build_track(&altitude, &velocity);
    Ok((altitude, velocity, track))
}
