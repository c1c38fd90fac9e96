//! Launch/apex/landing detection and trimming of both series to the flight window.

use crate::config::IntervalConfig;
use crate::error::{PipelineError, Result};
use crate::types::{BarometricTrack, FilteredInertial, FlightInterval};
use std::collections::BTreeMap;

/// Flight window from a denoised altitude profile.
///
/// Launch is the first sample above `start_threshold_m`; landing is the first sample
/// after the (first) global maximum below `end_threshold_m`, or the last sample.
/// Both ends are widened by `margin_s` and clipped to the data.
pub fn find_interval(
    times: &[f64],
    altitude: &[f64],
    config: &IntervalConfig,
) -> Option<FlightInterval> {
    let (&first, &last) = (times.first()?, times.last()?);

    let Some(launch) = altitude.iter().position(|&a| a > config.start_threshold_m) else {
        return Some(FlightInterval {
            t_start: first,
            t_end: last,
            degenerate: true,
        });
    };

    // First index of the maximum
    let apex = altitude
        .iter()
        .enumerate()
        .fold(0, |best, (i, &a)| if a > altitude[best] { i } else { best });

    let landing = altitude[apex + 1..]
        .iter()
        .position(|&a| a < config.end_threshold_m)
        .map(|offset| times[apex + 1 + offset])
        .unwrap_or(last);

    log::debug!(
        "Launch at t={:.2}s, apex {:.2} m at t={:.2}s, landing at t={:.2}s",
        times[launch],
        altitude[apex],
        times[apex],
        landing
    );

    Some(FlightInterval {
        t_start: first.max(times[launch] - config.margin_s),
        t_end: last.min(landing + config.margin_s),
        degenerate: false,
    })
}

/// Detect the flight window on the track's denoised altitude, then trim and re-base.
/// A degenerate window leaves the track unchanged.
pub fn detect(
    track: &BarometricTrack,
    config: &IntervalConfig,
) -> Result<(BarometricTrack, FlightInterval)> {
    let interval = find_interval(&track.times(), &track.altitude_kalman(), config).ok_or_else(
        || PipelineError::EmptySeries {
            stage: "flight interval".to_string(),
            input_len: 0,
        },
    )?;

    if interval.degenerate {
        log::warn!(
            "No altitude above {:.2} m, keeping the full series",
            config.start_threshold_m
        );
        return Ok((track.clone(), interval));
    }

    let rows = track
        .rows
        .iter()
        .filter(|r| interval.contains(r.time_s))
        .map(|r| {
            let mut row = r.clone();
            row.time_s -= interval.t_start;
            row
        })
        .collect::<Vec<_>>();

    log::info!(
        "Flight segment [{:.2}s, {:.2}s], {} of {} barometric samples",
        interval.t_start,
        interval.t_end,
        rows.len(),
        track.len()
    );

    Ok((BarometricTrack { rows }, interval))
}

/// Trim and re-base the inertial series with a window found on the barometric track
pub fn apply_to_inertial(
    inertial: &FilteredInertial,
    interval: &FlightInterval,
) -> FilteredInertial {
    if interval.degenerate {
        return inertial.clone();
    }

    let keep: Vec<usize> = inertial
        .rows
        .iter()
        .enumerate()
        .filter(|(_, r)| interval.contains(r.time_s))
        .map(|(i, _)| i)
        .collect();

    let rows = keep
        .iter()
        .map(|&i| {
            let mut row = inertial.rows[i].clone();
            row.time_s -= interval.t_start;
            row
        })
        .collect();

    let filtered: BTreeMap<_, _> = inertial
        .filtered
        .iter()
        .map(|(&channel, values)| (channel, keep.iter().map(|&i| values[i]).collect()))
        .collect();

    FilteredInertial {
        rows,
        filtered,
        offsets: inertial.offsets.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InertialChannel, InertialRow, TrackRow};
    use approx::assert_abs_diff_eq;

    fn profile(t: f64) -> f64 {
        if t < 1.0 {
            0.0
        } else if t <= 5.0 {
            12.5 * (t - 1.0)
        } else if t <= 9.0 {
            12.5 * (9.0 - t)
        } else {
            0.0
        }
    }

    fn track() -> BarometricTrack {
        BarometricTrack {
            rows: (0..=100)
                .map(|i| {
                    let t = i as f64 / 10.0;
                    let a = profile(t);
                    TrackRow {
                        time_s: t,
                        altitude_raw: a,
                        altitude: a,
                        altitude_kalman: a,
                        velocity_raw: 0.0,
                        velocity: 0.0,
                        velocity_kalman: 0.0,
                    }
                })
                .collect(),
        }
    }

    fn config(margin_s: f64) -> IntervalConfig {
        IntervalConfig {
            start_threshold_m: 1.0,
            end_threshold_m: 0.5,
            margin_s,
        }
    }

    #[test]
    fn test_margin_clipped_to_data() {
        let (trimmed, interval) = detect(&track(), &config(3.0)).unwrap();
        assert!(!interval.degenerate);
        assert_abs_diff_eq!(interval.t_start, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(interval.t_end, 10.0, epsilon = 1e-9);
        assert_eq!(trimmed.len(), 101);
    }

    #[test]
    fn test_narrow_margin_trims_and_rebases() {
        let (trimmed, interval) = detect(&track(), &config(0.55)).unwrap();
        // Launch at 1.1 s, landing at 9.0 s
        assert_abs_diff_eq!(interval.t_start, 0.55, epsilon = 1e-9);
        assert_abs_diff_eq!(interval.t_end, 9.55, epsilon = 1e-9);
        // Samples 0.6 ..= 9.5
        assert_eq!(trimmed.len(), 90);
        assert_abs_diff_eq!(trimmed.rows[0].time_s, 0.05, epsilon = 1e-9);
        assert_abs_diff_eq!(trimmed.rows[89].time_s, 8.95, epsilon = 1e-9);
    }

    #[test]
    fn test_no_landing_uses_last_sample() {
        let mut t = track();
        for r in &mut t.rows {
            r.altitude_kalman = r.time_s;
        }
        let interval = find_interval(&t.times(), &t.altitude_kalman(), &config(0.5)).unwrap();
        assert_abs_diff_eq!(interval.t_end, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_first_of_equal_maxima() {
        let times = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let altitude = [0.0, 5.0, 2.0, 5.0, 0.0, 0.0];
        let interval = find_interval(&times, &altitude, &config(0.0)).unwrap();
        // Landing searched after t=1, first value below 0.5 is at t=4
        assert_abs_diff_eq!(interval.t_end, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(interval.t_start, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_keeps_series() {
        let mut t = track();
        for r in &mut t.rows {
            r.altitude_kalman = 0.2;
        }
        let (same, interval) = detect(&t, &config(3.0)).unwrap();
        assert!(interval.degenerate);
        assert_eq!(same, t);
        assert_abs_diff_eq!(interval.t_end, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_track() {
        assert!(detect(&BarometricTrack::default(), &config(3.0)).is_err());
    }

    #[test]
    fn test_inertial_trimmed_with_columns() {
        let rows: Vec<InertialRow> = (0..=20)
            .map(|i| InertialRow {
                time_s: i as f64 * 0.5,
                accel_x_g: i as f64,
                accel_y_g: 0.0,
                accel_z_g: 0.0,
                gyro_x_dps: 0.0,
                gyro_y_dps: 0.0,
                gyro_z_dps: 0.0,
                temperature_c: 25.0,
            })
            .collect();
        let column: Vec<f64> = rows.iter().map(|r| r.accel_x_g * 10.0).collect();
        let inertial = FilteredInertial {
            rows,
            filtered: [(InertialChannel::AccelX, column)].into_iter().collect(),
            offsets: BTreeMap::new(),
        };
        let interval = FlightInterval {
            t_start: 2.0,
            t_end: 4.0,
            degenerate: false,
        };

        let trimmed = apply_to_inertial(&inertial, &interval);
        assert_eq!(trimmed.len(), 5);
        assert_eq!(trimmed.rows[0].time_s, 0.0);
        assert_eq!(trimmed.rows[0].accel_x_g, 4.0);
        assert_eq!(
            trimmed.filtered[&InertialChannel::AccelX],
            vec![40.0, 50.0, 60.0, 70.0, 80.0]
        );
    }
}
