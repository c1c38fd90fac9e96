//! Inertial filter stage: bias calibration, zero-phase low-pass and recursive smoothing
//! of the accelerometer/gyroscope channels.

use crate::config::InertialConfig;
use crate::error::{PipelineError, Result};
use crate::filters::{empirical_rate, ButterworthLowpass, ScalarKalman};
use crate::types::{FilteredInertial, InertialChannel, InertialTable};
use std::collections::BTreeMap;

const STAGE: &str = "inertial";

/// Sensor reads +1 g on the vertical axis at rest
const GRAVITY_G: f64 = 1.0;

/// Per-channel means over the rows with `time <= window_s`
pub fn calibration_offsets(
    table: &InertialTable,
    window_s: f64,
) -> Result<BTreeMap<InertialChannel, f64>> {
    let window: Vec<_> = table.rows.iter().filter(|r| r.time_s <= window_s).collect();
    if window.is_empty() {
        return Err(PipelineError::EmptySeries {
            stage: format!("{} calibration (window {:.2}s)", STAGE, window_s),
            input_len: table.len(),
        });
    }

    let count = window.len() as f64;
    Ok(InertialChannel::ALL
        .iter()
        .map(|&channel| {
            let mean = window.iter().map(|r| channel.get(r)).sum::<f64>() / count;
            (channel, mean)
        })
        .collect())
}

/// Subtract the calibration offsets (and gravity on the vertical axis) from every row
pub fn apply_offsets(
    table: &InertialTable,
    offsets: &BTreeMap<InertialChannel, f64>,
) -> InertialTable {
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let mut row = row.clone();
            for (&channel, &offset) in offsets {
                let bias = if channel == InertialChannel::AccelZ {
                    offset + GRAVITY_G
                } else {
                    offset
                };
                *channel.get_mut(&mut row) -= bias;
            }
            row
        })
        .collect();
    InertialTable { rows }
}

/// Low-pass then Kalman-smooth one calibrated channel
pub fn filter_channel(
    values: &[f64],
    lowpass: &ButterworthLowpass,
    kalman: &ScalarKalman,
    channel: InertialChannel,
) -> Result<Vec<f64>> {
    let stage = format!("{} {}", STAGE, channel);
    let smoothed = lowpass.filtfilt(values, &stage)?;
    Ok(kalman.smooth_from_zero(&smoothed))
}

pub struct InertialFilter {
    config: InertialConfig,
}

impl InertialFilter {
    pub fn new(config: InertialConfig) -> Self {
        Self { config }
    }

    pub fn process(&self, table: &InertialTable) -> Result<FilteredInertial> {
        if table.is_empty() {
            return Err(PipelineError::EmptySeries {
                stage: STAGE.to_string(),
                input_len: 0,
            });
        }

        let offsets = calibration_offsets(table, self.config.calibration_window_s)?;
        let calibrated = apply_offsets(table, &offsets);

        let sample_rate = match self.config.sampling_rate_hz {
            Some(fs) => fs,
            None => empirical_rate(&calibrated.times()).ok_or_else(|| {
                PipelineError::InsufficientSamples {
                    stage: STAGE.to_string(),
                    parameter: "sampling_rate_hz",
                    required: 2,
                    available: calibrated.len(),
                }
            })?,
        };
        let lowpass = ButterworthLowpass::design(
            self.config.butter_order,
            self.config.cutoff_hz,
            sample_rate,
            STAGE,
        )?;
        log::info!(
            "Inertial stage: {} samples at {:.2} Hz, cutoff {:.2} Hz, order {}",
            calibrated.len(),
            lowpass.sample_rate_hz(),
            lowpass.cutoff_hz(),
            lowpass.order()
        );
        let kalman = ScalarKalman::new(self.config.kalman_q, self.config.kalman_r);

        let filtered = if self.config.parallel_channels {
            self.filter_parallel(&calibrated, &lowpass, &kalman)?
        } else {
            self.config
                .channels
                .iter()
                .map(|&channel| {
                    let values = calibrated.column(channel);
                    filter_channel(&values, &lowpass, &kalman, channel).map(|f| (channel, f))
                })
                .collect::<Result<BTreeMap<_, _>>>()?
        };

        Ok(FilteredInertial {
            rows: calibrated.rows,
            filtered,
            offsets,
        })
    }

    fn filter_parallel(
        &self,
        calibrated: &InertialTable,
        lowpass: &ButterworthLowpass,
        kalman: &ScalarKalman,
    ) -> Result<BTreeMap<InertialChannel, Vec<f64>>> {
        crossbeam::scope(|scope| {
            let handles: Vec<_> = self
                .config
                .channels
                .iter()
                .map(|&channel| {
                    let values = calibrated.column(channel);
                    let handle =
                        scope.spawn(move |_| filter_channel(&values, lowpass, kalman, channel));
                    (channel, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(channel, handle)| {
                    handle
                        .join()
                        .map_err(|_| PipelineError::WorkerPanicked(channel.to_string()))
                        .and_then(|r| r.map(|f| (channel, f)))
                })
                .collect::<Result<BTreeMap<_, _>>>()
        })
        .map_err(|_| PipelineError::WorkerPanicked(STAGE.to_string()))?
    }
}
