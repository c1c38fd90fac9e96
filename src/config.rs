//! Per-run configuration.
//!
//! Every stage takes its parameters explicitly; the defaults here reproduce the
//! field processing script used with the M5Core2 logger (MPU6886 + BMP390).

use crate::decoder::TrailingDataPolicy;
use crate::error::{PipelineError, Result};
use crate::types::InertialChannel;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub decoder: DecoderConfig,
    pub corrector: CorrectorConfig,
    pub inertial: InertialConfig,
    pub altitude: ChannelFilterConfig,
    pub velocity: ChannelFilterConfig,
    pub interval: IntervalConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub magic: [u8; 4],
    /// g per LSB (±16 g range)
    pub accel_scale: f64,
    /// °/s per LSB (±2000 °/s range)
    pub gyro_scale: f64,
    /// °C per LSB
    pub temperature_scale: f64,
    pub temperature_offset_c: f64,
    pub trailing_policy: TrailingDataPolicy,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            magic: *b"M510",
            accel_scale: 0.000488,
            gyro_scale: 0.00763,
            temperature_scale: 1.0 / 326.8,
            temperature_offset_c: 25.0,
            trailing_policy: TrailingDataPolicy::Lenient,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectorConfig {
    /// Inter-sample gap treated as a clock jump [s]
    pub jump_threshold_s: f64,
    /// Spacing a collapsed jump is reduced to [s]
    pub nominal_delta_s: f64,
}

impl Default for CorrectorConfig {
    fn default() -> Self {
        Self {
            jump_threshold_s: 0.5,
            nominal_delta_s: 0.02,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InertialConfig {
    pub calibration_window_s: f64,
    pub cutoff_hz: f64,
    pub butter_order: usize,
    /// Fixed design rate; derived from the timestamps when unset
    pub sampling_rate_hz: Option<f64>,
    pub kalman_q: f64,
    pub kalman_r: f64,
    pub channels: Vec<InertialChannel>,
    pub parallel_channels: bool,
}

impl Default for InertialConfig {
    fn default() -> Self {
        Self {
            calibration_window_s: 1.0,
            cutoff_hz: 5.0,
            butter_order: 3,
            sampling_rate_hz: None,
            kalman_q: 0.001,
            kalman_r: 0.01,
            channels: InertialChannel::ACCEL.to_vec(),
            parallel_channels: false,
        }
    }
}

/// Parameters for one pass of the altitude/velocity chain
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelFilterConfig {
    pub despike_half_width: usize,
    /// Raw channel units
    pub despike_threshold: f64,
    pub offset_window_s: f64,
    pub cutoff_hz: f64,
    pub butter_order: usize,
    pub savgol_window_s: f64,
    pub savgol_poly_order: usize,
    pub kalman_q: f64,
    pub kalman_r: f64,
}

impl Default for ChannelFilterConfig {
    fn default() -> Self {
        Self {
            despike_half_width: 10,
            despike_threshold: 5.0,
            offset_window_s: 1.0,
            cutoff_hz: 1.5,
            butter_order: 4,
            savgol_window_s: 0.6,
            savgol_poly_order: 2,
            kalman_q: 0.05,
            kalman_r: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    pub start_threshold_m: f64,
    pub end_threshold_m: f64,
    pub margin_s: f64,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            start_threshold_m: 1.0,
            end_threshold_m: 0.5,
            margin_s: 3.0,
        }
    }
}

impl PipelineConfig {
    /// Load a JSON configuration; missing fields fall back to defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.decoder;
        if !(d.accel_scale.is_finite() && d.gyro_scale.is_finite() && d.temperature_scale.is_finite())
        {
            return Err(PipelineError::InvalidConfig(
                "decoder scale factors must be finite".to_string(),
            ));
        }

        let c = &self.corrector;
        require_positive("corrector.jump_threshold_s", c.jump_threshold_s)?;
        if c.nominal_delta_s < 0.0 || c.nominal_delta_s >= c.jump_threshold_s {
            return Err(PipelineError::InvalidConfig(format!(
                "corrector.nominal_delta_s must be in [0, {}), got {}",
                c.jump_threshold_s, c.nominal_delta_s
            )));
        }

        let i = &self.inertial;
        require_positive("inertial.calibration_window_s", i.calibration_window_s)?;
        require_positive("inertial.cutoff_hz", i.cutoff_hz)?;
        require_positive("inertial.kalman_q", i.kalman_q)?;
        require_positive("inertial.kalman_r", i.kalman_r)?;
        if i.butter_order == 0 {
            return Err(PipelineError::InvalidConfig(
                "inertial.butter_order must be at least 1".to_string(),
            ));
        }
        if let Some(fs) = i.sampling_rate_hz {
            require_positive("inertial.sampling_rate_hz", fs)?;
        }

        self.altitude.validate("altitude")?;
        self.velocity.validate("velocity")?;

        if self.interval.margin_s < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "interval.margin_s must be non-negative, got {}",
                self.interval.margin_s
            )));
        }
        Ok(())
    }
}

impl ChannelFilterConfig {
    fn validate(&self, section: &str) -> Result<()> {
        if self.despike_half_width == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "{}.despike_half_width must be at least 1",
                section
            )));
        }
        if self.butter_order == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "{}.butter_order must be at least 1",
                section
            )));
        }
        require_positive(&format!("{}.despike_threshold", section), self.despike_threshold)?;
        require_positive(&format!("{}.offset_window_s", section), self.offset_window_s)?;
        require_positive(&format!("{}.cutoff_hz", section), self.cutoff_hz)?;
        require_positive(&format!("{}.savgol_window_s", section), self.savgol_window_s)?;
        require_positive(&format!("{}.kalman_q", section), self.kalman_q)?;
        require_positive(&format!("{}.kalman_r", section), self.kalman_r)?;
        Ok(())
    }
}

fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PipelineError::InvalidConfig(format!(
            "{} must be positive, got {}",
            name, value
        )))
    }
}
