//! Runs the stages in their fixed order over one log buffer.

use crate::altitude;
use crate::config::PipelineConfig;
use crate::decoder::LogDecoder;
use crate::error::{PipelineWarning, Result};
use crate::flight_interval;
use crate::inertial::InertialFilter;
use crate::metrics::FlightMetrics;
use crate::report::{ChannelSummary, FlightReport};
use crate::timeline::correct_discontinuities;

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Validates the configuration up front; it is read-only afterwards
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, bytes: &[u8]) -> Result<FlightReport> {
        let mut warnings = Vec::new();

        let decoded = LogDecoder::new(self.config.decoder.clone()).decode(bytes)?;
        if let Some(warning) = decoded.end.as_warning() {
            warnings.push(warning);
        }

        let (barometric, clock_corrections) =
            correct_discontinuities(&decoded.barometric, &self.config.corrector);

        let inertial =
            InertialFilter::new(self.config.inertial.clone()).process(&decoded.inertial)?;

        let (altitude_pass, velocity_pass, track) =
            altitude::process(&barometric, &self.config.altitude, &self.config.velocity)?;

        let (track, interval) = flight_interval::detect(&track, &self.config.interval)?;
        if interval.degenerate {
            warnings.push(PipelineWarning::DegenerateInterval {
                start_threshold_m: self.config.interval.start_threshold_m,
            });
        }
        let inertial = flight_interval::apply_to_inertial(&inertial, &interval);

        let metrics = FlightMetrics::from_track(&track)?;
        log::info!(
            "Apogee {:.2} m at t={:.2}s, max ascent {:.2} m/s, max descent {:.2} m/s",
            metrics.apogee.value,
            metrics.apogee.time_s,
            metrics.max_ascent_velocity.value,
            metrics.max_descent_velocity.value
        );

        Ok(FlightReport {
            stream_end: decoded.end,
            clock_corrections,
            altitude_pass: ChannelSummary::from(&altitude_pass),
            velocity_pass: ChannelSummary::from(&velocity_pass),
            interval,
            metrics,
            warnings,
            barometric: track,
            inertial,
        })
    }
}
