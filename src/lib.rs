//! Flight computer log decoding and post-flight signal processing.
//!
//! `M510` binary logs are decoded into inertial and barometric tables, the barometric
//! clock is repaired, both series are denoised, and the flight window is detected and
//! used to trim everything to launch..landing.

pub mod altitude;
pub mod config;
pub mod decoder;
pub mod error;
pub mod filters;
pub mod flight_interval;
pub mod inertial;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod timeline;
pub mod types;

pub use config::PipelineConfig;
pub use decoder::{DecodedLog, LogDecoder, StreamEnd, TrailingDataPolicy};
pub use error::{PipelineError, PipelineWarning, Result};
pub use metrics::FlightMetrics;
pub use pipeline::Pipeline;
pub use report::FlightReport;
