use serde::Serialize;
use thiserror::Error;

/// Flight log processing errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid log header: expected {expected:?}, found {found:?}")]
    Format { expected: Vec<u8>, found: Vec<u8> },

    #[error("Corrupt record at byte {offset} (tag 0x{tag:02x}): {reason}")]
    CorruptRecord {
        offset: usize,
        tag: u8,
        reason: String,
    },

    #[error("{stage}: no usable samples (input had {input_len})")]
    EmptySeries { stage: String, input_len: usize },

    #[error("{stage}: {parameter} needs at least {required} samples, got {available}")]
    InsufficientSamples {
        stage: String,
        parameter: &'static str,
        required: usize,
        available: usize,
    },

    #[error("{stage}: invalid filter configuration for {parameter}: {reason}")]
    FilterConfiguration {
        stage: String,
        parameter: &'static str,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Worker thread panicked while filtering {0}")]
    WorkerPanicked(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Non-fatal conditions raised while processing a log
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// Decoding stopped early on an unknown tag or a short payload
    TruncatedStream {
        offset: usize,
        tag: u8,
        reason: String,
    },
    /// No altitude sample crossed the launch threshold
    DegenerateInterval { start_threshold_m: f64 },
}

impl std::fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineWarning::TruncatedStream {
                offset,
                tag,
                reason,
            } => write!(
                f,
                "stream truncated at byte {} (tag 0x{:02x}): {}",
                offset, tag, reason
            ),
            PipelineWarning::DegenerateInterval { start_threshold_m } => write!(
                f,
                "no altitude sample above {:.2} m, keeping full series",
                start_threshold_m
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = PipelineError::FilterConfiguration {
            stage: "altitude".to_string(),
            parameter: "cutoff_hz",
            reason: "cutoff 60 Hz >= Nyquist 50 Hz".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("altitude"));
        assert!(msg.contains("cutoff_hz"));

        let err = PipelineError::EmptySeries {
            stage: "inertial calibration".to_string(),
            input_len: 12,
        };
        assert!(err.to_string().contains("12"));
    }

    #[test]
    fn test_warning_display() {
        let w = PipelineWarning::TruncatedStream {
            offset: 29,
            tag: b'X',
            reason: "unknown tag".to_string(),
        };
        assert!(w.to_string().contains("0x58"));
    }
}
