use crate::error::{PipelineError, Result};
use nalgebra::DMatrix;

/// Savitzky-Golay smoothing filter for peak-preserving denoising.
///
/// Interior samples use the centered least-squares polynomial; the first and last
/// `window / 2` samples are taken from the polynomial fitted to the first and last full
/// window, so the output has the same length as the input with no edge shrinkage.
#[derive(Clone, Debug)]
pub struct SavitzkyGolay {
    window: usize,
    poly_order: usize,
    /// Hat matrix: row `j` gives the fitted value at window position `j`
    projection: DMatrix<f64>,
}

impl SavitzkyGolay {
    pub fn new(window: usize, poly_order: usize, stage: &str) -> Result<Self> {
        if window % 2 == 0 {
            return Err(PipelineError::FilterConfiguration {
                stage: stage.to_string(),
                parameter: "savgol_window",
                reason: format!("window length {} must be odd", window),
            });
        }
        if window <= poly_order {
            return Err(PipelineError::FilterConfiguration {
                stage: stage.to_string(),
                parameter: "savgol_poly_order",
                reason: format!(
                    "polynomial order {} must be less than window length {}",
                    poly_order, window
                ),
            });
        }

        let half = (window / 2) as f64;
        let cols = poly_order + 1;
        let vandermonde =
            DMatrix::from_fn(window, cols, |i, j| (i as f64 - half).powi(j as i32));
        let normal = vandermonde.transpose() * &vandermonde;
        let normal_inv = normal
            .try_inverse()
            .ok_or_else(|| PipelineError::FilterConfiguration {
                stage: stage.to_string(),
                parameter: "savgol_poly_order",
                reason: "normal equations are singular".to_string(),
            })?;
        let projection = &vandermonde * normal_inv * vandermonde.transpose();

        Ok(Self {
            window,
            poly_order,
            projection,
        })
    }

    /// Window length for `window_s` seconds at `sample_rate_hz`: rounded, bumped to odd,
    /// never below 5
    pub fn window_for(window_s: f64, sample_rate_hz: f64) -> usize {
        let mut length = (window_s * sample_rate_hz).round().max(0.0) as usize;
        if length % 2 == 0 {
            length += 1;
        }
        length.max(5)
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn poly_order(&self) -> usize {
        self.poly_order
    }

    /// Convolution weights for the window center
    pub fn coefficients(&self) -> Vec<f64> {
        self.projection.row(self.window / 2).iter().copied().collect()
    }

    pub fn apply(&self, signal: &[f64], stage: &str) -> Result<Vec<f64>> {
        let n = signal.len();
        let w = self.window;
        if n < w {
            return Err(PipelineError::InsufficientSamples {
                stage: stage.to_string(),
                parameter: "savgol_window",
                required: w,
                available: n,
            });
        }

        let half = w / 2;
        let fit = |row: usize, start: usize| -> f64 {
            self.projection
                .row(row)
                .iter()
                .zip(&signal[start..start + w])
                .map(|(c, x)| c * x)
                .sum()
        };

        let out = (0..n)
            .map(|i| {
                if i < half {
                    fit(i, 0)
                } else if i + half >= n {
                    fit(w - (n - i), n - w)
                } else {
                    fit(half, i - half)
                }
            })
            .collect();
        Ok(out)
    }
}
