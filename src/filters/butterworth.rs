//! Digital Butterworth low-pass in second-order sections, applied forward-backward.
//!
//! Design follows the classic analog prototype → frequency pre-warp → bilinear transform
//! route. The zero-phase pass pads both ends with an odd reflection of the signal and
//! starts each direction from the steady-state section response to the first padded
//! sample, so a constant input comes out unchanged.

use crate::error::{PipelineError, Result};
use nalgebra::Complex;
use ndarray::{Array2, ArrayView1};

/// Cascade of biquads, one row per section: `[b0, b1, b2, a0, a1, a2]`
#[derive(Clone, Debug)]
pub struct ButterworthLowpass {
    order: usize,
    cutoff_hz: f64,
    sample_rate_hz: f64,
    sos: Array2<f64>,
}

impl ButterworthLowpass {
    /// Design an `order`-pole low-pass at `cutoff_hz` for data sampled at `sample_rate_hz`.
    ///
    /// `stage` names the caller in errors.
    pub fn design(order: usize, cutoff_hz: f64, sample_rate_hz: f64, stage: &str) -> Result<Self> {
        if order == 0 {
            return Err(PipelineError::FilterConfiguration {
                stage: stage.to_string(),
                parameter: "butter_order",
                reason: "order must be at least 1".to_string(),
            });
        }
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(PipelineError::FilterConfiguration {
                stage: stage.to_string(),
                parameter: "sampling_rate_hz",
                reason: format!("sampling rate {} Hz is not usable", sample_rate_hz),
            });
        }
        let nyquist = 0.5 * sample_rate_hz;
        let wn = cutoff_hz / nyquist;
        if !(wn > 0.0 && wn < 1.0) {
            return Err(PipelineError::FilterConfiguration {
                stage: stage.to_string(),
                parameter: "cutoff_hz",
                reason: format!(
                    "cutoff {:.3} Hz must lie in (0, Nyquist {:.3} Hz)",
                    cutoff_hz, nyquist
                ),
            });
        }

        let sos = design_sos(order, wn);
        Ok(Self {
            order,
            cutoff_hz,
            sample_rate_hz,
            sos,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn cutoff_hz(&self) -> f64 {
        self.cutoff_hz
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    pub fn sections(&self) -> &Array2<f64> {
        &self.sos
    }

    /// Samples of odd-extension padding used on each side by `filtfilt`
    pub fn pad_len(&self) -> usize {
        let n_sections = self.sos.nrows();
        let zero_b2 = self.sos.column(2).iter().filter(|&&v| v == 0.0).count();
        let zero_a2 = self.sos.column(5).iter().filter(|&&v| v == 0.0).count();
        3 * (2 * n_sections + 1 - zero_b2.min(zero_a2))
    }

    /// DC gain of the whole cascade
    pub fn dc_gain(&self) -> f64 {
        self.sos
            .rows()
            .into_iter()
            .map(|s| (s[0] + s[1] + s[2]) / (s[3] + s[4] + s[5]))
            .product()
    }

    /// Causal single pass, starting from the given per-section state
    fn filter_from(&self, signal: &[f64], mut state: Vec<[f64; 2]>) -> Vec<f64> {
        signal
            .iter()
            .map(|&x| {
                let mut v = x;
                for (section, z) in self.sos.rows().into_iter().zip(state.iter_mut()) {
                    // Direct form II transposed
                    let y = section[0] * v + z[0];
                    z[0] = section[1] * v - section[4] * y + z[1];
                    z[1] = section[2] * v - section[5] * y;
                    v = y;
                }
                v
            })
            .collect()
    }

    /// Steady-state section states for a unit step
    fn step_state(&self) -> Vec<[f64; 2]> {
        let mut scale = 1.0;
        self.sos
            .rows()
            .into_iter()
            .map(|s| {
                let zi = section_step_state(s);
                let out = [zi[0] * scale, zi[1] * scale];
                scale *= (s[0] + s[1] + s[2]) / (s[3] + s[4] + s[5]);
                out
            })
            .collect()
    }

    /// Zero-phase forward-backward filtering
    pub fn filtfilt(&self, signal: &[f64], stage: &str) -> Result<Vec<f64>> {
        let pad = self.pad_len();
        if signal.len() <= pad {
            return Err(PipelineError::InsufficientSamples {
                stage: stage.to_string(),
                parameter: "butterworth padding",
                required: pad + 1,
                available: signal.len(),
            });
        }

        let extended = odd_extend(signal, pad);
        let zi = self.step_state();

        let scaled = |x0: f64| zi.iter().map(|z| [z[0] * x0, z[1] * x0]).collect::<Vec<_>>();

        let forward = self.filter_from(&extended, scaled(extended[0]));
        let mut reversed: Vec<f64> = forward.into_iter().rev().collect();
        let y0 = reversed[0];
        reversed = self.filter_from(&reversed, scaled(y0));
        reversed.reverse();

        Ok(reversed[pad..pad + signal.len()].to_vec())
    }
}

fn section_step_state(s: ArrayView1<f64>) -> [f64; 2] {
    let (b0, b1, b2) = (s[0] / s[3], s[1] / s[3], s[2] / s[3]);
    let (a1, a2) = (s[4] / s[3], s[5] / s[3]);
    let gain = (b0 + b1 + b2) / (1.0 + a1 + a2);
    let z1 = b2 - a2 * gain;
    let z0 = b1 - a1 * gain + z1;
    [z0, z1]
}

fn odd_extend(signal: &[f64], pad: usize) -> Vec<f64> {
    let n = signal.len();
    let first = signal[0];
    let last = signal[n - 1];
    let mut out = Vec::with_capacity(n + 2 * pad);
    out.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
    out.extend_from_slice(signal);
    out.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i]));
    out
}

/// Second-order sections for a normalized cutoff `wn` (fraction of Nyquist)
fn design_sos(order: usize, wn: f64) -> Array2<f64> {
    // Pre-warped analog cutoff for the bilinear transform with fs = 2
    let fs2 = 4.0;
    let warped = fs2 * (std::f64::consts::PI * wn / 2.0).tan();

    // Analog prototype poles in the left half plane, scaled to the cutoff
    let poles: Vec<Complex<f64>> = (0..order)
        .map(|k| {
            let m = -(order as f64) + 1.0 + 2.0 * k as f64;
            let theta = std::f64::consts::PI * m / (2.0 * order as f64);
            -Complex::new(theta.cos(), theta.sin()) * warped
        })
        .collect();

    let digital: Vec<Complex<f64>> = poles
        .iter()
        .map(|&p| (Complex::new(fs2, 0.0) + p) / (Complex::new(fs2, 0.0) - p))
        .collect();
    let denom: Complex<f64> = poles
        .iter()
        .map(|&p| Complex::new(fs2, 0.0) - p)
        .product();
    let gain = warped.powi(order as i32) / denom.re;

    // One real pole for odd orders, the rest as conjugate pairs (upper half-plane member)
    let mut real_pole = None;
    let mut pairs: Vec<Complex<f64>> = Vec::new();
    for p in digital {
        if p.im.abs() < 1e-12 {
            real_pole = Some(p.re);
        } else if p.im > 0.0 {
            pairs.push(p);
        }
    }
    // Poles nearest the unit circle last
    pairs.sort_by(|a, b| a.norm().total_cmp(&b.norm()));

    let n_sections = (order + 1) / 2;
    let mut sos = Array2::<f64>::zeros((n_sections, 6));
    let mut row = 0;
    if let Some(p) = real_pole {
        sos.row_mut(row)
            .assign(&ndarray::arr1(&[1.0, 1.0, 0.0, 1.0, -p, 0.0]));
        row += 1;
    }
    for p in pairs {
        sos.row_mut(row).assign(&ndarray::arr1(&[
            1.0,
            2.0,
            1.0,
            1.0,
            -2.0 * p.re,
            p.norm_sqr(),
        ]));
        row += 1;
    }

    // Overall gain goes on the first section
    for j in 0..3 {
        sos[[0, j]] *= gain;
    }
    sos
}
