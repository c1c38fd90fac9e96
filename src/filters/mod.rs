/// Signal filters shared by the inertial and altitude stages
pub mod butterworth;
pub mod derivative;
pub mod despike;
pub mod kalman;
pub mod savitzky_golay;

pub use butterworth::ButterworthLowpass;
pub use derivative::gradient;
pub use despike::{despike, DespikeResult};
pub use kalman::{KalmanState, ScalarKalman};
pub use savitzky_golay::SavitzkyGolay;

/// 1 / mean spacing of consecutive timestamps; `None` for fewer than two samples or a
/// non-advancing clock
pub fn empirical_rate(times: &[f64]) -> Option<f64> {
    if times.len() < 2 {
        return None;
    }
    let span: f64 = times.windows(2).map(|w| w[1] - w[0]).sum();
    let mean_dt = span / (times.len() - 1) as f64;
    if mean_dt > 0.0 && mean_dt.is_finite() {
        Some(1.0 / mean_dt)
    } else {
        None
    }
}
