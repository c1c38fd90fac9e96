/// Random-walk scalar Kalman filter.
///
/// Model: `x[k] = x[k-1] + w`, `z[k] = x[k] + v`, with `Var(w) = q` and `Var(v) = r`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalarKalman {
    pub q: f64,
    pub r: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KalmanState {
    pub estimate: f64,
    pub variance: f64,
}

impl ScalarKalman {
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            q: process_noise,
            r: measurement_noise,
        }
    }

    pub fn predict(&self, state: KalmanState) -> KalmanState {
        KalmanState {
            estimate: state.estimate,
            variance: state.variance + self.q,
        }
    }

    pub fn update(&self, state: KalmanState, measurement: f64) -> KalmanState {
        let gain = state.variance / (state.variance + self.r);
        KalmanState {
            estimate: state.estimate + gain * (measurement - state.estimate),
            variance: (1.0 - gain) * state.variance,
        }
    }

    pub fn step(&self, state: KalmanState, measurement: f64) -> KalmanState {
        self.update(self.predict(state), measurement)
    }

    /// Causal pass from `x = 0, p = 1`, predicting before every observation
    pub fn smooth_from_zero(&self, data: &[f64]) -> Vec<f64> {
        let initial = KalmanState {
            estimate: 0.0,
            variance: 1.0,
        };
        data.iter()
            .scan(initial, |state, &z| {
                *state = self.step(*state, z);
                Some(state.estimate)
            })
            .collect()
    }

    /// Causal pass seeded at the first observation with unit variance; the first
    /// observation is an update only, later ones predict then update
    pub fn smooth_seeded(&self, data: &[f64]) -> Vec<f64> {
        let Some(&first) = data.first() else {
            return Vec::new();
        };
        let prior = KalmanState {
            estimate: first,
            variance: 1.0,
        };
        let mut state = self.update(prior, first);
        let mut out = Vec::with_capacity(data.len());
        out.push(state.estimate);
        for &z in &data[1..] {
            state = self.step(state, z);
            out.push(state.estimate);
        }
        out
    }
}
