use crate::error::{PipelineError, Result};

/// Derivative of `values` against non-uniform `times`.
///
/// Interior points use the second-order accurate three-point formula for uneven
/// spacing; the two ends use one-sided first differences.
pub fn gradient(values: &[f64], times: &[f64], stage: &str) -> Result<Vec<f64>> {
    let n = values.len();
    if times.len() != n {
        return Err(PipelineError::InvalidConfig(format!(
            "{}: {} values against {} timestamps",
            stage,
            n,
            times.len()
        )));
    }
    if n < 2 {
        return Err(PipelineError::InsufficientSamples {
            stage: stage.to_string(),
            parameter: "gradient",
            required: 2,
            available: n,
        });
    }

    let mut out = Vec::with_capacity(n);
    out.push((values[1] - values[0]) / (times[1] - times[0]));
    for i in 1..n - 1 {
        let hs = times[i] - times[i - 1];
        let hd = times[i + 1] - times[i];
        let a = -hd / (hs * (hd + hs));
        let b = (hd - hs) / (hd * hs);
        let c = hs / (hd * (hd + hs));
        out.push(a * values[i - 1] + b * values[i] + c * values[i + 1]);
    }
    out.push((values[n - 1] - values[n - 2]) / (times[n - 1] - times[n - 2]));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_linear_exact() {
        let t = [0.0, 0.1, 0.25, 0.3, 0.6];
        let v: Vec<f64> = t.iter().map(|x| 3.0 * x - 1.0).collect();
        for g in gradient(&v, &t, "test").unwrap() {
            assert_abs_diff_eq!(g, 3.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_quadratic_interior_exact_on_uneven_grid() {
        let t = [0.0, 0.1, 0.25, 0.3, 0.6];
        let v: Vec<f64> = t.iter().map(|x| x * x).collect();
        let g = gradient(&v, &t, "test").unwrap();
        for i in 1..4 {
            assert_abs_diff_eq!(g[i], 2.0 * t[i], epsilon = 1e-9);
        }
        // One-sided ends
        assert_abs_diff_eq!(g[0], 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_needs_two_points() {
        assert!(gradient(&[1.0], &[0.0], "velocity").is_err());
    }
}
