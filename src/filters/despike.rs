//! Local-median spike replacement.

/// Median of a non-empty slice; even counts average the two middle values
pub fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DespikeResult {
    pub values: Vec<f64>,
    pub replaced: Vec<usize>,
}

/// Replace interior samples deviating more than `threshold` from the median of their
/// `half_width` neighbours on each side (the sample itself excluded).
///
/// The scan runs front to back over one working buffer, so a replaced value takes part
/// in the windows of the samples after it. The first and last samples are never touched.
pub fn despike(values: &[f64], half_width: usize, threshold: f64) -> DespikeResult {
    let mut data = values.to_vec();
    let mut replaced = Vec::new();
    let n = data.len();
    let mut neighbors = Vec::with_capacity(2 * half_width);

    for i in 1..n.saturating_sub(1) {
        let start = i.saturating_sub(half_width);
        let end = (i + half_width + 1).min(n);
        neighbors.clear();
        neighbors.extend_from_slice(&data[start..i]);
        neighbors.extend_from_slice(&data[i + 1..end]);

        let local = median(&mut neighbors);
        if (data[i] - local).abs() > threshold {
            data[i] = local;
            replaced.push(i);
        }
    }

    DespikeResult {
        values: data,
        replaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_single_outlier_replaced() {
        let mut signal = vec![0.0; 50];
        signal[20] = 100.0;
        let result = despike(&signal, 10, 5.0);
        assert_eq!(result.replaced, vec![20]);
        assert!(result.values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_edges_untouched() {
        let mut signal = vec![0.0; 30];
        signal[0] = 100.0;
        signal[29] = -100.0;
        let result = despike(&signal, 10, 5.0);
        assert!(result.replaced.is_empty());
        assert_eq!(result.values, signal);
    }

    #[test]
    fn test_slow_ramp_kept() {
        let signal: Vec<f64> = (0..100).map(|i| i as f64 * 0.2).collect();
        let result = despike(&signal, 10, 5.0);
        assert!(result.replaced.is_empty());
    }

    #[test]
    fn test_replacement_is_local_median() {
        let signal = vec![1.0, 2.0, 50.0, 3.0, 4.0];
        let result = despike(&signal, 10, 5.0);
        assert_eq!(result.replaced, vec![2]);
        assert_eq!(result.values[2], 2.5);
    }

    #[test]
    fn test_short_inputs() {
        assert!(despike(&[], 10, 5.0).values.is_empty());
        assert_eq!(despike(&[7.0, 100.0], 10, 5.0).values, vec![7.0, 100.0]);
    }
}
