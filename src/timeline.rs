//! Barometric clock-jump repair.
//!
//! The logger's barometer timestamps occasionally leap forward by whole seconds while the
//! samples keep arriving at their normal cadence. Each such leap is treated as a clock
//! artifact and collapsed to the nominal sample spacing; the collapse accumulates so every
//! later sample shifts by the same amount.

use crate::config::CorrectorConfig;
use crate::types::{BarometricRow, BarometricTable};
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CorrectionSummary {
    pub jumps: usize,
    pub total_correction_s: f64,
}

#[derive(Clone, Copy, Debug, Default)]
struct Accumulator {
    prev_raw: Option<f64>,
    correction: f64,
    jumps: usize,
}

/// Collapse cumulative timestamp jumps. Δt is measured on the uncorrected times and
/// sample 0 is never moved.
pub fn correct_discontinuities(
    table: &BarometricTable,
    config: &CorrectorConfig,
) -> (BarometricTable, CorrectionSummary) {
    let mut rows = Vec::with_capacity(table.len());

    let acc = table.rows.iter().fold(Accumulator::default(), |acc, row| {
        let mut next = Accumulator {
            prev_raw: Some(row.time_s),
            ..acc
        };
        if let Some(prev) = acc.prev_raw {
            let dt = row.time_s - prev;
            if dt > config.jump_threshold_s {
                let excess = dt - config.nominal_delta_s;
                next.correction += excess;
                next.jumps += 1;
                log::debug!(
                    "Clock jump of {:.3}s at t={:.3}s, cumulative correction {:.3}s",
                    dt,
                    row.time_s,
                    next.correction
                );
            }
        }
        rows.push(BarometricRow {
            time_s: row.time_s - next.correction,
            altitude_m: row.altitude_m,
        });
        next
    });

    if acc.jumps > 0 {
        log::info!(
            "Collapsed {} barometric clock jumps ({:.3}s total)",
            acc.jumps,
            acc.correction
        );
    }

    (
        BarometricTable { rows },
        CorrectionSummary {
            jumps: acc.jumps,
            total_correction_s: acc.correction,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn table(times: &[f64]) -> BarometricTable {
        BarometricTable {
            rows: times
                .iter()
                .enumerate()
                .map(|(i, &t)| BarometricRow {
                    time_s: t,
                    altitude_m: i as f64,
                })
                .collect(),
        }
    }

    #[test]
    fn test_single_jump_collapsed() {
        let input = table(&[0.0, 0.02, 0.04, 2.04, 2.06]);
        let (out, summary) = correct_discontinuities(&input, &CorrectorConfig::default());
        let times = out.times();
        let expected = [0.0, 0.02, 0.04, 0.06, 0.08];
        for (t, e) in times.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*t, *e, epsilon = 1e-9);
        }
        assert_eq!(summary.jumps, 1);
        assert_abs_diff_eq!(summary.total_correction_s, 1.98, epsilon = 1e-9);
        // Values ride along untouched
        assert_eq!(out.altitudes(), input.altitudes());
    }

    #[test]
    fn test_corrections_accumulate() {
        let input = table(&[0.0, 1.0, 1.02, 3.02]);
        let (out, summary) = correct_discontinuities(&input, &CorrectorConfig::default());
        let times = out.times();
        assert_abs_diff_eq!(times[1], 0.02, epsilon = 1e-9);
        assert_abs_diff_eq!(times[2], 0.04, epsilon = 1e-9);
        assert_abs_diff_eq!(times[3], 0.06, epsilon = 1e-9);
        assert_eq!(summary.jumps, 2);
    }

    #[test]
    fn test_idempotent_on_clean_series() {
        let input = table(&[0.0, 1.0, 1.02, 3.02, 3.04]);
        let config = CorrectorConfig::default();
        let (once, _) = correct_discontinuities(&input, &config);
        let (twice, summary) = correct_discontinuities(&once, &config);
        assert_eq!(once, twice);
        assert_eq!(summary.jumps, 0);
    }

    #[test]
    fn test_first_sample_never_moves() {
        let input = table(&[5.0, 9.0]);
        let (out, _) = correct_discontinuities(&input, &CorrectorConfig::default());
        assert_eq!(out.rows[0].time_s, 5.0);
        assert_abs_diff_eq!(out.rows[1].time_s, 5.02, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_table() {
        let (out, summary) =
            correct_discontinuities(&BarometricTable::default(), &CorrectorConfig::default());
        assert!(out.is_empty());
        assert_eq!(summary, CorrectionSummary::default());
    }
}
