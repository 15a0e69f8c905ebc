// Copyright 2026 Policy Inference Lab. All rights reserved.
// Policy Priority Inference Suite ("PPI") - Target Transformation

use crate::error::PpiError;

/// Minimum headroom a target keeps above its series' final value when the
/// raw gaps are too small or negative for the model to grow into.
const TARGET_FLOOR: f64 = 0.01;

/// Derive initial values and targets from an empirical series matrix (one
/// row per indicator, one column per period).
///
/// The model needs every target strictly above its initial value, so series
/// that declined (or barely moved) get their targets lifted: when any gap is
/// negative, every target becomes the final value plus the magnitude of the
/// worst decline plus `max(smallest positive gap, 0.01)`; when all gaps are
/// positive but the smallest is under 0.01, final values are lifted by 0.01;
/// otherwise final values are used as-is.
pub fn series_targets(series: &[Vec<f64>]) -> Result<(Vec<f64>, Vec<f64>), PpiError> {
    if series.is_empty() {
        return Err(PpiError::invalid("empty series matrix"));
    }
    let mut initial = Vec::with_capacity(series.len());
    let mut finals = Vec::with_capacity(series.len());
    let mut gaps = Vec::with_capacity(series.len());
    for (row_idx, row) in series.iter().enumerate() {
        if row.len() < 2 {
            return Err(PpiError::invalid(format!(
                "series row {} has fewer than two periods",
                row_idx
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(PpiError::invalid(format!("non-finite value in series row {}", row_idx)));
        }
        let first = row[0];
        let last = row[row.len() - 1];
        initial.push(first);
        finals.push(last);
        gaps.push(last - first);
    }

    let min_gap = gaps.iter().cloned().fold(f64::INFINITY, f64::min);
    let targets: Vec<f64> = if min_gap < 0.0 {
        let smallest_positive = gaps
            .iter()
            .cloned()
            .filter(|&g| g > 0.0)
            .fold(f64::INFINITY, f64::min);
        let headroom = if smallest_positive.is_finite() {
            smallest_positive.max(TARGET_FLOOR)
        } else {
            TARGET_FLOOR
        };
        finals.iter().map(|&f| f + min_gap.abs() + headroom).collect()
    } else if min_gap < TARGET_FLOOR {
        finals.iter().map(|&f| f + TARGET_FLOOR).collect()
    } else {
        finals
    };

    Ok((initial, targets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_growth_keeps_final_values() {
        let series = vec![vec![0.1, 0.3, 0.5], vec![0.2, 0.4, 0.6]];
        let (initial, targets) = series_targets(&series).unwrap();
        assert_eq!(initial, vec![0.1, 0.2]);
        assert_eq!(targets, vec![0.5, 0.6]);
    }

    #[test]
    fn test_declining_row_lifts_every_target() {
        // Row 1 declined by 0.2; smallest positive gap is 0.4.
        let series = vec![vec![0.1, 0.3, 0.5], vec![0.6, 0.5, 0.4]];
        let (initial, targets) = series_targets(&series).unwrap();
        // Every target: final + 0.2 + max(0.4, 0.01)
        assert!((targets[0] - (0.5 + 0.2 + 0.4)).abs() < 1e-12);
        assert!((targets[1] - (0.4 + 0.2 + 0.4)).abs() < 1e-12);
        // The declining row's target must clear its own maximum by at least
        // the decline magnitude plus the floor.
        let row_max: f64 = series[1].iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(targets[1] >= row_max + 0.2 + TARGET_FLOOR);
        // And every target now strictly exceeds its initial value.
        for (t, i0) in targets.iter().zip(initial.iter()) {
            assert!(t > i0);
        }
    }

    #[test]
    fn test_all_declining_rows_use_floor_alone() {
        let series = vec![vec![0.5, 0.4], vec![0.8, 0.6]];
        let (_, targets) = series_targets(&series).unwrap();
        // Worst decline 0.2, no positive gap: final + 0.2 + 0.01
        assert!((targets[0] - (0.4 + 0.2 + TARGET_FLOOR)).abs() < 1e-12);
        assert!((targets[1] - (0.6 + 0.2 + TARGET_FLOOR)).abs() < 1e-12);
    }

    #[test]
    fn test_tiny_positive_gaps_get_the_floor() {
        let series = vec![vec![0.100, 0.105], vec![0.2, 0.5]];
        let (_, targets) = series_targets(&series).unwrap();
        assert!((targets[0] - (0.105 + TARGET_FLOOR)).abs() < 1e-12);
        assert!((targets[1] - (0.5 + TARGET_FLOOR)).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_degenerate_input() {
        assert!(series_targets(&[]).is_err());
        assert!(series_targets(&[vec![0.1]]).is_err());
        assert!(series_targets(&[vec![0.1, f64::NAN]]).is_err());
    }
}
