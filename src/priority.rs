// Copyright 2026 Policy Inference Lab. All rights reserved.
// Policy Priority Inference Suite ("PPI") - Allocation Priorities
//
// Normalization safeguards and the pluggable priority-weighting strategy
// that turns target gaps and historical inefficiencies into next-step
// resource allocations.

// ─── Normalization helpers ──────────────────────────────────────────────────

/// Floor factors keeping normalized values strictly inside (0, 1) so the
/// exponent `gap^(1 + hist)` never sees an exact 0 or 1.
const UNIT_SHRINK: f64 = 1.0 - 1e-6;
const UNIT_FLOOR: f64 = 1e-12;

/// Min-max normalize into [0, 1]. A zero-range vector (all values equal,
/// always the case for a single instrumental indicator) maps to the uniform
/// midpoint instead of 0/0.
pub(crate) fn min_max_unit(values: &[f64]) -> Vec<f64> {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range == 0.0 {
        return vec![0.5; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

/// Shrink unit-interval values away from the exact endpoints.
pub(crate) fn floor_open_unit(values: &mut [f64]) {
    for v in values.iter_mut() {
        *v = *v * UNIT_SHRINK + UNIT_FLOOR;
    }
}

/// Normalize weights onto the simplex. Returns `None` when the sum is zero
/// or non-finite; the caller reports that as a numerical degeneracy.
pub(crate) fn simplex(weights: &[f64]) -> Option<Vec<f64>> {
    let sum: f64 = weights.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return None;
    }
    Some(weights.iter().map(|w| w / sum).collect())
}

/// Normalize historical inefficiencies into the open unit interval.
///
/// A vector still entirely at the neutral initialization value 1 has no
/// ordering information and maps to zeros; otherwise min-max applies.
pub(crate) fn inefficiency_unit(history: &[f64]) -> Vec<f64> {
    let untouched = history.iter().filter(|&&h| h == 1.0).count();
    let mut unit = if untouched < history.len() {
        min_max_unit(history)
    } else {
        vec![0.0; history.len()]
    };
    floor_open_unit(&mut unit);
    unit
}

/// Normalize instrumental target gaps into the open unit interval.
pub(crate) fn gap_unit(gaps: &[f64]) -> Vec<f64> {
    let mut unit = min_max_unit(gaps);
    floor_open_unit(&mut unit);
    unit
}

// ─── PriorityPolicy ─────────────────────────────────────────────────────────

/// Strategy turning normalized gaps and historical inefficiencies into raw
/// priority weights. The engine simplex-normalizes whatever is returned, so
/// implementations only need relative magnitudes.
///
/// Both inputs are already floored strictly inside (0, 1).
pub trait PriorityPolicy: Send + Sync {
    fn weights(&self, gaps: &[f64], inefficiency: &[f64]) -> Vec<f64>;
}

/// Default weighting: `gap^(1 + hist)`. Larger gaps attract resources;
/// a worse inefficiency record sharpens the exponent and shifts allocation
/// toward the largest gaps.
#[derive(Debug, Clone, Copy, Default)]
pub struct GapExponentPolicy;

impl PriorityPolicy for GapExponentPolicy {
    fn weights(&self, gaps: &[f64], inefficiency: &[f64]) -> Vec<f64> {
        gaps.iter()
            .zip(inefficiency.iter())
            .map(|(&g, &h)| g.powf(1.0 + h))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_unit_spans_interval() {
        let unit = min_max_unit(&[2.0, 4.0, 3.0]);
        assert!((unit[0] - 0.0).abs() < f64::EPSILON);
        assert!((unit[1] - 1.0).abs() < f64::EPSILON);
        assert!((unit[2] - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_min_max_unit_zero_range_midpoint() {
        assert_eq!(min_max_unit(&[0.7]), vec![0.5]);
        assert_eq!(min_max_unit(&[3.0, 3.0, 3.0]), vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_floor_keeps_values_interior() {
        let mut values = vec![0.0, 1.0];
        floor_open_unit(&mut values);
        assert!(values[0] > 0.0);
        assert!(values[1] < 1.0);
    }

    #[test]
    fn test_simplex_sums_to_one() {
        let p = simplex(&[1.0, 3.0]).unwrap();
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((p[1] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_simplex_rejects_zero_sum() {
        assert!(simplex(&[0.0, 0.0]).is_none());
        assert!(simplex(&[f64::NAN]).is_none());
    }

    #[test]
    fn test_inefficiency_unit_neutral_history_is_zero() {
        let unit = inefficiency_unit(&[1.0, 1.0, 1.0]);
        // zeros, then floored: strictly positive but tiny
        for v in unit {
            assert!(v > 0.0 && v < 1e-6);
        }
    }

    #[test]
    fn test_inefficiency_unit_orders_history() {
        let unit = inefficiency_unit(&[1.2, 1.8, 1.5]);
        assert!(unit[0] < unit[2] && unit[2] < unit[1]);
    }

    #[test]
    fn test_gap_exponent_policy_prefers_large_gaps() {
        let policy = GapExponentPolicy;
        let w = policy.weights(&[0.2, 0.9], &[0.5, 0.5]);
        assert!(w[1] > w[0]);
    }
}
