// Copyright 2026 Policy Inference Lab. All rights reserved.
// Policy Priority Inference Suite ("PPI") - Error Taxonomy

/// Failure modes of the simulation and calibration layers.
///
/// Invalid parameters are rejected before a run starts; degeneracies are
/// reported at the step that produces them; the loop guards turn the
/// model's data-dependent (in principle unbounded) iterations into
/// detectable errors instead of hangs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PpiError {
    /// Shape mismatch or out-of-range input, caught at construction.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A step produced a non-finite or undefined quantity that has no
    /// defined fallback (zero-sum priority simplex, NaN success probability).
    #[error("numerical degeneracy at step {step}: {what}")]
    NumericalDegeneracy { step: u64, what: String },

    /// The run's convergence condition never became true within the cap.
    #[error("step limit of {limit} exceeded before all indicators converged")]
    StepLimitExceeded { limit: u64 },

    /// The bounded scalar search failed for one indicator.
    #[error("calibration failed for indicator {node}: {reason}")]
    CalibrationFailure { node: usize, reason: String },

    /// The greedy coordinate search used up its round budget.
    #[error("calibration did not reach the deviation tolerance within {rounds} rounds")]
    CalibrationExhausted { rounds: usize },

    /// The horizon loop used up its budget without matching volatility.
    #[error("simulated volatility never fell below {empirical} within {horizons} horizons")]
    HorizonExhausted { horizons: u64, empirical: f64 },
}

impl PpiError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        PpiError::InvalidParameter(msg.into())
    }

    pub(crate) fn degenerate(step: u64, what: impl Into<String>) -> Self {
        PpiError::NumericalDegeneracy { step, what: what.into() }
    }
}
