// Copyright 2026 Policy Inference Lab. All rights reserved.
// Policy Priority Inference Suite ("PPI") - Horizon Search

use log::info;
use serde::Serialize;

use crate::calibration::{estimate_growth_factors, CalibrationSettings};
use crate::error::PpiError;
use crate::simulation::PolicyModel;

/// One calibrated horizon: the number of convergence periods, the growth
/// factors fitted for it, and the volatility those factors simulate.
#[derive(Debug, Clone, Serialize)]
pub struct HorizonRecord {
    pub horizon: u64,
    pub growth_factors: Vec<f64>,
    pub volatility: f64,
}

/// Walk the convergence horizon upward from `initial_horizon`, calibrating
/// growth factors at each step (warm-started from the previous horizon's
/// fit), until the simulated volatility falls below the empirical one.
///
/// Returns the full record history: callers inspect the volatility-vs-horizon
/// trajectory, and the last entry is the first horizon that matched. A
/// `max_horizons` budget turns a volatility that never drops into an error
/// instead of an endless climb.
pub fn match_volatility(
    model: &PolicyModel,
    empirical_volatility: f64,
    initial_horizon: u64,
    settings: &CalibrationSettings,
    max_horizons: Option<u64>,
) -> Result<Vec<HorizonRecord>, PpiError> {
    if !(empirical_volatility > 0.0) || !empirical_volatility.is_finite() {
        return Err(PpiError::invalid("empirical volatility must be positive and finite"));
    }
    if initial_horizon == 0 {
        return Err(PpiError::invalid("initial horizon must be at least 1"));
    }

    let mut history: Vec<HorizonRecord> = Vec::new();
    let mut horizon = initial_horizon;
    let mut warm: Option<Vec<f64>> = None;

    loop {
        if let Some(max) = max_horizons {
            if history.len() as u64 >= max {
                return Err(PpiError::HorizonExhausted {
                    horizons: max,
                    empirical: empirical_volatility,
                });
            }
        }

        let outcome = estimate_growth_factors(model, horizon, warm.as_deref(), settings)?;
        info!(
            "horizon {}: simulated volatility {:.6} vs empirical {:.6}",
            horizon, outcome.volatility, empirical_volatility
        );

        let matched = outcome.volatility < empirical_volatility;
        warm = Some(outcome.growth_factors.clone());
        history.push(HorizonRecord {
            horizon,
            growth_factors: outcome.growth_factors,
            volatility: outcome.volatility,
        });

        if matched {
            return Ok(history);
        }
        horizon += 1;
    }
}
