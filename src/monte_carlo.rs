// Copyright 2026 Policy Inference Lab. All rights reserved.
// Policy Priority Inference Suite ("PPI") - Monte Carlo Sampling
//
// Repeated independent trajectories of one model with seeds
// base_seed..base_seed+k. Aggregation beyond the per-indicator mean is the
// caller's job.

use crate::error::PpiError;
use crate::simulation::PolicyModel;
use crate::types::RunOutput;

// ─── TickSample ─────────────────────────────────────────────────────────────

/// Convergence ticks of a Monte Carlo batch: one row per indicator, one
/// column per simulation run.
#[derive(Debug, Clone)]
pub struct TickSample {
    ticks: Vec<Vec<u64>>,
}

impl TickSample {
    /// (indicators, runs)
    pub fn shape(&self) -> (usize, usize) {
        let rows = self.ticks.len();
        let cols = self.ticks.first().map_or(0, |r| r.len());
        (rows, cols)
    }

    pub fn rows(&self) -> &[Vec<u64>] {
        &self.ticks
    }

    /// Mean convergence tick per indicator.
    pub fn mean_ticks(&self) -> Vec<f64> {
        self.ticks
            .iter()
            .map(|row| row.iter().sum::<u64>() as f64 / row.len() as f64)
            .collect()
    }
}

// ─── Sampling ───────────────────────────────────────────────────────────────

/// Run `sample_size` independent trajectories and collect each run's tick
/// vector as one column. Runs share nothing but the read-only model; run i
/// draws from its own stream seeded `base_seed + i`.
pub fn sample_convergence(
    model: &PolicyModel,
    sample_size: usize,
    base_seed: u64,
) -> Result<TickSample, PpiError> {
    if sample_size == 0 {
        return Err(PpiError::invalid("sample size must be at least 1"));
    }
    let n_ind = model.config().len();
    let mut ticks = vec![vec![0u64; sample_size]; n_ind];
    for i in 0..sample_size {
        let run = model.run(base_seed + i as u64)?;
        for (j, &tick) in run.ticks.iter().enumerate() {
            ticks[j][i] = tick;
        }
    }
    Ok(TickSample { ticks })
}

/// Same seed loop, retaining each run's full trajectory. Used by the
/// calibrator's final volatility pass.
pub fn sample_trajectories(
    model: &PolicyModel,
    sample_size: usize,
    base_seed: u64,
) -> Result<Vec<RunOutput>, PpiError> {
    if sample_size == 0 {
        return Err(PpiError::invalid("sample size must be at least 1"));
    }
    (0..sample_size)
        .map(|i| model.run(base_seed + i as u64))
        .collect()
}
