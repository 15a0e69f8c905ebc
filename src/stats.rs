// Copyright 2026 Policy Inference Lab. All rights reserved.
// Policy Priority Inference Suite ("PPI") - Statistics

use serde::Serialize;

use crate::types::RunOutput;

// ─── Stats (per-metric Monte Carlo aggregation) ─────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub mean: f64,
    pub std_dev: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

impl Stats {
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self { mean: 0.0, std_dev: 0.0, ci_lower: 0.0, ci_upper: 0.0, min: 0.0, max: 0.0, n: 0 };
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        let std_dev = variance.sqrt();
        let stderr = std_dev / (n as f64).sqrt();
        let z = 1.96; // 95% CI
        Self {
            mean,
            std_dev,
            ci_lower: mean - z * stderr,
            ci_upper: mean + z * stderr,
            min: samples.iter().cloned().fold(f64::INFINITY, f64::min),
            max: samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            n,
        }
    }
}

// ─── Pooled volatility ──────────────────────────────────────────────────────

/// Population standard deviation (divisor n, not n-1) of a pooled sample.
fn population_std(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Simulated volatility of a batch of runs: the population standard
/// deviation of every per-step indicator change across every run, pooled
/// into one sample. This is the quantity the horizon search compares
/// against its empirical counterpart.
pub fn pooled_volatility(runs: &[RunOutput]) -> f64 {
    let mut diffs = Vec::new();
    for run in runs {
        for window in run.indicators.windows(2) {
            for (next, prev) in window[1].iter().zip(window[0].iter()) {
                diffs.push(next - prev);
            }
        }
    }
    population_std(&diffs)
}
