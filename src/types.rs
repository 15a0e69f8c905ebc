// Copyright 2026 Policy Inference Lab. All rights reserved.
// Policy Priority Inference Suite ("PPI") - Type Definitions

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PpiError;
use crate::priority::{GapExponentPolicy, PriorityPolicy};

// ─── Coefficient ─────────────────────────────────────────────────────────────

/// A model coefficient supplied either as one value for every index or as a
/// per-index vector. Covers the growth factor (alpha), monitoring quality
/// (phi), and rule-of-law quality (tau).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Coefficient {
    Uniform(f64),
    PerIndex(Vec<f64>),
}

impl Coefficient {
    /// Expand to a dense vector of length `len`.
    pub fn expand(&self, len: usize) -> Vec<f64> {
        match self {
            Self::Uniform(v) => vec![*v; len],
            Self::PerIndex(vs) => vs.clone(),
        }
    }

    /// Check length (vector form only) and that every value lies in the
    /// given interval. `open` excludes the endpoints.
    pub(crate) fn validate(
        &self,
        name: &str,
        len: usize,
        lo: f64,
        hi: f64,
        open: bool,
    ) -> Result<(), PpiError> {
        let values: &[f64] = match self {
            Self::Uniform(v) => std::slice::from_ref(v),
            Self::PerIndex(vs) => {
                if vs.len() != len {
                    return Err(PpiError::invalid(format!(
                        "{} has length {}, expected {}",
                        name,
                        vs.len(),
                        len
                    )));
                }
                vs
            }
        };
        for &v in values {
            let inside = if open { v > lo && v < hi } else { v >= lo && v <= hi };
            if !v.is_finite() || !inside {
                let open_bracket = if open { "(" } else { "[" };
                let close_bracket = if open { ")" } else { "]" };
                return Err(PpiError::invalid(format!(
                    "{} value {} outside {}{}, {}{}",
                    name, v, open_bracket, lo, hi, close_bracket
                )));
            }
        }
        Ok(())
    }
}

impl From<f64> for Coefficient {
    fn from(v: f64) -> Self {
        Self::Uniform(v)
    }
}

impl From<Vec<f64>> for Coefficient {
    fn from(vs: Vec<f64>) -> Self {
        Self::PerIndex(vs)
    }
}

// ─── ModelConfig ─────────────────────────────────────────────────────────────

/// Full input surface of one simulation: indicator levels, targets, the
/// spillover network, the instrumental mask, coefficients, and optional
/// warm-start overrides. Validated once by `PolicyModel::new`; runs share it
/// read-only.
#[derive(Clone)]
pub struct ModelConfig {
    /// Initial indicator levels (length N).
    pub initial: Vec<f64>,
    /// Target levels; each must strictly exceed its initial value.
    pub targets: Vec<f64>,
    /// Spillover adjacency matrix (N x N). `None` means no spillovers.
    /// The diagonal is forced to zero at construction.
    pub spillovers: Option<Vec<Vec<f64>>>,
    /// Which indicators receive resource allocation. `None` means all.
    pub instrumental: Option<Vec<bool>>,
    /// Growth factor alpha, strictly inside (0, 1).
    pub growth: Coefficient,
    /// Monitoring quality phi in [0, 1], per instrumental indicator.
    pub monitoring: Coefficient,
    /// Rule-of-law quality tau in [0, 1], per instrumental indicator.
    pub rule_of_law: Coefficient,
    /// Optional initial allocation profile P0 (length n, strictly positive).
    pub initial_allocation: Option<Vec<f64>>,
    /// Optional initial historical inefficiencies H0 (length n).
    pub initial_inefficiency: Option<Vec<f64>>,
    /// Optional exogenous priority vector PF (length n, non-negative).
    pub exogenous_priorities: Option<Vec<f64>>,
    /// Probability of following the exogenous priorities each step.
    pub follow_probability: f64,
    /// Convergence tolerance on |target - indicator|.
    pub tolerance: f64,
    /// Hard cap on simulation steps; exceeding it is an error, not a hang.
    pub max_steps: u64,
    /// Priority weighting strategy; defaults to gap^(1 + hist).
    pub policy: Arc<dyn PriorityPolicy>,
}

impl ModelConfig {
    pub fn new(initial: Vec<f64>, targets: Vec<f64>) -> Self {
        Self {
            initial,
            targets,
            spillovers: None,
            instrumental: None,
            growth: Coefficient::Uniform(0.1),
            monitoring: Coefficient::Uniform(0.5),
            rule_of_law: Coefficient::Uniform(0.5),
            initial_allocation: None,
            initial_inefficiency: None,
            exogenous_priorities: None,
            follow_probability: 1.0,
            tolerance: 1e-3,
            max_steps: 100_000,
            policy: Arc::new(GapExponentPolicy),
        }
    }

    pub fn with_spillovers(mut self, a: Vec<Vec<f64>>) -> Self {
        self.spillovers = Some(a);
        self
    }

    pub fn with_instrumental(mut self, mask: Vec<bool>) -> Self {
        self.instrumental = Some(mask);
        self
    }

    pub fn with_growth(mut self, alpha: impl Into<Coefficient>) -> Self {
        self.growth = alpha.into();
        self
    }

    pub fn with_monitoring(mut self, phi: impl Into<Coefficient>) -> Self {
        self.monitoring = phi.into();
        self
    }

    pub fn with_rule_of_law(mut self, tau: impl Into<Coefficient>) -> Self {
        self.rule_of_law = tau.into();
        self
    }

    pub fn with_initial_allocation(mut self, p0: Vec<f64>) -> Self {
        self.initial_allocation = Some(p0);
        self
    }

    pub fn with_initial_inefficiency(mut self, h0: Vec<f64>) -> Self {
        self.initial_inefficiency = Some(h0);
        self
    }

    pub fn with_exogenous_priorities(mut self, pf: Vec<f64>, follow_probability: f64) -> Self {
        self.exogenous_priorities = Some(pf);
        self.follow_probability = follow_probability;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn PriorityPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Number of indicators.
    pub fn len(&self) -> usize {
        self.initial.len()
    }

    pub fn is_empty(&self) -> bool {
        self.initial.is_empty()
    }

    /// Dense instrumental mask (all-true when none was supplied).
    pub fn instrumental_mask(&self) -> Vec<bool> {
        self.instrumental
            .clone()
            .unwrap_or_else(|| vec![true; self.len()])
    }
}

// ─── RunOutput ───────────────────────────────────────────────────────────────

/// Full trajectory of one simulation run. Each series stores one snapshot
/// per recorded step: indicator-indexed series have inner length N, agent
/// series (contributions, benefits, allocations, inefficiencies) have inner
/// length n (instrumental indicators only).
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub indicators: Vec<Vec<f64>>,
    pub contributions: Vec<Vec<f64>>,
    pub benefits: Vec<Vec<f64>>,
    pub allocations: Vec<Vec<f64>>,
    pub inefficiencies: Vec<Vec<f64>>,
    pub spillovers: Vec<Vec<f64>>,
    /// Step at which each indicator was last outside tolerance, frozen once
    /// it converges.
    pub ticks: Vec<u64>,
    /// Final accumulated historical inefficiencies (length n).
    pub inefficiency_history: Vec<f64>,
    /// Total steps executed.
    pub steps: u64,
    /// Indicator levels at termination.
    pub final_indicators: Vec<f64>,
}
