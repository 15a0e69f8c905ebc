// Copyright 2026 Policy Inference Lab. All rights reserved.
// Policy Priority Inference Suite ("PPI")
//
// A stochastic agent-based model of the policymaking process: development
// indicators grow toward targets under resource allocation, monitoring, and
// spillover dynamics, and a Monte Carlo calibration layer fits the model's
// growth factors and convergence horizon to empirical data.

pub mod calibration;
pub mod error;
pub mod horizon;
pub mod monte_carlo;
pub mod priority;
pub mod simulation;
pub mod stats;
pub mod targets;
pub mod types;

pub use calibration::{estimate_growth_factors, CalibrationOutcome, CalibrationSettings};
pub use error::PpiError;
pub use horizon::{match_volatility, HorizonRecord};
pub use monte_carlo::{sample_convergence, sample_trajectories, TickSample};
pub use priority::{GapExponentPolicy, PriorityPolicy};
pub use simulation::PolicyModel;
pub use stats::{pooled_volatility, Stats};
pub use targets::series_targets;
pub use types::{Coefficient, ModelConfig, RunOutput};
