// Copyright 2026 Policy Inference Lab. All rights reserved.
// PPI Calibration Runner - fits growth factors and the convergence horizon
// of a synthetic indicator set, printing the volatility-vs-horizon history.
//
// Usage:
//   cargo run --release --bin calibrate                    # defaults
//   cargo run --release --bin calibrate -- --indicators 8  # bigger universe
//   cargo run --release --bin calibrate -- --vola 0.02     # empirical volatility
//   cargo run --release --bin calibrate -- --json out.json # write full report
//
// Set RUST_LOG=info for per-round calibration progress.

use serde::Serialize;

use ppi_engine::{
    match_volatility, sample_convergence, CalibrationSettings, HorizonRecord, ModelConfig,
    PolicyModel, Stats,
};

// ─── CLI Parsing ────────────────────────────────────────────────────────────

struct CliArgs {
    indicators: usize,
    sample: usize,
    steps: u64,
    seed: u64,
    vola: f64,
    dev_lim: f64,
    workers: Option<usize>,
    max_horizons: Option<u64>,
    json: Option<String>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut cli = CliArgs {
        indicators: 4,
        sample: 100,
        steps: 10,
        seed: 0,
        vola: 0.05,
        dev_lim: 3.0,
        workers: None,
        max_horizons: Some(50),
        json: None,
    };

    let mut i = 0;
    while i < args.len() {
        let take = |args: &[String], i: &mut usize| -> Option<String> {
            *i += 1;
            args.get(*i).cloned()
        };
        match args[i].as_str() {
            "--indicators" => {
                if let Some(v) = take(&args, &mut i) {
                    cli.indicators = v.parse().unwrap_or(cli.indicators);
                }
            }
            "--sample" => {
                if let Some(v) = take(&args, &mut i) {
                    cli.sample = v.parse().unwrap_or(cli.sample);
                }
            }
            "--steps" => {
                if let Some(v) = take(&args, &mut i) {
                    cli.steps = v.parse().unwrap_or(cli.steps);
                }
            }
            "--seed" => {
                if let Some(v) = take(&args, &mut i) {
                    cli.seed = v.parse().unwrap_or(cli.seed);
                }
            }
            "--vola" => {
                if let Some(v) = take(&args, &mut i) {
                    cli.vola = v.parse().unwrap_or(cli.vola);
                }
            }
            "--dev-lim" => {
                if let Some(v) = take(&args, &mut i) {
                    cli.dev_lim = v.parse().unwrap_or(cli.dev_lim);
                }
            }
            "--workers" => {
                if let Some(v) = take(&args, &mut i) {
                    cli.workers = v.parse().ok();
                }
            }
            "--max-horizons" => {
                if let Some(v) = take(&args, &mut i) {
                    cli.max_horizons = v.parse().ok();
                }
            }
            "--json" => {
                cli.json = take(&args, &mut i);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
            }
        }
        i += 1;
    }

    cli
}

// ─── Report ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CalibrationReport {
    version: &'static str,
    prng: &'static str,
    indicators: usize,
    sample_size: usize,
    empirical_volatility: f64,
    history: Vec<HorizonRecord>,
}

// ─── Main ───────────────────────────────────────────────────────────────────

/// Synthetic indicator universe: staggered initial levels with targets a
/// varied distance above them, plus a sparse one-step spillover ring.
fn synthetic_model(n: usize) -> Result<PolicyModel, ppi_engine::PpiError> {
    let initial: Vec<f64> = (0..n).map(|j| 0.15 + 0.04 * (j % 5) as f64).collect();
    let targets: Vec<f64> = initial
        .iter()
        .enumerate()
        .map(|(j, &i0)| i0 + 0.45 + 0.05 * (j % 3) as f64)
        .collect();
    let mut spillovers = vec![vec![0.0; n]; n];
    if n > 1 {
        for j in 0..n {
            spillovers[j][(j + 1) % n] = 0.1;
        }
    }
    PolicyModel::new(
        ModelConfig::new(initial, targets)
            .with_spillovers(spillovers)
            .with_growth(0.5),
    )
}

fn main() {
    env_logger::init();
    let cli = parse_args();

    let model = match synthetic_model(cli.indicators) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("model construction failed: {}", e);
            std::process::exit(1);
        }
    };

    let settings = CalibrationSettings {
        sample_size: cli.sample,
        dev_lim: cli.dev_lim,
        base_seed: cli.seed,
        workers: cli.workers,
        ..CalibrationSettings::default()
    };

    println!("\n  PPI Calibration Runner v0.2.0");
    println!(
        "  PRNG: ChaCha8Rng | Indicators: {} | Sample: {} | Base seed: {}",
        cli.indicators, cli.sample, cli.seed
    );
    println!(
        "  Empirical volatility: {:.6} | Initial horizon: {}\n",
        cli.vola, cli.steps
    );

    let start = std::time::Instant::now();
    let history = match match_volatility(&model, cli.vola, cli.steps, &settings, cli.max_horizons)
    {
        Ok(h) => h,
        Err(e) => {
            eprintln!("calibration failed: {}", e);
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    println!("  {:<10} {:>14} {:>10}", "Horizon", "Volatility", "Matched");
    println!("  {}", "-".repeat(38));
    for record in &history {
        println!(
            "  {:<10} {:>14.6} {:>10}",
            record.horizon,
            record.volatility,
            if record.volatility < cli.vola { "yes" } else { "no" },
        );
    }
    let last = history.last().expect("match_volatility returns at least one record");
    println!("  {}", "-".repeat(38));
    println!(
        "  Matched at horizon {} after {} candidate(s) in {:.1}s",
        last.horizon,
        history.len(),
        elapsed.as_secs_f64()
    );
    // Per-indicator convergence statistics under the fitted factors.
    let fitted = match model.with_growth_factors(&last.growth_factors) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("refit failed: {}", e);
            std::process::exit(1);
        }
    };
    let tick_stats: Vec<Stats> = match sample_convergence(&fitted, cli.sample, cli.seed) {
        Ok(sample) => sample
            .rows()
            .iter()
            .map(|row| {
                let ticks: Vec<f64> = row.iter().map(|&t| t as f64).collect();
                Stats::from_samples(&ticks)
            })
            .collect(),
        Err(e) => {
            eprintln!("final sampling failed: {}", e);
            std::process::exit(1);
        }
    };

    println!("  {:<10} {:>8} {:>12} {:>8} {:>8}", "Indicator", "Alpha", "Ticks", "Min", "Max");
    println!("  {}", "-".repeat(52));
    for (j, (alpha, stats)) in
        last.growth_factors.iter().zip(tick_stats.iter()).enumerate()
    {
        println!(
            "  {:<10} {:>8.4} {:>7.1}±{:<4.1} {:>8.0} {:>8.0}",
            j, alpha, stats.mean, stats.std_dev, stats.min, stats.max,
        );
    }
    println!();

    if let Some(path) = &cli.json {
        let report = CalibrationReport {
            version: "0.2.0",
            prng: "ChaCha8Rng",
            indicators: cli.indicators,
            sample_size: cli.sample,
            empirical_volatility: cli.vola,
            history,
        };
        let json = match serde_json::to_string_pretty(&report) {
            Ok(j) => j,
            Err(e) => {
                eprintln!("failed to serialize report: {}", e);
                std::process::exit(1);
            }
        };
        if let Err(e) = std::fs::write(path, &json) {
            eprintln!("failed to write {}: {}", path, e);
            std::process::exit(1);
        }
        println!("  Report saved to: {}\n", path);
    }
}
