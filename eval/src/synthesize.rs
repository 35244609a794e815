// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Synthetic disparity table generator
//!
//! Writes a seeded CSV in the input format of `fairness-eval`, for trying
//! out configurations without a bias computation at hand.

use anyhow::Result;
use clap::Parser;
use fairness_eval::datasets::{self, SyntheticSpec};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "synthesize-disparities")]
#[command(about = "Generate a synthetic disparity table")]
#[command(version)]
struct Args {
    /// Output CSV file
    #[arg(short, long, default_value = "eval/datasets/synthetic_disparities.csv")]
    output: PathBuf,

    /// Random seed
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Number of models
    #[arg(long, default_value_t = 1)]
    models: usize,

    /// Score thresholds (comma-separated)
    #[arg(long, default_value = "binary 0/1")]
    thresholds: String,

    /// Log-ratio spread of generated disparities
    #[arg(long, default_value_t = 0.4)]
    spread: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let spec = SyntheticSpec {
        models: args.models,
        score_thresholds: args.thresholds.split(',').map(|s| s.trim().to_string()).collect(),
        spread: args.spread,
        ..Default::default()
    };

    tracing::info!("Generating {} model(s), seed={}", spec.models, args.seed);
    let table = datasets::synthetic(&spec, args.seed)?;
    datasets::write_csv(&table, &args.output)?;

    println!("Wrote {} rows to {}", table.len(), args.output.display());
    for (attribute, count) in datasets::attribute_distribution(&table) {
        println!("  {}: {} values", attribute, count);
    }

    Ok(())
}
