// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Fairness evaluation CLI
//!
//! Usage:
//!   fairness-eval --synthetic --seed 42
//!   fairness-eval --input bias.csv --tau 0.8 --output eval/results

use anyhow::Result;
use clap::Parser;
use fairness_eval::datasets::{self, SyntheticSpec};
use fairness_eval::pipeline::{FairnessPipeline, PipelineOptions};
use fairness_eval::{FairnessConfig, FairnessSettings};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fairness-eval")]
#[command(about = "Evaluate group fairness from bias disparity tables")]
#[command(version)]
struct Args {
    /// CSV file with disparity ratios (one row per attribute value)
    #[arg(short, long, conflicts_with = "synthetic")]
    input: Option<PathBuf>,

    /// Evaluate a seeded synthetic disparity table
    #[arg(long)]
    synthetic: bool,

    /// Random seed for the synthetic table
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Fairness threshold in (0, 1]; overrides the config file
    #[arg(short, long)]
    tau: Option<f64>,

    /// JSON fairness configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Element measures to evaluate (comma-separated, empty = all)
    #[arg(short, long)]
    measures: Option<String>,

    /// Output directory for results
    #[arg(short, long, default_value = "eval/results")]
    output: PathBuf,

    /// List configured fairness measures and exit
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => FairnessSettings::load(path)?,
        None => FairnessSettings::default(),
    };
    let mut builder = FairnessConfig::builder().settings(settings);
    if let Some(tau) = args.tau {
        builder = builder.tau(tau);
    }
    let config = builder.build()?;

    if args.list {
        print_measures(&config);
        return Ok(());
    }

    let (table, input_digest, source) = match &args.input {
        Some(path) => (
            datasets::load_csv(path)?,
            Some(datasets::file_sha256(path)?),
            path.display().to_string(),
        ),
        None => {
            if !args.synthetic {
                tracing::warn!("No input provided, using synthetic disparity table");
            }
            tracing::info!("Generating synthetic disparity table with seed {}", args.seed);
            (
                datasets::synthetic(&SyntheticSpec::default().with_measures(config.element_measures()), args.seed)?,
                None,
                format!("synthetic (seed {})", args.seed),
            )
        }
    };

    tracing::info!("Fairness Evaluation");
    tracing::info!("===================");
    tracing::info!("Input: {}", source);
    tracing::info!("Tau: {}", config.tau());
    for (attribute, count) in datasets::attribute_distribution(&table) {
        tracing::info!("  {}: {} values", attribute, count);
    }

    let measures: Vec<String> = args
        .measures
        .map(|m| m.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let options = PipelineOptions {
        tau: None,
        measures,
        input_digest,
    };
    let pipeline = FairnessPipeline::new(config, options);
    let results = pipeline.run(&table)?;

    println!("\n{}", "=".repeat(60));
    println!("FAIRNESS SUMMARY");
    println!("{}", "=".repeat(60));
    println!("{}", results.summary());

    std::fs::create_dir_all(&args.output)?;
    let timestamp = results.timestamp.format("%Y%m%d_%H%M%S");
    let json_path = args.output.join(format!("fairness_{}.json", timestamp));
    results.save(&json_path)?;
    println!("JSON results saved to: {}", json_path.display());

    Ok(())
}

fn print_measures(config: &FairnessConfig) {
    println!("tau = {}", config.tau());
    println!("\nElement measures:");
    for measure in config.element_measures() {
        println!("  {:<20} <- {}", measure.name, measure.source);
    }
    println!("\nType parity:");
    for composite in config.type_parity() {
        println!("  {:<20} <- {} & {}", composite.name, composite.inputs[0], composite.inputs[1]);
    }
    println!("\nHigh level fairness:");
    for composite in config.high_level_parity() {
        println!("  {:<20} <- {} & {}", composite.name, composite.inputs[0], composite.inputs[1]);
    }
}
