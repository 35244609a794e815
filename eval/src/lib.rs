// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Group fairness evaluation over precomputed bias disparities
//!
//! This crate provides:
//! - Element fairness: disparity ratios checked against a tau tolerance band
//! - Composite fairness: type parity and supervised/unsupervised categories
//! - Reduction to group attribute level and an overall verdict
//! - Disparity table loading (CSV) and seeded synthetic tables
//! - A pipeline producing serializable results

pub mod composite;
pub mod config;
pub mod datasets;
pub mod element;
pub mod error;
pub mod pipeline;
pub mod reduce;
pub mod table;

pub use composite::CompositeEvaluator;
pub use config::{
    Combinator, CompositeSpec, FairnessConfig, FairnessConfigBuilder, FairnessSettings, MeasureSpec, StrictAnd,
    TauBand, ThresholdPredicate,
};
pub use element::ElementEvaluator;
pub use error::FairnessError;
pub use pipeline::{FairnessPipeline, FairnessResults, PipelineOptions};
pub use reduce::{OverallFairness, Reducer, Verdict};
pub use table::{DisparityTable, GroupAttributeTable, GroupKey, GroupValueTable, RowKey};
