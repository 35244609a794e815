// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Fairness evaluation pipeline
//!
//! Orchestrates:
//! - Element fairness per group value
//! - Type parity and high level composites
//! - Reduction to group attribute level
//! - Overall verdict
//! - Results serialization

use crate::composite::CompositeEvaluator;
use crate::config::{Combinator, FairnessConfig, FairnessSettings, ThresholdPredicate};
use crate::element::ElementEvaluator;
use crate::reduce::{OverallFairness, Reducer};
use crate::table::{DisparityTable, GroupAttributeTable, GroupValueTable};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Per run options layered on top of the configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Overrides the configured tau for element evaluation
    pub tau: Option<f64>,
    /// Element measures to evaluate and reduce (empty = all configured)
    pub measures: Vec<String>,
    /// Hex SHA-256 of the input file, recorded in the results
    pub input_digest: Option<String>,
}

/// Attribute level fairness of one (model, threshold, attribute) group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub model_id: String,
    pub score_threshold: String,
    pub attribute_name: String,
    pub fairness: BTreeMap<String, Option<bool>>,
}

/// Complete pipeline output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FairnessResults {
    pub overall: OverallFairness,
    pub group_attribute: Vec<AttributeRecord>,
    pub group_value_rows: usize,
    pub measures_evaluated: Vec<String>,
    pub tau: f64,
    pub settings: FairnessSettings,
    pub input_digest: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Intermediate tables of a run, for callers that need more than the summary
#[derive(Debug, Clone)]
pub struct PipelineTables {
    pub group_value: GroupValueTable,
    pub group_attribute: GroupAttributeTable,
    pub overall: OverallFairness,
}

impl FairnessResults {
    /// Save results to JSON file
    pub fn save(&self, output_path: &Path) -> Result<()> {
        std::fs::create_dir_all(output_path.parent().unwrap_or(Path::new(".")))?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(output_path, json)?;
        tracing::info!("Results saved to {}", output_path.display());
        Ok(())
    }

    /// Short console summary of a run
    pub fn summary(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("tau = {}, group value rows = {}\n\n", self.tau, self.group_value_rows));

        let width = self.measures_evaluated.iter().map(|m| m.len()).max().unwrap_or(0).max(8);
        for record in &self.group_attribute {
            out.push_str(&format!(
                "[model {} | {} | {}]\n",
                record.model_id, record.score_threshold, record.attribute_name
            ));
            for measure in &self.measures_evaluated {
                let cell = match record.fairness.get(measure).copied().flatten() {
                    Some(true) => "fair",
                    Some(false) => "UNFAIR",
                    None => "-",
                };
                out.push_str(&format!("  {:<width$} {}\n", measure, cell, width = width));
            }
        }

        out.push('\n');
        for (category, value) in self.overall.entries() {
            out.push_str(&format!("{}: {}\n", category, value));
        }
        out
    }
}

/// Main fairness pipeline
pub struct FairnessPipeline<P, C> {
    config: FairnessConfig<P, C>,
    options: PipelineOptions,
}

impl<P: ThresholdPredicate, C: Combinator> FairnessPipeline<P, C> {
    pub fn new(config: FairnessConfig<P, C>, options: PipelineOptions) -> Self {
        Self { config, options }
    }

    pub fn config(&self) -> &FairnessConfig<P, C> {
        &self.config
    }

    fn requested(&self) -> Option<Vec<&str>> {
        if self.options.measures.is_empty() {
            None
        } else {
            Some(self.options.measures.iter().map(String::as_str).collect())
        }
    }

    /// Run every stage and keep the intermediate tables
    pub fn evaluate(&self, table: &DisparityTable) -> Result<PipelineTables> {
        let requested = self.requested();

        let element = ElementEvaluator::new(&self.config).evaluate(table, self.options.tau, requested.as_deref())?;
        let group_value = CompositeEvaluator::new(&self.config).evaluate(&element);

        let reducer = Reducer::new(&self.config);
        let group_attribute = reducer.reduce_to_attribute(&group_value, requested.as_deref())?;
        let overall = reducer.reduce_to_overall(&group_attribute);

        tracing::info!(
            "Evaluated {} group value rows into {} group attributes",
            group_value.len(),
            group_attribute.len()
        );

        Ok(PipelineTables {
            group_value,
            group_attribute,
            overall,
        })
    }

    /// Run the full pipeline and package the results
    pub fn run(&self, table: &DisparityTable) -> Result<FairnessResults> {
        let tables = self.evaluate(table)?;

        let group_attribute = tables
            .group_attribute
            .groups
            .iter()
            .enumerate()
            .map(|(idx, group)| AttributeRecord {
                model_id: group.model_id.clone(),
                score_threshold: group.score_threshold.clone(),
                attribute_name: group.attribute_name.clone(),
                fairness: tables
                    .group_attribute
                    .fairness
                    .iter()
                    .map(|column| (column.name.clone(), column.values[idx]))
                    .collect(),
            })
            .collect();

        Ok(FairnessResults {
            overall: tables.overall,
            group_attribute,
            group_value_rows: tables.group_value.len(),
            measures_evaluated: tables.group_attribute.fairness.names().map(String::from).collect(),
            tau: self.options.tau.unwrap_or(self.config.tau()),
            settings: self.config.settings(),
            input_digest: self.options.input_digest.clone(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MeasureSpec, STATISTICAL_PARITY, SUPERVISED_FAIRNESS};
    use crate::datasets::{synthetic, SyntheticSpec};
    use crate::error::FairnessError;
    use crate::reduce::Verdict;
    use crate::table::{GroupKey, RowKey};

    fn race_table() -> DisparityTable {
        DisparityTable::new(vec![
            RowKey::new("1", "binary 0/1", "race", "white"),
            RowKey::new("1", "binary 0/1", "race", "black"),
        ])
        .with_disparity("ppr_disparity", vec![Some(0.9), Some(1.3)])
    }

    #[test]
    fn test_end_to_end_statistical_parity() {
        let pipeline = FairnessPipeline::new(FairnessConfig::default(), PipelineOptions::default());
        let tables = pipeline.evaluate(&race_table()).unwrap();

        assert_eq!(
            tables.group_value.measure(STATISTICAL_PARITY).unwrap(),
            &[Some(true), Some(false)]
        );

        let group = GroupKey {
            model_id: "1".to_string(),
            score_threshold: "binary 0/1".to_string(),
            attribute_name: "race".to_string(),
        };
        assert_eq!(tables.group_attribute.value(&group, STATISTICAL_PARITY), Some(false));

        // Unsupervised falls back to Statistical Parity alone
        assert_eq!(tables.overall.unsupervised, Some(false));
        assert_eq!(tables.overall.supervised, None);
        assert_eq!(tables.overall.overall, Verdict::Unfair);
    }

    #[test]
    fn test_no_configured_columns_is_fatal() {
        let table = DisparityTable::new(vec![RowKey::new("1", "binary 0/1", "race", "white")])
            .with_disparity("tpr_disparity", vec![Some(1.0)]);
        let pipeline = FairnessPipeline::new(FairnessConfig::default(), PipelineOptions::default());

        let err = pipeline.run(&table).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FairnessError>(),
            Some(FairnessError::NoApplicableMeasures { .. })
        ));
    }

    #[test]
    fn test_run_synthetic() {
        let table = synthetic(&SyntheticSpec::default(), 42).unwrap();
        let pipeline = FairnessPipeline::new(FairnessConfig::default(), PipelineOptions::default());

        let results = pipeline.run(&table).unwrap();

        assert_eq!(results.group_attribute.len(), 3);
        assert_eq!(results.group_value_rows, 9);
        assert_eq!(results.measures_evaluated.len(), 10);
        assert!(results.overall.supervised.is_some());
        assert!(results.overall.unsupervised.is_some());
        assert_ne!(results.overall.overall, Verdict::Unknown);
    }

    #[test]
    fn test_run_synthetic_with_custom_measures() {
        let config = FairnessConfig::builder()
            .element_measures(vec![MeasureSpec::new("TPR Parity", "tpr_disparity")])
            .build()
            .unwrap();
        let table = synthetic(&SyntheticSpec::default().with_measures(config.element_measures()), 42).unwrap();
        let pipeline = FairnessPipeline::new(config, PipelineOptions::default());

        let results = pipeline.run(&table).unwrap();

        assert_eq!(results.measures_evaluated, vec!["TPR Parity".to_string()]);
        assert_eq!(results.group_attribute.len(), 3);
        assert_eq!(results.overall.overall, Verdict::Unknown);
    }

    #[test]
    fn test_requested_measures_limit_output() {
        let table = synthetic(&SyntheticSpec::default(), 42).unwrap();
        let options = PipelineOptions {
            measures: vec![STATISTICAL_PARITY.to_string()],
            ..Default::default()
        };
        let pipeline = FairnessPipeline::new(FairnessConfig::default(), options);

        let results = pipeline.run(&table).unwrap();

        assert_eq!(
            results.measures_evaluated,
            vec![STATISTICAL_PARITY.to_string(), "Unsupervised Fairness".to_string()]
        );
        assert!(results.overall.supervised.is_none());
        assert!(!results.measures_evaluated.contains(&SUPERVISED_FAIRNESS.to_string()));
    }

    #[test]
    fn test_save_results_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("fairness.json");
        let pipeline = FairnessPipeline::new(FairnessConfig::default(), PipelineOptions::default());
        let results = pipeline.run(&race_table()).unwrap();

        results.save(&path).unwrap();

        let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["overall"]["Overall Fairness"], serde_json::json!(false));
        assert_eq!(saved["group_attribute"][0]["fairness"][STATISTICAL_PARITY], serde_json::json!(false));

        let summary = results.summary();
        assert!(summary.contains("UNFAIR"));
        assert!(summary.contains("Overall Fairness: false"));
    }
}
