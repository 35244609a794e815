// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Fairness configuration
//!
//! The configuration is immutable once built and can be shared freely between
//! threads. It carries:
//! - `tau`, the fairness tolerance in (0.0, 1.0]
//! - the threshold predicate deciding whether a disparity ratio is fair
//! - the combinator deriving composite measures from their inputs
//! - which disparity column feeds each element measure
//! - which measures feed the type parity and high level categories

use crate::error::{validate_tau, FairnessError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_TAU: f64 = 0.8;

pub const STATISTICAL_PARITY: &str = "Statistical Parity";
pub const IMPACT_PARITY: &str = "Impact Parity";
pub const FDR_PARITY: &str = "FDR Parity";
pub const FPR_PARITY: &str = "FPR Parity";
pub const FOR_PARITY: &str = "FOR Parity";
pub const FNR_PARITY: &str = "FNR Parity";
pub const TYPE_I_PARITY: &str = "TypeI Parity";
pub const TYPE_II_PARITY: &str = "TypeII Parity";
pub const UNSUPERVISED_FAIRNESS: &str = "Unsupervised Fairness";
pub const SUPERVISED_FAIRNESS: &str = "Supervised Fairness";
pub const OVERALL_FAIRNESS: &str = "Overall Fairness";

/// Decides whether a disparity ratio is fair under a tolerance `tau`
pub trait ThresholdPredicate {
    fn is_fair(&self, tau: f64, ratio: f64) -> bool;
}

/// Default predicate: `tau <= ratio <= 1 / tau`, both bounds inclusive
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TauBand;

impl ThresholdPredicate for TauBand {
    fn is_fair(&self, tau: f64, ratio: f64) -> bool {
        tau <= ratio && ratio <= 1.0 / tau
    }
}

impl<F> ThresholdPredicate for F
where
    F: Fn(f64, f64) -> bool,
{
    fn is_fair(&self, tau: f64, ratio: f64) -> bool {
        self(tau, ratio)
    }
}

/// Combines constituent fairness cells into a composite cell
pub trait Combinator {
    /// Both constituent columns are present
    fn pair(&self, a: Option<bool>, b: Option<bool>) -> bool;
    /// Only one constituent column is present
    fn single(&self, a: Option<bool>) -> bool;
}

/// Logical AND where only an explicit `true` counts as fair
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StrictAnd;

impl Combinator for StrictAnd {
    fn pair(&self, a: Option<bool>, b: Option<bool>) -> bool {
        a == Some(true) && b == Some(true)
    }

    fn single(&self, a: Option<bool>) -> bool {
        a == Some(true)
    }
}

/// Element measure fed by a disparity column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureSpec {
    pub name: String,
    pub source: String,
}

impl MeasureSpec {
    pub fn new(name: &str, source: &str) -> Self {
        Self {
            name: name.to_string(),
            source: source.to_string(),
        }
    }
}

/// Composite measure fed by an ordered pair of other measures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeSpec {
    pub name: String,
    pub inputs: [String; 2],
}

impl CompositeSpec {
    pub fn new(name: &str, first: &str, second: &str) -> Self {
        Self {
            name: name.to_string(),
            inputs: [first.to_string(), second.to_string()],
        }
    }
}

pub fn default_element_measures() -> Vec<MeasureSpec> {
    vec![
        MeasureSpec::new(STATISTICAL_PARITY, "ppr_disparity"),
        MeasureSpec::new(IMPACT_PARITY, "pprev_disparity"),
        MeasureSpec::new(FDR_PARITY, "fdr_disparity"),
        MeasureSpec::new(FPR_PARITY, "fpr_disparity"),
        MeasureSpec::new(FOR_PARITY, "for_disparity"),
        MeasureSpec::new(FNR_PARITY, "fnr_disparity"),
    ]
}

pub fn default_type_parity() -> Vec<CompositeSpec> {
    vec![
        CompositeSpec::new(TYPE_I_PARITY, FDR_PARITY, FPR_PARITY),
        CompositeSpec::new(TYPE_II_PARITY, FOR_PARITY, FNR_PARITY),
    ]
}

pub fn default_high_level_parity() -> Vec<CompositeSpec> {
    vec![
        CompositeSpec::new(UNSUPERVISED_FAIRNESS, STATISTICAL_PARITY, IMPACT_PARITY),
        CompositeSpec::new(SUPERVISED_FAIRNESS, TYPE_I_PARITY, TYPE_II_PARITY),
    ]
}

/// Immutable fairness configuration
#[derive(Debug, Clone)]
pub struct FairnessConfig<P = TauBand, C = StrictAnd> {
    tau: f64,
    predicate: P,
    combinator: C,
    element_measures: Vec<MeasureSpec>,
    type_parity: Vec<CompositeSpec>,
    high_level_parity: Vec<CompositeSpec>,
}

impl Default for FairnessConfig {
    fn default() -> Self {
        Self {
            tau: DEFAULT_TAU,
            predicate: TauBand,
            combinator: StrictAnd,
            element_measures: default_element_measures(),
            type_parity: default_type_parity(),
            high_level_parity: default_high_level_parity(),
        }
    }
}

impl FairnessConfig {
    pub fn builder() -> FairnessConfigBuilder {
        FairnessConfigBuilder::default()
    }
}

impl<P, C> FairnessConfig<P, C> {
    pub fn tau(&self) -> f64 {
        self.tau
    }

    pub fn predicate(&self) -> &P {
        &self.predicate
    }

    pub fn combinator(&self) -> &C {
        &self.combinator
    }

    pub fn element_measures(&self) -> &[MeasureSpec] {
        &self.element_measures
    }

    pub fn type_parity(&self) -> &[CompositeSpec] {
        &self.type_parity
    }

    pub fn high_level_parity(&self) -> &[CompositeSpec] {
        &self.high_level_parity
    }

    /// Element measure names in configuration order
    pub fn supported_measures(&self) -> Vec<&str> {
        self.element_measures.iter().map(|m| m.name.as_str()).collect()
    }

    /// Serializable view of this configuration (the predicate is not included)
    pub fn settings(&self) -> FairnessSettings {
        FairnessSettings {
            tau: Some(self.tau),
            element_measures: Some(self.element_measures.clone()),
            type_parity: Some(self.type_parity.clone()),
            high_level_parity: Some(self.high_level_parity.clone()),
        }
    }
}

/// Builder with independent overrides for every configuration field
#[derive(Debug, Clone)]
pub struct FairnessConfigBuilder<P = TauBand, C = StrictAnd> {
    tau: f64,
    predicate: P,
    combinator: C,
    element_measures: Vec<MeasureSpec>,
    type_parity: Vec<CompositeSpec>,
    high_level_parity: Vec<CompositeSpec>,
}

impl Default for FairnessConfigBuilder {
    fn default() -> Self {
        let defaults = FairnessConfig::default();
        Self {
            tau: defaults.tau,
            predicate: defaults.predicate,
            combinator: defaults.combinator,
            element_measures: defaults.element_measures,
            type_parity: defaults.type_parity,
            high_level_parity: defaults.high_level_parity,
        }
    }
}

impl<P, C> FairnessConfigBuilder<P, C> {
    pub fn tau(mut self, tau: f64) -> Self {
        self.tau = tau;
        self
    }

    pub fn predicate<Q: ThresholdPredicate>(self, predicate: Q) -> FairnessConfigBuilder<Q, C> {
        FairnessConfigBuilder {
            tau: self.tau,
            predicate,
            combinator: self.combinator,
            element_measures: self.element_measures,
            type_parity: self.type_parity,
            high_level_parity: self.high_level_parity,
        }
    }

    pub fn combinator<D: Combinator>(self, combinator: D) -> FairnessConfigBuilder<P, D> {
        FairnessConfigBuilder {
            tau: self.tau,
            predicate: self.predicate,
            combinator,
            element_measures: self.element_measures,
            type_parity: self.type_parity,
            high_level_parity: self.high_level_parity,
        }
    }

    pub fn element_measures(mut self, measures: Vec<MeasureSpec>) -> Self {
        self.element_measures = measures;
        self
    }

    pub fn type_parity(mut self, composites: Vec<CompositeSpec>) -> Self {
        self.type_parity = composites;
        self
    }

    pub fn high_level_parity(mut self, composites: Vec<CompositeSpec>) -> Self {
        self.high_level_parity = composites;
        self
    }

    /// Apply every field set in `settings`, leaving the others untouched
    pub fn settings(mut self, settings: FairnessSettings) -> Self {
        if let Some(tau) = settings.tau {
            self.tau = tau;
        }
        if let Some(measures) = settings.element_measures {
            self.element_measures = measures;
        }
        if let Some(composites) = settings.type_parity {
            self.type_parity = composites;
        }
        if let Some(composites) = settings.high_level_parity {
            self.high_level_parity = composites;
        }
        self
    }

    pub fn build(self) -> Result<FairnessConfig<P, C>, FairnessError> {
        let tau = validate_tau(self.tau)?;
        Ok(FairnessConfig {
            tau,
            predicate: self.predicate,
            combinator: self.combinator,
            element_measures: self.element_measures,
            type_parity: self.type_parity,
            high_level_parity: self.high_level_parity,
        })
    }
}

/// On-disk (JSON) form of the configuration. Absent fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FairnessSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tau: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_measures: Option<Vec<MeasureSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_parity: Option<Vec<CompositeSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_level_parity: Option<Vec<CompositeSpec>>,
}

impl FairnessSettings {
    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fairness config: {}", path.display()))?;
        let settings = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse fairness config: {}", path.display()))?;
        tracing::info!("Loaded fairness config from {}", path.display());
        Ok(settings)
    }

    /// Build a configuration with the default predicate and combinator
    pub fn into_config(self) -> Result<FairnessConfig, FairnessError> {
        FairnessConfig::builder().settings(self).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_config() {
        let config = FairnessConfig::default();
        assert_eq!(config.tau(), 0.8);
        assert_eq!(config.element_measures().len(), 6);
        assert_eq!(config.type_parity().len(), 2);
        assert_eq!(config.high_level_parity().len(), 2);
        assert_eq!(config.supported_measures()[0], STATISTICAL_PARITY);
        assert_eq!(config.supported_measures()[5], FNR_PARITY);
    }

    #[test]
    fn test_builder_rejects_invalid_tau() {
        assert!(matches!(
            FairnessConfig::builder().tau(0.0).build(),
            Err(FairnessError::InvalidTau(_))
        ));
        assert!(FairnessConfig::builder().tau(1.5).build().is_err());
        assert!(FairnessConfig::builder().tau(1.0).build().is_ok());
    }

    #[test]
    fn test_tau_band_boundaries() {
        let tau = 0.8;
        assert!(TauBand.is_fair(tau, tau));
        assert!(TauBand.is_fair(tau, 1.0 / tau));
        assert!(TauBand.is_fair(tau, 1.0));
        assert!(!TauBand.is_fair(tau, 0.79));
        assert!(!TauBand.is_fair(tau, 1.3));
        assert!(!TauBand.is_fair(tau, f64::NAN));
    }

    #[test]
    fn test_custom_predicate() {
        let config = FairnessConfig::builder()
            .predicate(|_tau: f64, ratio: f64| ratio >= 0.5)
            .build()
            .unwrap();
        assert!(config.predicate().is_fair(config.tau(), 3.0));
        assert!(!config.predicate().is_fair(config.tau(), 0.4));
    }

    #[test]
    fn test_strict_and() {
        assert!(StrictAnd.pair(Some(true), Some(true)));
        assert!(!StrictAnd.pair(Some(true), Some(false)));
        assert!(!StrictAnd.pair(Some(false), Some(true)));
        assert!(!StrictAnd.pair(Some(true), None));
        assert!(StrictAnd.single(Some(true)));
        assert!(!StrictAnd.single(Some(false)));
        assert!(!StrictAnd.single(None));
    }

    #[test]
    fn test_settings_partial_override() {
        let settings: FairnessSettings = serde_json::from_str(
            r#"{"tau": 0.9, "type_parity": [{"name": "TypeI Parity", "inputs": ["FDR Parity", "FPR Parity"]}]}"#,
        )
        .unwrap();
        let config = settings.into_config().unwrap();

        assert_eq!(config.tau(), 0.9);
        assert_eq!(config.type_parity().len(), 1);
        assert_eq!(config.element_measures().len(), 6);
        assert_eq!(config.high_level_parity(), default_high_level_parity().as_slice());
    }

    #[test]
    fn test_settings_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fairness.json");
        let settings = FairnessConfig::default().settings();
        std::fs::write(&path, serde_json::to_string_pretty(&settings).unwrap()).unwrap();

        let loaded = FairnessSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_settings_reject_unknown_field() {
        let parsed: std::result::Result<FairnessSettings, _> = serde_json::from_str(r#"{"threshold": 0.8}"#);
        assert!(parsed.is_err());
    }

    proptest! {
        #[test]
        fn prop_tau_band_matches_closed_interval(tau in 0.01f64..=1.0, ratio in 0.001f64..100.0) {
            let expected = ratio >= tau && ratio <= 1.0 / tau;
            prop_assert_eq!(TauBand.is_fair(tau, ratio), expected);
        }
    }
}
