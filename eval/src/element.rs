// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Element level fairness: one boolean column per disparity ratio column

use crate::config::{FairnessConfig, MeasureSpec, ThresholdPredicate};
use crate::error::{validate_tau, FairnessError};
use crate::table::{DisparityTable, GroupValueTable};

const STAGE: &str = "group value fairness";

/// Applies the threshold predicate to each configured disparity column
pub struct ElementEvaluator<'a, P, C> {
    config: &'a FairnessConfig<P, C>,
}

impl<'a, P: ThresholdPredicate, C> ElementEvaluator<'a, P, C> {
    pub fn new(config: &'a FairnessConfig<P, C>) -> Self {
        Self { config }
    }

    /// Evaluate element measures on a copy of `table`.
    ///
    /// `tau` defaults to the configured tau and `requested` to every configured
    /// element measure. Measures whose disparity column is absent are skipped.
    pub fn evaluate(
        &self,
        table: &DisparityTable,
        tau: Option<f64>,
        requested: Option<&[&str]>,
    ) -> Result<GroupValueTable, FairnessError> {
        let tau = validate_tau(tau.unwrap_or(self.config.tau()))?;
        let measures = self.select_measures(requested)?;

        tracing::info!("Evaluating group value fairness (tau={}, measures={})", tau, measures.len());

        let mut output = GroupValueTable::from(table);
        for measure in measures {
            let Some(ratios) = table.disparities.get(&measure.source) else {
                tracing::debug!("Skipping {}: column '{}' not found", measure.name, measure.source);
                continue;
            };

            let predicate = self.config.predicate();
            let values = ratios
                .iter()
                .map(|ratio| ratio.map(|r| predicate.is_fair(tau, r)))
                .collect();
            output.insert_measure(&measure.name, values);
        }

        Ok(output)
    }

    /// Resolve the requested measure names against the configuration
    fn select_measures(&self, requested: Option<&[&str]>) -> Result<Vec<&'a MeasureSpec>, FairnessError> {
        let config: &'a FairnessConfig<P, C> = self.config;
        let configured = config.element_measures();
        let Some(requested) = requested else {
            return Ok(configured.iter().collect());
        };

        for name in requested {
            if !configured.iter().any(|m| m.name == *name) {
                tracing::warn!("Requested measure '{}' is not configured, ignoring", name);
            }
        }

        let selected: Vec<_> = configured
            .iter()
            .filter(|m| requested.contains(&m.name.as_str()))
            .collect();

        if selected.is_empty() {
            return Err(FairnessError::EmptyMeasureSelection { stage: STAGE });
        }
        Ok(selected)
    }
}
