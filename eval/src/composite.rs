// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Composite fairness: type parity and high level categories
//!
//! Each composite is derived from an ordered pair of existing fairness columns.
//! When only one of the pair is present, the composite follows that one alone.
//! When neither is present, no column is produced.

use crate::config::{Combinator, CompositeSpec, FairnessConfig, SUPERVISED_FAIRNESS, UNSUPERVISED_FAIRNESS};
use crate::table::GroupValueTable;

/// Derives composite fairness columns with the configured combinator
pub struct CompositeEvaluator<'a, P, C> {
    config: &'a FairnessConfig<P, C>,
}

impl<'a, P, C: Combinator> CompositeEvaluator<'a, P, C> {
    pub fn new(config: &'a FairnessConfig<P, C>) -> Self {
        Self { config }
    }

    /// Derive the type parity columns, then the high level columns
    pub fn evaluate(&self, table: &GroupValueTable) -> GroupValueTable {
        let with_types = self.derive(table, self.config.type_parity());
        let output = self.derive(&with_types, self.config.high_level_parity());

        if !output.has_measure(UNSUPERVISED_FAIRNESS) && !output.has_measure(SUPERVISED_FAIRNESS) {
            tracing::info!("No high level fairness input found on group value table");
        }
        output
    }

    /// Derive one column per composite whose inputs are at least partly present
    pub fn derive(&self, table: &GroupValueTable, composites: &[CompositeSpec]) -> GroupValueTable {
        let combinator = self.config.combinator();
        let mut output = table.clone();

        for composite in composites {
            let [first, second] = &composite.inputs;
            let values: Vec<Option<bool>> = match (output.measure(first), output.measure(second)) {
                (Some(a), Some(b)) => a
                    .iter()
                    .zip(b)
                    .map(|(&a, &b)| Some(combinator.pair(a, b)))
                    .collect(),
                (Some(only), None) | (None, Some(only)) => {
                    only.iter().map(|&a| Some(combinator.single(a))).collect()
                }
                (None, None) => {
                    tracing::info!(
                        "No input found for {} (needs {} or {}), skipping",
                        composite.name,
                        first,
                        second
                    );
                    continue;
                }
            };
            output.insert_measure(&composite.name, values);
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FDR_PARITY, FPR_PARITY, STATISTICAL_PARITY, TYPE_I_PARITY, TYPE_II_PARITY};
    use crate::table::{DisparityTable, RowKey};
    use proptest::prelude::*;

    fn table_with(columns: &[(&str, Vec<Option<bool>>)]) -> GroupValueTable {
        let n = columns.first().map_or(0, |(_, v)| v.len());
        let rows = (0..n)
            .map(|i| RowKey::new("1", "binary 0/1", "race", &format!("group_{}", i)))
            .collect();
        let mut table = GroupValueTable::from(&DisparityTable::new(rows));
        for (name, values) in columns {
            table.insert_measure(name, values.clone());
        }
        table
    }

    fn type_i() -> Vec<CompositeSpec> {
        vec![CompositeSpec::new(TYPE_I_PARITY, FDR_PARITY, FPR_PARITY)]
    }

    #[test]
    fn test_pair_and_semantics() {
        let config = FairnessConfig::default();
        let table = table_with(&[
            (FDR_PARITY, vec![Some(true), Some(true), Some(false), Some(false)]),
            (FPR_PARITY, vec![Some(true), Some(false), Some(true), Some(false)]),
        ]);

        let output = CompositeEvaluator::new(&config).derive(&table, &type_i());

        assert_eq!(
            output.measure(TYPE_I_PARITY).unwrap(),
            &[Some(true), Some(false), Some(false), Some(false)]
        );
    }

    #[test]
    fn test_single_input_fallback() {
        let config = FairnessConfig::default();
        let evaluator = CompositeEvaluator::new(&config);

        let only_first = table_with(&[(FDR_PARITY, vec![Some(true), Some(false)])]);
        let output = evaluator.derive(&only_first, &type_i());
        assert_eq!(output.measure(TYPE_I_PARITY).unwrap(), &[Some(true), Some(false)]);

        let only_second = table_with(&[(FPR_PARITY, vec![Some(false), Some(true)])]);
        let output = evaluator.derive(&only_second, &type_i());
        assert_eq!(output.measure(TYPE_I_PARITY).unwrap(), &[Some(false), Some(true)]);
    }

    #[test]
    fn test_no_inputs_produces_no_column() {
        let config = FairnessConfig::default();
        let table = table_with(&[(STATISTICAL_PARITY, vec![Some(true)])]);

        let output = CompositeEvaluator::new(&config).derive(&table, &type_i());

        assert!(!output.has_measure(TYPE_I_PARITY));
        assert_eq!(output, table);
    }

    #[test]
    fn test_missing_cell_is_not_fair() {
        let config = FairnessConfig::default();
        let table = table_with(&[
            (FDR_PARITY, vec![None, Some(true)]),
            (FPR_PARITY, vec![Some(true), None]),
        ]);

        let output = CompositeEvaluator::new(&config).derive(&table, &type_i());
        assert_eq!(output.measure(TYPE_I_PARITY).unwrap(), &[Some(false), Some(false)]);
    }

    #[test]
    fn test_full_hierarchy() {
        let config = FairnessConfig::default();
        let table = table_with(&[
            (STATISTICAL_PARITY, vec![Some(true), Some(true)]),
            ("Impact Parity", vec![Some(true), Some(false)]),
            (FDR_PARITY, vec![Some(true), Some(true)]),
            (FPR_PARITY, vec![Some(true), Some(true)]),
            ("FOR Parity", vec![Some(false), Some(true)]),
        ]);

        let output = CompositeEvaluator::new(&config).evaluate(&table);

        assert_eq!(output.measure(TYPE_I_PARITY).unwrap(), &[Some(true), Some(true)]);
        assert_eq!(output.measure(TYPE_II_PARITY).unwrap(), &[Some(false), Some(true)]);
        assert_eq!(output.measure(UNSUPERVISED_FAIRNESS).unwrap(), &[Some(true), Some(false)]);
        assert_eq!(output.measure(SUPERVISED_FAIRNESS).unwrap(), &[Some(false), Some(true)]);
    }

    #[test]
    fn test_without_high_level_inputs() {
        let config = FairnessConfig::default();
        let table = table_with(&[("Unrelated", vec![Some(true)])]);

        let output = CompositeEvaluator::new(&config).evaluate(&table);

        assert!(!output.has_measure(UNSUPERVISED_FAIRNESS));
        assert!(!output.has_measure(SUPERVISED_FAIRNESS));
    }

    fn arb_cell() -> impl Strategy<Value = Option<bool>> {
        prop_oneof![Just(None), Just(Some(true)), Just(Some(false))]
    }

    proptest! {
        #[test]
        fn prop_composites_are_idempotent(
            cells in proptest::collection::vec((arb_cell(), arb_cell(), arb_cell()), 1..20)
        ) {
            let config = FairnessConfig::default();
            let table = table_with(&[
                (STATISTICAL_PARITY, cells.iter().map(|c| c.0).collect()),
                (FDR_PARITY, cells.iter().map(|c| c.1).collect()),
                ("FNR Parity", cells.iter().map(|c| c.2).collect()),
            ]);
            let evaluator = CompositeEvaluator::new(&config);

            let once = evaluator.evaluate(&table);
            let twice = evaluator.evaluate(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
