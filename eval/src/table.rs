// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Columnar tables flowing between the evaluation stages
//!
//! - `DisparityTable`: input rows with numeric disparity ratios
//! - `GroupValueTable`: the same rows plus one boolean column per fairness measure
//! - `GroupAttributeTable`: one row per (model, threshold, attribute)
//!
//! A column that is absent is not in the collection; a cell that is absent is `None`.

use serde::{Deserialize, Serialize};

/// Key columns required on every input row
pub const KEY_COLUMNS: [&str; 4] = ["model_id", "score_threshold", "attribute_name", "attribute_value"];

/// Identifies a single group value row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowKey {
    pub model_id: String,
    pub score_threshold: String,
    pub attribute_name: String,
    pub attribute_value: String,
}

impl RowKey {
    pub fn new(model_id: &str, score_threshold: &str, attribute_name: &str, attribute_value: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            score_threshold: score_threshold.to_string(),
            attribute_name: attribute_name.to_string(),
            attribute_value: attribute_value.to_string(),
        }
    }

    /// The (model, threshold, attribute) group this row belongs to
    pub fn group(&self) -> GroupKey {
        GroupKey {
            model_id: self.model_id.clone(),
            score_threshold: self.score_threshold.clone(),
            attribute_name: self.attribute_name.clone(),
        }
    }
}

/// Grouping key for attribute level reduction.
///
/// Ordered field by field with plain string comparison, so numeric looking
/// ids sort lexicographically: model "10" comes before model "2".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub model_id: String,
    pub score_threshold: String,
    pub attribute_name: String,
}

/// A named column of optional cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column<T> {
    pub name: String,
    pub values: Vec<Option<T>>,
}

/// Insertion-ordered set of named columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Columns<T> {
    columns: Vec<Column<T>>,
}

impl<T> Default for Columns<T> {
    fn default() -> Self {
        Self { columns: Vec::new() }
    }
}

impl<T> Columns<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&[Option<T>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Insert a column, replacing any existing column of the same name in place
    pub fn insert(&mut self, name: &str, values: Vec<Option<T>>) {
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(Column {
                name: name.to_string(),
                values,
            }),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column<T>> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Output of the bias/disparity computation: one row per group value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisparityTable {
    pub rows: Vec<RowKey>,
    pub disparities: Columns<f64>,
}

impl DisparityTable {
    pub fn new(rows: Vec<RowKey>) -> Self {
        Self {
            rows,
            disparities: Columns::new(),
        }
    }

    /// Add a disparity column (builder style)
    ///
    /// # Panics
    ///
    /// Panics if `values` does not have one cell per row.
    pub fn with_disparity(mut self, name: &str, values: Vec<Option<f64>>) -> Self {
        self.insert_disparity(name, values);
        self
    }

    /// Add or replace a disparity column
    ///
    /// # Panics
    ///
    /// Panics if `values` does not have one cell per row.
    pub fn insert_disparity(&mut self, name: &str, values: Vec<Option<f64>>) {
        assert_eq!(values.len(), self.rows.len(), "Column '{}' length must match row count", name);
        self.disparities.insert(name, values);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Disparity rows augmented with fairness determinations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupValueTable {
    pub rows: Vec<RowKey>,
    pub disparities: Columns<f64>,
    pub fairness: Columns<bool>,
}

impl GroupValueTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_measure(&self, name: &str) -> bool {
        self.fairness.contains(name)
    }

    pub fn measure(&self, name: &str) -> Option<&[Option<bool>]> {
        self.fairness.get(name)
    }

    /// Add or replace a fairness column
    ///
    /// # Panics
    ///
    /// Panics if `values` does not have one cell per row.
    pub fn insert_measure(&mut self, name: &str, values: Vec<Option<bool>>) {
        assert_eq!(values.len(), self.rows.len(), "Column '{}' length must match row count", name);
        self.fairness.insert(name, values);
    }
}

impl From<&DisparityTable> for GroupValueTable {
    fn from(table: &DisparityTable) -> Self {
        Self {
            rows: table.rows.clone(),
            disparities: table.disparities.clone(),
            fairness: Columns::new(),
        }
    }
}

/// Fairness determinations collapsed to one row per group attribute
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupAttributeTable {
    pub groups: Vec<GroupKey>,
    pub fairness: Columns<bool>,
}

impl GroupAttributeTable {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() || self.fairness.is_empty()
    }

    pub fn has_measure(&self, name: &str) -> bool {
        self.fairness.contains(name)
    }

    pub fn measure(&self, name: &str) -> Option<&[Option<bool>]> {
        self.fairness.get(name)
    }

    /// Cell lookup by group and measure
    pub fn value(&self, group: &GroupKey, measure: &str) -> Option<bool> {
        let idx = self.groups.iter().position(|g| g == group)?;
        self.measure(measure).and_then(|values| values[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_insert_replaces_in_place() {
        let mut columns: Columns<bool> = Columns::new();
        columns.insert("a", vec![Some(true)]);
        columns.insert("b", vec![Some(false)]);
        columns.insert("a", vec![Some(false)]);

        assert_eq!(columns.len(), 2);
        assert_eq!(columns.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(columns.get("a"), Some(&[Some(false)][..]));
        assert!(columns.get("c").is_none());
    }

    #[test]
    fn test_group_key_ordering() {
        let a = RowKey::new("1", "binary 0/1", "race", "white").group();
        let b = RowKey::new("1", "binary 0/1", "sex", "male").group();
        let c = RowKey::new("2", "binary 0/1", "age", "young").group();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_group_key_orders_ids_as_strings() {
        let ten = RowKey::new("10", "binary 0/1", "race", "white").group();
        let two = RowKey::new("2", "binary 0/1", "race", "white").group();
        assert!(ten < two);
    }

    #[test]
    #[should_panic(expected = "length must match row count")]
    fn test_insert_disparity_rejects_short_column() {
        let mut table = DisparityTable::new(vec![
            RowKey::new("1", "t", "race", "white"),
            RowKey::new("1", "t", "race", "black"),
        ]);
        table.insert_disparity("ppr_disparity", vec![Some(1.0)]);
    }

    #[test]
    #[should_panic(expected = "length must match row count")]
    fn test_insert_measure_rejects_long_column() {
        let mut table = GroupValueTable::from(&DisparityTable::new(vec![RowKey::new("1", "t", "race", "white")]));
        table.insert_measure("Statistical Parity", vec![Some(true), Some(false)]);
    }

    #[test]
    fn test_group_value_table_copies_input() {
        let input = DisparityTable::new(vec![RowKey::new("1", "t", "race", "white")])
            .with_disparity("ppr_disparity", vec![Some(1.0)]);
        let mut table = GroupValueTable::from(&input);
        table.insert_measure("Statistical Parity", vec![Some(true)]);

        assert!(table.has_measure("Statistical Parity"));
        assert_eq!(input.disparities.len(), 1);
        assert_eq!(table.disparities, input.disparities);
    }
}
