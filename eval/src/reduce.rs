// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Reduction of group value fairness to group attribute and overall verdicts
//!
//! Unfairness dominates at every level: a single `false` among the values of
//! an attribute makes the attribute unfair for that measure, and a single
//! unfair attribute makes the category unfair.

use crate::config::{FairnessConfig, OVERALL_FAIRNESS, SUPERVISED_FAIRNESS, UNSUPERVISED_FAIRNESS};
use crate::error::FairnessError;
use crate::table::{Columns, GroupAttributeTable, GroupKey, GroupValueTable};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

const STAGE: &str = "group attribute reduction";

/// Literal reported when no high level category could be evaluated
pub const UNKNOWN_VERDICT: &str = "Unknown!";

/// Overall fairness verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Fair,
    Unfair,
    Unknown,
}

impl Verdict {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Verdict::Fair => Some(true),
            Verdict::Unfair => Some(false),
            Verdict::Unknown => None,
        }
    }
}

impl From<bool> for Verdict {
    fn from(fair: bool) -> Self {
        if fair {
            Verdict::Fair
        } else {
            Verdict::Unfair
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Fair => write!(f, "true"),
            Verdict::Unfair => write!(f, "false"),
            Verdict::Unknown => write!(f, "{}", UNKNOWN_VERDICT),
        }
    }
}

impl Serialize for Verdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_bool() {
            Some(fair) => serializer.serialize_bool(fair),
            None => serializer.serialize_str(UNKNOWN_VERDICT),
        }
    }
}

impl<'de> Deserialize<'de> for Verdict {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Flag(fair) => Ok(Verdict::from(fair)),
            Repr::Text(text) if text == UNKNOWN_VERDICT => Ok(Verdict::Unknown),
            Repr::Text(text) => Err(serde::de::Error::custom(format!("unexpected verdict '{}'", text))),
        }
    }
}

/// System level fairness summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallFairness {
    #[serde(rename = "Unsupervised Fairness", default, skip_serializing_if = "Option::is_none")]
    pub unsupervised: Option<bool>,
    #[serde(rename = "Supervised Fairness", default, skip_serializing_if = "Option::is_none")]
    pub supervised: Option<bool>,
    #[serde(rename = "Overall Fairness")]
    pub overall: Verdict,
}

impl OverallFairness {
    /// Entries keyed by category name, as exposed to reporting collaborators
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = Vec::new();
        if let Some(fair) = self.unsupervised {
            entries.push((UNSUPERVISED_FAIRNESS, fair.to_string()));
        }
        if let Some(fair) = self.supervised {
            entries.push((SUPERVISED_FAIRNESS, fair.to_string()));
        }
        entries.push((OVERALL_FAIRNESS, self.overall.to_string()));
        entries
    }
}

/// Collects attribute level columns before assembling the table in one step
struct AttributeTableBuilder {
    groups: Vec<GroupKey>,
    columns: Vec<(String, Vec<Option<bool>>)>,
}

impl AttributeTableBuilder {
    fn new(groups: Vec<GroupKey>) -> Self {
        Self {
            groups,
            columns: Vec::new(),
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    fn push(&mut self, name: &str, values: Vec<Option<bool>>) {
        self.columns.push((name.to_string(), values));
    }

    fn is_empty(&self) -> bool {
        self.groups.is_empty() || self.columns.is_empty()
    }

    fn build(self) -> GroupAttributeTable {
        let mut fairness = Columns::new();
        for (name, values) in self.columns {
            fairness.insert(&name, values);
        }
        GroupAttributeTable {
            groups: self.groups,
            fairness,
        }
    }
}

/// Collapses fairness tables to attribute level and overall verdicts
pub struct Reducer<'a, P, C> {
    config: &'a FairnessConfig<P, C>,
}

impl<'a, P, C> Reducer<'a, P, C> {
    pub fn new(config: &'a FairnessConfig<P, C>) -> Self {
        Self { config }
    }

    /// Reduce group value rows to one row per (model, threshold, attribute).
    ///
    /// `requested` defaults to the configured element measures. Type parity and
    /// high level columns are carried over whenever present. Fails when `table`
    /// has no rows, or when none of the requested measures is a column of it.
    pub fn reduce_to_attribute(
        &self,
        table: &GroupValueTable,
        requested: Option<&[&str]>,
    ) -> Result<GroupAttributeTable, FairnessError> {
        tracing::info!("Reducing group value fairness to group attribute level");

        let requested: Vec<&str> = match requested {
            Some([]) => return Err(FairnessError::EmptyMeasureSelection { stage: STAGE }),
            Some(names) => names.to_vec(),
            None => self.config.supported_measures(),
        };

        if table.is_empty() {
            tracing::error!("{}: input group value table has no rows", STAGE);
            return Err(FairnessError::EmptyInput { stage: STAGE });
        }

        let groups = group_rows(table);
        let mut builder = AttributeTableBuilder::new(groups.keys().cloned().collect());

        for name in &requested {
            if let Some(values) = table.measure(name) {
                if !builder.contains(name) {
                    builder.push(name, group_minimum(values, &groups));
                }
            }
        }

        if builder.is_empty() {
            let missing: Vec<String> = requested
                .iter()
                .filter(|name| !table.has_measure(name))
                .map(|s| s.to_string())
                .collect();
            tracing::error!(
                "{}: no fairness measures requested found on input group value table ({})",
                STAGE,
                missing.join(", ")
            );
            return Err(FairnessError::NoApplicableMeasures { stage: STAGE, missing });
        }

        let composites = self
            .config
            .type_parity()
            .iter()
            .chain(self.config.high_level_parity());
        for composite in composites {
            if let Some(values) = table.measure(&composite.name) {
                if !builder.contains(&composite.name) {
                    builder.push(&composite.name, group_minimum(values, &groups));
                }
            }
        }

        Ok(builder.build())
    }

    /// Collapse the attribute table to the overall verdicts
    pub fn reduce_to_overall(&self, table: &GroupAttributeTable) -> OverallFairness {
        reduce_to_overall(table)
    }
}

/// Unfair if any attribute is unfair for a category; absent categories stay absent.
pub fn reduce_to_overall(table: &GroupAttributeTable) -> OverallFairness {
    let category = |name: &str| {
        table
            .measure(name)
            .map(|values| !values.iter().any(|v| *v == Some(false)))
    };

    let unsupervised = category(UNSUPERVISED_FAIRNESS);
    let supervised = category(SUPERVISED_FAIRNESS);

    let verdicts: Vec<bool> = unsupervised.into_iter().chain(supervised).collect();
    let overall = if verdicts.contains(&false) {
        Verdict::Unfair
    } else if verdicts.contains(&true) {
        Verdict::Fair
    } else {
        Verdict::Unknown
    };

    tracing::info!("Overall fairness: {}", overall);

    OverallFairness {
        unsupervised,
        supervised,
        overall,
    }
}

/// Row indices of each group, groups in ascending key order
fn group_rows(table: &GroupValueTable) -> BTreeMap<GroupKey, Vec<usize>> {
    let mut groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
    for (idx, row) in table.rows.iter().enumerate() {
        groups.entry(row.group()).or_default().push(idx);
    }
    groups
}

/// Index of the first row holding the smallest present value (`false < true`)
fn arg_min(values: &[Option<bool>], rows: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, bool)> = None;
    for &idx in rows {
        let Some(value) = values[idx] else { continue };
        match best {
            Some((_, current)) if value >= current => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Per group value of the arg-min row
fn group_minimum(values: &[Option<bool>], groups: &BTreeMap<GroupKey, Vec<usize>>) -> Vec<Option<bool>> {
    groups
        .values()
        .map(|rows| arg_min(values, rows).and_then(|idx| values[idx]))
        .collect()
}
