// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Loading and generation of disparity tables
//!
//! Input is the CSV export of a bias/disparity computation: one row per
//! (model_id, score_threshold, attribute_name, attribute_value), plus any
//! number of `*_disparity` ratio columns.

use crate::config::{default_element_measures, MeasureSpec};
use crate::table::{DisparityTable, RowKey, KEY_COLUMNS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const DISPARITY_SUFFIX: &str = "_disparity";

/// Load a disparity table from a CSV file with a header row
pub fn load_csv(path: &Path) -> Result<DisparityTable> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open disparity file: {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .clone();

    let mut key_idx = [0usize; 4];
    for (slot, key) in key_idx.iter_mut().zip(KEY_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h == key)
            .with_context(|| format!("Missing key column '{}' in {}", key, path.display()))?;
    }

    let mut disparity_idx = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        if header.ends_with(DISPARITY_SUFFIX) {
            disparity_idx.push((idx, header.to_string()));
        } else if !KEY_COLUMNS.contains(&header) {
            tracing::debug!("Ignoring column '{}' in {}", header, path.display());
        }
    }

    let mut rows = Vec::new();
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); disparity_idx.len()];

    for (line, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read record {} in {}", line, path.display()))?;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        rows.push(RowKey::new(field(key_idx[0]), field(key_idx[1]), field(key_idx[2]), field(key_idx[3])));

        for ((idx, name), column) in disparity_idx.iter().zip(values.iter_mut()) {
            let cell = parse_ratio(field(*idx))
                .with_context(|| format!("Invalid value for '{}' in record {} of {}", name, line, path.display()))?;
            column.push(cell);
        }
    }

    let mut table = DisparityTable::new(rows);
    for ((_, name), column) in disparity_idx.into_iter().zip(values) {
        table.insert_disparity(&name, column);
    }

    tracing::info!(
        "Loaded {} group value rows with {} disparity columns from {}",
        table.len(),
        table.disparities.len(),
        path.display()
    );
    Ok(table)
}

/// Parse a ratio cell; empty and NaN-like cells are missing
fn parse_ratio(raw: &str) -> Result<Option<f64>> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("na") || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let value: f64 = raw.parse().with_context(|| format!("'{}' is not a number", raw))?;
    Ok(if value.is_nan() { None } else { Some(value) })
}

/// Write a disparity table as CSV, key columns first
pub fn write_csv(table: &DisparityTable, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut header: Vec<&str> = KEY_COLUMNS.to_vec();
    header.extend(table.disparities.names());
    writer.write_record(&header)?;

    for (idx, row) in table.rows.iter().enumerate() {
        let mut record = vec![
            row.model_id.clone(),
            row.score_threshold.clone(),
            row.attribute_name.clone(),
            row.attribute_value.clone(),
        ];
        for column in table.disparities.iter() {
            record.push(column.values[idx].map(|v| v.to_string()).unwrap_or_default());
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    tracing::info!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

/// SHA-256 digest of a file, hex encoded
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Shape of a generated disparity table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticSpec {
    pub models: usize,
    pub score_thresholds: Vec<String>,
    /// Attribute name and its values; the first value is the reference group
    pub attributes: Vec<(String, Vec<String>)>,
    /// Ratios are drawn from exp(U(-spread, spread)); must be finite and non-negative
    pub spread: f64,
    /// Disparity columns to generate
    pub sources: Vec<String>,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        let attr = |name: &str, values: &[&str]| {
            (name.to_string(), values.iter().map(|v| v.to_string()).collect())
        };
        Self {
            models: 1,
            score_thresholds: vec!["binary 0/1".to_string()],
            attributes: vec![
                attr("race", &["white", "black", "hispanic", "asian"]),
                attr("sex", &["male", "female"]),
                attr("age_cat", &["25 - 45", "less than 25", "greater than 45"]),
            ],
            spread: 0.4,
            sources: default_element_measures().into_iter().map(|m| m.source).collect(),
        }
    }
}

impl SyntheticSpec {
    /// Generate the source columns of the given element measures instead of the defaults
    pub fn with_measures(mut self, measures: &[MeasureSpec]) -> Self {
        self.sources = measures.iter().map(|m| m.source.clone()).collect();
        self
    }
}

/// Generate a deterministic disparity table with one column per source in `spec`
pub fn synthetic(spec: &SyntheticSpec, seed: u64) -> Result<DisparityTable> {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    if !spec.spread.is_finite() || spec.spread < 0.0 {
        anyhow::bail!("Spread must be finite and non-negative, got {}", spec.spread);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let sources = &spec.sources;

    let mut rows = Vec::new();
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); sources.len()];

    for model in 0..spec.models {
        let model_id = (model + 1).to_string();
        for threshold in &spec.score_thresholds {
            for (attribute, attribute_values) in &spec.attributes {
                for (pos, value) in attribute_values.iter().enumerate() {
                    rows.push(RowKey::new(&model_id, threshold, attribute, value));
                    for column in values.iter_mut() {
                        let ratio = if pos == 0 || spec.spread == 0.0 {
                            1.0
                        } else {
                            rng.gen_range(-spec.spread..spec.spread).exp()
                        };
                        column.push(Some(ratio));
                    }
                }
            }
        }
    }

    let mut table = DisparityTable::new(rows);
    for (name, column) in sources.iter().zip(values) {
        table.insert_disparity(name, column);
    }
    Ok(table)
}

/// Number of group values per attribute name
pub fn attribute_distribution(table: &DisparityTable) -> BTreeMap<String, usize> {
    let mut dist = BTreeMap::new();
    for row in &table.rows {
        *dist.entry(row.attribute_name.clone()).or_insert(0) += 1;
    }
    dist
}
