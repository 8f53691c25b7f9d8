//! Column profiling and near-zero-variance detection
//!
//! A column is near-zero-variance when its most common value dominates the
//! second most common one and it has few distinct values relative to the
//! row count. Columns with a single distinct value are always flagged.

use std::collections::HashMap;

use polars::prelude::*;
use serde::Serialize;

use super::error::Result;

/// Default ratio of most-frequent to second-most-frequent count (95/5)
pub const DEFAULT_FREQ_CUT: f64 = 95.0 / 5.0;
/// Default distinct-value percentage below which a column counts as low-cardinality
pub const DEFAULT_UNIQUE_CUT: f64 = 10.0;

/// Broad kind of a column, used for reporting only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Identifier,
}

/// Descriptor of a single column's value distribution
#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    pub missing: usize,
    pub distinct: usize,
    pub freq_ratio: f64,
    pub percent_unique: f64,
    pub zero_var: bool,
}

impl ColumnProfile {
    /// Near-zero-variance decision for the given cut-offs
    pub fn is_near_zero_variance(&self, freq_cut: f64, unique_cut: f64) -> bool {
        self.zero_var || (self.freq_ratio > freq_cut && self.percent_unique < unique_cut)
    }
}

/// Profile one column. `identifiers` only affects the reported kind.
pub fn profile_column(column: &Column, identifiers: &[String]) -> Result<ColumnProfile> {
    let name = column.name().to_string();
    let rows = column.len();
    let missing = column.null_count();
    let counts = value_counts(column)?;

    let distinct = counts.len();
    let freq_ratio = if distinct >= 2 {
        counts[0] as f64 / counts[1] as f64
    } else {
        0.0
    };
    let percent_unique = if rows > 0 {
        100.0 * distinct as f64 / rows as f64
    } else {
        0.0
    };

    let kind = if identifiers.iter().any(|id| *id == name) {
        ColumnKind::Identifier
    } else if column.dtype().is_primitive_numeric() {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    };

    Ok(ColumnProfile {
        name,
        kind,
        missing,
        distinct,
        freq_ratio,
        percent_unique,
        zero_var: distinct <= 1,
    })
}

/// Profile every column of `df` except `label`.
pub fn profile_columns(df: &DataFrame, label: &str, identifiers: &[String]) -> Result<Vec<ColumnProfile>> {
    df.get_columns()
        .iter()
        .filter(|c| c.name().as_str() != label)
        .map(|c| profile_column(c, identifiers))
        .collect()
}

/// Names of near-zero-variance columns of `df`, label excluded, in column order.
pub fn near_zero_variance(
    df: &DataFrame,
    label: &str,
    identifiers: &[String],
    freq_cut: f64,
    unique_cut: f64,
) -> Result<(Vec<ColumnProfile>, Vec<String>)> {
    let profiles = profile_columns(df, label, identifiers)?;
    let flagged = profiles
        .iter()
        .filter(|p| p.is_near_zero_variance(freq_cut, unique_cut))
        .map(|p| p.name.clone())
        .collect();
    Ok((profiles, flagged))
}

/// Counts of each distinct non-missing value, largest first.
fn value_counts(column: &Column) -> Result<Vec<usize>> {
    let mut counts: Vec<usize> = if column.dtype().is_primitive_numeric()
        || matches!(column.dtype(), DataType::Boolean)
    {
        let as_f64 = column.cast(&DataType::Float64)?;
        let mut map: HashMap<u64, usize> = HashMap::new();
        for v in as_f64.f64()?.into_iter().flatten() {
            // -0.0 and 0.0 are the same value
            let key = if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() };
            *map.entry(key).or_insert(0) += 1;
        }
        map.into_values().collect()
    } else {
        let as_str = column.cast(&DataType::String)?;
        let mut map: HashMap<&str, usize> = HashMap::new();
        for v in as_str.str()?.into_iter().flatten() {
            *map.entry(v).or_insert(0) += 1;
        }
        map.into_values().collect()
    };

    counts.sort_unstable_by(|a, b| b.cmp(a));
    Ok(counts)
}
