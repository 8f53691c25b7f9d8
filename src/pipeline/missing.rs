//! Missing value analysis and sparse-column detection

use polars::prelude::*;
use serde::Serialize;

use super::error::Result;

/// Minimum number of present (non-missing) values a column needs to be kept
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum MinPresent {
    /// Absolute count of present values
    Count(usize),
    /// Fraction of the table's rows, rounded up
    Fraction(f64),
}

impl Default for MinPresent {
    fn default() -> Self {
        MinPresent::Fraction(0.9999)
    }
}

impl MinPresent {
    /// Resolve to an absolute count for a table with `rows` rows
    pub fn resolve(&self, rows: usize) -> usize {
        match *self {
            MinPresent::Count(n) => n,
            MinPresent::Fraction(f) => (f.clamp(0.0, 1.0) * rows as f64).ceil() as usize,
        }
    }
}

/// Count present values per column.
///
/// Returns `(column, present_count)` sorted ascending by count, so the
/// sparsest columns come first.
pub fn analyze_missing_values(df: &DataFrame) -> Result<Vec<(String, usize)>> {
    if df.height() == 0 {
        return Ok(Vec::new());
    }

    let mut present: Vec<(String, usize)> = df
        .get_columns()
        .iter()
        .map(|col| (col.name().to_string(), col.len() - col.null_count()))
        .collect();

    present.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(present)
}

/// Get features whose present count falls below `min_present`
pub fn get_sparse_features(
    present_counts: &[(String, usize)],
    min_present: usize,
    target_column: &str,
) -> Vec<String> {
    present_counts
        .iter()
        .filter(|(name, count)| *count < min_present && name != target_column)
        .map(|(name, _)| name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_resolves_to_source_threshold() {
        assert_eq!(MinPresent::Fraction(0.9999).resolve(11776), 11775);
        assert_eq!(MinPresent::Fraction(1.0).resolve(10), 10);
        assert_eq!(MinPresent::Count(42).resolve(10), 42);
    }

    #[test]
    fn test_sorted_sparsest_first() {
        let df = df! {
            "full" => [1.0f64, 2.0, 3.0],
            "half" => [Some(1.0f64), None, None],
        }
        .unwrap();
        let counts = analyze_missing_values(&df).unwrap();
        assert_eq!(counts[0], ("half".to_string(), 1));
        assert_eq!(counts[1], ("full".to_string(), 3));
    }
}
