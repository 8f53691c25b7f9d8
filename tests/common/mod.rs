//! Shared test utilities and fixture generators
#![allow(dead_code)]

use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Exercise classes used by the synthetic tables
pub const LEVELS: [&str; 5] = ["A", "B", "C", "D", "E"];

/// Number of informative sensor columns in the synthetic tables
pub const INFORMATIVE: usize = 10;

const USERS: [&str; 6] = ["adelmo", "carlitos", "charles", "eurico", "jeremy", "pedro"];

/// Create a small labeled DataFrame with one column per pruning filter
///
/// This DataFrame includes:
/// - `X`, `user_name`: identifiers
/// - `num_window`: window metadata
/// - `constant`: zero variance
/// - `mostly_missing`: 1 of 10 values present
/// - `roll_belt`, `pitch_belt`: informative sensors
/// - `classe`: label with two levels
pub fn create_test_dataframe() -> DataFrame {
    df! {
        "X" => [1i64, 2, 3, 4, 5, 6, 7, 8, 9, 10],
        "user_name" => ["pedro", "eurico", "pedro", "eurico", "pedro", "eurico", "pedro", "eurico", "pedro", "eurico"],
        "num_window" => [11i64, 11, 12, 12, 13, 13, 14, 14, 15, 15],
        "constant" => [0.0f64; 10],
        "mostly_missing" => [Some(1.0f64), None, None, None, None, None, None, None, None, None],
        "roll_belt" => [1.1f64, 8.9, 1.3, 9.2, 0.8, 9.5, 1.0, 8.7, 1.4, 9.1],
        "pitch_belt" => [-3.0f64, 4.1, -2.7, 3.8, -3.3, 4.4, -2.9, 4.0, -3.1, 3.9],
        "classe" => ["A", "B", "A", "B", "A", "B", "A", "B", "A", "B"],
    }
    .unwrap()
}

/// Rows of the synthetic exercise tables: class `i % 5` for row `i`.
fn class_of(row: usize) -> usize {
    row % LEVELS.len()
}

/// Sensor value of `feature` for a row of class `class`.
/// Class centers are 3 apart on every sensor while the noise stays within 1.
fn sensor(class: usize, feature: usize, rng: &mut ChaCha8Rng) -> f64 {
    let center = class as f64 * 3.0 * (1.0 + feature as f64 * 0.1);
    center + rng.gen_range(-1.0..1.0)
}

fn exercise_columns(rows: usize, seed: u64) -> Vec<Column> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut columns: Vec<Column> = Vec::with_capacity(INFORMATIVE + 9);

    columns.push(Column::new("X".into(), (1..=rows as i64).collect::<Vec<_>>()));
    columns.push(Column::new(
        "user_name".into(),
        (0..rows).map(|i| USERS[i % USERS.len()]).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        "raw_timestamp_part_1".into(),
        (0..rows).map(|i| 1_322_489_729 + i as i64).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        "raw_timestamp_part_2".into(),
        (0..rows).map(|_| rng.gen_range(0..1_000_000i64)).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        "cvtd_timestamp".into(),
        (0..rows)
            .map(|i| format!("28/11/2011 14:{:02}", i % 60))
            .collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        "new_window".into(),
        (0..rows)
            .map(|i| if i % 50 == 0 { "yes" } else { "no" })
            .collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        "num_window".into(),
        (0..rows).map(|i| (i / 20) as i64 + 1).collect::<Vec<_>>(),
    ));

    for j in 0..INFORMATIVE {
        let values: Vec<f64> = (0..rows).map(|i| sensor(class_of(i), j, &mut rng)).collect();
        columns.push(Column::new(format!("sensor_{}", j).into(), values));
    }

    // One value in a hundred differs from the rest
    columns.push(Column::new(
        "near_constant".into(),
        (0..rows)
            .map(|i| if i % 100 == 0 { 1.0f64 } else { 0.0 })
            .collect::<Vec<_>>(),
    ));
    // 98% missing
    columns.push(Column::new(
        "mostly_missing".into(),
        (0..rows)
            .map(|i| if i % 50 == 0 { Some(rng.gen::<f64>()) } else { None })
            .collect::<Vec<Option<f64>>>(),
    ));

    columns
}

/// Labeled synthetic exercise table with `rows_per_class` rows of each class.
///
/// Ten informative sensors separate the classes cleanly; `near_constant`
/// should fall to the near-zero-variance filter and `mostly_missing` to the
/// missing-value filter.
pub fn create_exercise_dataframe(rows_per_class: usize, seed: u64) -> DataFrame {
    let rows = rows_per_class * LEVELS.len();
    let mut columns = exercise_columns(rows, seed);
    columns.push(Column::new(
        "classe".into(),
        (0..rows).map(|i| LEVELS[class_of(i)]).collect::<Vec<_>>(),
    ));
    DataFrame::new(columns).unwrap()
}

/// Unlabeled scoring table with a trailing `problem_id` column.
/// Returns the table and the class each row was generated from.
pub fn create_scoring_dataframe(rows: usize, seed: u64) -> (DataFrame, Vec<String>) {
    let mut columns = exercise_columns(rows, seed);
    columns.push(Column::new(
        "problem_id".into(),
        (1..=rows as i64).collect::<Vec<_>>(),
    ));
    let expected = (0..rows).map(|i| LEVELS[class_of(i)].to_string()).collect();
    (DataFrame::new(columns).unwrap(), expected)
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");
    write_csv(df, &csv_path);
    (temp_dir, csv_path)
}

/// Write `df` as CSV to `path`
pub fn write_csv(df: &mut DataFrame, path: &Path) {
    let mut file = std::fs::File::create(path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
}

/// Write raw CSV text into a fresh temporary directory
pub fn create_temp_csv_text(name: &str, contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    (temp_dir, path)
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols = column_names(df);
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols = column_names(df);
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}
