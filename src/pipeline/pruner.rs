//! Feature pruning: decide the kept column set on the fitting table, then
//! apply it identically to the validation and scoring tables.
//!
//! Four filters run in a fixed order:
//! 1. near-zero variance
//! 2. identifier columns (row index, user, formatted timestamp)
//! 3. raw timestamp / window bookkeeping columns
//! 4. columns with too few present values
//!
//! Only the fitting table's statistics feed any decision.

use polars::prelude::*;
use serde::Serialize;

use super::error::{PipelineError, Result};
use super::missing::{analyze_missing_values, get_sparse_features, MinPresent};
use super::variance::{near_zero_variance, ColumnProfile, DEFAULT_FREQ_CUT, DEFAULT_UNIQUE_CUT};

/// Default identifier columns: row index, subject and formatted timestamp
pub const DEFAULT_IDENTIFIER_COLUMNS: [&str; 3] = ["X", "user_name", "cvtd_timestamp"];

/// Default raw timestamp and window-tracking columns
pub const DEFAULT_METADATA_COLUMNS: [&str; 4] = [
    "raw_timestamp_part_1",
    "raw_timestamp_part_2",
    "new_window",
    "num_window",
];

/// Thresholds and static name lists for the pruning filters
#[derive(Debug, Clone, Serialize)]
pub struct PrunerConfig {
    pub freq_cut: f64,
    pub unique_cut: f64,
    pub identifier_columns: Vec<String>,
    pub metadata_columns: Vec<String>,
    pub min_present: MinPresent,
    /// Treat an absent statically named column as fatal instead of skipping it
    pub strict_columns: bool,
}

impl Default for PrunerConfig {
    fn default() -> Self {
        Self {
            freq_cut: DEFAULT_FREQ_CUT,
            unique_cut: DEFAULT_UNIQUE_CUT,
            identifier_columns: DEFAULT_IDENTIFIER_COLUMNS.iter().map(|s| s.to_string()).collect(),
            metadata_columns: DEFAULT_METADATA_COLUMNS.iter().map(|s| s.to_string()).collect(),
            min_present: MinPresent::default(),
            strict_columns: false,
        }
    }
}

/// Table dimensions after one pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageDimensions {
    pub stage: String,
    pub rows: usize,
    pub columns: usize,
}

impl StageDimensions {
    pub fn of(stage: &str, df: &DataFrame) -> Self {
        Self {
            stage: stage.to_string(),
            rows: df.height(),
            columns: df.width(),
        }
    }
}

/// Columns removed by each filter
#[derive(Debug, Clone, Default, Serialize)]
pub struct DroppedColumns {
    pub near_zero_variance: Vec<String>,
    pub identifiers: Vec<String>,
    pub metadata: Vec<String>,
    pub sparse: Vec<String>,
}

impl DroppedColumns {
    pub fn total(&self) -> usize {
        self.near_zero_variance.len() + self.identifiers.len() + self.metadata.len() + self.sparse.len()
    }
}

/// A statically named column that was absent and skipped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedColumn {
    pub stage: String,
    pub column: String,
}

/// Column decisions taken on the fitting table
#[derive(Debug, Clone, Serialize)]
pub struct PruningPlan {
    pub label: String,
    pub kept_features: Vec<String>,
    pub dropped: DroppedColumns,
    pub skipped: Vec<SkippedColumn>,
    pub stages: Vec<StageDimensions>,
    pub profiles: Vec<ColumnProfile>,
    pub min_present: usize,
}

impl PruningPlan {
    /// Run the four filters over the fitting table.
    pub fn decide(fit: &DataFrame, label: &str, cfg: &PrunerConfig) -> Result<Self> {
        if fit.column(label).is_err() {
            return Err(PipelineError::LabelMissing {
                table: "fitting".to_string(),
                label: label.to_string(),
                missing_rows: 0,
            });
        }
        if fit.height() == 0 {
            return Err(PipelineError::EmptyAfterPruning {
                stage: "split".to_string(),
            });
        }

        let mut stages = vec![StageDimensions::of("fitting (before pruning)", fit)];
        let mut dropped = DroppedColumns::default();
        let mut skipped = Vec::new();

        // Step 1: near-zero variance
        let (profiles, nzv) = near_zero_variance(
            fit,
            label,
            &cfg.identifier_columns,
            cfg.freq_cut,
            cfg.unique_cut,
        )?;
        let current = fit.drop_many(&nzv);
        dropped.near_zero_variance = nzv;
        ensure_features_left(&current, label, "near-zero-variance filter")?;
        stages.push(StageDimensions::of("near-zero-variance filter", &current));

        // Step 2: identifiers
        let (current, ids) = drop_named(
            fit,
            &current,
            &cfg.identifier_columns,
            "identifier filter",
            cfg.strict_columns,
            &mut skipped,
        )?;
        dropped.identifiers = ids;
        ensure_features_left(&current, label, "identifier filter")?;
        stages.push(StageDimensions::of("identifier filter", &current));

        // Step 3: timestamp and window metadata
        let (current, meta) = drop_named(
            fit,
            &current,
            &cfg.metadata_columns,
            "metadata filter",
            cfg.strict_columns,
            &mut skipped,
        )?;
        dropped.metadata = meta;
        ensure_features_left(&current, label, "metadata filter")?;
        stages.push(StageDimensions::of("metadata filter", &current));

        // Step 4: high missingness
        let min_present = cfg.min_present.resolve(current.height());
        let present_counts = analyze_missing_values(&current)?;
        let sparse = get_sparse_features(&present_counts, min_present, label);
        let current = current.drop_many(&sparse);
        dropped.sparse = sparse;
        ensure_features_left(&current, label, "missing-value filter")?;
        stages.push(StageDimensions::of("missing-value filter", &current));

        let kept_features = current
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|name| name != label)
            .collect();

        Ok(Self {
            label: label.to_string(),
            kept_features,
            dropped,
            skipped,
            stages,
            profiles,
            min_present,
        })
    }

    /// Select kept features plus the label from a labeled table.
    pub fn apply_labeled(&self, df: &DataFrame, table: &str) -> Result<DataFrame> {
        if df.column(&self.label).is_err() {
            return Err(PipelineError::LabelMissing {
                table: table.to_string(),
                label: self.label.clone(),
                missing_rows: 0,
            });
        }
        let mut columns = self.kept_features.clone();
        columns.push(self.label.clone());
        select_existing(df, &columns, table)
    }

    /// Select kept features from a table without labels.
    pub fn apply_unlabeled(&self, df: &DataFrame, table: &str) -> Result<DataFrame> {
        select_existing(df, &self.kept_features, table)
    }
}

/// The three tables after pruning, plus the plan that produced them
#[derive(Debug, Clone)]
pub struct PrunedTables {
    pub fit: DataFrame,
    pub validation: DataFrame,
    pub scoring: DataFrame,
    pub plan: PruningPlan,
}

/// Decide the column set on `fit` and apply it to all three tables.
pub fn prune(
    fit: &DataFrame,
    validation: &DataFrame,
    scoring: &DataFrame,
    label: &str,
    cfg: &PrunerConfig,
) -> Result<PrunedTables> {
    let plan = PruningPlan::decide(fit, label, cfg)?;
    Ok(PrunedTables {
        fit: plan.apply_labeled(fit, "fitting")?,
        validation: plan.apply_labeled(validation, "validation")?,
        scoring: plan.apply_unlabeled(scoring, "scoring")?,
        plan,
    })
}

/// Drop `names` from `df`. Columns an earlier stage already removed from
/// `original` are ignored; columns never present are skipped or rejected.
fn drop_named(
    original: &DataFrame,
    df: &DataFrame,
    names: &[String],
    stage: &str,
    strict: bool,
    skipped: &mut Vec<SkippedColumn>,
) -> Result<(DataFrame, Vec<String>)> {
    let mut present = Vec::new();
    for name in names {
        if df.column(name).is_ok() {
            present.push(name.clone());
        } else if original.column(name).is_ok() {
            continue;
        } else if strict {
            return Err(PipelineError::ColumnNotFound {
                table: "fitting".to_string(),
                column: name.clone(),
            });
        } else {
            skipped.push(SkippedColumn {
                stage: stage.to_string(),
                column: name.clone(),
            });
        }
    }
    Ok((df.drop_many(&present), present))
}

fn ensure_features_left(df: &DataFrame, label: &str, stage: &str) -> Result<()> {
    let features = df.get_column_names().iter().filter(|n| n.as_str() != label).count();
    if features == 0 || df.height() == 0 {
        return Err(PipelineError::EmptyAfterPruning {
            stage: stage.to_string(),
        });
    }
    Ok(())
}

fn select_existing(df: &DataFrame, columns: &[String], table: &str) -> Result<DataFrame> {
    if let Some(absent) = columns.iter().find(|c| df.column(c.as_str()).is_err()) {
        return Err(PipelineError::ColumnNotFound {
            table: table.to_string(),
            column: absent.clone(),
        });
    }
    Ok(df.select(columns)?)
}
