//! Error types for the classification pipeline.
//!
//! Every stage reports failures through `PipelineError`. The variants name
//! the table or column at fault so the binary can surface them as-is.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Result alias used throughout the pipeline and model modules.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while loading, pruning, fitting or scoring.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Neither a cached copy nor the remote copy of a dataset could be read.
    #[error("Source unavailable: {source_name} ({reason})")]
    SourceUnavailable { source_name: String, reason: String },

    /// Split fraction outside the open interval (0, 1).
    #[error("Invalid split fraction {0}: must be strictly between 0 and 1")]
    InvalidFraction(f64),

    /// A named column is absent from a table.
    #[error("Column '{column}' not found in {table} table")]
    ColumnNotFound { table: String, column: String },

    /// A filter removed every feature column or every row.
    #[error("Nothing left after {stage}: all rows or feature columns were removed")]
    EmptyAfterPruning { stage: String },

    /// The label column is absent, or some rows have no label.
    #[error("Label column '{label}' missing in {table} table{}", detail_suffix(.missing_rows))]
    LabelMissing {
        table: String,
        label: String,
        missing_rows: usize,
    },

    /// A feature column that survived pruning cannot be read as numbers.
    #[error("Feature column '{column}' is not numeric (dtype {dtype})")]
    NonNumericFeature { column: String, dtype: String },

    /// Validation data carries a label level never seen while fitting.
    #[error("Label '{value}' does not occur in the fitting data")]
    UnknownLabel { value: String },

    /// Fold count is unusable for the number of rows available.
    #[error("Cannot build {folds} folds from {rows} rows")]
    InvalidFolds { folds: usize, rows: usize },

    /// Training was asked to choose among zero classifiers.
    #[error("No candidate classifiers to train")]
    NoCandidates,

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn detail_suffix(missing_rows: &usize) -> String {
    if *missing_rows == 0 {
        String::new()
    } else {
        format!(" ({} row(s) without a label)", missing_rows)
    }
}

impl PipelineError {
    /// Short taxonomy name, used by the report when a run aborts.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::SourceUnavailable { .. } => "SourceUnavailable",
            PipelineError::InvalidFraction(_) => "InvalidFraction",
            PipelineError::ColumnNotFound { .. } => "ColumnNotFound",
            PipelineError::EmptyAfterPruning { .. } => "EmptyAfterPruning",
            PipelineError::LabelMissing { .. } => "LabelMissing",
            PipelineError::NonNumericFeature { .. } => "NonNumericFeature",
            PipelineError::UnknownLabel { .. } => "UnknownLabel",
            PipelineError::InvalidFolds { .. } => "InvalidFolds",
            PipelineError::NoCandidates => "NoCandidates",
            PipelineError::Polars(_) => "Polars",
            PipelineError::Io(_) => "Io",
        }
    }
}
