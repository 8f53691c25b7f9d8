//! Feature matrix extraction, centering/scaling and label encoding
//!
//! Parameters are always estimated on the fitting table and then applied
//! unchanged to validation and scoring tables.

use faer::Mat;
use polars::prelude::*;
use serde::Serialize;

use super::error::{PipelineError, Result};

/// Read the label column as strings, rejecting absent columns and null labels.
pub fn label_strings(df: &DataFrame, label: &str, table: &str) -> Result<Vec<String>> {
    let missing = |missing_rows| PipelineError::LabelMissing {
        table: table.to_string(),
        label: label.to_string(),
        missing_rows,
    };

    let column = df.column(label).map_err(|_| missing(0))?;
    let null_count = column.null_count();
    if null_count > 0 {
        return Err(missing(null_count));
    }

    let as_str = column.cast(&DataType::String)?;
    Ok(as_str
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}

/// Label levels (sorted) and the per-row level index
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoding {
    pub levels: Vec<String>,
    pub codes: Vec<usize>,
}

/// Encode the label column of the fitting table. Levels come out sorted.
pub fn encode_labels(df: &DataFrame, label: &str, table: &str) -> Result<LabelEncoding> {
    let values = label_strings(df, label, table)?;
    let mut levels = values.clone();
    levels.sort();
    levels.dedup();
    let codes = encode_with(&levels, &values)?;
    Ok(LabelEncoding { levels, codes })
}

/// Encode values against an existing level set.
pub fn encode_with(levels: &[String], values: &[String]) -> Result<Vec<usize>> {
    values
        .iter()
        .map(|v| {
            levels
                .binary_search(v)
                .map_err(|_| PipelineError::UnknownLabel { value: v.clone() })
        })
        .collect()
}

/// Numeric predictors as a dense row-major view
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub x: Mat<f64>,
}

impl FeatureMatrix {
    pub fn rows(&self) -> usize {
        self.x.nrows()
    }

    pub fn row(&self, i: usize) -> Vec<f64> {
        (0..self.x.ncols()).map(|j| self.x[(i, j)]).collect()
    }
}

/// Fitted center and scale of one predictor
#[derive(Debug, Clone, Serialize)]
pub struct ColumnScale {
    pub name: String,
    pub center: f64,
    pub scale: f64,
}

/// Center/scale parameters and mean imputation learned from the fitting table
#[derive(Debug, Clone, Serialize)]
pub struct Preprocessor {
    pub columns: Vec<ColumnScale>,
    pub standardize: bool,
}

impl Preprocessor {
    /// Learn per-column mean and sample standard deviation from `df`.
    ///
    /// A column with zero (or undefined) spread keeps a scale of 1.
    pub fn fit(df: &DataFrame, features: &[String], standardize: bool) -> Result<Self> {
        let columns = features
            .iter()
            .map(|name| {
                let values = numeric_values(df, name, "fitting")?;
                let (center, scale) = mean_and_std(&values);
                Ok(ColumnScale {
                    name: name.clone(),
                    center,
                    scale,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            columns,
            standardize,
        })
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Build the feature matrix of `df`, imputing missing values with the
    /// fitted mean before scaling.
    pub fn transform(&self, df: &DataFrame, table: &str) -> Result<FeatureMatrix> {
        let data: Vec<Vec<f64>> = self
            .columns
            .iter()
            .map(|c| {
                let values = numeric_values(df, &c.name, table)?;
                Ok(values
                    .into_iter()
                    .map(|v| {
                        let v = v.unwrap_or(c.center);
                        if self.standardize {
                            (v - c.center) / c.scale
                        } else {
                            v
                        }
                    })
                    .collect())
            })
            .collect::<Result<Vec<_>>>()?;

        let x = Mat::from_fn(df.height(), data.len(), |i, j| data[j][i]);
        Ok(FeatureMatrix {
            names: self.feature_names(),
            x,
        })
    }
}

fn numeric_values(df: &DataFrame, name: &str, table: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name).map_err(|_| PipelineError::ColumnNotFound {
        table: table.to_string(),
        column: name.to_string(),
    })?;

    let dtype = column.dtype();
    if !(dtype.is_primitive_numeric() || matches!(dtype, DataType::Boolean)) {
        return Err(PipelineError::NonNumericFeature {
            column: name.to_string(),
            dtype: dtype.to_string(),
        });
    }

    let as_f64 = column.cast(&DataType::Float64)?;
    Ok(as_f64
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

fn mean_and_std(values: &[Option<f64>]) -> (f64, f64) {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let n = present.len();
    if n == 0 {
        return (0.0, 1.0);
    }

    let mean = present.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, 1.0);
    }

    let var = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std = var.sqrt();
    if std > 0.0 && std.is_finite() {
        (mean, std)
    } else {
        (mean, 1.0)
    }
}
