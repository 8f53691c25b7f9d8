//! Predictions for the unlabeled scoring table

use polars::prelude::*;
use serde::Serialize;

use super::error::Result;
use super::trainer::TrainedModel;

/// Predicted label of one scoring row; `row` is 1-based
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub row: usize,
    pub label: String,
}

/// Predict one label per scoring row, preserving row order.
pub fn predict(model: &TrainedModel, scoring: &DataFrame) -> Result<Vec<Prediction>> {
    Ok(model
        .predict_table(scoring, "scoring")?
        .into_iter()
        .enumerate()
        .map(|(i, label)| Prediction { row: i + 1, label })
        .collect())
}
