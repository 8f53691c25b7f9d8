//! Stratified partition of the labeled table into fitting and validation sets

use std::collections::BTreeMap;

use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::error::{PipelineError, Result};
use super::preprocess::label_strings;

/// Fitting and validation parts of a labeled table.
///
/// `fit_rows` and `validation_rows` are row indices into the original table,
/// each sorted ascending.
#[derive(Debug, Clone)]
pub struct Partition {
    pub fit: DataFrame,
    pub validation: DataFrame,
    pub fit_rows: Vec<usize>,
    pub validation_rows: Vec<usize>,
}

/// Split `df` so each label level contributes `ceil(fraction * level_count)`
/// rows to the fitting set and the rest to the validation set.
///
/// The same `seed` and input always produce the same partition.
pub fn stratified_split(df: &DataFrame, label: &str, fraction: f64, seed: u64) -> Result<Partition> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(PipelineError::InvalidFraction(fraction));
    }

    let labels = label_strings(df, label, "training")?;
    let (fit_rows, validation_rows) = stratified_indices(&labels, fraction, seed);

    Ok(Partition {
        fit: take_rows(df, &fit_rows)?,
        validation: take_rows(df, &validation_rows)?,
        fit_rows,
        validation_rows,
    })
}

/// Index-level stratified sampling. Levels are visited in sorted order so the
/// shuffle sequence does not depend on hash iteration order.
pub fn stratified_indices(labels: &[String], fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, level) in labels.iter().enumerate() {
        groups.entry(level.as_str()).or_default().push(idx);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut fit = Vec::with_capacity((labels.len() as f64 * fraction).ceil() as usize);
    let mut validation = Vec::with_capacity(labels.len());

    for (_, mut rows) in groups {
        rows.shuffle(&mut rng);
        let take = ((rows.len() as f64) * fraction).ceil() as usize;
        let take = take.min(rows.len());
        fit.extend_from_slice(&rows[..take]);
        validation.extend_from_slice(&rows[take..]);
    }

    fit.sort_unstable();
    validation.sort_unstable();
    (fit, validation)
}

/// New frame holding `rows` of `df`, in the given order.
pub fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        rows.iter().map(|&r| r as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}
