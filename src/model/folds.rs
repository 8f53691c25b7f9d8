//! Stratified k-fold assignment

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::pipeline::{PipelineError, Result};

/// A single train/test split
#[derive(Debug, Clone)]
pub struct Fold {
    pub index: usize,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Deal each class's shuffled rows round-robin into `k` folds.
///
/// The dealing position carries over between classes, so fold sizes differ
/// by at most one. Every row lands in exactly one test set.
pub fn stratified_folds(y: &[usize], k: usize, seed: u64) -> Result<Vec<Fold>> {
    if k < 2 || k > y.len() {
        return Err(PipelineError::InvalidFolds {
            folds: k,
            rows: y.len(),
        });
    }

    let n_classes = y.iter().copied().max().map_or(0, |m| m + 1);
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (i, &class) in y.iter().enumerate() {
        by_class[class].push(i);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut assignment = vec![0usize; y.len()];
    let mut next = 0usize;
    for rows in by_class.iter_mut() {
        rows.shuffle(&mut rng);
        for &row in rows.iter() {
            assignment[row] = next % k;
            next += 1;
        }
    }

    Ok((0..k)
        .map(|index| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..y.len()).partition(|&i| assignment[i] == index);
            Fold { index, train, test }
        })
        .collect())
}
