//! Classification models
//!
//! The pipeline only talks to the `Classifier` / `Model` pair, so the
//! concrete algorithm can be swapped without touching the stages around it.

pub mod centroid;
pub mod folds;
pub mod forest;
pub mod tree;

pub use centroid::NearestCentroid;
pub use folds::{stratified_folds, Fold};
pub use forest::{FittedForest, RandomForest};
pub use tree::{DecisionTree, FittedTree};

use faer::Mat;

use crate::pipeline::Result;

/// A fitted model mapping a feature row to a class index
pub trait Model: Send + Sync {
    /// Predict the class index of one row
    fn predict_row(&self, row: &[f64]) -> usize;

    /// Predict every row of `x`, in order
    fn predict(&self, x: &Mat<f64>) -> Vec<usize> {
        let mut row = vec![0.0; x.ncols()];
        (0..x.nrows())
            .map(|i| {
                for (j, v) in row.iter_mut().enumerate() {
                    *v = x[(i, j)];
                }
                self.predict_row(&row)
            })
            .collect()
    }

    /// Model-specific facts worth reporting (e.g. out-of-bag error)
    fn describe(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// A learning algorithm with fixed hyperparameters
pub trait Classifier: Send + Sync {
    /// Algorithm name for reports
    fn name(&self) -> String;

    /// Hyperparameters as `(name, value)` pairs
    fn params(&self) -> Vec<(String, String)>;

    /// Fit on `x` with class indices `y` in `0..n_classes`.
    ///
    /// All randomness is derived from `seed`.
    fn fit(&self, x: &Mat<f64>, y: &[usize], n_classes: usize, seed: u64) -> Result<Box<dyn Model>>;
}

/// Index of the largest count; ties go to the lowest index
pub fn majority(counts: &[usize]) -> usize {
    let mut best = 0;
    for (class, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = class;
        }
    }
    best
}

/// Fraction of positions where `truth` and `predicted` agree
pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    correct as f64 / truth.len() as f64
}
