//! Random forest: bootstrap-sampled CART trees with per-split feature subsampling

use faer::Mat;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use super::tree::{FittedTree, TreeParams};
use super::{majority, Classifier, Model};
use crate::pipeline::Result;

/// Random forest classifier configuration
#[derive(Debug, Clone)]
pub struct RandomForest {
    /// Number of trees
    pub n_trees: usize,
    /// Features tried per split; defaults to floor(sqrt(p))
    pub mtry: Option<usize>,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    pub fn new(n_trees: usize) -> Self {
        Self {
            n_trees,
            mtry: None,
            min_samples_leaf: 1,
            max_depth: None,
        }
    }

    /// Set the number of features tried at each split
    pub fn with_mtry(mut self, mtry: usize) -> Self {
        self.mtry = Some(mtry);
        self
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    fn resolve_mtry(&self, n_features: usize) -> usize {
        self.mtry
            .unwrap_or_else(|| (n_features as f64).sqrt().floor() as usize)
            .clamp(1, n_features.max(1))
    }

    /// Fit and return the concrete forest, including its out-of-bag error.
    pub fn fit_forest(&self, x: &Mat<f64>, y: &[usize], n_classes: usize, seed: u64) -> FittedForest {
        let n_samples = x.nrows();
        let params = TreeParams {
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            mtry: Some(self.resolve_mtry(x.ncols())),
        };

        let grown: Vec<(FittedTree, Vec<usize>)> = (0..self.n_trees)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = tree_rng(seed, tree_idx);

                let mut in_bag = vec![false; n_samples];
                let sample: Vec<usize> = (0..n_samples)
                    .map(|_| {
                        let idx = rng.gen_range(0..n_samples);
                        in_bag[idx] = true;
                        idx
                    })
                    .collect();
                let out_of_bag: Vec<usize> = (0..n_samples).filter(|&i| !in_bag[i]).collect();

                let tree = FittedTree::grow(x, y, n_classes, &sample, &params, &mut rng);
                (tree, out_of_bag)
            })
            .collect();

        let oob_error = out_of_bag_error(&grown, x, y, n_classes);
        let trees = grown.into_iter().map(|(tree, _)| tree).collect();

        FittedForest {
            trees,
            n_classes,
            mtry: params.mtry.unwrap_or(1),
            oob_error,
        }
    }
}

/// Generator for one tree: the key comes from `seed` and each tree reads its own stream,
/// so neighbouring seeds never replay each other's trees.
fn tree_rng(seed: u64, tree_idx: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(tree_idx as u64);
    rng
}

fn out_of_bag_error(
    grown: &[(FittedTree, Vec<usize>)],
    x: &Mat<f64>,
    y: &[usize],
    n_classes: usize,
) -> Option<f64> {
    let mut votes = vec![vec![0usize; n_classes]; x.nrows()];
    let mut row = vec![0.0; x.ncols()];

    for (tree, oob) in grown {
        for &i in oob {
            for (j, v) in row.iter_mut().enumerate() {
                *v = x[(i, j)];
            }
            votes[i][tree.predict_row(&row)] += 1;
        }
    }

    let mut scored = 0usize;
    let mut wrong = 0usize;
    for (i, counts) in votes.iter().enumerate() {
        if counts.iter().all(|&c| c == 0) {
            continue;
        }
        scored += 1;
        if majority(counts) != y[i] {
            wrong += 1;
        }
    }

    if scored == 0 {
        None
    } else {
        Some(wrong as f64 / scored as f64)
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> String {
        "Random Forest".to_string()
    }

    fn params(&self) -> Vec<(String, String)> {
        vec![
            (
                "mtry".to_string(),
                self.mtry.map_or("sqrt(p)".to_string(), |m| m.to_string()),
            ),
            ("trees".to_string(), self.n_trees.to_string()),
        ]
    }

    fn fit(&self, x: &Mat<f64>, y: &[usize], n_classes: usize, seed: u64) -> Result<Box<dyn Model>> {
        Ok(Box::new(self.fit_forest(x, y, n_classes, seed)))
    }
}

/// A fitted ensemble of trees voting by majority
#[derive(Debug, Clone)]
pub struct FittedForest {
    trees: Vec<FittedTree>,
    n_classes: usize,
    mtry: usize,
    oob_error: Option<f64>,
}

impl FittedForest {
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn mtry(&self) -> usize {
        self.mtry
    }

    /// Out-of-bag misclassification rate, if any row was ever out of bag
    pub fn out_of_bag_error(&self) -> Option<f64> {
        self.oob_error
    }

    /// Per-class vote counts for one row
    pub fn votes(&self, row: &[f64]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for tree in &self.trees {
            counts[tree.predict_row(row)] += 1;
        }
        counts
    }
}

impl Model for FittedForest {
    fn predict_row(&self, row: &[f64]) -> usize {
        majority(&self.votes(row))
    }

    fn describe(&self) -> Vec<(String, String)> {
        let mut facts = vec![
            ("trees".to_string(), self.n_trees().to_string()),
            ("mtry".to_string(), self.mtry.to_string()),
        ];
        if let Some(oob) = self.oob_error {
            facts.push(("oob_error".to_string(), format!("{:.4}", oob)));
        }
        facts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> (Mat<f64>, Vec<usize>) {
        let n = 60;
        let x = Mat::from_fn(n, 3, |i, j| {
            let class = (i % 2) as f64;
            let jitter = ((i * 7 + j * 3) % 11) as f64 / 11.0;
            if j == 0 {
                class * 10.0 + jitter
            } else {
                jitter * 5.0
            }
        });
        let y = (0..n).map(|i| i % 2).collect();
        (x, y)
    }

    #[test]
    fn test_forest_learns_separable_data() {
        let (x, y) = two_blobs();
        let forest = RandomForest::new(25).fit_forest(&x, &y, 2, 42);
        assert_eq!(forest.n_trees(), 25);
        assert_eq!(forest.predict(&x), y);
        assert!(forest.out_of_bag_error().unwrap() < 0.1);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = two_blobs();
        let a = RandomForest::new(10).fit_forest(&x, &y, 2, 7);
        let b = RandomForest::new(10).fit_forest(&x, &y, 2, 7);
        assert_eq!(a.out_of_bag_error(), b.out_of_bag_error());
        for i in 0..x.nrows() {
            let row: Vec<f64> = (0..x.ncols()).map(|j| x[(i, j)]).collect();
            assert_eq!(a.votes(&row), b.votes(&row));
        }
    }

    #[test]
    fn test_adjacent_seeds_do_not_share_trees() {
        let draws = |seed: u64, tree: usize| -> Vec<u64> {
            let mut rng = tree_rng(seed, tree);
            (0..8).map(|_| rng.gen()).collect()
        };
        for tree in 0..20 {
            assert_ne!(draws(7, tree + 1), draws(8, tree));
            assert_ne!(draws(7, tree), draws(7, tree + 1));
        }
        assert_eq!(draws(7, 3), draws(7, 3));
    }

    #[test]
    fn test_default_mtry_is_floor_sqrt() {
        let rf = RandomForest::default();
        assert_eq!(rf.resolve_mtry(52), 7);
        assert_eq!(rf.resolve_mtry(1), 1);
        assert_eq!(RandomForest::new(5).with_mtry(100).resolve_mtry(10), 10);
    }
}
