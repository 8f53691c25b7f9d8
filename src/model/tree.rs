//! CART classification tree with Gini impurity

use faer::Mat;
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::{majority, Classifier, Model};
use crate::pipeline::Result;

/// Decision tree node
#[derive(Debug, Clone, Serialize)]
pub enum TreeNode {
    /// Leaf node with the predicted class
    Leaf { class: usize, n_samples: usize },
    /// Internal node: rows with `x[feature] <= threshold` go left
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Growth limits shared by single trees and forests
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    /// Features tried at each split; `None` tries all of them
    pub mtry: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_leaf: 1,
            mtry: None,
        }
    }
}

/// A grown tree
#[derive(Debug, Clone, Serialize)]
pub struct FittedTree {
    root: TreeNode,
}

impl FittedTree {
    /// Grow a tree on the given (possibly repeated) row indices.
    pub fn grow(
        x: &Mat<f64>,
        y: &[usize],
        n_classes: usize,
        indices: &[usize],
        params: &TreeParams,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let grower = Grower {
            x,
            y,
            n_classes,
            params,
        };
        let root = grower.build(indices, 0, rng);
        Self { root }
    }

    pub fn depth(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        walk(&self.root)
    }

    pub fn n_leaves(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => walk(left) + walk(right),
            }
        }
        walk(&self.root)
    }
}

impl Model for FittedTree {
    fn predict_row(&self, row: &[f64]) -> usize {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { class, .. } => return *class,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    fn describe(&self) -> Vec<(String, String)> {
        vec![
            ("depth".to_string(), self.depth().to_string()),
            ("leaves".to_string(), self.n_leaves().to_string()),
        ]
    }
}

struct Grower<'a> {
    x: &'a Mat<f64>,
    y: &'a [usize],
    n_classes: usize,
    params: &'a TreeParams,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl Grower<'_> {
    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += 1;
        }
        counts
    }

    fn build(&self, indices: &[usize], depth: usize, rng: &mut ChaCha8Rng) -> TreeNode {
        let n_samples = indices.len();
        let counts = self.class_counts(indices);
        let leaf = || TreeNode::Leaf {
            class: majority(&counts),
            n_samples,
        };

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let too_deep = self.params.max_depth.is_some_and(|d| depth >= d);
        if pure || too_deep || n_samples < 2 * self.params.min_samples_leaf {
            return leaf();
        }

        let Some(best) = self.find_best_split(indices, &counts, rng) else {
            return leaf();
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[(i, best.feature)] <= best.threshold);

        TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.build(&left, depth + 1, rng)),
            right: Box::new(self.build(&right, depth + 1, rng)),
            n_samples,
        }
    }

    fn find_best_split(
        &self,
        indices: &[usize],
        counts: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<BestSplit> {
        let n_features = self.x.ncols();
        let mtry = self.params.mtry.unwrap_or(n_features).clamp(1, n_features.max(1));
        let candidates: Vec<usize> = if mtry >= n_features {
            (0..n_features).collect()
        } else {
            sample(rng, n_features, mtry).into_vec()
        };

        let n = indices.len() as f64;
        let parent = gini(counts, indices.len());
        let min_leaf = self.params.min_samples_leaf.max(1);
        let mut best: Option<BestSplit> = None;
        let mut column: Vec<(f64, usize)> = Vec::with_capacity(indices.len());

        for feature in candidates {
            column.clear();
            column.extend(indices.iter().map(|&i| (self.x[(i, feature)], self.y[i])));
            column.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            // Sweep split positions, moving one row at a time to the left side
            let mut left = vec![0usize; self.n_classes];
            let mut right = counts.to_vec();
            for pos in 0..column.len() - 1 {
                let (value, class) = column[pos];
                left[class] += 1;
                right[class] -= 1;

                let next = column[pos + 1].0;
                if next <= value {
                    continue;
                }
                let n_left = pos + 1;
                let n_right = column.len() - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let weighted = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n;
                let gain = parent - weighted;
                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (value + next) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>()
}

/// Single CART tree, grown on all rows
#[derive(Debug, Clone, Default)]
pub struct DecisionTree {
    pub params: TreeParams,
}

impl Classifier for DecisionTree {
    fn name(&self) -> String {
        "Decision Tree".to_string()
    }

    fn params(&self) -> Vec<(String, String)> {
        vec![
            (
                "max_depth".to_string(),
                self.params.max_depth.map_or("none".to_string(), |d| d.to_string()),
            ),
            (
                "min_samples_leaf".to_string(),
                self.params.min_samples_leaf.to_string(),
            ),
        ]
    }

    fn fit(&self, x: &Mat<f64>, y: &[usize], n_classes: usize, seed: u64) -> Result<Box<dyn Model>> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let indices: Vec<usize> = (0..x.nrows()).collect();
        Ok(Box::new(FittedTree::grow(x, y, n_classes, &indices, &self.params, &mut rng)))
    }
}
