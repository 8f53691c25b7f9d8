//! Nearest-centroid classifier
//!
//! Assigns each row to the class whose mean feature vector is closest in
//! Euclidean distance. Sensitive to feature scale, so it expects centered
//! and scaled inputs.

use faer::Mat;

use super::{Classifier, Model};
use crate::pipeline::Result;

#[derive(Debug, Clone, Default)]
pub struct NearestCentroid;

impl Classifier for NearestCentroid {
    fn name(&self) -> String {
        "Nearest Centroid".to_string()
    }

    fn params(&self) -> Vec<(String, String)> {
        vec![("metric".to_string(), "euclidean".to_string())]
    }

    fn fit(&self, x: &Mat<f64>, y: &[usize], n_classes: usize, _seed: u64) -> Result<Box<dyn Model>> {
        let p = x.ncols();
        let mut sums = vec![vec![0.0; p]; n_classes];
        let mut counts = vec![0usize; n_classes];

        for (i, &class) in y.iter().enumerate() {
            counts[class] += 1;
            for (j, s) in sums[class].iter_mut().enumerate() {
                *s += x[(i, j)];
            }
        }

        let centroids: Vec<Option<Vec<f64>>> = sums
            .into_iter()
            .zip(counts)
            .map(|(sum, count)| {
                (count > 0).then(|| sum.into_iter().map(|s| s / count as f64).collect())
            })
            .collect();

        Ok(Box::new(FittedCentroids { centroids }))
    }
}

/// Class means learned by `NearestCentroid`; `None` for classes with no rows
#[derive(Debug, Clone)]
pub struct FittedCentroids {
    centroids: Vec<Option<Vec<f64>>>,
}

impl Model for FittedCentroids {
    fn predict_row(&self, row: &[f64]) -> usize {
        let mut best = (0, f64::INFINITY);
        for (class, centroid) in self.centroids.iter().enumerate() {
            let Some(c) = centroid else { continue };
            let dist: f64 = c.iter().zip(row).map(|(a, b)| (a - b).powi(2)).sum();
            if dist < best.1 {
                best = (class, dist);
            }
        }
        best.0
    }

    fn describe(&self) -> Vec<(String, String)> {
        let fitted = self.centroids.iter().filter(|c| c.is_some()).count();
        vec![("centroids".to_string(), fitted.to_string())]
    }
}
