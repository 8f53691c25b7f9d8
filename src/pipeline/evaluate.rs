//! Out-of-sample evaluation: confusion matrix and error rate

use polars::prelude::*;
use serde::Serialize;

use super::error::{PipelineError, Result};
use super::preprocess::{encode_with, label_strings};
use super::trainer::TrainedModel;

/// Cross-tabulation of true (rows) against predicted (columns) labels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    pub levels: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Build from class indices into `levels`
    pub fn from_codes(levels: &[String], truth: &[usize], predicted: &[usize]) -> Self {
        let k = levels.len();
        let mut counts = vec![vec![0usize; k]; k];
        for (&t, &p) in truth.iter().zip(predicted) {
            counts[t][p] += 1;
        }
        Self {
            levels: levels.to_vec(),
            counts,
        }
    }

    /// Build from label strings. Both sides must use levels from `levels`.
    pub fn from_labels(levels: &[String], truth: &[String], predicted: &[String]) -> Result<Self> {
        let truth = encode_with(levels, truth)?;
        let predicted = encode_with(levels, predicted)?;
        Ok(Self::from_codes(levels, &truth, &predicted))
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.levels.len()).map(|i| self.counts[i][i]).sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.correct() as f64 / total as f64
    }

    /// Misclassified share of rows, in [0, 1]
    pub fn error_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (total - self.correct()) as f64 / total as f64
    }

    /// Cohen's kappa: agreement corrected for chance
    pub fn kappa(&self) -> f64 {
        let total = self.total() as f64;
        if total == 0.0 {
            return 0.0;
        }
        let k = self.levels.len();
        let observed = self.correct() as f64 / total;
        let expected: f64 = (0..k)
            .map(|i| {
                let row: usize = self.counts[i].iter().sum();
                let col: usize = self.counts.iter().map(|r| r[i]).sum();
                (row as f64 / total) * (col as f64 / total)
            })
            .sum();
        if (1.0 - expected).abs() < f64::EPSILON {
            return if observed >= 1.0 { 1.0 } else { 0.0 };
        }
        (observed - expected) / (1.0 - expected)
    }

    /// Recall (sensitivity) of each level; `None` for levels absent from the truth
    pub fn per_class_recall(&self) -> Vec<Option<f64>> {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let n: usize = row.iter().sum();
                (n > 0).then(|| row[i] as f64 / n as f64)
            })
            .collect()
    }
}

/// Result of scoring the validation table
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub confusion: ConfusionMatrix,
    pub accuracy: f64,
    pub error_rate: f64,
    pub kappa: f64,
}

/// Score `model` on a labeled validation table.
pub fn evaluate(model: &TrainedModel, validation: &DataFrame) -> Result<Evaluation> {
    if validation.height() == 0 {
        return Err(PipelineError::EmptyAfterPruning {
            stage: "validation".to_string(),
        });
    }

    let truth = label_strings(validation, &model.label, "validation")?;
    let truth = encode_with(&model.levels, &truth)?;
    let predicted = model.predict_codes(validation, "validation")?;

    let confusion = ConfusionMatrix::from_codes(&model.levels, &truth, &predicted);
    Ok(Evaluation {
        accuracy: confusion.accuracy(),
        error_rate: confusion.error_rate(),
        kappa: confusion.kappa(),
        confusion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> Vec<String> {
        ["A", "B", "C"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_perfect_predictions() {
        let cm = ConfusionMatrix::from_codes(&levels(), &[0, 1, 2, 2], &[0, 1, 2, 2]);
        assert_eq!(cm.error_rate(), 0.0);
        assert_eq!(cm.accuracy(), 1.0);
        assert!((cm.kappa() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_counts_and_error_rate() {
        let cm = ConfusionMatrix::from_codes(&levels(), &[0, 0, 1, 2], &[0, 1, 1, 0]);
        assert_eq!(cm.counts[0], vec![1, 1, 0]);
        assert_eq!(cm.counts[2], vec![1, 0, 0]);
        assert_eq!(cm.total(), 4);
        assert_eq!(cm.error_rate(), 0.5);
        assert_eq!(cm.per_class_recall(), vec![Some(0.5), Some(1.0), Some(0.0)]);
    }

    #[test]
    fn test_from_labels_rejects_unknown_level() {
        let truth = vec!["A".to_string()];
        let predicted = vec!["Z".to_string()];
        assert!(ConfusionMatrix::from_labels(&levels(), &truth, &predicted).is_err());
    }

    #[test]
    fn test_empty_matrix_is_zero() {
        let cm = ConfusionMatrix::from_codes(&levels(), &[], &[]);
        assert_eq!(cm.error_rate(), 0.0);
        assert_eq!(cm.kappa(), 0.0);
    }
}
