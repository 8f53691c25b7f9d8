//! Model training with stratified k-fold cross-validation
//!
//! Each candidate classifier is scored on every fold; the candidate with the
//! highest mean accuracy is refit on the whole fitting table. Imputation and
//! scaling are learned inside each fold from its training rows alone.

use faer::Mat;
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use super::error::{PipelineError, Result};
use super::evaluate::ConfusionMatrix;
use super::preprocess::{encode_labels, Preprocessor};
use super::split::take_rows;
use crate::model::{stratified_folds, Classifier, Fold, Model};
use crate::utils::cv_progress;

/// Cross-validation settings
#[derive(Debug, Clone, Serialize)]
pub struct TrainerConfig {
    pub folds: usize,
    pub seed: u64,
    /// Center and scale predictors before fitting
    pub standardize: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            folds: 5,
            seed: 32343,
            standardize: true,
        }
    }
}

/// Cross-validated score of one candidate
#[derive(Debug, Clone, Serialize)]
pub struct CandidateScore {
    pub classifier: String,
    pub params: Vec<(String, String)>,
    pub fold_accuracies: Vec<f64>,
    pub fold_kappas: Vec<f64>,
    pub mean_accuracy: f64,
    pub mean_kappa: f64,
}

/// Outcome of model selection
#[derive(Debug, Clone, Serialize)]
pub struct CvSummary {
    pub folds: usize,
    pub fitting_rows: usize,
    pub features: usize,
    pub candidates: Vec<CandidateScore>,
    /// Index into `candidates` of the refit model
    pub selected: usize,
    /// Facts reported by the final model
    pub final_model: Vec<(String, String)>,
}

impl CvSummary {
    pub fn selected_candidate(&self) -> &CandidateScore {
        &self.candidates[self.selected]
    }
}

/// The selected classifier refit on all fitting rows, with everything needed
/// to score new tables
pub struct TrainedModel {
    model: Box<dyn Model>,
    pub label: String,
    pub levels: Vec<String>,
    pub preprocessor: Preprocessor,
    pub summary: CvSummary,
}

impl TrainedModel {
    /// Predict class indices for every row of `df`
    pub fn predict_codes(&self, df: &DataFrame, table: &str) -> Result<Vec<usize>> {
        let matrix = self.preprocessor.transform(df, table)?;
        Ok(self.model.predict(&matrix.x))
    }

    /// Predict label strings for every row of `df`, in row order
    pub fn predict_table(&self, df: &DataFrame, table: &str) -> Result<Vec<String>> {
        Ok(self
            .predict_codes(df, table)?
            .into_iter()
            .map(|c| self.levels[c].clone())
            .collect())
    }

    pub fn features(&self) -> Vec<String> {
        self.preprocessor.feature_names()
    }
}

/// Cross-validate every candidate on `fit`, then refit the best one.
pub fn train(
    fit: &DataFrame,
    features: &[String],
    label: &str,
    candidates: &[Box<dyn Classifier>],
    cfg: &TrainerConfig,
) -> Result<TrainedModel> {
    if candidates.is_empty() {
        return Err(PipelineError::NoCandidates);
    }

    let encoding = encode_labels(fit, label, "fitting")?;
    let preprocessor = Preprocessor::fit(fit, features, cfg.standardize)?;
    let matrix = preprocessor.transform(fit, "fitting")?;
    let y = encoding.codes;
    let n_classes = encoding.levels.len();

    let folds = stratified_folds(&y, cfg.folds, cfg.seed)?;
    let fold_data = folds
        .par_iter()
        .map(|fold| FoldData::build(fit, features, &y, fold, cfg.standardize))
        .collect::<Result<Vec<_>>>()?;

    let pb = cv_progress(candidates.len(), folds.len());

    // (candidate, fold) -> (accuracy, kappa)
    let jobs: Vec<(usize, usize)> = (0..candidates.len())
        .flat_map(|c| (0..folds.len()).map(move |f| (c, f)))
        .collect();
    let results: Vec<Result<(usize, usize, f64, f64)>> = jobs
        .par_iter()
        .map(|&(c, f)| {
            let data = &fold_data[f];
            let seed = cfg.seed.wrapping_add(1 + folds[f].index as u64);
            let model = candidates[c].fit(&data.x_train, &data.y_train, n_classes, seed)?;
            let predicted = model.predict(&data.x_test);
            let cm = ConfusionMatrix::from_codes(&encoding.levels, &data.y_test, &predicted);

            pb.inc(1);
            Ok((c, f, cm.accuracy(), cm.kappa()))
        })
        .collect();

    let mut accuracies = vec![vec![0.0; folds.len()]; candidates.len()];
    let mut kappas = vec![vec![0.0; folds.len()]; candidates.len()];
    for result in results {
        let (c, f, acc, kappa) = result?;
        accuracies[c][f] = acc;
        kappas[c][f] = kappa;
    }
    pb.finish_and_clear();

    let scores: Vec<CandidateScore> = candidates
        .iter()
        .zip(accuracies.into_iter().zip(kappas))
        .map(|(candidate, (fold_accuracies, fold_kappas))| CandidateScore {
            classifier: candidate.name(),
            params: candidate.params(),
            mean_accuracy: mean(&fold_accuracies),
            mean_kappa: mean(&fold_kappas),
            fold_accuracies,
            fold_kappas,
        })
        .collect();

    let mut selected = 0;
    for (i, score) in scores.iter().enumerate() {
        if score.mean_accuracy > scores[selected].mean_accuracy {
            selected = i;
        }
    }

    let model = candidates[selected].fit(&matrix.x, &y, n_classes, cfg.seed)?;

    let summary = CvSummary {
        folds: folds.len(),
        fitting_rows: matrix.rows(),
        features: features.len(),
        candidates: scores,
        selected,
        final_model: model.describe(),
    };

    Ok(TrainedModel {
        model,
        label: label.to_string(),
        levels: encoding.levels,
        preprocessor,
        summary,
    })
}

/// Matrices of one fold, preprocessed with statistics of its training rows
struct FoldData {
    x_train: Mat<f64>,
    y_train: Vec<usize>,
    x_test: Mat<f64>,
    y_test: Vec<usize>,
}

impl FoldData {
    fn build(
        fit: &DataFrame,
        features: &[String],
        y: &[usize],
        fold: &Fold,
        standardize: bool,
    ) -> Result<Self> {
        let train = take_rows(fit, &fold.train)?;
        let test = take_rows(fit, &fold.test)?;
        let preprocessor = Preprocessor::fit(&train, features, standardize)?;

        Ok(Self {
            x_train: preprocessor.transform(&train, "fitting")?.x,
            y_train: fold.train.iter().map(|&i| y[i]).collect(),
            x_test: preprocessor.transform(&test, "fitting")?.x,
            y_test: fold.test.iter().map(|&i| y[i]).collect(),
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NearestCentroid, RandomForest};

    fn separable() -> DataFrame {
        let n = 60;
        let f1: Vec<f64> = (0..n).map(|i| (i % 3) as f64 * 10.0 + (i % 7) as f64 * 0.1).collect();
        let f2: Vec<f64> = (0..n).map(|i| (i % 5) as f64).collect();
        let label: Vec<&str> = (0..n).map(|i| ["A", "B", "C"][i % 3]).collect();
        df! { "f1" => f1, "f2" => f2, "classe" => label }.unwrap()
    }

    #[test]
    fn test_selects_best_candidate_and_reports_folds() {
        let df = separable();
        let features = vec!["f1".to_string(), "f2".to_string()];
        let candidates: Vec<Box<dyn Classifier>> = vec![
            Box::new(RandomForest::new(10).with_mtry(1)),
            Box::new(NearestCentroid),
        ];
        let trained = train(&df, &features, "classe", &candidates, &TrainerConfig::default()).unwrap();

        assert_eq!(trained.summary.candidates.len(), 2);
        for score in &trained.summary.candidates {
            assert_eq!(score.fold_accuracies.len(), 5);
        }
        assert!(trained.summary.selected_candidate().mean_accuracy > 0.9);
        assert_eq!(trained.levels, vec!["A", "B", "C"]);

        let predicted = trained.predict_table(&df, "fitting").unwrap();
        assert_eq!(predicted.len(), df.height());
    }

    #[test]
    fn test_fold_scaling_ignores_held_out_rows() {
        // Every fifth row is an outlier and forms the held-out fold
        let n = 50;
        let f1: Vec<Option<f64>> = (0..n)
            .map(|i| match i {
                _ if i % 5 == 0 => Some(1000.0),
                7 => None,
                _ => Some((i % 4) as f64),
            })
            .collect();
        let label: Vec<&str> = (0..n).map(|i| ["A", "B"][i % 2]).collect();
        let df = df! { "f1" => f1, "classe" => label }.unwrap();
        let y: Vec<usize> = (0..n).map(|i| i % 2).collect();
        let fold = Fold {
            index: 0,
            train: (0..n).filter(|i| i % 5 != 0).collect(),
            test: (0..n).filter(|i| i % 5 == 0).collect(),
        };

        let data = FoldData::build(&df, &["f1".to_string()], &y, &fold, true).unwrap();

        let train_mean = (0..data.x_train.nrows())
            .map(|i| data.x_train[(i, 0)])
            .sum::<f64>()
            / data.x_train.nrows() as f64;
        assert!(train_mean.abs() < 1e-9, "train mean {}", train_mean);
        // The imputed row sits exactly at the fold center
        let imputed = fold.train.iter().position(|&i| i == 7).unwrap();
        assert_eq!(data.x_train[(imputed, 0)], 0.0);
        assert!((0..data.x_test.nrows()).all(|i| data.x_test[(i, 0)] > 100.0));
        assert_eq!(data.y_test.len(), 10);
    }

    #[test]
    fn test_no_candidates_is_an_error() {
        let df = separable();
        let err = train(&df, &["f1".to_string()], "classe", &[], &TrainerConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::NoCandidates));
    }
}
