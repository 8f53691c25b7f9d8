//! Command-line argument definitions using clap

use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use crate::model::{Classifier, NearestCentroid, RandomForest};
use crate::pipeline::{
    DataSource, LoaderOptions, MinPresent, PrunerConfig, TrainerConfig, DEFAULT_FREQ_CUT,
    DEFAULT_IDENTIFIER_COLUMNS, DEFAULT_METADATA_COLUMNS, DEFAULT_UNIQUE_CUT, SCORING_FILE,
    TRAINING_FILE,
};

/// Classifier family to tune and fit
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassifierKind {
    /// Random forest tuned over the number of features tried per split
    Rf,
    /// Nearest class centroid (no tuning parameters)
    Centroid,
}

impl ClassifierKind {
    pub fn label(&self) -> &'static str {
        match self {
            ClassifierKind::Rf => "random forest",
            ClassifierKind::Centroid => "nearest centroid",
        }
    }
}

/// pml-rf - Predict weight-lifting exercise quality from accelerometer data
#[derive(Parser, Debug)]
#[command(name = "pml-rf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Training table: a local CSV path or an http(s) URL.
    /// Defaults to the public pml-training.csv download.
    #[arg(long)]
    pub training: Option<String>,

    /// Scoring table: a local CSV path or an http(s) URL.
    /// Defaults to the public pml-testing.csv download.
    #[arg(long)]
    pub scoring: Option<String>,

    /// Directory where downloaded tables are cached and looked up
    #[arg(long, default_value = "data")]
    pub cache_dir: PathBuf,

    /// Never download; fail if a table is not already on disk
    #[arg(long, default_value = "false")]
    pub offline: bool,

    /// Label column to predict
    #[arg(short, long, default_value = "classe")]
    pub label: String,

    /// Fraction of each class assigned to the fitting partition (exclusive 0 to 1)
    #[arg(long, default_value = "0.6", value_parser = validate_fraction)]
    pub fraction: f64,

    /// Seed for the split, the folds and the model
    #[arg(long, default_value = "32343")]
    pub seed: u64,

    /// Number of cross-validation folds (at least 2)
    #[arg(long, default_value = "5", value_parser = validate_folds)]
    pub folds: usize,

    /// Trees per random forest
    #[arg(long, default_value = "100")]
    pub trees: usize,

    /// Classifier to train
    #[arg(long, value_enum, default_value = "rf")]
    pub classifier: ClassifierKind,

    /// Near-zero variance: ratio of most to second most frequent value above which
    /// a low-cardinality column is dropped
    #[arg(long, default_value_t = DEFAULT_FREQ_CUT)]
    pub freq_cut: f64,

    /// Near-zero variance: percentage of distinct values (0-100) below which
    /// a high frequency ratio drops the column
    #[arg(long, default_value_t = DEFAULT_UNIQUE_CUT, value_parser = validate_percentage)]
    pub unique_cut: f64,

    /// Minimum present values per column, as a row count (e.g. 11775)
    /// or a fraction of the fitting rows (e.g. 0.9999)
    #[arg(long, default_value = "0.9999", value_parser = parse_min_present)]
    pub min_present: MinPresent,

    /// Fail when an identifier or metadata column is missing instead of skipping it
    #[arg(long, default_value = "false")]
    pub strict_columns: bool,

    /// Skip centering and scaling of the predictors
    #[arg(long, default_value = "false")]
    pub no_standardize: bool,

    /// Also write the full report as JSON to this path
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Number of rows to use for schema inference.
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

impl Cli {
    /// Where the training table comes from
    pub fn training_source(&self) -> DataSource {
        match &self.training {
            Some(location) => resolve_source("training", location, &self.cache_dir, TRAINING_FILE),
            None => DataSource::training(&self.cache_dir),
        }
    }

    /// Where the scoring table comes from
    pub fn scoring_source(&self) -> DataSource {
        match &self.scoring {
            Some(location) => resolve_source("scoring", location, &self.cache_dir, SCORING_FILE),
            None => DataSource::scoring(&self.cache_dir),
        }
    }

    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            infer_schema_length: self.infer_schema_length,
            ..LoaderOptions::default()
        }
    }

    pub fn pruner_config(&self) -> PrunerConfig {
        PrunerConfig {
            freq_cut: self.freq_cut,
            unique_cut: self.unique_cut,
            identifier_columns: DEFAULT_IDENTIFIER_COLUMNS.iter().map(|s| s.to_string()).collect(),
            metadata_columns: DEFAULT_METADATA_COLUMNS.iter().map(|s| s.to_string()).collect(),
            min_present: self.min_present,
            strict_columns: self.strict_columns,
        }
    }

    pub fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig {
            folds: self.folds,
            seed: self.seed,
            standardize: !self.no_standardize,
        }
    }

    /// Candidate grid for `n_features` predictors.
    ///
    /// The random forest is tried with 2, (2 + p) / 2 and p features per
    /// split; duplicates collapse when p is small.
    pub fn candidates(&self, n_features: usize) -> Vec<Box<dyn Classifier>> {
        match self.classifier {
            ClassifierKind::Rf => mtry_grid(n_features)
                .into_iter()
                .map(|mtry| {
                    Box::new(RandomForest::new(self.trees).with_mtry(mtry)) as Box<dyn Classifier>
                })
                .collect(),
            ClassifierKind::Centroid => vec![Box::new(NearestCentroid)],
        }
    }
}

/// Distinct values of {2, (2 + p) / 2, p}, clamped to `1..=p`
pub fn mtry_grid(n_features: usize) -> Vec<usize> {
    let p = n_features.max(1);
    let mut grid: Vec<usize> = [2, (2 + p) / 2, p].iter().map(|&m| m.clamp(1, p)).collect();
    grid.dedup();
    grid
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// A URL is downloaded into the cache directory; anything else is a local file.
fn resolve_source(name: &str, location: &str, cache_dir: &Path, fallback_file: &str) -> DataSource {
    if is_url(location) {
        let file = location
            .rsplit('/')
            .next()
            .filter(|f| !f.is_empty())
            .unwrap_or(fallback_file);
        DataSource::new(name, Some(location), cache_dir.join(file))
    } else {
        DataSource::new(name, None, PathBuf::from(location))
    }
}

/// Validator for fraction parameter
fn validate_fraction(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!(
            "fraction must be strictly between 0.0 and 1.0, got {}",
            value
        ))
    }
}

/// Validator for folds parameter
fn validate_folds(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid fold count", s))?;

    if value < 2 {
        Err(format!("folds must be at least 2, got {}", value))
    } else {
        Ok(value)
    }
}

/// Validator for unique_cut parameter
fn validate_percentage(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(0.0..=100.0).contains(&value) {
        Err(format!("unique_cut must be between 0.0 and 100.0, got {}", value))
    } else {
        Ok(value)
    }
}

/// Parse a whole number as a row count and anything else as a fraction in (0, 1]
fn parse_min_present(s: &str) -> Result<MinPresent, String> {
    if let Ok(count) = s.parse::<usize>() {
        return Ok(MinPresent::Count(count));
    }
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is neither a row count nor a fraction", s))?;
    if value > 0.0 && value <= 1.0 {
        Ok(MinPresent::Fraction(value))
    } else {
        Err(format!("min_present fraction must be in (0.0, 1.0], got {}", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reproduce_reference_run() {
        let cli = Cli::parse_from(["pml-rf"]);
        assert_eq!(cli.label, "classe");
        assert_eq!(cli.fraction, 0.6);
        assert_eq!(cli.seed, 32343);
        assert_eq!(cli.folds, 5);
        assert_eq!(cli.classifier, ClassifierKind::Rf);
        assert_eq!(cli.min_present, MinPresent::Fraction(0.9999));
        assert!(cli.trainer_config().standardize);
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        assert!(Cli::try_parse_from(["pml-rf", "--fraction", "1.0"]).is_err());
        assert!(Cli::try_parse_from(["pml-rf", "--fraction", "0"]).is_err());
        assert!(Cli::try_parse_from(["pml-rf", "--fraction", "abc"]).is_err());
    }

    #[test]
    fn test_folds_must_be_at_least_two() {
        assert!(Cli::try_parse_from(["pml-rf", "--folds", "1"]).is_err());
        assert!(Cli::try_parse_from(["pml-rf", "--folds", "2"]).is_ok());
    }

    #[test]
    fn test_min_present_count_or_fraction() {
        assert_eq!(parse_min_present("11775"), Ok(MinPresent::Count(11775)));
        assert_eq!(parse_min_present("0.5"), Ok(MinPresent::Fraction(0.5)));
        assert!(parse_min_present("1.5").is_err());
        assert!(parse_min_present("lots").is_err());
    }

    #[test]
    fn test_mtry_grid() {
        assert_eq!(mtry_grid(52), vec![2, 27, 52]);
        assert_eq!(mtry_grid(2), vec![2]);
        assert_eq!(mtry_grid(1), vec![1]);
        assert_eq!(mtry_grid(3), vec![2, 3]);
    }

    #[test]
    fn test_local_and_remote_sources() {
        let cli = Cli::parse_from([
            "pml-rf",
            "--training",
            "local/train.csv",
            "--scoring",
            "https://example.org/files/score.csv",
            "--cache-dir",
            "cache",
        ]);
        let training = cli.training_source();
        assert!(training.url.is_none());
        assert_eq!(training.cache_path, PathBuf::from("local/train.csv"));

        let scoring = cli.scoring_source();
        assert_eq!(scoring.url.as_deref(), Some("https://example.org/files/score.csv"));
        assert_eq!(scoring.cache_path, PathBuf::from("cache").join("score.csv"));
    }
}
