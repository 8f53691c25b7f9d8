//! Dataset loader for the training and scoring CSV files
//!
//! Files are read from a local cache when present and downloaded otherwise.
//! Every missing-value marker in the source data is mapped to null at parse
//! time, identically for both tables.

use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use polars::prelude::*;

use super::error::{PipelineError, Result};
use crate::utils::{finish_with_success, finish_with_warning, table_spinner};

/// Remote location of the labeled training data
pub const TRAINING_URL: &str = "https://d396qusza40orc.cloudfront.net/predmachlearn/pml-training.csv";
/// Remote location of the unlabeled scoring data
pub const SCORING_URL: &str = "https://d396qusza40orc.cloudfront.net/predmachlearn/pml-testing.csv";

/// Cache filename for the training data
pub const TRAINING_FILE: &str = "pml-training.csv";
/// Cache filename for the scoring data
pub const SCORING_FILE: &str = "pml-testing.csv";

/// Field values treated as missing: empty, `NA` and spreadsheet division errors
pub const MISSING_MARKERS: [&str; 3] = ["", "NA", "#DIV/0!"];

/// Name given to the unnamed leading row-index column
pub const ROW_INDEX_COLUMN: &str = "X";

/// Where a dataset lives: a cache path and an optional remote fallback
#[derive(Debug, Clone)]
pub struct DataSource {
    pub name: String,
    pub url: Option<String>,
    pub cache_path: PathBuf,
}

impl DataSource {
    pub fn new(name: &str, url: Option<&str>, cache_path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            url: url.map(str::to_string),
            cache_path,
        }
    }

    /// Default training source cached under `cache_dir`
    pub fn training(cache_dir: &Path) -> Self {
        Self::new("training", Some(TRAINING_URL), cache_dir.join(TRAINING_FILE))
    }

    /// Default scoring source cached under `cache_dir`
    pub fn scoring(cache_dir: &Path) -> Self {
        Self::new("scoring", Some(SCORING_URL), cache_dir.join(SCORING_FILE))
    }
}

/// Loader tuning: schema inference depth and download retry policy
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub infer_schema_length: usize,
    pub retries: u32,
    pub initial_backoff: Duration,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            infer_schema_length: 10000,
            retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// Fetches the raw bytes behind a URL
pub trait Fetcher {
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, String>;
}

/// Blocking HTTP fetcher
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("pml-rf/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| PipelineError::SourceUnavailable {
                source_name: "http client".to_string(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, String> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status));
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| format!("failed to read body: {}", e))
    }
}

/// Where the bytes of a loaded table came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOrigin {
    Cache,
    Remote { cached: bool },
}

/// Raw CSV content, either on disk or in memory
#[derive(Debug)]
pub enum RawTable {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// Resolve a source to readable CSV content, downloading it if needed.
///
/// A downloaded copy is written to the cache path on a best-effort basis;
/// a failed write still returns the bytes in memory.
pub fn ensure_cached(
    source: &DataSource,
    fetcher: Option<&dyn Fetcher>,
    opts: &LoaderOptions,
) -> Result<(RawTable, TableOrigin)> {
    if source.cache_path.is_file() {
        return Ok((RawTable::File(source.cache_path.clone()), TableOrigin::Cache));
    }

    let unavailable = |reason: String| PipelineError::SourceUnavailable {
        source_name: source.name.clone(),
        reason,
    };

    let url = source.url.as_deref().ok_or_else(|| {
        unavailable(format!(
            "no cached copy at {} and no remote location configured",
            source.cache_path.display()
        ))
    })?;
    let fetcher = fetcher.ok_or_else(|| {
        unavailable(format!(
            "no cached copy at {} and downloads are disabled",
            source.cache_path.display()
        ))
    })?;

    let bytes = fetch_with_retry(fetcher, url, opts).map_err(unavailable)?;
    let cached = write_cache(&source.cache_path, &bytes).is_ok();

    Ok((RawTable::Bytes(bytes), TableOrigin::Remote { cached }))
}

fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    url: &str,
    opts: &LoaderOptions,
) -> std::result::Result<Vec<u8>, String> {
    let attempts = opts.retries.max(1);
    let mut backoff = opts.initial_backoff;
    let mut last_err = String::new();

    for attempt in 1..=attempts {
        match fetcher.fetch(url) {
            Ok(bytes) => return Ok(bytes),
            Err(e) => {
                last_err = format!("{} (attempt {}/{})", e, attempt, attempts);
                if attempt < attempts {
                    thread::sleep(backoff);
                    backoff *= 2;
                }
            }
        }
    }

    Err(last_err)
}

fn write_cache(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let partial = path.with_extension("part");
    std::fs::write(&partial, bytes)?;
    std::fs::rename(&partial, path)
}

/// Parse CSV content into a DataFrame with the shared missing-value markers.
pub fn read_table(raw: &RawTable, infer_schema_length: usize) -> Result<DataFrame> {
    let mut df = match raw {
        RawTable::File(path) => {
            let file = File::open(path)?;
            csv_options(infer_schema_length)
                .into_reader_with_file_handle(file)
                .finish()?
        }
        RawTable::Bytes(bytes) => csv_options(infer_schema_length)
            .into_reader_with_file_handle(Cursor::new(bytes.clone()))
            .finish()?,
    };

    normalize_header(&mut df)?;
    Ok(df)
}

fn csv_options(infer_schema_length: usize) -> CsvReadOptions {
    let infer = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(infer)
        .map_parse_options(|opts| {
            let markers: Vec<PlSmallStr> = MISSING_MARKERS.iter().map(|m| (*m).into()).collect();
            opts.with_separator(b',')
                .with_missing_is_null(true)
                .with_null_values(Some(NullValues::AllColumns(markers)))
        })
}

/// Give the unnamed leading row-index column a usable name.
fn normalize_header(df: &mut DataFrame) -> Result<()> {
    let first = match df.get_column_names().first() {
        Some(name) => name.to_string(),
        None => return Ok(()),
    };
    let auto_named = first.is_empty() || first == "column_1";
    if auto_named && first != ROW_INDEX_COLUMN {
        df.rename(&first, ROW_INDEX_COLUMN.into())?;
    }
    Ok(())
}

/// Load one table, printing a spinner while it is fetched and parsed.
pub fn load_table_with_progress(
    source: &DataSource,
    fetcher: Option<&dyn Fetcher>,
    opts: &LoaderOptions,
) -> Result<(DataFrame, TableOrigin)> {
    let spinner = table_spinner(&source.name);

    let (raw, origin) = match ensure_cached(source, fetcher, opts) {
        Ok(resolved) => resolved,
        Err(e) => {
            finish_with_warning(&spinner, &format!("{} data unavailable", source.name));
            return Err(e);
        }
    };
    let df = read_table(&raw, opts.infer_schema_length)?;

    let from = match origin {
        TableOrigin::Cache => format!("cache {}", source.cache_path.display()),
        TableOrigin::Remote { cached: true } => "remote (cached for reuse)".to_string(),
        TableOrigin::Remote { cached: false } => "remote (not cached)".to_string(),
    };
    finish_with_success(
        &spinner,
        &format!(
            "Loaded {} data from {}: {} rows x {} columns",
            source.name,
            from,
            df.height(),
            df.width()
        ),
    );

    Ok((df, origin))
}

/// The two tables the pipeline starts from
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub training: DataFrame,
    pub scoring: DataFrame,
}

/// Load the training and scoring tables with identical parse options.
pub fn load_datasets(
    training: &DataSource,
    scoring: &DataSource,
    fetcher: Option<&dyn Fetcher>,
    opts: &LoaderOptions,
) -> Result<LoadedData> {
    let (training, _) = load_table_with_progress(training, fetcher, opts)?;
    let (scoring, _) = load_table_with_progress(scoring, fetcher, opts)?;
    Ok(LoadedData { training, scoring })
}
