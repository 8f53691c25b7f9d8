//! Progress indicators for the two slow steps: loading tables and fold fits

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TICK: Duration = Duration::from_millis(100);
const SPINNER_TEMPLATE: &str = "    {spinner:.cyan} {msg}";
const FITS_TEMPLATE: &str = "{msg} [{bar:40.cyan/blue}] {pos}/{len} fits ({eta})";

/// Spinner shown while one table is fetched and parsed
pub fn table_spinner(table: &str) -> ProgressBar {
    let style = ProgressStyle::default_spinner()
        .template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let pb = ProgressBar::new_spinner().with_style(style);
    pb.set_message(format!("Loading {} data...", table));
    pb.enable_steady_tick(TICK);
    pb
}

/// Bar counting one tick per (candidate, fold) fit
pub fn cv_progress(candidates: usize, folds: usize) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template(FITS_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░");
    let pb = ProgressBar::new((candidates * folds) as u64).with_style(style);
    pb.set_message(format!("   Cross-validating {} candidate(s)", candidates));
    pb.enable_steady_tick(TICK);
    pb
}

/// Table loaded
pub fn finish_with_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✅ {}", message));
}

/// Table could not be obtained
pub fn finish_with_warning(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("⚠️  {}", message));
}
