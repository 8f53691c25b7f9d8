//! Runtime environment description for the report

use chrono::Local;
use serde::Serialize;

/// Facts about the process that produced a report
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentInfo {
    pub package: String,
    pub version: String,
    pub os: String,
    pub arch: String,
    pub family: String,
    pub threads: usize,
    pub timestamp: String,
    pub seed: u64,
}

impl EnvironmentInfo {
    pub fn collect(seed: u64) -> Self {
        Self {
            package: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            family: std::env::consts::FAMILY.to_string(),
            threads: rayon::current_num_threads(),
            timestamp: Local::now().to_rfc3339(),
            seed,
        }
    }

    /// `(field, value)` rows for display
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Package", format!("{} v{}", self.package, self.version)),
            ("Platform", format!("{}/{} ({})", self.os, self.arch, self.family)),
            ("Worker threads", self.threads.to_string()),
            ("Seed", self.seed.to_string()),
            ("Run at", self.timestamp.clone()),
        ]
    }
}
