//! Run report.
//!
//! Built by the pipeline driver, printed once, then dropped. Nothing here is
//! persisted.

pub mod table;
pub mod json;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::backup::BackupStatus;
use crate::pipeline::{Outcome, RunMode};
use crate::transcode::TargetFormat;
use crate::util::{display_path, format_size};

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub destination: PathBuf,
    pub target_format: TargetFormat,
    pub backup: BackupStatus,
    pub before_size: u64,
    pub after_size: u64,
    pub width: u32,
    pub height: u32,
    pub actions: Vec<String>,
    pub warnings: Vec<String>,
}

impl FileReport {
    pub fn renamed(&self) -> bool {
        self.destination != self.path
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub optimized: usize,
    pub skipped: usize,
    pub already_optimized: usize,
    pub backups_made: usize,
    pub backups_planned: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub files: Vec<FileReport>,
    pub counters: Counters,
    /// Run-level warnings for candidates that were skipped with a reason.
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_memory_bytes: Option<usize>,
}

impl RunReport {
    pub fn new(mode: RunMode) -> Self {
        RunReport {
            mode,
            files: Vec::new(),
            counters: Counters::default(),
            warnings: Vec::new(),
            duration_ms: None,
            peak_memory_bytes: None,
        }
    }

    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Ignored => {}
            Outcome::AlreadyOptimized => {
                self.counters.already_optimized += 1;
                self.counters.skipped += 1;
            }
            Outcome::TooSmall { path, warnings } => {
                self.counters.skipped += 1;
                self.push_file_warnings(&path, warnings);
            }
            Outcome::DestinationExists {
                path,
                destination,
                warnings,
            } => {
                self.counters.skipped += 1;
                self.warnings.push(format!(
                    "skipped {} because {} already exists",
                    display_path(&path),
                    display_path(&destination)
                ));
                self.push_file_warnings(&path, warnings);
            }
            Outcome::Processed(file) => {
                self.counters.optimized += 1;
                match file.backup {
                    BackupStatus::Created => self.counters.backups_made += 1,
                    BackupStatus::Planned => self.counters.backups_planned += 1,
                    BackupStatus::Existing => {}
                }
                self.files.push(file);
            }
        }
    }

    // skipped files have no FileReport to hold their warnings
    fn push_file_warnings(&mut self, path: &Path, warnings: Vec<String>) {
        let shown = display_path(path);
        self.warnings
            .extend(warnings.into_iter().map(|w| format!("{shown}: {w}")));
    }

    /// True when at least one image was (or in a dry run, would be) optimized.
    pub fn pending(&self) -> bool {
        self.counters.optimized > 0
    }

    /// `Completed. Optimized 2 file(s), skipped 1, ...`
    pub fn summary(&self) -> String {
        let c = &self.counters;
        let mut line = format!(
            "{} Optimized {} file(s), skipped {}, already optimized {}, new backups {}",
            if self.mode.is_mutating() { "Completed." } else { "Dry run completed." },
            c.optimized,
            c.skipped,
            c.already_optimized,
            c.backups_made,
        );
        if !self.mode.is_mutating() && c.backups_planned > 0 {
            line.push_str(&format!(" (would back up {} file(s))", c.backups_planned));
        }
        line.push('.');
        line
    }
}

/// Prints the report to stdout in the requested format.
pub fn print(report: &RunReport, json_output: bool, verbose: bool) {
    if json_output {
        println!("{}", json::render(report));
        return;
    }

    print!("{}", table::render(report));
    println!("\n{}", report.summary());

    if verbose {
        if let Some(duration_ms) = report.duration_ms {
            println!("run completed in {:.2}s", duration_ms as f64 / 1000.0);
        }
        if let Some(peak) = report.peak_memory_bytes {
            println!("peak memory: {}", format_size(peak as u64));
        }
    }
}
