//! Pipeline driver.
//!
//! Every candidate goes through the same state machine:
//!
//! ```text
//! Discovered -> AlreadyOptimized | TooSmall | DestinationExists      (skipped)
//! Discovered -> BackupEnsured -> Transcoded -> Renamed | InPlace -> Sentineled
//! ```
//!
//! Dry run and check mode walk the same path with `mutating == false`: every
//! write is reported as "would ..." instead of performed. Fatal errors stop the
//! whole run.

mod destinations;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use crate::backup::{BackupStatus, BackupStore};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::paths::PathResolver;
use crate::report::{FileReport, RunReport};
use crate::scan::{self, Candidate};
use crate::sentinel::{SentinelLedger, SentinelRecord};
use crate::transcode::{self, QualityParams, TargetFormat};
use crate::util::{self, display_path, format_size};

pub use destinations::DestinationClaims;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    Apply,
    DryRun,
    /// Dry run whose exit status reports pending work.
    Check,
}

impl RunMode {
    pub fn is_mutating(self) -> bool {
        matches!(self, RunMode::Apply)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Sequential,
    Parallel { jobs: usize },
}

impl Strategy {
    pub fn from_jobs(jobs: usize) -> Self {
        if jobs > 1 {
            Strategy::Parallel { jobs }
        } else {
            Strategy::Sequential
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub mode: RunMode,
    /// Skip files already under the size limit.
    pub only_large: bool,
    /// Reprocess from backup even when a sentinel says the image is done.
    pub force: bool,
    pub strategy: Strategy,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            mode: RunMode::Apply,
            only_large: false,
            force: false,
            strategy: Strategy::Sequential,
        }
    }
}

/// Terminal state of one candidate.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Not a recognized image extension.
    Ignored,
    AlreadyOptimized,
    /// Skipped by `only_large`. `warnings` keeps anything noticed before.
    TooSmall { path: PathBuf, warnings: Vec<String> },
    DestinationExists {
        path: PathBuf,
        destination: PathBuf,
        warnings: Vec<String>,
    },
    Processed(FileReport),
}

pub struct Driver {
    config: Config,
    options: RunOptions,
    resolver: PathResolver,
    quality: QualityParams,
    destinations: DestinationClaims,
    peak_memory: AtomicUsize,
}

impl Driver {
    /// Fails with `MissingRoot` before anything is touched when the public
    /// directory does not exist.
    pub fn new(mut config: Config, options: RunOptions) -> Result<Self> {
        // explicit files are made absolute by the scanner, so the roots must be too
        config.public_dir = util::absolutize(&config.public_dir);
        config.raw_dir = util::absolutize(&config.raw_dir);
        if !config.public_dir.is_dir() {
            return Err(Error::MissingRoot(config.public_dir.clone()));
        }
        config.validate()?;

        Ok(Driver {
            resolver: PathResolver::new(&config),
            quality: QualityParams::from(&config),
            config,
            options,
            destinations: DestinationClaims::new(),
            peak_memory: AtomicUsize::new(0),
        })
    }

    /// Explicit files if given, otherwise every image under the public root.
    pub fn discover(&self, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
        scan::collect(&self.config.public_dir, files)
    }

    pub fn run(&self, candidates: Vec<PathBuf>) -> Result<RunReport> {
        let start = Instant::now();

        // a path must never be handed to two workers
        let mut seen = HashSet::new();
        let candidates: Vec<PathBuf> = candidates
            .into_iter()
            .filter(|c| seen.insert(c.clone()))
            .collect();

        if !self.options.mode.is_mutating() {
            log::info!("dry run enabled, no files will be modified");
        }

        let outcomes = match self.options.strategy {
            Strategy::Sequential => candidates
                .iter()
                .map(|c| self.process(c))
                .collect::<Result<Vec<_>>>()?,
            Strategy::Parallel { jobs } => {
                let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
                pool.install(|| {
                    candidates
                        .par_iter()
                        .map(|c| self.process(c))
                        .collect::<Result<Vec<_>>>()
                })?
            }
        };

        let mut report = RunReport::new(self.options.mode);
        for outcome in outcomes {
            report.record(outcome);
        }
        report.duration_ms = Some(start.elapsed().as_millis());
        report.peak_memory_bytes = match self.peak_memory.load(Ordering::Relaxed) {
            0 => None,
            peak => Some(peak),
        };
        Ok(report)
    }

    /// Runs one candidate through the state machine.
    pub fn process(&self, path: &Path) -> Result<Outcome> {
        let Some(candidate) = Candidate::inspect(path)? else {
            return Ok(Outcome::Ignored);
        };
        let mutating = self.options.mode.is_mutating();
        let shown = display_path(&candidate.path);
        let ledger = SentinelLedger::new(&self.resolver);
        let mut warnings = Vec::new();

        let sentinel = match ledger.read(&candidate.path) {
            Ok(record) => record,
            Err(Error::Sentinel { path, source }) => {
                log::warn!("ignoring unreadable sentinel {}: {source}", display_path(&path));
                None
            }
            Err(e) => return Err(e),
        };
        let found_backup = self.resolver.find_backup(&candidate.path);

        if sentinel.is_some() {
            if found_backup.is_some() && !self.options.force {
                log::info!("skipping {shown} (already optimized), use --force to reprocess");
                return Ok(Outcome::AlreadyOptimized);
            }
            if found_backup.is_none() {
                let msg = "sentinel exists but raw backup is missing, recreating backup and re-optimizing";
                log::warn!("{shown}: {msg}");
                warnings.push(msg.to_string());
            }
        }

        if self.options.only_large && candidate.size <= self.config.max_size_bytes {
            log::debug!("skipping {shown} ({} is under the limit)", format_size(candidate.size));
            return Ok(Outcome::TooSmall {
                path: candidate.path,
                warnings,
            });
        }

        let format = TargetFormat::for_extension(&candidate.extension);
        let output_ext = format.output_extension(&candidate.extension);
        let destination = if output_ext.eq_ignore_ascii_case(&candidate.extension) {
            candidate.path.clone()
        } else {
            log::info!("converting .{} to jpeg output: {shown}", candidate.extension);
            candidate.path.with_extension(output_ext)
        };
        let renamed = destination != candidate.path;

        if renamed && mutating && !self.destinations.claim(&destination) {
            log::warn!(
                "skipping {shown} because {} already exists",
                display_path(&destination)
            );
            return Ok(Outcome::DestinationExists {
                path: candidate.path,
                destination,
                warnings,
            });
        }

        let backup = BackupStore::new(&self.resolver).ensure_with(
            &candidate.path,
            found_backup,
            mutating,
        )?;
        let mut actions = Vec::new();
        match backup.status {
            BackupStatus::Created => actions.push(format!(
                "backed up original -> {}",
                display_path(&backup.path)
            )),
            BackupStatus::Planned => actions.push(format!(
                "would back up original -> {}",
                display_path(&backup.path)
            )),
            BackupStatus::Existing => {}
        }

        let output = transcode::transcode_file(
            backup.source(&candidate.path),
            format,
            self.config.target_width,
            self.quality,
        )?;
        self.sample_memory();
        let after_size = output.bytes.len() as u64;

        if mutating {
            fs::write(&destination, &output.bytes).map_err(|e| Error::io(&destination, e))?;
        }

        if renamed {
            if mutating {
                fs::remove_file(&candidate.path).map_err(|e| Error::io(&candidate.path, e))?;
                actions.push("removed original after conversion".to_string());
            } else {
                actions.push("would remove original after conversion".to_string());
            }
        }

        if after_size > self.config.max_size_bytes {
            warnings.push(format!(
                "still exceeds size limit ({} > {})",
                format_size(after_size),
                format_size(self.config.max_size_bytes)
            ));
        }

        if mutating {
            let record = SentinelRecord::new(
                display_path(&backup.path),
                display_path(&destination),
                format,
                self.config.target_width,
                after_size,
            );
            ledger.write(&candidate.path, &record)?;
            // the next scan sees the converted file, not the original name
            if renamed {
                ledger.write(&destination, &record)?;
            }
            actions.push("marked optimized".to_string());
        } else if sentinel.is_none() {
            actions.push("would mark image as optimized".to_string());
        }

        log::debug!(
            "{shown}: {} -> {}",
            format_size(candidate.size),
            format_size(after_size)
        );

        Ok(Outcome::Processed(FileReport {
            path: candidate.path,
            destination,
            target_format: format,
            backup: backup.status,
            before_size: candidate.size,
            after_size,
            width: output.width,
            height: output.height,
            actions,
            warnings,
        }))
    }

    fn sample_memory(&self) {
        if let Some(stats) = memory_stats::memory_stats() {
            self.peak_memory.fetch_max(stats.physical_mem, Ordering::Relaxed);
        }
    }
}
