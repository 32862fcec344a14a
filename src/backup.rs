//! Backup store for untouched originals.
//!
//! A backup is created at most once per image. Anything the resolver can find
//! (mirrored, flat or stem match) counts as the backup and is never
//! overwritten, so repeated runs never compound lossy re-encoding.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::paths::PathResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupStatus {
    /// A backup was already on disk.
    Existing,
    /// The original was copied during this run.
    Created,
    /// Dry run: a copy would be made at `path`.
    Planned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOutcome {
    pub path: PathBuf,
    pub status: BackupStatus,
}

impl BackupOutcome {
    /// Bytes to transcode from. A planned backup does not exist yet, so the
    /// public file stands in for it.
    pub fn source<'a>(&'a self, candidate: &'a Path) -> &'a Path {
        match self.status {
            BackupStatus::Existing | BackupStatus::Created => &self.path,
            BackupStatus::Planned => candidate,
        }
    }
}

pub struct BackupStore<'a> {
    resolver: &'a PathResolver,
}

impl<'a> BackupStore<'a> {
    pub fn new(resolver: &'a PathResolver) -> Self {
        BackupStore { resolver }
    }

    /// Guarantees a pristine copy of `candidate` exists.
    pub fn ensure_backup(&self, candidate: &Path, mutating: bool) -> Result<BackupOutcome> {
        self.ensure_with(candidate, self.resolver.find_backup(candidate), mutating)
    }

    /// Same as `ensure_backup`, reusing an earlier `find_backup` result for
    /// `candidate` so the raw tree is walked only once.
    pub fn ensure_with(
        &self,
        candidate: &Path,
        found: Option<PathBuf>,
        mutating: bool,
    ) -> Result<BackupOutcome> {
        if let Some(path) = found {
            return Ok(BackupOutcome {
                path,
                status: BackupStatus::Existing,
            });
        }

        let path = self.resolver.backup_path(candidate);
        if !mutating {
            return Ok(BackupOutcome {
                path,
                status: BackupStatus::Planned,
            });
        }

        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        fs::copy(candidate, &path).map_err(|e| Error::io(&path, e))?;
        log::debug!("backed up {} -> {}", candidate.display(), path.display());

        Ok(BackupOutcome {
            path,
            status: BackupStatus::Created,
        })
    }
}

/// Create-if-absent, safe to call from several workers at once.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathResolver) {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            public_dir: tmp.path().join("public"),
            raw_dir: tmp.path().join("raw"),
            ..Config::default()
        };
        fs::create_dir_all(tmp.path().join("public/events")).unwrap();
        (tmp, PathResolver::new(&config))
    }

    #[test]
    fn copies_original_to_mirrored_path() {
        let (tmp, resolver) = setup();
        let candidate = tmp.path().join("public/events/poster.png");
        fs::write(&candidate, b"original").unwrap();

        let outcome = BackupStore::new(&resolver)
            .ensure_backup(&candidate, true)
            .unwrap();

        assert_eq!(outcome.status, BackupStatus::Created);
        assert_eq!(outcome.path, tmp.path().join("raw/events/poster.png"));
        assert_eq!(fs::read(&outcome.path).unwrap(), b"original");
        assert_eq!(outcome.source(&candidate), outcome.path.as_path());
    }

    #[test]
    fn existing_backup_is_never_overwritten() {
        let (tmp, resolver) = setup();
        let candidate = tmp.path().join("public/events/poster.png");
        fs::write(&candidate, b"already compressed").unwrap();
        fs::create_dir_all(tmp.path().join("raw/events")).unwrap();
        fs::write(tmp.path().join("raw/events/poster.png"), b"pristine").unwrap();

        let outcome = BackupStore::new(&resolver)
            .ensure_backup(&candidate, true)
            .unwrap();

        assert_eq!(outcome.status, BackupStatus::Existing);
        assert_eq!(fs::read(&outcome.path).unwrap(), b"pristine");
    }

    #[test]
    fn dry_run_plans_without_touching_disk() {
        let (tmp, resolver) = setup();
        let candidate = tmp.path().join("public/events/poster.png");
        fs::write(&candidate, b"original").unwrap();

        let outcome = BackupStore::new(&resolver)
            .ensure_backup(&candidate, false)
            .unwrap();

        assert_eq!(outcome.status, BackupStatus::Planned);
        assert!(!tmp.path().join("raw").exists());
        assert_eq!(outcome.source(&candidate), candidate.as_path());
    }

    #[test]
    fn copy_failure_is_an_io_error() {
        let (tmp, resolver) = setup();
        let missing = tmp.path().join("public/events/missing.png");

        let err = BackupStore::new(&resolver)
            .ensure_backup(&missing, true)
            .unwrap_err();

        assert!(matches!(err, Error::Io { .. }));
    }
}
