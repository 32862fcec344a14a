//! Candidate discovery.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::transcode::is_image_extension;
use crate::util;

/// An image file eligible for optimization, as seen at processing time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub size: u64,
    /// Lowercase, without the dot.
    pub extension: String,
}

impl Candidate {
    /// Stats `path`. Returns `None` for files without a recognized image
    /// extension, errors if the file can't be read.
    pub fn inspect(path: &Path) -> Result<Option<Candidate>> {
        let Some(extension) = image_extension(path) else {
            return Ok(None);
        };
        let metadata = fs::metadata(path).map_err(|e| Error::io(path, e))?;
        Ok(Some(Candidate {
            path: path.to_path_buf(),
            size: metadata.len(),
            extension,
        }))
    }
}

/// Explicit files win over a full scan of `public_dir`. Paths come back
/// absolute and de-duplicated, in a stable order.
pub fn collect(public_dir: &Path, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if files.is_empty() {
        return walk(public_dir);
    }

    let mut seen = HashSet::new();
    Ok(files
        .iter()
        .map(|f| util::absolutize(f))
        .filter(|f| seen.insert(f.clone()))
        .collect())
}

fn walk(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            Error::io(path, e.into())
        })?;

        if entry.file_type().is_file() && image_extension(entry.path()).is_some() {
            found.push(entry.into_path());
        }
    }

    Ok(found)
}

fn image_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| is_image_extension(e))
        .map(|e| e.to_ascii_lowercase())
}
