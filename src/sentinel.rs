//! Per-image sentinel records.
//!
//! One small json file per optimized image under `<raw>/.optimized`. They are
//! a cache, not a source of truth: the pipeline only trusts a sentinel when
//! the image's backup can also be found.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::backup::ensure_dir;
use crate::error::{Error, Result};
use crate::paths::PathResolver;
use crate::transcode::TargetFormat;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentinelRecord {
    /// ISO-8601, UTC.
    pub optimized_at: String,
    pub raw_path: String,
    pub output_path: String,
    pub target_format: TargetFormat,
    pub target_width: u32,
    pub size_bytes: u64,
}

impl SentinelRecord {
    /// Stamps the record with the current time.
    pub fn new(
        raw_path: String,
        output_path: String,
        target_format: TargetFormat,
        target_width: u32,
        size_bytes: u64,
    ) -> Self {
        SentinelRecord {
            optimized_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            raw_path,
            output_path,
            target_format,
            target_width,
            size_bytes,
        }
    }
}

pub struct SentinelLedger<'a> {
    resolver: &'a PathResolver,
}

impl<'a> SentinelLedger<'a> {
    pub fn new(resolver: &'a PathResolver) -> Self {
        SentinelLedger { resolver }
    }

    pub fn exists(&self, candidate: &Path) -> bool {
        self.resolver.sentinel_path(candidate).is_file()
    }

    /// `Ok(None)` when no record exists, `Err(Error::Sentinel)` when one
    /// exists but does not parse.
    pub fn read(&self, candidate: &Path) -> Result<Option<SentinelRecord>> {
        let path = self.resolver.sentinel_path(candidate);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(&path, e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| Error::Sentinel { path, source })
    }

    /// Creates or replaces the record for `candidate`.
    pub fn write(&self, candidate: &Path, record: &SentinelRecord) -> Result<()> {
        ensure_dir(self.resolver.meta_dir())?;
        let path = self.resolver.sentinel_path(candidate);
        let json = serde_json::to_string_pretty(record).map_err(|source| Error::Sentinel {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|e| Error::io(&path, e))
    }
}
