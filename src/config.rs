//! Run configuration.
//!
//! Values are layered, later layers win:
//! - built-in defaults
//! - optional toml file (`--config`, or `./imgslim.toml` when present)
//! - environment variables (`PUBLIC_IMAGES_DIR`, `MAX_IMAGE_SIZE_MB`, ...)
//! - command line flags
//!
//! The resulting `Config` is handed to the pipeline explicitly, nothing reads
//! the environment after startup.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::util;

pub const DEFAULT_CONFIG_FILE: &str = "imgslim.toml";

/// Directory under the backup root that holds sentinel records.
pub const META_DIR_NAME: &str = ".optimized";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub public_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub max_size_bytes: u64,
    pub target_width: u32,
    pub jpeg_quality: u8,
    pub png_compression: u8,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            public_dir: PathBuf::from("public/images"),
            raw_dir: PathBuf::from("assets/raw-images"),
            max_size_bytes: 5 * 1024 * 1024,
            target_width: 1600,
            jpeg_quality: 85,
            png_compression: 9,
        }
    }
}

/// On-disk shape of `imgslim.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub public_dir: Option<PathBuf>,
    pub raw_dir: Option<PathBuf>,
    pub max_size_mb: Option<f64>,
    pub target_width: Option<u32>,
    pub jpeg_quality: Option<u8>,
    pub png_compression: Option<u8>,
}

impl Config {
    /// Builds the full configuration for a CLI invocation.
    pub fn from_args(args: &Cli) -> Result<Self> {
        let mut config = Config::default();

        let file = match &args.config {
            Some(path) => Some(ConfigFile::load(path)?),
            None => {
                let implicit = Path::new(DEFAULT_CONFIG_FILE);
                if implicit.is_file() {
                    Some(ConfigFile::load(implicit)?)
                } else {
                    None
                }
            }
        };
        if let Some(file) = file {
            config.apply_file(file)?;
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_args(args)?;
        config.validate()?;

        config.public_dir = util::absolutize(&config.public_dir);
        config.raw_dir = util::absolutize(&config.raw_dir);
        Ok(config)
    }

    pub fn apply_file(&mut self, file: ConfigFile) -> Result<()> {
        if let Some(dir) = file.public_dir {
            self.public_dir = dir;
        }
        if let Some(dir) = file.raw_dir {
            self.raw_dir = dir;
        }
        if let Some(mb) = file.max_size_mb {
            self.max_size_bytes = mb_to_bytes(mb, "max_size_mb")?;
        }
        if let Some(width) = file.target_width {
            self.target_width = width;
        }
        if let Some(quality) = file.jpeg_quality {
            self.jpeg_quality = quality;
        }
        if let Some(level) = file.png_compression {
            self.png_compression = level;
        }
        Ok(())
    }

    /// Applies environment overrides. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("PUBLIC_IMAGES_DIR") {
            self.public_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("RAW_IMAGES_DIR") {
            self.raw_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("MAX_IMAGE_SIZE_MB") {
            let mb = parse_env::<f64>("MAX_IMAGE_SIZE_MB", &raw)?;
            self.max_size_bytes = mb_to_bytes(mb, "MAX_IMAGE_SIZE_MB")?;
        }
        if let Some(raw) = lookup("IMAGE_TARGET_WIDTH") {
            self.target_width = parse_env("IMAGE_TARGET_WIDTH", &raw)?;
        }
        if let Some(raw) = lookup("IMAGE_JPEG_QUALITY") {
            self.jpeg_quality = parse_env("IMAGE_JPEG_QUALITY", &raw)?;
        }
        if let Some(raw) = lookup("IMAGE_PNG_COMPRESSION") {
            self.png_compression = parse_env("IMAGE_PNG_COMPRESSION", &raw)?;
        }
        Ok(())
    }

    pub fn apply_args(&mut self, args: &Cli) -> Result<()> {
        if let Some(dir) = &args.public_dir {
            self.public_dir = dir.clone();
        }
        if let Some(dir) = &args.raw_dir {
            self.raw_dir = dir.clone();
        }
        if let Some(mb) = args.max_size_mb {
            self.max_size_bytes = mb_to_bytes(mb, "--max-size-mb")?;
        }
        if let Some(width) = args.target_width {
            self.target_width = width;
        }
        if let Some(quality) = args.jpeg_quality {
            self.jpeg_quality = quality;
        }
        if let Some(level) = args.png_compression {
            self.png_compression = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_width == 0 {
            return Err(Error::Config("target width must be greater than 0".into()));
        }
        if self.jpeg_quality > 100 {
            return Err(Error::Config(format!(
                "jpeg quality must be between 0 and 100, got {}",
                self.jpeg_quality
            )));
        }
        if self.png_compression > 9 {
            return Err(Error::Config(format!(
                "png compression must be between 0 and 9, got {}",
                self.png_compression
            )));
        }
        Ok(())
    }

    /// Where sentinel records live: `<raw_dir>/.optimized`.
    pub fn meta_dir(&self) -> PathBuf {
        self.raw_dir.join(META_DIR_NAME)
    }
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key}: cannot parse '{raw}'")))
}

fn mb_to_bytes(mb: f64, source: &str) -> Result<u64> {
    if !mb.is_finite() || mb < 0.0 {
        return Err(Error::Config(format!(
            "{source}: size must be a non-negative number of megabytes, got {mb}"
        )));
    }
    Ok((mb * BYTES_PER_MB) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.max_size_bytes, 5 * 1024 * 1024);
        assert_eq!(config.target_width, 1600);
        assert_eq!(config.jpeg_quality, 85);
        assert_eq!(config.png_compression, 9);
        assert_eq!(config.meta_dir(), PathBuf::from("assets/raw-images/.optimized"));
    }

    #[test]
    fn env_overrides_defaults() {
        let vars = env(&[
            ("PUBLIC_IMAGES_DIR", "site/img"),
            ("MAX_IMAGE_SIZE_MB", "0.5"),
            ("IMAGE_TARGET_WIDTH", "800"),
            ("IMAGE_JPEG_QUALITY", "70"),
        ]);
        let mut config = Config::default();
        config.apply_env(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.public_dir, PathBuf::from("site/img"));
        assert_eq!(config.max_size_bytes, 512 * 1024);
        assert_eq!(config.target_width, 800);
        assert_eq!(config.jpeg_quality, 70);
        assert_eq!(config.png_compression, 9);
    }

    #[test]
    fn unparseable_env_is_a_config_error() {
        let vars = env(&[("IMAGE_TARGET_WIDTH", "wide")]);
        let mut config = Config::default();
        let err = config.apply_env(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn negative_size_rejected() {
        let vars = env(&[("MAX_IMAGE_SIZE_MB", "-1")]);
        let mut config = Config::default();
        assert!(config.apply_env(|k| vars.get(k).cloned()).is_err());
    }

    #[test]
    fn file_values_apply() {
        let file: ConfigFile = toml::from_str(
            r#"
            raw_dir = "backups"
            max_size_mb = 2
            png_compression = 6
            "#,
        )
        .unwrap();
        let mut config = Config::default();
        config.apply_file(file).unwrap();

        assert_eq!(config.raw_dir, PathBuf::from("backups"));
        assert_eq!(config.max_size_bytes, 2 * 1024 * 1024);
        assert_eq!(config.png_compression, 6);
    }

    #[test]
    fn unknown_file_keys_rejected() {
        assert!(toml::from_str::<ConfigFile>("quality = 3").is_err());
    }

    #[test]
    fn validate_checks_ranges() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.png_compression = 10;
        assert!(config.validate().is_err());

        config.png_compression = 9;
        config.jpeg_quality = 101;
        assert!(config.validate().is_err());

        config.jpeg_quality = 0;
        config.target_width = 0;
        assert!(config.validate().is_err());
    }
}
