// Changes the working directory, so it lives in its own test binary.

use std::fs;
use std::path::PathBuf;

use image::{Rgb, RgbImage};
use tempfile::TempDir;

use imgslim::config::Config;
use imgslim::pipeline::{Driver, RunOptions};

#[test]
fn relative_roots_mirror_explicit_files() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("public/events")).unwrap();
    RgbImage::from_fn(40, 20, |x, y| Rgb([x as u8, y as u8, 7]))
        .save(tmp.path().join("public/events/poster.png"))
        .unwrap();
    std::env::set_current_dir(tmp.path()).unwrap();

    let config = Config {
        public_dir: PathBuf::from("public"),
        raw_dir: PathBuf::from("raw"),
        ..Config::default()
    };
    let driver = Driver::new(config, RunOptions::default()).unwrap();
    let candidates = driver
        .discover(&[PathBuf::from("public/events/poster.png")])
        .unwrap();
    let report = driver.run(candidates).unwrap();

    assert_eq!(report.counters.optimized, 1);
    assert!(tmp.path().join("raw/events/poster.png").is_file());
    assert!(tmp.path().join("raw/.optimized/events__poster.png.json").is_file());
    assert!(!tmp.path().join("raw/poster.png").exists());

    // the walk agrees with the explicit list on keys
    let again = driver.run(driver.discover(&[]).unwrap()).unwrap();
    assert_eq!(again.counters.already_optimized, 1);
}
