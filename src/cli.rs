use clap::Parser;
use std::path::PathBuf;

use crate::pipeline::{RunMode, RunOptions, Strategy};

#[derive(Parser, Debug, Default)]
#[command(name = "imgslim")]
#[command(about = "Resize and re-encode site images, keeping a pristine backup of every original")]
#[command(version)]
pub struct Cli {
    /// Images to process (defaults to every image under the public directory)
    pub files: Vec<PathBuf>,

    /// Only process files larger than the size limit
    #[arg(long, visible_alias = "large-only", default_value_t = false)]
    pub only_large: bool,

    /// Reprocess images even if they were already optimized
    #[arg(long, visible_alias = "use-raw", default_value_t = false)]
    pub force: bool,

    /// Show what would happen without modifying any file
    #[arg(long, short = 'n', default_value_t = false)]
    pub dry_run: bool,

    /// Dry run that exits with status 1 when any image still needs work
    #[arg(long, default_value_t = false)]
    pub check: bool,

    /// Accepted for compatibility, processing everything is the default
    #[arg(long, hide = true, default_value_t = false)]
    pub all: bool,

    /// Output the run report as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Number of images to process in parallel
    #[arg(long, short = 'j', default_value_t = 1)]
    pub jobs: usize,

    /// Path to a toml config file (defaults to ./imgslim.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory of publicly served images
    #[arg(long)]
    pub public_dir: Option<PathBuf>,

    /// Directory holding untouched originals
    #[arg(long)]
    pub raw_dir: Option<PathBuf>,

    /// Size limit in megabytes
    #[arg(long)]
    pub max_size_mb: Option<f64>,

    /// Maximum output width in pixels
    #[arg(long)]
    pub target_width: Option<u32>,

    /// JPEG quality (0-100)
    #[arg(long)]
    pub jpeg_quality: Option<u8>,

    /// PNG compression effort (0-9)
    #[arg(long)]
    pub png_compression: Option<u8>,

    /// Show detailed output including per-file progress
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,

    /// Only print errors
    #[arg(long, short = 'q', default_value_t = false, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// check implies dry run, so it wins when both are given
    pub fn mode(&self) -> RunMode {
        if self.check {
            RunMode::Check
        } else if self.dry_run {
            RunMode::DryRun
        } else {
            RunMode::Apply
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            mode: self.mode(),
            only_large: self.only_large,
            force: self.force,
            strategy: Strategy::from_jobs(self.jobs),
        }
    }
}
