use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use imgslim::cli::Cli;
use imgslim::config::Config;
use imgslim::pipeline::{Driver, RunMode};
use imgslim::{logging, report};

fn run(cli: &Cli) -> imgslim::Result<ExitCode> {
    let config = Config::from_args(cli)?;
    let options = cli.run_options();
    let driver = Driver::new(config, options)?;

    let candidates = driver.discover(&cli.files)?;
    let result = driver.run(candidates)?;

    report::print(&result, cli.json, cli.verbose);

    if options.mode == RunMode::Check {
        if result.pending() {
            eprintln!(
                "[imgslim] {} image(s) would be optimized. Run `imgslim` to optimize them.",
                result.counters.optimized
            );
            return Ok(ExitCode::FAILURE);
        }
        if !cli.json {
            println!("All images are already optimized.");
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    // bad flag values are configuration errors: exit 1, not clap's 2
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };
    logging::init(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("failed to optimize images: {e}");
            ExitCode::FAILURE
        }
    }
}
