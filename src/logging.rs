use std::io::Write;

/// Initialize the stderr logger.
///
/// Warn by default, `-v` adds debug output from this crate, `-q` keeps errors
/// only. A set `RUST_LOG` is applied on top, with the same line format.
pub fn init(verbose: bool, quiet: bool) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let _ = builder(verbose, quiet, rust_log.as_deref()).try_init();
}

fn builder(verbose: bool, quiet: bool, filters: Option<&str>) -> env_logger::Builder {
    let default_level = if quiet {
        log::LevelFilter::Error
    } else if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(default_level).format(|buf, record| {
        if record.level() <= log::Level::Warn {
            writeln!(buf, "[imgslim] {}: {}", record.level().as_str().to_lowercase(), record.args())
        } else {
            writeln!(buf, "[imgslim] {}", record.args())
        }
    });

    // decoders are chatty at debug, keep that to our own crate
    if verbose {
        builder.filter_module("imgslim", log::LevelFilter::Debug);
    }

    if let Some(filters) = filters {
        builder.parse_filters(filters);
    }
    builder
}
