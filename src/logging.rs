//! Logger initialization.
//!
//! Diagnostics go to stderr through `env_logger`, keeping stdout for the
//! report itself.

use std::io::Write;

use log::LevelFilter;

/// Maps the number of `-v` flags to a level filter.
pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initializes the logger.
///
/// `RUST_LOG` is read first and `level` is applied on top of it for this
/// crate, so `RUST_LOG=openssl=trace` keeps working alongside `-v`.
///
/// # Errors
///
/// Returns an error if a logger has already been installed.
pub fn init_logger(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_module("certinspect", level);
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{} {}] {}",
            record.level(),
            record.target(),
            record.args()
        )
    });
    builder.try_init()
}
