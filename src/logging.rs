use crate::error::{ReadmeError, Result};
use chrono::Local;
use env_logger::{Builder, Env};
use log::{self, LevelFilter};
use std::io::Write;
use yansi::Paint;

const CRATE_PREFIX: &str = "readmegen::";

/// Initializes the command-line logger with the specified log level
///
/// `RUST_LOG` still takes precedence when set. Valid log levels are:
/// off, error, warn, info, debug, trace
pub fn init(log_level: &str) -> Result<()> {
    Builder::new()
        .filter_level(parse_log_level(log_level))
        .parse_env(Env::default().write_style_or("RUST_LOG_STYLE", "auto"))
        .format(|buf, record| writeln!(buf, "{}", format_log(record)))
        .try_init()
        .map_err(|e| ReadmeError::Config(format!("Failed to initialise logging: {}", e)))
}

/// Formats a log record as `time level [module] message`
///
/// The crate prefix is dropped from targets inside this crate.
pub fn format_log(record: &log::Record) -> String {
    let level = match record.level() {
        log::Level::Error => Paint::red("ERROR").bold(),
        log::Level::Warn => Paint::yellow("WARN ").bold(),
        log::Level::Info => Paint::green("INFO ").bold(),
        log::Level::Debug => Paint::blue("DEBUG"),
        log::Level::Trace => Paint::new("TRACE").dimmed(),
    };

    let target = match record.target() {
        "" => record.module_path().unwrap_or("readmegen"),
        target => target,
    };
    let target = target.strip_prefix(CRATE_PREFIX).unwrap_or(target);

    format!(
        "{} {} [{}] {}",
        Local::now().format("%H:%M:%S%.3f"),
        level,
        target,
        record.args()
    )
}

/// Maps a `--log-level` value to a filter; unknown values fall back to `info`
pub fn parse_log_level(level: &str) -> LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "off" | "none" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}
