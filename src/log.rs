//! Program logging, built on `fern`.
//!
//! Messages go to the console and, for study runs, to log files in the case folder.
use anyhow::{Context, Result, anyhow, bail, ensure};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

/// A flag indicating whether the logger has been initialised
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The default log level for the program.
///
/// Used as a fallback if the user hasn't specified something else with the `POWERPLAN_LOG_LEVEL`
/// environment variable or the `settings.toml` file.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The environment variable which overrides the log level in the settings file
pub const LOG_LEVEL_ENV_VAR: &str = "POWERPLAN_LOG_LEVEL";

/// The file name for the log file containing messages about the ordinary progress of a study
const LOG_INFO_FILE_NAME: &str = "powerplan_info.log";

/// The file name for the log file containing warnings and error messages
const LOG_ERROR_FILE_NAME: &str = "powerplan_error.log";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// The log files written into a case folder during a study run
struct LogFiles {
    /// Ordinary progress messages
    info: File,
    /// Warnings and errors
    error: File,
}

impl LogFiles {
    /// Create (or truncate) both log files in `dir`
    fn create(dir: &Path) -> Result<Self> {
        let open = |file_name: &str| {
            let file_path = dir.join(file_name);
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&file_path)
                .with_context(|| format!("Could not create log file {}", file_path.display()))
        };

        Ok(Self {
            info: open(LOG_INFO_FILE_NAME)?,
            error: open(LOG_ERROR_FILE_NAME)?,
        })
    }

    /// Loggers writing progress and problems to separate files.
    ///
    /// Progress is always recorded at `info` or finer, even when the console is quieter.
    fn dispatch(self, level: LevelFilter) -> Dispatch {
        Dispatch::new()
            .chain(
                Dispatch::new()
                    .filter(|metadata| metadata.level() > LevelFilter::Warn)
                    .format(write_log_plain)
                    .level(level.max(LevelFilter::Info))
                    .chain(self.info),
            )
            .chain(
                Dispatch::new()
                    .format(write_log_plain)
                    .level(LevelFilter::Warn)
                    .chain(self.error),
            )
    }
}

/// Loggers for the console: progress to stdout, warnings and errors to stderr.
///
/// Colours are only used for streams attached to a terminal.
fn console_dispatch(level: LevelFilter) -> Dispatch {
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);
    let colour_stdout = std::io::stdout().is_terminal().then_some(colours);
    let colour_stderr = std::io::stderr().is_terminal().then_some(colours);

    Dispatch::new()
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .format(move |out, message, record| {
                    write_log_colour(out, message, record, colour_stdout.as_ref());
                })
                .level(level)
                .chain(std::io::stdout()),
        )
        .chain(
            Dispatch::new()
                .format(move |out, message, record| {
                    write_log_colour(out, message, record, colour_stderr.as_ref());
                })
                .level(level.min(LevelFilter::Warn))
                .chain(std::io::stderr()),
        )
}

/// Initialise the program logger.
///
/// The level is taken from the `POWERPLAN_LOG_LEVEL` environment variable if set, otherwise from
/// `settings.toml`, otherwise [`DEFAULT_LOG_LEVEL`]. Level names are `off`, `error`, `warn`,
/// `info`, `debug` and `trace`, in any case.
///
/// If `log_dir` is given, `powerplan_info.log` and `powerplan_error.log` are also written there.
/// The logger can only be initialised once per process.
pub fn init(log_level_from_settings: Option<&str>, log_dir: Option<&Path>) -> Result<()> {
    let log_level = match env::var(LOG_LEVEL_ENV_VAR) {
        Ok(level) => level,
        Err(_) => log_level_from_settings
            .unwrap_or(DEFAULT_LOG_LEVEL)
            .to_string(),
    };
    let log_level = parse_level(&log_level)?;
    ensure!(!is_logger_initialised(), "Logger already initialised");

    let mut dispatch = console_dispatch(log_level);
    if let Some(log_dir) = log_dir {
        dispatch = dispatch.chain(LogFiles::create(log_dir)?.dispatch(log_level));
    }

    dispatch.apply().context("Logger already initialised")?;
    LOGGER_INIT
        .set(())
        .map_err(|()| anyhow!("Logger already initialised"))?;

    Ok(())
}

/// Convert a log level name (case-insensitive) to a [`LevelFilter`]
fn parse_level(level: &str) -> Result<LevelFilter> {
    Ok(match level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    })
}

/// Write to the log in the format used for study runs
fn write_log<T: Display>(out: FormatCallback, level: T, target: &str, message: &Arguments) {
    let timestamp = Local::now().format("%H:%M:%S");

    out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
}

/// Write to the log with no colours
fn write_log_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    write_log(out, record.level(), record.target(), message);
}

/// Write to the log, with colours if any are given
fn write_log_colour(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    colours: Option<&ColoredLevelConfig>,
) {
    match colours {
        Some(colours) => write_log(out, colours.color(record.level()), record.target(), message),
        None => write_log_plain(out, message, record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;
    use std::fs;

    #[rstest]
    #[case("off", LevelFilter::Off)]
    #[case("WARN", LevelFilter::Warn)]
    #[case("Info", LevelFilter::Info)]
    #[case("trace", LevelFilter::Trace)]
    fn test_parse_level(#[case] level: &str, #[case] expected: LevelFilter) {
        assert_eq!(parse_level(level).unwrap(), expected);
    }

    #[test]
    fn test_parse_level_unknown() {
        assert_error!(parse_level("loud"), "Unknown log level: loud");
    }

    #[test]
    fn test_log_files_create() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(LOG_INFO_FILE_NAME), "old run").unwrap();

        LogFiles::create(dir.path()).unwrap();
        assert!(fs::read_to_string(dir.path().join(LOG_INFO_FILE_NAME)).unwrap().is_empty());
        assert!(dir.path().join(LOG_ERROR_FILE_NAME).is_file());
        assert!(LogFiles::create(&dir.path().join("missing")).is_err());
    }
}
