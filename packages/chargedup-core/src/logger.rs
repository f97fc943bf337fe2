//! Console and file logger.
//!
//! This module implements the [`log`] crate's logging facade. Messages go to
//! stdout and, when a path is given, to a log file that is truncated at startup.
//!
//! Initialize the logger once at the start of the program:
//!
//! ```no_run
//! use std::path::Path;
//!
//! use chargedup_core::logger;
//! use log::{info, LevelFilter};
//!
//! logger::init(LevelFilter::Debug, Some(Path::new("robot.log"))).expect("logger already set");
//! info!("Robot program started");
//! ```
//!
//! Each line carries the level, the program uptime, the target and the message:
//!
//! ```text
//! INFO [2m 5s 123ms] chargedup::robot - Autonomous selected: Autobalance
//! WARN [2m 5s 456ms] chargedup_core::time - Loop time of 20ms overrun by 3ms
//! ```

use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::Path,
    sync::{Mutex, OnceLock},
    time::Duration,
};

use humantime::{FormattedDuration, format_duration};
use log::{LevelFilter, Metadata, Record, SetLoggerError};

use crate::time::uptime;

/// A logger writing to the console and an optional file.
pub struct RobotLogger {
    /// `None` when no path was given or the file could not be opened.
    file_writer: Mutex<Option<BufWriter<File>>>,
}

impl RobotLogger {
    fn new(path: Option<&Path>) -> Self {
        let file_writer = path.and_then(|path| {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .ok()
                .map(BufWriter::new)
        });

        Self {
            file_writer: Mutex::new(file_writer),
        }
    }

    fn format(record: &Record<'_>) -> String {
        format!(
            "{} [{}] {} - {}\n",
            record.level(),
            timestamp(),
            record.target(),
            record.args()
        )
    }
}

impl log::Log for RobotLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = Self::format(record);
        print!("{line}");

        if let Ok(mut guard) = self.file_writer.lock() {
            if let Some(writer) = guard.as_mut() {
                writer.write_all(line.as_bytes()).ok();
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut guard) = self.file_writer.lock() {
            if let Some(writer) = guard.as_mut() {
                writer.flush().ok();
            }
        }
    }
}

static LOGGER: OnceLock<RobotLogger> = OnceLock::new();

/// Installs the robot logger as the global [`log`] backend.
///
/// Messages below `level` are discarded. When `path` is given, log lines are
/// also written to that file.
///
/// Only the first call builds the logger and opens `path`. A global logger can
/// be installed once, so every later call fails without touching `path`.
///
/// # Errors
///
/// Returns [`SetLoggerError`] if a logger has already been set.
pub fn init(level: LevelFilter, path: Option<&Path>) -> Result<(), SetLoggerError> {
    // Anchor the uptime clock before the first line is written.
    uptime();
    let logger = LOGGER.get_or_init(|| RobotLogger::new(path));
    log::set_logger(logger).map(|()| log::set_max_level(level))
}

fn timestamp() -> FormattedDuration {
    // Millisecond resolution keeps lines short.
    format_duration(Duration::from_millis(uptime().as_millis() as u64))
}

#[cfg(test)]
mod tests {
    use log::{Level, Log};

    use super::*;

    #[test]
    fn line_format() {
        let line = RobotLogger::format(
            &Record::builder()
                .level(Level::Warn)
                .target("chargedup::arm")
                .args(format_args!("target {} unreachable", -30.0))
                .build(),
        );
        assert!(line.starts_with("WARN ["));
        assert!(line.ends_with("] chargedup::arm - target -30 unreachable\n"));
    }

    #[test]
    fn second_init_fails_without_opening_the_file() {
        let path = std::env::temp_dir().join(format!("chargedup-second-init-{}.log", std::process::id()));
        std::fs::remove_file(&path).ok();

        init(LevelFilter::Off, None).unwrap();
        assert!(init(LevelFilter::Debug, Some(&path)).is_err());
        assert!(!path.exists());
        assert_eq!(log::max_level(), LevelFilter::Off);
    }

    #[test]
    fn logger_without_file_is_usable() {
        let logger = RobotLogger::new(None);
        logger.flush();
        assert!(logger.file_writer.lock().is_ok_and(|guard| guard.is_none()));
    }
}
