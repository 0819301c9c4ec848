//! Logging initialization
//!
//! Standard output carries command results, so log lines only ever go to
//! stderr or to a rolling file.
//!
//! | Output | Guard required |
//! |--------|----------------|
//! | `Stderr` | No |
//! | `File` | **Yes** |
//! | `Both` | **Yes** |
//! | `None` | No |
//!
//! The guard flushes buffered file logs when dropped; hold it until the
//! program exits.

use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::settings::{LogOutput, LogRotation, LoggingSettings};

/// Keeps the non-blocking file writers alive
#[derive(Debug)]
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
    _stderr_guard: Option<WorkerGuard>,
}

impl LoggingSettings {
    /// Filter directive after applying `-v` flags
    pub fn effective_level(&self, verbosity: u8) -> &str {
        match verbosity {
            0 => &self.level,
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Install the global subscriber.
    ///
    /// `RUST_LOG` takes precedence over both the configured level and `-v`.
    /// Returns a guard for file output, which must be held.
    pub fn init(&self, verbosity: u8) -> io::Result<Option<LoggingGuard>> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.effective_level(verbosity)));

        match self.output {
            LogOutput::None => Ok(None),
            LogOutput::Stderr => {
                init_stderr(self, filter)?;
                Ok(None)
            }
            LogOutput::File => {
                let dir = self.require_directory()?;
                init_file_only(self, dir, filter).map(Some)
            }
            LogOutput::Both => {
                let dir = self.require_directory()?;
                init_stderr_and_file(self, dir, filter).map(Some)
            }
        }
    }

    fn require_directory(&self) -> io::Result<&Path> {
        self.directory.as_deref().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "file logging requires logging.directory to be set",
            )
        })
    }

    fn appender(&self, dir: &Path) -> io::Result<RollingFileAppender> {
        std::fs::create_dir_all(dir)?;
        Ok(match self.rotation {
            LogRotation::Minute => tracing_appender::rolling::minutely(dir, &self.file_prefix),
            LogRotation::Hourly => tracing_appender::rolling::hourly(dir, &self.file_prefix),
            LogRotation::Daily => tracing_appender::rolling::daily(dir, &self.file_prefix),
            LogRotation::Never => tracing_appender::rolling::never(dir, &self.file_prefix),
        })
    }
}

fn init_stderr(settings: &LoggingSettings, filter: EnvFilter) -> io::Result<()> {
    let subscriber = tracing_subscriber::registry().with(filter);

    if settings.structured {
        subscriber
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))
    } else {
        subscriber
            .with(fmt::layer().with_writer(io::stderr))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))
    }
}

fn init_file_only(
    settings: &LoggingSettings,
    dir: &Path,
    filter: EnvFilter,
) -> io::Result<LoggingGuard> {
    let (non_blocking, guard) = tracing_appender::non_blocking(settings.appender(dir)?);
    let subscriber = tracing_subscriber::registry().with(filter);

    if settings.structured {
        subscriber
            .with(fmt::layer().json().with_writer(non_blocking))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))?;
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))?;
    }

    Ok(LoggingGuard {
        _file_guard: guard,
        _stderr_guard: None,
    })
}

fn init_stderr_and_file(
    settings: &LoggingSettings,
    dir: &Path,
    filter: EnvFilter,
) -> io::Result<LoggingGuard> {
    let (file_non_blocking, file_guard) = tracing_appender::non_blocking(settings.appender(dir)?);
    let (stderr_non_blocking, stderr_guard) = tracing_appender::non_blocking(io::stderr());
    let combined = file_non_blocking.and(stderr_non_blocking);

    let subscriber = tracing_subscriber::registry().with(filter);

    if settings.structured {
        subscriber
            .with(fmt::layer().json().with_writer(combined))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))?;
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(combined))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))?;
    }

    Ok(LoggingGuard {
        _file_guard: file_guard,
        _stderr_guard: Some(stderr_guard),
    })
}
