//! Logging setup for the `hookbot` process.
//!
//! The global subscriber has two outputs:
//! - stderr, limited to warnings and errors so the operator prompt stays readable
//! - a log file, attached once the configuration names one
//!
//! Only the file output follows the reloadable level filter driven by the
//! `log_level` configuration key. Startup failures reach stderr even when the
//! configured level is `off`.

use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry, fmt, reload};

use crate::config::LogLevel;

/// Destination-and-severity controls the configuration loader drives.
pub trait LogSink {
    /// Send log output to the file at `path` from now on.
    fn set_log_file(&self, path: &Path) -> io::Result<()>;

    /// Apply `level` to the log file output.
    fn set_level(&self, level: LogLevel);
}

type FileLayer =
    Option<fmt::Layer<Registry, fmt::format::DefaultFields, fmt::format::Format, NonBlocking>>;

/// The process-wide `tracing` subscriber, with handles to retarget it.
pub struct Logging {
    level: reload::Handle<LevelFilter, Registry>,
    file: reload::Handle<FileLayer, Registry>,
    guard: Mutex<Option<WorkerGuard>>,
}

impl Logging {
    /// Install the global subscriber at the default level ([`LogLevel::Info`]).
    ///
    /// Fails if a global subscriber is already set.
    pub fn install() -> crate::Result<Self> {
        let (level_filter, level) =
            reload::Layer::<LevelFilter, Registry>::new(LogLevel::default().to_filter());
        let (file_layer, file) = reload::Layer::<FileLayer, Registry>::new(None);

        tracing_subscriber::registry()
            .with(file_layer.with_filter(level_filter))
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(io::stderr().is_terminal())
                    .with_writer(io::stderr.with_max_level(Level::WARN)),
            )
            .try_init()
            .map_err(|e| crate::Error::Logging(e.to_string()))?;

        Ok(Self {
            level,
            file,
            guard: Mutex::new(None),
        })
    }
}

impl LogSink for Logging {
    fn set_log_file(&self, path: &Path) -> io::Result<()> {
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("log file path has no file name: {}", path.display()),
                )
            })?;

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(file_name)
            .build(directory)
            .map_err(io::Error::other)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);

        self.file
            .reload(Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer),
            ))
            .map_err(io::Error::other)?;

        // Replacing the guard flushes the previous file's writer.
        if let Ok(mut slot) = self.guard.lock() {
            *slot = Some(guard);
        }

        tracing::debug!(path = %path.display(), "Log file configured");
        Ok(())
    }

    fn set_level(&self, level: LogLevel) {
        match self.level.reload(level.to_filter()) {
            Ok(()) => tracing::debug!(%level, "Log level applied"),
            Err(e) => tracing::warn!(%level, error = %e, "Could not apply log level"),
        }
    }
}
