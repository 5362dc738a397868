//! Schema definitions for the configuration document.
//!
//! This module provides:
//! - [`BotConfig`], the validated, read-only configuration value
//! - [`LogLevel`], the severities accepted by the `log_level` key
//! - Key names and default values

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::level_filters::LevelFilter;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Log file used when the configuration has no `log_file` key.
pub const DEFAULT_LOG_FILE: &str = "output.log";

/// Keys that must be present (and non-empty) before any network action.
///
/// Validation walks this list in order and reports the first offender.
pub const REQUIRED_OPTIONS: [&str; 3] = ["token", "api_url", "webhook_url"];

/// Severity applied globally from the `log_level` key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    /// Default level when `log_level` is absent or unrecognized
    #[default]
    Info,
    Warn,
    Error,
    /// Silence the log file; warnings and errors still reach stderr
    Off,
}

impl LogLevel {
    /// Parse from string, case-insensitive.
    ///
    /// Returns `None` for names outside the supported set.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            "off" | "none" => Some(LogLevel::Off),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    /// The `tracing` filter equivalent to this level.
    pub fn to_filter(self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validated operator configuration.
///
/// Created once by [`load_configuration`](super::load_configuration) and held
/// read-only for the lifetime of the process.
#[derive(Clone, PartialEq)]
pub struct BotConfig {
    /// Credential for the remote Bot API
    pub token: String,
    /// Base endpoint of the remote Bot API (e.g. `https://api.telegram.org/bot`)
    pub api_url: String,
    /// Externally reachable URL the API should deliver updates to
    pub webhook_url: String,
    /// Log destination (resolved to [`DEFAULT_LOG_FILE`] when absent)
    pub log_file: PathBuf,
    /// Log level, if the document set a recognized one
    pub log_level: Option<LogLevel>,
    document: Map<String, Value>,
}

impl BotConfig {
    pub(crate) fn new(
        token: String,
        api_url: String,
        webhook_url: String,
        log_file: PathBuf,
        log_level: Option<LogLevel>,
        document: Map<String, Value>,
    ) -> Self {
        Self {
            token,
            api_url,
            webhook_url,
            log_file,
            log_level,
            document,
        }
    }

    /// Look up any key of the configuration document, including ones Hookbot
    /// itself does not interpret.
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.document.get(name)
    }

    /// Path of the log file in effect.
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("webhook_url", &self.webhook_url)
            .field("log_file", &self.log_file)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}
