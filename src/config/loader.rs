//! Reading and validating the configuration document.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use super::schema::{BotConfig, DEFAULT_LOG_FILE, LogLevel, REQUIRED_OPTIONS};
use crate::logging::LogSink;

/// Errors that can occur while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be opened
    #[error("Could not open config file {}: {source}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not a valid JSON object
    #[error("Syntax error in config file: {0}")]
    ParseError(String),

    /// A required key is absent or empty
    #[error("Missing required config option: {0}")]
    MissingOption(String),

    /// A key is present with the wrong type
    #[error("Invalid config option '{name}': {reason}")]
    InvalidOption { name: String, reason: String },

    /// The configured log destination could not be opened
    #[error("Could not open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Load and validate the configuration at `path`.
///
/// The log destination is applied to `sink` before the required keys are
/// checked; the log level is applied only once validation has passed.
/// Validation is fail-fast: the first missing key in [`REQUIRED_OPTIONS`]
/// order is the one reported.
pub fn load_configuration(path: &Path, sink: &dyn LogSink) -> Result<BotConfig, ConfigError> {
    let contents = fs::read(path).map_err(|source| ConfigError::NotFound {
        path: path.to_path_buf(),
        source,
    })?;

    let document = parse_document(&contents)?;

    let log_file = log_file_option(&document)?;
    sink.set_log_file(&log_file)
        .map_err(|source| ConfigError::LogFile {
            path: log_file.clone(),
            source,
        })?;

    let [token, api_url, webhook_url] = REQUIRED_OPTIONS.map(|option| required(&document, option));
    let (token, api_url, webhook_url) = (token?, api_url?, webhook_url?);

    let log_level = match document.get("log_level") {
        Some(Value::String(name)) => match LogLevel::parse(name) {
            Some(level) => {
                sink.set_level(level);
                Some(level)
            }
            None => {
                tracing::warn!(log_level = %name, "Unknown log level, keeping default");
                None
            }
        },
        Some(other) => {
            tracing::warn!(log_level = %other, "log_level is not a string, keeping default");
            None
        }
        None => None,
    };

    tracing::debug!(path = %path.display(), "Configuration loaded");

    Ok(BotConfig::new(
        token,
        api_url,
        webhook_url,
        log_file,
        log_level,
        document,
    ))
}

fn parse_document(contents: &[u8]) -> Result<Map<String, Value>, ConfigError> {
    let value: Value =
        serde_json::from_slice(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(ConfigError::ParseError(format!(
            "expected a JSON object at the top level, found {}",
            json_type(&other)
        ))),
    }
}

fn log_file_option(document: &Map<String, Value>) -> Result<PathBuf, ConfigError> {
    match document.get("log_file") {
        None => Ok(PathBuf::from(DEFAULT_LOG_FILE)),
        Some(Value::String(path)) if !path.is_empty() => Ok(PathBuf::from(path)),
        Some(Value::String(_)) => Err(ConfigError::InvalidOption {
            name: "log_file".to_string(),
            reason: "must not be empty".to_string(),
        }),
        Some(other) => Err(ConfigError::InvalidOption {
            name: "log_file".to_string(),
            reason: format!("expected a string, found {}", json_type(other)),
        }),
    }
}

fn required(document: &Map<String, Value>, option: &str) -> Result<String, ConfigError> {
    match document.get(option) {
        None | Some(Value::Null) => Err(ConfigError::MissingOption(option.to_string())),
        Some(Value::String(s)) if s.is_empty() => {
            Err(ConfigError::MissingOption(option.to_string()))
        }
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ConfigError::InvalidOption {
            name: option.to_string(),
            reason: format!("expected a string, found {}", json_type(other)),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
