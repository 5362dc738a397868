//! Operator configuration for Hookbot.
//!
//! The configuration is a JSON object, read once at startup from
//! `config.json` (or the path given with `--config`):
//!
//! ```json
//! {
//!     "token": "123456:ABC-DEF",
//!     "api_url": "https://api.telegram.org/bot",
//!     "webhook_url": "https://bot.example.com/hook",
//!     "log_file": "output.log",
//!     "log_level": "info"
//! }
//! ```
//!
//! - `token`, `api_url` and `webhook_url` are required and must be non-empty strings.
//! - `log_file` defaults to [`DEFAULT_LOG_FILE`].
//! - `log_level` defaults to `info`; unknown names are ignored.
//!
//! Loading configures the log destination *before* the required keys are
//! validated, so a missing-key error lands in the configured log file.

pub mod loader;
pub mod schema;

pub use loader::{ConfigError, load_configuration};
pub use schema::{BotConfig, DEFAULT_CONFIG_FILE, DEFAULT_LOG_FILE, LogLevel, REQUIRED_OPTIONS};
