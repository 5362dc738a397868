//! Hookbot - lifecycle controller for a webhook-driven chat bot.
//!
//! This library provides the pieces the `hookbot` binary sequences at startup:
//! configuration loading, webhook registration against the remote Bot API,
//! the background callback server, and the interactive operator control loop.

pub mod cli;
pub mod config;
pub mod control;
pub mod controller;
pub mod logging;
pub mod server;
pub mod webhook;


/// Library-level error type for Hookbot operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Registration(#[from] webhook::RegistrationError),

    #[error(transparent)]
    ServerStart(#[from] server::ServerStartError),

    #[error("Invalid environment: {0}")]
    Environment(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Result type alias for Hookbot operations.
pub type Result<T> = std::result::Result<T, Error>;
