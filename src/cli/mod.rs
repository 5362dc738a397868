//! CLI argument definitions for Hookbot.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;

use crate::config::DEFAULT_CONFIG_FILE;

/// Version string shown by `--version`, with build metadata from build.rs.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit ",
    env!("HOOKBOT_GIT_COMMIT"),
    ", built ",
    env!("HOOKBOT_BUILD_TIMESTAMP"),
    ")"
);

/// Hookbot - webhook-driven bot process.
///
/// Registers the configured webhook with the Bot API, serves callbacks on
/// PORT/IP and waits for `quit` on standard input.
#[derive(Parser, Debug)]
#[command(name = "hookbot")]
#[command(author, version, long_version = LONG_VERSION, about = "Run a webhook-driven bot", long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short = 'c', long = "config", env = "HOOKBOT_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Port the callback server listens on
    #[arg(long, env = "PORT")]
    pub port: Option<String>,

    /// Address the callback server binds to
    #[arg(long = "ip", env = "IP")]
    pub ip: Option<String>,
}

/// Resolve the callback server address from the raw `PORT` and `IP` values.
///
/// Both are required. Values are trimmed before parsing; anything that is not
/// a `u16` port or an IP address is rejected with a message naming the
/// variable, before any network action takes place.
pub fn bind_address(port: Option<&str>, ip: Option<&str>) -> crate::Result<SocketAddr> {
    let port = port
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| crate::Error::Environment("PORT is not set".to_string()))?;
    let port: u16 = port.parse().map_err(|_| {
        crate::Error::Environment(format!("PORT must be a number from 0 to 65535, got '{}'", port))
    })?;

    let ip = ip
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .ok_or_else(|| crate::Error::Environment("IP is not set".to_string()))?;
    let ip: IpAddr = ip.parse().map_err(|e| {
        crate::Error::Environment(format!("IP must be an IP address, got '{}': {}", ip, e))
    })?;

    Ok(SocketAddr::new(ip, port))
}
