//! Hookbot - webhook-driven bot process.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use hookbot::cli::{Cli, bind_address};
use hookbot::config::load_configuration;
use hookbot::controller::{Controller, EXIT_STARTUP_FAILURE, exit_code};
use hookbot::logging::Logging;
use hookbot::server::WebhookServer;
use hookbot::webhook::ApiClient;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = match Logging::install() {
        Ok(logging) => logging,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_STARTUP_FAILURE);
        }
    };

    let result = run(cli, &logging);
    if let Err(e) = &result {
        tracing::error!(error = %e, "Startup failed");
    }

    // Dropping `logging` after this point flushes the log file writer.
    ExitCode::from(exit_code(&result))
}

fn run(cli: Cli, logging: &Logging) -> hookbot::Result<()> {
    let config = load_configuration(&cli.config, logging)?;
    tracing::info!(config = ?config, "Starting hookbot {}", env!("CARGO_PKG_VERSION"));

    let addr = bind_address(cli.port.as_deref(), cli.ip.as_deref())?;

    let mut controller = Controller::new(ApiClient::from_config(&config), WebhookServer::new());
    let stdin = io::stdin();
    let stdout = io::stdout();
    controller.run(&config.webhook_url, addr, stdin.lock(), stdout.lock())
}
