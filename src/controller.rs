//! Startup and shutdown sequencing.
//!
//! Once configuration is loaded, the controller runs the rest of the process
//! lifecycle on the calling thread:
//!
//! 1. register the webhook (abort on failure)
//! 2. start the callback server (abort on failure)
//! 3. run the operator control loop until it stops
//! 4. stop the callback server
//!
//! Every startup failure is fatal; there is no retry and no degraded mode.

use std::io::{BufRead, Write};
use std::net::SocketAddr;

use crate::control::{ControlLoop, ControlState};
use crate::server::CallbackServer;
use crate::webhook::WebhookRegistrar;

/// Exit status for a clean operator-requested shutdown.
pub const EXIT_CLEAN: u8 = 0;

/// Exit status for any startup failure.
pub const EXIT_STARTUP_FAILURE: u8 = 1;

/// Orchestrates registration, the callback server and the control loop.
pub struct Controller<R, S> {
    registrar: R,
    server: S,
}

impl<R: WebhookRegistrar, S: CallbackServer> Controller<R, S> {
    pub fn new(registrar: R, server: S) -> Self {
        Self { registrar, server }
    }

    /// Run from webhook registration through orderly shutdown.
    ///
    /// Returns once the operator has quit (or input has ended) and the
    /// callback server has been stopped. The server is stopped only if it
    /// was started.
    pub fn run<I: BufRead, O: Write>(
        &mut self,
        webhook_url: &str,
        addr: SocketAddr,
        input: I,
        output: O,
    ) -> crate::Result<()> {
        self.registrar.register(webhook_url)?;
        self.server.start(addr)?;

        let mut control = ControlLoop::new(input, output);
        let state = control.run();
        debug_assert_eq!(state, ControlState::Stopped);

        self.server.stop();
        tracing::info!("Shutdown complete");
        Ok(())
    }

    /// Consume the controller, returning its collaborators.
    pub fn into_parts(self) -> (R, S) {
        (self.registrar, self.server)
    }
}

/// Process exit status for the outcome of a startup-and-run sequence.
pub fn exit_code<T>(result: &crate::Result<T>) -> u8 {
    match result {
        Ok(_) => EXIT_CLEAN,
        Err(_) => EXIT_STARTUP_FAILURE,
    }
}
