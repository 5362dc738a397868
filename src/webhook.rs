//! Webhook registration against the remote Bot API.
//!
//! Registration is a single blocking `setWebhook` call made at startup, before
//! the callback server is started. There is no retry and no timeout at this
//! layer: if the API never answers, startup waits with it.

use serde::Deserialize;
use thiserror::Error;

use crate::config::BotConfig;

/// User-Agent header sent with API requests
const USER_AGENT: &str = concat!("hookbot/", env!("CARGO_PKG_VERSION"));

/// Bot API method that points update delivery at a URL
const SET_WEBHOOK_METHOD: &str = "setWebhook";

/// Errors that can occur during webhook registration.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The API answered but refused the registration
    #[error("Webhook registration rejected (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },

    /// The API could not be reached
    #[error("Webhook registration request failed: {0}")]
    Transport(String),

    /// The API answered with something other than a Bot API envelope
    #[error("Failed to parse webhook registration response: {0}")]
    MalformedResponse(String),
}

/// Registers the callback URL so the remote service pushes updates to it.
pub trait WebhookRegistrar {
    /// Register `url` as the delivery target for inbound events.
    fn register(&self, url: &str) -> Result<(), RegistrationError>;
}

/// Envelope every Bot API response is wrapped in (only fields we care about).
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Blocking Bot API client.
///
/// Requests go to `{api_url}{token}/{method}`, the Bot API convention where
/// `api_url` is e.g. `https://api.telegram.org/bot`.
#[derive(Clone)]
pub struct ApiClient {
    api_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            token: token.into(),
        }
    }

    /// Build a client from the validated configuration.
    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(config.api_url.clone(), config.token.clone())
    }

    /// Full URL for an API method.
    fn method_url(&self, method: &str) -> String {
        format!("{}{}/{}", self.api_url, self.token, method)
    }

    /// Describe a transport failure without the request URL, which embeds the token.
    fn describe_transport(&self, transport: &ureq::Transport) -> String {
        let mut description = transport.kind().to_string();
        if let Some(message) = transport.message() {
            description.push_str(": ");
            description.push_str(message);
        }
        if let Some(source) = std::error::Error::source(transport) {
            description.push_str(": ");
            description.push_str(&source.to_string());
        }
        if self.token.is_empty() {
            description
        } else {
            description.replace(&self.token, "<redacted>")
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl WebhookRegistrar for ApiClient {
    fn register(&self, url: &str) -> Result<(), RegistrationError> {
        tracing::info!(webhook_url = %url, "Registering webhook");

        let response = ureq::post(&self.method_url(SET_WEBHOOK_METHOD))
            .set("User-Agent", USER_AGENT)
            .set("Accept", "application/json")
            .send_json(serde_json::json!({ "url": url }));

        match response {
            Ok(resp) => {
                let status = resp.status();
                let body: ApiResponse = resp
                    .into_json()
                    .map_err(|e| RegistrationError::MalformedResponse(e.to_string()))?;
                check_envelope(status, body)?;
                tracing::info!(webhook_url = %url, "Webhook registered");
                Ok(())
            }
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                let description = serde_json::from_str::<ApiResponse>(&body)
                    .ok()
                    .and_then(|r| r.description)
                    .unwrap_or(body);
                Err(RegistrationError::Rejected {
                    status: code,
                    description,
                })
            }
            Err(ureq::Error::Transport(transport)) => Err(RegistrationError::Transport(
                self.describe_transport(&transport),
            )),
        }
    }
}

/// A 2xx answer still carries `ok: false` when the API refuses the request.
fn check_envelope(status: u16, body: ApiResponse) -> Result<(), RegistrationError> {
    if body.ok {
        Ok(())
    } else {
        Err(RegistrationError::Rejected {
            status,
            description: body
                .description
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}
