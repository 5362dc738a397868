//! Callback server that receives webhook updates.
//!
//! The server runs on its own tokio runtime so the controller thread stays
//! free for the blocking operator loop. The controller only sees two control
//! points: [`CallbackServer::start`] and [`CallbackServer::stop`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    routing::get,
};
use thiserror::Error;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// How long `stop` waits for in-flight requests once shutdown is signalled
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// How long the runtime gets to wind down blocking work after the serve task
const RUNTIME_SHUTDOWN: Duration = Duration::from_secs(1);

/// Errors that can occur while starting the callback server.
#[derive(Debug, Error)]
pub enum ServerStartError {
    #[error("Callback server is already running on {0}")]
    AlreadyRunning(SocketAddr),

    #[error("Failed to create server runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Failed to bind callback server to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// The listening endpoint webhook callbacks are delivered to.
pub trait CallbackServer {
    /// Start listening on `addr`. Returns once the socket is bound.
    fn start(&mut self, addr: SocketAddr) -> Result<(), ServerStartError>;

    /// Stop listening and wait for the server to wind down.
    fn stop(&mut self);
}

/// Shared application state
#[derive(Clone, Default)]
struct AppState {
    /// Number of updates accepted since start
    updates: Arc<AtomicU64>,
}

/// Handles owned while the server is up.
struct Running {
    runtime: Runtime,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
    local_addr: SocketAddr,
}

/// axum-based [`CallbackServer`].
///
/// Any `POST` carrying a JSON body is accepted as an update; `GET /health`
/// reports liveness and the number of updates received.
pub struct WebhookServer {
    state: AppState,
    running: Option<Running>,
    shutdown_grace: Duration,
}

impl Default for WebhookServer {
    fn default() -> Self {
        Self {
            state: AppState::default(),
            running: None,
            shutdown_grace: SHUTDOWN_GRACE,
        }
    }
}

impl WebhookServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound how long `stop` waits for open connections to finish.
    ///
    /// Connections still open after `grace` are dropped.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Address the server is bound to, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Number of updates accepted so far.
    pub fn updates_received(&self) -> u64 {
        self.state.updates.load(Ordering::Relaxed)
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health))
            .fallback(receive_update)
            .with_state(self.state.clone())
    }
}

impl CallbackServer for WebhookServer {
    fn start(&mut self, addr: SocketAddr) -> Result<(), ServerStartError> {
        if let Some(running) = &self.running {
            return Err(ServerStartError::AlreadyRunning(running.local_addr));
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("hookbot-server")
            .build()
            .map_err(ServerStartError::Runtime)?;

        // Bind on the caller's thread so a bad address fails `start` itself.
        let listener = runtime
            .block_on(tokio::net::TcpListener::bind(addr))
            .map_err(|source| ServerStartError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerStartError::Bind { addr, source })?;

        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let app = self.router();
        let task = runtime.spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::info!(%local_addr, "Callback server listening");
        self.running = Some(Running {
            runtime,
            shutdown,
            task,
            local_addr,
        });
        Ok(())
    }

    fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            tracing::debug!("Callback server stop requested but it is not running");
            return;
        };

        let _ = running.shutdown.send(());
        let grace = self.shutdown_grace;
        let task = running.task;
        let finished = running
            .runtime
            .block_on(async move { tokio::time::timeout(grace, task).await });
        match finished {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => tracing::error!(error = %e, "Callback server exited with error"),
            Ok(Err(e)) => tracing::error!(error = %e, "Callback server task failed"),
            Err(_) => tracing::warn!(
                grace_secs = grace.as_secs_f64(),
                "Connections still open after shutdown grace period, dropping them"
            ),
        }
        // Dropping the runtime aborts whatever the serve task left behind.
        running.runtime.shutdown_timeout(RUNTIME_SHUTDOWN);

        tracing::info!(
            local_addr = %running.local_addr,
            updates = self.updates_received(),
            "Callback server stopped"
        );
    }
}

impl Drop for WebhookServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Liveness check
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "updates": state.updates.load(Ordering::Relaxed)
    }))
}

/// Accept an inbound update on any path.
///
/// Update contents are only logged; interpreting them is up to the bot.
async fn receive_update(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> StatusCode {
    if method != Method::POST {
        return StatusCode::METHOD_NOT_ALLOWED;
    }

    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(update) => {
            let count = state.updates.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!(
                update_id = ?update.get("update_id"),
                count,
                "Received update"
            );
            StatusCode::OK
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected malformed update");
            StatusCode::BAD_REQUEST
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    fn url(server: &WebhookServer, path: &str) -> String {
        format!("http://{}{}", server.local_addr().unwrap(), path)
    }

    #[test]
    fn test_start_reports_bound_address() {
        let mut server = WebhookServer::new();
        server.start(loopback()).unwrap();

        let addr = server.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);

        server.stop();
        assert!(server.local_addr().is_none());
    }

    #[test]
    fn test_health_endpoint() {
        let mut server = WebhookServer::new();
        server.start(loopback()).unwrap();

        let body: serde_json::Value = ureq::get(&url(&server, "/health"))
            .call()
            .unwrap()
            .into_json()
            .unwrap();

        assert_eq!(body["status"], "ok");
        assert_eq!(body["updates"], 0);
        server.stop();
    }

    #[test]
    fn test_update_is_accepted_and_counted() {
        let mut server = WebhookServer::new();
        server.start(loopback()).unwrap();

        let resp = ureq::post(&url(&server, "/hook"))
            .send_json(serde_json::json!({"update_id": 1, "message": {"text": "hi"}}))
            .unwrap();

        assert_eq!(resp.status(), 200);
        assert_eq!(server.updates_received(), 1);
        server.stop();
    }

    #[test]
    fn test_malformed_update_is_rejected() {
        let mut server = WebhookServer::new();
        server.start(loopback()).unwrap();

        let result = ureq::post(&url(&server, "/hook")).send_string("{not json");

        assert!(matches!(result, Err(ureq::Error::Status(400, _))));
        assert_eq!(server.updates_received(), 0);
        server.stop();
    }

    #[test]
    fn test_non_post_is_method_not_allowed() {
        let mut server = WebhookServer::new();
        server.start(loopback()).unwrap();

        let result = ureq::get(&url(&server, "/hook")).call();

        assert!(matches!(result, Err(ureq::Error::Status(405, _))));
        server.stop();
    }

    #[test]
    fn test_bind_failure() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();

        let mut server = WebhookServer::new();
        let err = server.start(addr).unwrap_err();

        assert!(matches!(err, ServerStartError::Bind { addr: a, .. } if a == addr));
        assert!(server.local_addr().is_none());
    }

    #[test]
    fn test_double_start_is_rejected() {
        let mut server = WebhookServer::new();
        server.start(loopback()).unwrap();

        let err = server.start(loopback()).unwrap_err();

        assert!(matches!(err, ServerStartError::AlreadyRunning(_)));
        server.stop();
    }

    #[test]
    fn test_stop_is_bounded_by_half_sent_request() {
        use std::io::Write;
        use std::sync::mpsc;
        use std::thread;

        let mut server = WebhookServer::new().with_shutdown_grace(Duration::from_millis(200));
        server.start(loopback()).unwrap();

        // Declare a body the peer never finishes sending.
        let mut peer = std::net::TcpStream::connect(server.local_addr().unwrap()).unwrap();
        write!(
            peer,
            "POST /hook HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{{\"a\""
        )
        .unwrap();
        peer.flush().unwrap();
        thread::sleep(Duration::from_millis(100));

        let (done_tx, done_rx) = mpsc::channel();
        let stopper = thread::spawn(move || {
            server.stop();
            done_tx.send(()).unwrap();
            server
        });

        assert!(
            done_rx.recv_timeout(Duration::from_secs(10)).is_ok(),
            "stop did not return while a request was half-sent"
        );
        let server = stopper.join().unwrap();
        assert!(server.local_addr().is_none());
        drop(peer);
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let mut server = WebhookServer::new();
        server.stop();
        assert!(server.local_addr().is_none());
    }
}
