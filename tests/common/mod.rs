//! Common test utilities for hookbot integration tests.
//!
//! Provides `TestEnv` for isolated working directories and `StubApi`, a
//! one-shot Bot API stand-in that answers the webhook registration call.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with its own working directory.
///
/// The `hookbot()` method returns a `Command` that runs in that directory
/// with `PORT`, `IP` and `HOOKBOT_CONFIG` cleared, so the parent environment
/// never leaks into a test.
pub struct TestEnv {
    pub work_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with an empty working directory.
    pub fn new() -> Self {
        Self {
            work_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the hookbot binary.
    pub fn hookbot(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_hookbot"));
        cmd.current_dir(self.work_dir.path());
        cmd.env_remove("PORT");
        cmd.env_remove("IP");
        cmd.env_remove("HOOKBOT_CONFIG");
        cmd
    }

    /// Get a Command with `PORT=0` and `IP=127.0.0.1` set.
    pub fn hookbot_on_loopback(&self) -> Command {
        let mut cmd = self.hookbot();
        cmd.env("PORT", "0");
        cmd.env("IP", "127.0.0.1");
        cmd
    }

    /// Write `contents` to `config.json` in the working directory.
    pub fn write_config(&self, contents: &str) -> PathBuf {
        let path = self.path().join("config.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Write a complete configuration pointing at `api_url`.
    pub fn write_valid_config(&self, api_url: &str) -> PathBuf {
        self.write_config(
            &serde_json::json!({
                "token": "123:abc",
                "api_url": api_url,
                "webhook_url": "https://bot.example.com/hook"
            })
            .to_string(),
        )
    }

    /// Read a file from the working directory, or an empty string if absent.
    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path().join(name)).unwrap_or_default()
    }

    /// Get the path to the working directory.
    pub fn path(&self) -> &Path {
        self.work_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// A Bot API stand-in that serves exactly one request with a canned response.
pub struct StubApi {
    /// Base URL to use as `api_url`
    pub url: String,
    handle: JoinHandle<String>,
}

impl StubApi {
    /// Answer `setWebhook` with `{"ok": true}`.
    pub fn accepting() -> Self {
        Self::respond(
            "200 OK",
            r#"{"ok":true,"result":true,"description":"Webhook was set"}"#,
        )
    }

    /// Answer `setWebhook` with a 401 rejection.
    pub fn rejecting() -> Self {
        Self::respond(
            "401 Unauthorized",
            r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#,
        )
    }

    pub fn respond(status: &'static str, body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/bot", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();

            let mut content_length = 0;
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                if header == "\r\n" || header.is_empty() {
                    break;
                }
                if let Some((name, value)) = header.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut body_in = vec![0; content_length];
            reader.read_exact(&mut body_in).unwrap();

            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            )
            .unwrap();
            stream.flush().unwrap();

            request_line.trim_end().to_string()
        });

        Self { url, handle }
    }

    /// Wait for the request and return its request line.
    pub fn request_line(self) -> String {
        self.handle.join().unwrap()
    }
}

/// An API URL nothing is listening on.
pub fn unreachable_api() -> String {
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    format!("http://127.0.0.1:{}/bot", port)
}
