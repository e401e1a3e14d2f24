use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8765";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("could not connect to server at {0}")]
    Connect(String),
    #[error("request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
    #[error("server error: {status}{}", format_message(.message))]
    Status { status: u16, message: Option<String> },
    #[error("malformed response from server: {0}")]
    Malformed(String),
    #[error("server error: {0}")]
    Server(String),
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
}

fn format_message(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(" ({m})"))
        .unwrap_or_default()
}

/// Turns a natural-language request into a shell command.
pub trait CommandGenerator {
    fn generate(&self, query: &str) -> Result<String, ClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub model: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Blocking client for the command generation server.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl GenerationClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Request)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health(&self) -> Result<HealthStatus, ClientError> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .map_err(|err| self.classify(err))?;
        let body = self.read_body(response)?;
        serde_json::from_str(&body).map_err(|err| ClientError::Malformed(err.to_string()))
    }

    /// Polls `/health` every `interval` until the server reports healthy or
    /// `deadline` passes, returning the last failure in that case.
    pub fn wait_until_healthy(
        &self,
        deadline: Duration,
        interval: Duration,
    ) -> Result<HealthStatus, ClientError> {
        let start = Instant::now();
        loop {
            let last = match self.health() {
                Ok(health) if health.is_healthy() => return Ok(health),
                Ok(health) => ClientError::Server(format!("status {}", health.status)),
                Err(err) => err,
            };
            if start.elapsed() + interval > deadline {
                return Err(last);
            }
            debug!(error = %last, "server not ready yet");
            thread::sleep(interval);
        }
    }

    fn classify(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.timeout)
        } else if err.is_connect() {
            ClientError::Connect(self.base_url.clone())
        } else {
            ClientError::Request(err)
        }
    }

    /// Body of a 200 response; any other status becomes `ClientError::Status`
    /// carrying the server's `error` text when it sent one.
    fn read_body(&self, response: Response) -> Result<String, ClientError> {
        let status = response.status();
        let body = response.text().map_err(|err| self.classify(err))?;
        if status != StatusCode::OK {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .map(|b| b.error);
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }
}

impl CommandGenerator for GenerationClient {
    fn generate(&self, query: &str) -> Result<String, ClientError> {
        debug!(query, server = %self.base_url, "requesting command");
        let response = self
            .http
            .get(format!("{}/generate", self.base_url))
            .query(&[("q", query)])
            .send()
            .map_err(|err| self.classify(err))?;
        let body = self.read_body(response)?;

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|err| ClientError::Malformed(err.to_string()))?;
        match parsed {
            GenerateResponse {
                error: Some(error), ..
            } => Err(ClientError::Server(error)),
            GenerateResponse {
                command: Some(command),
                ..
            } => Ok(command.trim().to_string()),
            _ => Err(ClientError::Malformed("missing \"command\" field".into())),
        }
    }
}
