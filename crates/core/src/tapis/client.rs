//! Shared HTTP plumbing for the Tapis v3 APIs.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::TapisConfig;
use crate::execution::ExecutionError;
use crate::storage::StorageError;

const TOKEN_HEADER: &str = "X-Tapis-Token";

/// Transport-level failure talking to Tapis.
#[derive(Debug, Error)]
pub enum TapisError {
    #[error("missing access token")]
    MissingToken,

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("request timeout")]
    Timeout,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for TapisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TapisError::Timeout
        } else if e.is_connect() {
            TapisError::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            TapisError::InvalidResponse(e.to_string())
        } else {
            TapisError::Http {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                message: e.to_string(),
            }
        }
    }
}

impl From<TapisError> for StorageError {
    fn from(e: TapisError) -> Self {
        match e {
            TapisError::Timeout => StorageError::Timeout,
            TapisError::ConnectionFailed(msg) => StorageError::ConnectionFailed(msg),
            TapisError::Unauthorized(msg) => StorageError::AuthenticationFailed(msg),
            TapisError::NotFound(msg) => StorageError::NotFound(msg),
            TapisError::InvalidResponse(msg) => StorageError::InvalidResponse(msg),
            other => StorageError::ApiError(other.to_string()),
        }
    }
}

impl From<TapisError> for ExecutionError {
    fn from(e: TapisError) -> Self {
        match e {
            TapisError::Timeout => ExecutionError::Timeout,
            TapisError::ConnectionFailed(msg) => ExecutionError::ConnectionFailed(msg),
            TapisError::Unauthorized(msg) => ExecutionError::AuthenticationFailed(msg),
            TapisError::NotFound(msg) => ExecutionError::JobNotFound(msg),
            TapisError::Http { status: 400, message } => ExecutionError::Rejected(message),
            TapisError::InvalidResponse(msg) => ExecutionError::InvalidResponse(msg),
            other => ExecutionError::ApiError(other.to_string()),
        }
    }
}

/// Standard Tapis response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    result: Option<T>,
}

/// Authenticated client for one Tapis tenant.
#[derive(Clone)]
pub struct TapisClient {
    client: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for TapisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapisClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TapisClient {
    /// Create a client from validated config. The access token must already be resolved.
    pub fn new(config: &TapisConfig) -> Result<Self, TapisError> {
        let token = config
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(TapisError::MissingToken)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| TapisError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Build a URL from an API prefix and a storage path, encoding each path segment.
    pub fn url(&self, prefix: &str, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::encode(s).into_owned())
            .collect();
        format!(
            "{}/{}/{}",
            self.base_url,
            prefix.trim_matches('/'),
            encoded.join("/")
        )
    }

    /// URL of a fixed API endpoint.
    pub fn endpoint(&self, route: &str) -> String {
        format!("{}/{}", self.base_url, route.trim_start_matches('/'))
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url).header(TOKEN_HEADER, &self.token)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url).header(TOKEN_HEADER, &self.token)
    }

    /// Send a request and unwrap the `result` of the Tapis envelope.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, TapisError> {
        let response = Self::check(request.send().await?).await?;
        let envelope: Envelope<T> = response.json().await?;

        if let Some(status) = envelope.status.as_deref() {
            if status != "success" {
                return Err(TapisError::InvalidResponse(format!(
                    "status {}: {}",
                    status,
                    envelope.message.unwrap_or_default()
                )));
            }
        }

        envelope.result.ok_or_else(|| {
            TapisError::InvalidResponse("response envelope has no result".to_string())
        })
    }

    /// Send a request and return the raw body bytes.
    pub async fn send_bytes(&self, request: RequestBuilder) -> Result<Vec<u8>, TapisError> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn check(response: Response) -> Result<Response, TapisError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        let message = Self::error_message(&body);
        debug!(status = status.as_u16(), url = %url, "Tapis request failed");

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TapisError::Unauthorized(message),
            StatusCode::NOT_FOUND => TapisError::NotFound(format!("{}: {}", url, message)),
            _ => TapisError::Http {
                status: status.as_u16(),
                message,
            },
        })
    }

    /// Pull `message` out of an error envelope, falling back to the raw body.
    fn error_message(body: &str) -> String {
        serde_json::from_str::<Envelope<serde_json::Value>>(body)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| body.chars().take(200).collect())
    }
}
