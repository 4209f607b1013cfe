//! Remote model access for Jifra.
//!
//! # Architecture
//!
//! - [`TextModel`] - the seam between the application and a hosted model: list
//!   the available models, generate text for a prompt.
//! - [`gemini`] - [`TextModel`] over the Gemini REST API (`generateContent`).
//! - [`retry`] - exponential backoff with jitter for rate-limited calls.
//! - [`resolver`] - picks a model by preference order, once per process.
//!
//! # Error Handling
//!
//! Every remote failure is a [`RemoteError`]. Only
//! [`RemoteError::RateLimited`] is retried; everything else is returned to the
//! caller on the first occurrence with the provider's message intact.

pub mod gemini;
pub mod resolver;
pub mod retry;
mod wire;

use std::future::Future;
use std::time::Duration;

use jifra_types::ModelId;

pub use gemini::GeminiClient;
pub use resolver::{ModelResolution, ModelResolver, pick_model};
pub use retry::{RetryConfig, Sleeper, TokioSleeper, call_with_retry};

pub use jifra_types;

/// Canonical Gemini API base URL.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Capability a model must advertise to be usable for text generation.
pub const GENERATE_CONTENT: &str = "generateContent";

const CONNECT_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 120;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The provider asked us to slow down (HTTP 429 / `RESOURCE_EXHAUSTED`).
    #[error("{message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },
    /// Any other non-success response. Displays the provider's message as-is.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

/// A model listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: ModelId,
    pub capabilities: Vec<String>,
}

impl ModelInfo {
    #[must_use]
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

/// A hosted text-generation model.
pub trait TextModel {
    fn list_models(&self) -> impl Future<Output = Result<Vec<ModelInfo>, RemoteError>> + Send;

    fn generate(
        &self,
        model: &ModelId,
        prompt: &str,
    ) -> impl Future<Output = Result<String, RemoteError>> + Send;
}

/// Generate text, retrying rate-limited attempts per `config`.
pub async fn generate_with_retry<M, S>(
    client: &M,
    model: &ModelId,
    prompt: &str,
    config: &RetryConfig,
    sleeper: &S,
) -> Result<String, RemoteError>
where
    M: TextModel + Sync,
    S: Sleeper + Sync,
{
    call_with_retry(|_attempt| client.generate(model, prompt), config, sleeper).await
}

fn base_client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
}

/// HTTP client for `base_url`. HTTPS is enforced unless the base is plain HTTP
/// (local proxies and test servers).
pub fn http_client(base_url: &str) -> Result<reqwest::Client, reqwest::Error> {
    let https = base_url.starts_with("https://");
    if !https {
        tracing::warn!(base_url, "Using a non-HTTPS model endpoint");
    }
    base_client_builder().https_only(https).build()
}

pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
