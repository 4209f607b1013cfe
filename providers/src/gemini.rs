//! Gemini REST client.
//!
//! - `GET {base}/models` (paginated) lists models and their
//!   `supportedGenerationMethods`.
//! - `POST {base}/{model}:generateContent` sends a single user turn and returns
//!   the first candidate's text.
//!
//! The API key travels in the `x-goog-api-key` header, never in the URL.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use reqwest::header::RETRY_AFTER;

use jifra_types::{ApiKey, ModelId};

use crate::wire::{ErrorEnvelope, GenerateRequest, GenerateResponse, ListModelsResponse};
use crate::{
    GEMINI_API_BASE_URL, ModelInfo, RemoteError, TextModel, http_client, read_capped_error_body,
};

const API_KEY_HEADER: &str = "x-goog-api-key";
const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";
const LIST_PAGE_SIZE: u32 = 1000;
/// Guards against a server that keeps handing out page tokens.
const MAX_LIST_PAGES: usize = 20;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: ApiKey,
    base_url: String,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: ApiKey) -> Result<Self, RemoteError> {
        Self::with_base_url(api_key, GEMINI_API_BASE_URL)
    }

    /// Client against a custom endpoint (proxy, test server).
    pub fn with_base_url(api_key: ApiKey, base_url: &str) -> Result<Self, RemoteError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let http = http_client(&base_url)?;
        Ok(Self {
            api_key,
            base_url,
            http,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn list_page(&self, page_token: Option<&str>) -> Result<ListModelsResponse, RemoteError> {
        let mut url = Url::parse(&format!("{}/models", self.base_url))
            .map_err(|e| RemoteError::Transport(format!("invalid base URL: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pageSize", &LIST_PAGE_SIZE.to_string());
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }

        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response
            .json::<ListModelsResponse>()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }
}

impl TextModel for GeminiClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, RemoteError> {
        let mut models = Vec::new();
        let mut token: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let page = self.list_page(token.as_deref()).await?;
            for model in page.models {
                match ModelId::parse(&model.name) {
                    Ok(id) => models.push(ModelInfo {
                        id,
                        capabilities: model.supported_generation_methods,
                    }),
                    Err(_) => tracing::debug!("Skipping unnamed model in listing"),
                }
            }
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        tracing::debug!(count = models.len(), "Listed models");
        Ok(models)
    }

    async fn generate(&self, model: &ModelId, prompt: &str) -> Result<String, RemoteError> {
        let url = format!("{}/{}:generateContent", self.base_url, model.as_str());
        tracing::debug!(model = %model, prompt_chars = prompt.chars().count(), "generateContent");

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&GenerateRequest::user_text(prompt))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

        if let Some(reason) = body.finish_reason().and_then(|r| r.error_message()) {
            return Err(RemoteError::InvalidResponse(reason.to_string()));
        }
        match body.first_text() {
            Some(text) => Ok(text),
            None => {
                let blocked = body
                    .prompt_feedback
                    .and_then(|feedback| feedback.block_reason)
                    .map_or_else(
                        || "response contained no candidates".to_string(),
                        |reason| format!("prompt blocked: {reason}"),
                    );
                Err(RemoteError::InvalidResponse(blocked))
            }
        }
    }
}

async fn error_from_response(response: reqwest::Response) -> RemoteError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_retry_after);
    let body = read_capped_error_body(response).await;
    classify_error(status, retry_after, &body)
}

fn classify_error(status: StatusCode, retry_after: Option<Duration>, body: &str) -> RemoteError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let api_status = envelope.as_ref().and_then(|e| e.error.status.as_deref());
    let message = envelope
        .as_ref()
        .and_then(|e| e.error.message.clone())
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status.to_string()
            } else {
                trimmed.to_string()
            }
        });

    if status == StatusCode::TOO_MANY_REQUESTS || api_status == Some(RESOURCE_EXHAUSTED) {
        tracing::debug!(%status, ?retry_after, "Rate limited by provider");
        return RemoteError::RateLimited {
            message,
            retry_after,
        };
    }

    tracing::warn!(%status, ?api_status, "Provider returned an error");
    RemoteError::Api {
        status: status.as_u16(),
        message,
    }
}

/// `Retry-After` in delta-seconds form. HTTP dates are ignored.
fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}
