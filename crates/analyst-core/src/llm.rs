//! Language model boundary
//!
//! The engine talks to exactly one trait, [`LanguageModel`], so plan
//! generation is testable with a scripted fake and deployable against any
//! chat-completions-compatible endpoint. [`HttpModel`] is the production
//! implementation.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// One completion request: a system prompt and a user prompt
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// Instructions and contract (wire schema, dataset summary)
    pub system: String,
    /// The analyst's natural-language request plus corrective feedback
    pub user: String,
}

/// Model transport and protocol failures
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The endpoint rejected the request
    #[error("model endpoint returned {status}: {message}")]
    Endpoint {
        status: u16,
        message: String,
        retryable: bool,
    },

    /// The request never reached the endpoint or timed out
    #[error("model request failed: {message}")]
    Transport { message: String, retryable: bool },

    /// The endpoint answered with no usable text
    #[error("model returned an empty completion")]
    EmptyCompletion,
}

impl ModelError {
    /// Whether a retry with the same request could plausibly succeed
    #[must_use]
    pub fn retryable(&self) -> bool {
        match self {
            Self::Endpoint { retryable, .. } | Self::Transport { retryable, .. } => *retryable,
            Self::EmptyCompletion => true,
        }
    }
}

/// A text-in, text-out completion backend
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Produce one completion for `request`
    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelError>;

    /// Backend name for logging
    fn name(&self) -> &str {
        "model"
    }
}

/// Chat-completions HTTP client
#[derive(Clone)]
pub struct HttpModel {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl HttpModel {
    /// Build a client for the given key and model name
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_timeout_inner(api_key.into(), model.into(), REQUEST_TIMEOUT)
    }

    /// Build a client with an explicit request timeout
    pub fn with_timeout(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self::with_timeout_inner(api_key.into(), model.into(), timeout)
    }

    fn with_timeout_inner(api_key: String, model: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Configure from `OPENAI_API_KEY`, `OPENAI_MODEL_NAME`, and
    /// `OPENAI_BASE_URL`
    ///
    /// The model name defaults to `gpt-4o`; the base URL to the OpenAI
    /// chat completions endpoint.
    pub fn try_from_env() -> Result<Self, ModelError> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| ModelError::Transport {
            message: "OPENAI_API_KEY is not set".into(),
            retryable: false,
        })?;
        let model = env::var("OPENAI_MODEL_NAME").unwrap_or_else(|_| DEFAULT_MODEL.into());
        let mut this = Self::new(api_key, model);
        if let Ok(url) = env::var("OPENAI_BASE_URL") {
            this.base_url = url;
        }
        Ok(this)
    }

    /// Point the client at a different endpoint
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl LanguageModel for HttpModel {
    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelError> {
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: request.user.clone(),
                },
            ],
        };

        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|err| ModelError::Transport {
                message: err.to_string(),
                retryable: err.is_connect() || err.is_timeout(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .ok()
                .and_then(|text| {
                    serde_json::from_str::<ErrorResponse>(&text)
                        .map(|e| e.error.message)
                        .ok()
                        .or(Some(text))
                })
                .unwrap_or_default();
            return Err(ModelError::Endpoint {
                status: status.as_u16(),
                message,
                retryable: matches!(
                    status,
                    StatusCode::TOO_MANY_REQUESTS
                        | StatusCode::INTERNAL_SERVER_ERROR
                        | StatusCode::BAD_GATEWAY
                        | StatusCode::SERVICE_UNAVAILABLE
                        | StatusCode::GATEWAY_TIMEOUT
                ),
            });
        }

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(|err| ModelError::Transport {
                message: format!("malformed completion body: {err}"),
                retryable: false,
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ModelError::EmptyCompletion)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}
