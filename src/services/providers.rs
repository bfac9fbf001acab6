// Chat Provider Service
// OpenAI-compatible chat completion client and the failure classification
// used by the semantic analyzer. Error kinds are decided here, once.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use crate::models::ApiErrorKind;
use crate::services::config_store::AppConfig;

pub const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const OPENAI_PROVIDER: &str = "openai";

/// Raw response bodies kept on a malformed-response error are cut to this many characters.
const RAW_BODY_MAX_CHARS: usize = 2000;

/// Body fragments that mark a 400/429 as an account-level limit rather than throttling.
const QUOTA_MARKERS: &[&str] = &["insufficient_quota", "quota", "billing", "credit balance"];

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Missing content in response")]
    MissingContent { body: String },
    #[error("JSON parse error: {message}")]
    JsonError { message: String, body: String },
    #[error("API key not configured")]
    MissingApiKey,
}

impl ProviderError {
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ProviderError::HttpError(e) => classify_transport(e),
            ProviderError::ApiError { status, message } => classify_status(*status, message),
            ProviderError::Timeout(_) => ApiErrorKind::ConnectionFailure,
            ProviderError::MissingContent { .. } | ProviderError::JsonError { .. } => {
                ApiErrorKind::MalformedResponse
            }
            ProviderError::MissingApiKey => ApiErrorKind::InvalidCredentials,
        }
    }

    /// The (truncated) response body behind a malformed-response error.
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            ProviderError::MissingContent { body } | ProviderError::JsonError { body, .. } => {
                Some(body.as_str())
            }
            _ => None,
        }
    }
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(RAW_BODY_MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Map an HTTP error status (and its body) onto the error taxonomy.
pub fn classify_status(status: u16, body: &str) -> ApiErrorKind {
    let lowered = body.to_lowercase();
    let quota = QUOTA_MARKERS.iter().any(|m| lowered.contains(m));
    match status {
        401 | 403 => ApiErrorKind::InvalidCredentials,
        402 => ApiErrorKind::QuotaExceeded,
        429 if quota => ApiErrorKind::QuotaExceeded,
        429 => ApiErrorKind::RateLimited,
        400 if quota => ApiErrorKind::QuotaExceeded,
        408 => ApiErrorKind::ConnectionFailure,
        _ => ApiErrorKind::ServiceUnavailable,
    }
}

fn classify_transport(err: &reqwest::Error) -> ApiErrorKind {
    if err.is_decode() {
        ApiErrorKind::MalformedResponse
    } else if let Some(status) = err.status() {
        classify_status(status.as_u16(), "")
    } else {
        ApiErrorKind::ConnectionFailure
    }
}

/// Provider-neutral chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    pub model: String,
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub json_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    pub content: String,
    pub latency_ms: i64,
}

/// One completion per call; implementations must be shareable across tasks.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<ChatResult, ProviderError>;
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Clone)]
pub struct ProviderClient {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ProviderClient {
    pub fn new(url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn with_proxy(
        url: &str,
        api_key: Option<String>,
        timeout: Duration,
        proxy_url: &str,
    ) -> Result<Self, ProviderError> {
        let proxy = reqwest::Proxy::all(proxy_url)?;
        let client = Client::builder().timeout(timeout).proxy(proxy).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Client for the configured endpoint, key resolved from env or config file.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let url = config
            .provider
            .base_url
            .clone()
            .unwrap_or_else(|| OPENAI_DEFAULT_URL.to_string());
        let timeout = Duration::from_secs(config.analysis.model_timeout_secs.max(1));
        let api_key = resolve_api_key(config);

        match config.proxy.as_ref().filter(|p| p.enabled) {
            Some(proxy) => match proxy.https.as_deref().or(proxy.http.as_deref()) {
                Some(proxy_url) => Self::with_proxy(&url, api_key, timeout, proxy_url),
                None => Self::new(&url, api_key, timeout),
            },
            None => Self::new(&url, api_key, timeout),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn call_chat_api(&self, prompt: &ChatPrompt) -> Result<ChatResult, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;

        let request = ChatRequest {
            model: prompt.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: prompt.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.user.clone(),
                },
            ],
            max_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
            response_format: if prompt.json_mode {
                Some(ResponseFormat {
                    r#type: "json_object".to_string(),
                })
            } else {
                None
            },
        };

        let start = Instant::now();

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let data: ChatResponse = serde_json::from_str(&body).map_err(|e| ProviderError::JsonError {
            message: e.to_string(),
            body: truncate_body(&body),
        })?;

        let content = data
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingContent {
                body: truncate_body(&body),
            })?;

        debug!(
            "[PROVIDER] completion ok model={} latency_ms={} chars={}",
            prompt.model,
            latency_ms,
            content.chars().count()
        );

        Ok(ChatResult { content, latency_ms })
    }
}

#[async_trait]
impl ChatTransport for ProviderClient {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<ChatResult, ProviderError> {
        self.call_chat_api(prompt).await
    }
}

/// Get the API key from the environment, then from the given config.
pub fn resolve_api_key(config: &AppConfig) -> Option<String> {
    for key in ["OPENAI_API_KEY", "COGNIBOT_OPENAI_API_KEY"] {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    config
        .api_keys
        .get(OPENAI_PROVIDER)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}
