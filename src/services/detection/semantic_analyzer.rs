// Semantic Analyzer
// Single-shot language-model analysis of one message.
// Every failure is captured as data on the verdict; nothing is thrown past this boundary.

use crate::models::{ApiErrorKind, BiasCategory, ReasoningQuality, SemanticVerdict};
use crate::services::config_store::AppConfig;
use crate::services::providers::{ChatPrompt, ChatResult, ChatTransport, ProviderError};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::prompts;

const EDUCATIONAL_MAX_TOKENS: u32 = 500;
const EDUCATIONAL_TEMPERATURE: f64 = 0.5;
/// Raw payload characters kept in the malformed-response log line.
const RAW_LOG_MAX_CHARS: usize = 2000;

#[derive(Debug, Clone)]
pub struct SemanticSettings {
    pub model: String,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f64,
    pub context_window: usize,
}

impl Default for SemanticSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4-turbo-preview".to_string(),
            timeout: Duration::from_secs(30),
            max_tokens: 1000,
            temperature: 0.3,
            context_window: 5,
        }
    }
}

impl SemanticSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.provider.model.clone(),
            timeout: Duration::from_secs(config.analysis.model_timeout_secs.max(1)),
            max_tokens: config.provider.max_tokens,
            temperature: config.provider.temperature,
            context_window: config.analysis.context_window,
        }
    }
}

/// Holds no per-call state; clones share the transport.
#[derive(Clone)]
pub struct SemanticAnalyzer {
    transport: Arc<dyn ChatTransport>,
    settings: SemanticSettings,
    system_prompt: Arc<str>,
}

impl SemanticAnalyzer {
    pub fn new(transport: Arc<dyn ChatTransport>, settings: SemanticSettings) -> Self {
        let system_prompt: Arc<str> = prompts::analysis_system_prompt(&BiasCategory::ALL).into();
        Self {
            transport,
            settings,
            system_prompt,
        }
    }

    /// Analyze `text` with up to `context_window` prior messages of `context`.
    pub async fn analyze(&self, text: &str, context: &[String]) -> SemanticVerdict {
        let started = Instant::now();
        let prompt = ChatPrompt {
            model: self.settings.model.clone(),
            system: self.system_prompt.to_string(),
            user: prompts::analysis_user_message(text, context, self.settings.context_window),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            json_mode: true,
        };

        let reply = match self.complete(&prompt).await {
            Ok(reply) => reply,
            Err(kind) => return SemanticVerdict::failed(kind),
        };

        match parse_verdict(&reply.content) {
            Ok(verdict) => {
                info!(
                    "[SEMANTIC] analysis ok categories={} quality={} confidence={:.3} latency_ms={} elapsed_ms={}",
                    verdict.categories.len(),
                    verdict.reasoning_quality.as_str(),
                    verdict.confidence,
                    reply.latency_ms,
                    started.elapsed().as_millis()
                );
                if !verdict.unmapped_labels.is_empty() {
                    info!("[SEMANTIC] labels outside vocabulary: {:?}", verdict.unmapped_labels);
                }
                verdict
            }
            Err(reason) => {
                warn!(
                    raw = %prompts::truncate_chars(&reply.content, RAW_LOG_MAX_CHARS),
                    "[SEMANTIC] malformed response: {}",
                    reason
                );
                SemanticVerdict::failed(ApiErrorKind::MalformedResponse)
            }
        }
    }

    /// Constructive follow-up explaining a verdict. `None` when nothing was flagged.
    pub async fn educational_reply(
        &self,
        verdict: &SemanticVerdict,
        original_text: &str,
    ) -> Result<Option<String>, ApiErrorKind> {
        if !verdict.is_ok() || !verdict.has_findings() {
            return Ok(None);
        }

        let prompt = ChatPrompt {
            model: self.settings.model.clone(),
            system: prompts::EDUCATOR_SYSTEM_PROMPT.to_string(),
            user: prompts::educational_prompt(verdict, original_text),
            max_tokens: EDUCATIONAL_MAX_TOKENS,
            temperature: EDUCATIONAL_TEMPERATURE,
            json_mode: false,
        };

        let reply = self.complete(&prompt).await?;
        Ok(Some(reply.content.trim().to_string()))
    }

    async fn complete(&self, prompt: &ChatPrompt) -> Result<ChatResult, ApiErrorKind> {
        let result = match tokio::time::timeout(self.settings.timeout, self.transport.complete(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.settings.timeout)),
        };

        result.map_err(|e| {
            let kind = e.kind();
            match e.raw_body() {
                Some(raw) => warn!(kind = kind.as_str(), raw = %raw, "[SEMANTIC] model call failed: {}", e),
                None => warn!(kind = kind.as_str(), "[SEMANTIC] model call failed: {}", e),
            }
            kind
        })
    }
}

/// Parse a model reply into a verdict, coercing malformed fields to safe defaults.
/// Only a reply that is not a JSON object at all is an error.
pub fn parse_verdict(content: &str) -> Result<SemanticVerdict, String> {
    let json_str = extract_json(content.trim())?;
    let value: Value = serde_json::from_str(&json_str).map_err(|e| format!("JSON parse error: {}", e))?;
    let obj = value.as_object().ok_or_else(|| "response is not a JSON object".to_string())?;

    let mut categories = BTreeSet::new();
    let mut unmapped_labels = Vec::new();
    let labels = obj.get("categories").or_else(|| obj.get("detected_biases"));
    for label in string_list(labels) {
        match BiasCategory::from_label(&label) {
            Some(category) => {
                categories.insert(category);
            }
            None => unmapped_labels.push(label),
        }
    }

    let reasoning_quality = obj
        .get("reasoning_quality")
        .and_then(Value::as_str)
        .and_then(ReasoningQuality::from_label)
        .unwrap_or_default();

    let summary = obj
        .get("summary")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(SemanticVerdict {
        categories,
        reasoning_quality,
        discussion_issues: string_list(obj.get("discussion_issues")),
        suggestions: string_list(obj.get("suggestions")),
        confidence: coerce_confidence(obj.get("confidence")),
        summary,
        unmapped_labels,
        api_error: None,
        error_message: None,
    })
}

/// Extract JSON from response content
fn extract_json(content: &str) -> Result<String, String> {
    if content.starts_with('{') {
        Ok(content.to_string())
    } else if let Some(start) = content.find('{') {
        match content.rfind('}') {
            Some(end) if end > start => Ok(content[start..=end].to_string()),
            _ => Err("Invalid JSON response".to_string()),
        }
    } else {
        Err("No JSON in response".to_string())
    }
}

/// Strings from an array (or a lone string); other item types are dropped.
fn string_list(value: Option<&Value>) -> Vec<String> {
    let items: Vec<&Value> = match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(v @ Value::String(_)) => vec![v],
        _ => Vec::new(),
    };
    items
        .into_iter()
        .filter_map(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Number, numeric string or percentage -> [0, 1]; anything else -> 0.
fn coerce_confidence(value: Option<&Value>) -> f64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(v) if v.is_finite() && v > 1.0 && v <= 100.0 => v / 100.0,
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
        _ => 0.0,
    }
}
