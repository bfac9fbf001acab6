// Analysis Pipeline
// Input validation, concurrent pattern + semantic analysis, merge into a report.

use crate::models::{AnalysisReport, ApiErrorKind, SemanticVerdict};
use crate::services::config_store::AppConfig;
use crate::services::providers::{ChatTransport, ProviderClient, ProviderError};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::aggregation::AnalysisAggregator;
use super::pattern_matcher::PatternMatcher;
use super::retry::{retry_analyze, RetryPolicy};
use super::semantic_analyzer::{SemanticAnalyzer, SemanticSettings};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Message is too long: {len} characters (limit {max})")]
    TooLong { len: usize, max: usize },
}

pub struct AnalysisPipeline {
    matcher: &'static PatternMatcher,
    semantic: Option<SemanticAnalyzer>,
    aggregator: AnalysisAggregator,
    max_input_chars: usize,
    retry: Option<RetryPolicy>,
}

impl AnalysisPipeline {
    pub fn new(
        semantic: Option<SemanticAnalyzer>,
        aggregator: AnalysisAggregator,
        max_input_chars: usize,
    ) -> Self {
        Self {
            matcher: PatternMatcher::shared(),
            semantic,
            aggregator,
            max_input_chars,
            retry: None,
        }
    }

    /// Pipeline wired from configuration. With `use_llm` the semantic layer talks to the
    /// configured endpoint; a missing API key surfaces later as `InvalidCredentials`.
    pub fn from_config(config: &AppConfig, use_llm: bool) -> Result<Self, ProviderError> {
        let semantic = if use_llm {
            let client = ProviderClient::from_config(config)?;
            if !client.has_api_key() {
                warn!("[PIPELINE] no API key configured; semantic analysis will report invalid credentials");
            }
            let transport: Arc<dyn ChatTransport> = Arc::new(client);
            Some(SemanticAnalyzer::new(transport, SemanticSettings::from_config(config)))
        } else {
            None
        };

        Ok(Self::new(
            semantic,
            AnalysisAggregator::new(config.analysis.confidence_threshold),
            config.analysis.max_message_length,
        ))
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn has_semantic_layer(&self) -> bool {
        self.semantic.is_some()
    }

    pub fn aggregator(&self) -> &AnalysisAggregator {
        &self.aggregator
    }

    /// Over-long input is rejected whole, never truncated.
    pub fn validate_input(&self, text: &str) -> Result<usize, InputError> {
        let len = text.chars().count();
        if len > self.max_input_chars {
            return Err(InputError::TooLong {
                len,
                max: self.max_input_chars,
            });
        }
        Ok(len)
    }

    pub async fn analyze(&self, text: &str, context: &[String]) -> Result<AnalysisReport, InputError> {
        let input_chars = self.validate_input(text)?;
        let id = Uuid::new_v4();
        info!("[PIPELINE] analysis start id={} chars={}", id, input_chars);

        let (pattern_matches, verdict) = match &self.semantic {
            Some(analyzer) => {
                let (pattern_matches, semantic) =
                    tokio::join!(async { self.matcher.detect(text) }, self.run_semantic(analyzer, text, context));
                let verdict = self.aggregator.combine(&pattern_matches, &semantic);
                (pattern_matches, verdict)
            }
            None => {
                let pattern_matches = self.matcher.detect(text);
                let verdict = self.aggregator.combine_pattern_only(&pattern_matches);
                (pattern_matches, verdict)
            }
        };

        if let Some(kind) = verdict.semantic_error {
            warn!("[PIPELINE] id={} degraded to pattern-only: {}", id, kind);
        }
        info!(
            "[PIPELINE] analysis done id={} categories={} confidence={:.3} actionable={}",
            id,
            verdict.categories.len(),
            verdict.confidence,
            verdict.actionable
        );

        Ok(AnalysisReport {
            id,
            analyzed_at: Utc::now(),
            input_chars,
            pattern_matches,
            verdict,
        })
    }

    /// Constructive follow-up for a report. `None` without a semantic layer,
    /// for degraded reports, and when nothing was flagged.
    pub async fn explain(&self, report: &AnalysisReport, original_text: &str) -> Result<Option<String>, ApiErrorKind> {
        let analyzer = match &self.semantic {
            Some(analyzer) if !report.verdict.is_degraded() => analyzer,
            _ => return Ok(None),
        };

        let verdict = SemanticVerdict {
            categories: report.verdict.categories.clone(),
            reasoning_quality: report.verdict.reasoning_quality,
            discussion_issues: report.verdict.discussion_issues.clone(),
            suggestions: report.verdict.suggestions.clone(),
            confidence: report.verdict.semantic_confidence.unwrap_or(0.0),
            summary: report.verdict.summary.clone(),
            ..Default::default()
        };
        analyzer.educational_reply(&verdict, original_text).await
    }

    async fn run_semantic(&self, analyzer: &SemanticAnalyzer, text: &str, context: &[String]) -> SemanticVerdict {
        match self.retry {
            Some(policy) => retry_analyze(analyzer, text, context, policy).await,
            None => {
                debug!("[PIPELINE] single-shot semantic call");
                analyzer.analyze(text, context).await
            }
        }
    }
}
