// Caller-side Retry
// The analyzer itself is single-shot; callers that want retries wrap it here.

use crate::models::SemanticVerdict;
use std::time::Duration;
use tracing::{info, warn};

use super::semantic_analyzer::SemanticAnalyzer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: usize,
    /// Sleep before attempt `n + 1` is `base_backoff * n`.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(400),
        }
    }
}

impl RetryPolicy {
    pub fn with_attempts(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }
}

/// Run `analyze` until it succeeds, fails with a non-retryable kind, or attempts run out.
/// Returns the last verdict either way.
pub async fn retry_analyze(
    analyzer: &SemanticAnalyzer,
    text: &str,
    context: &[String],
    policy: RetryPolicy,
) -> SemanticVerdict {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let verdict = analyzer.analyze(text, context).await;
        let kind = match verdict.api_error {
            None => {
                if attempt > 1 {
                    info!("[RETRY] semantic analysis ok on attempt={}", attempt);
                }
                return verdict;
            }
            Some(kind) => kind,
        };

        if !kind.is_retryable() || attempt >= max_attempts {
            if kind.is_retryable() {
                warn!("[RETRY] giving up after attempt={} kind={}", attempt, kind);
            }
            return verdict;
        }

        let backoff = policy.base_backoff * attempt as u32;
        warn!(
            "[RETRY] attempt={} failed kind={} backoff_ms={}",
            attempt,
            kind,
            backoff.as_millis()
        );
        tokio::time::sleep(backoff).await;
        attempt += 1;
    }
}
