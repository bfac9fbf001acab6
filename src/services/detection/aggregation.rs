// Aggregation Logic
// Merges pattern matches and the semantic verdict into one unified verdict.
// Pure: no I/O, no suspension points, never fails.

use crate::models::{
    ApiErrorKind, BiasCategory, CategorySource, PatternMatch, ReasoningQuality, SemanticVerdict,
    UnifiedVerdict,
};
use std::collections::{BTreeMap, BTreeSet};

use super::pattern_catalog;
use super::pattern_matcher::{category_scores, pattern_confidence};

/// Weight of the semantic confidence when the semantic layer succeeded.
pub const SEMANTIC_WEIGHT: f64 = 0.7;
/// Weight of the pattern confidence when the semantic layer succeeded.
pub const PATTERN_WEIGHT: f64 = 0.3;
/// Generic issues/suggestions substituted from the catalog.
const MAX_GENERIC_ITEMS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisAggregator {
    threshold: f64,
}

impl Default for AnalysisAggregator {
    fn default() -> Self {
        Self { threshold: 0.7 }
    }
}

impl AnalysisAggregator {
    /// Thresholds outside [0, 1] are clamped.
    pub fn new(threshold: f64) -> Self {
        let threshold = if threshold.is_nan() { 0.7 } else { threshold.clamp(0.0, 1.0) };
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Merge both layers. A failed semantic verdict contributes its error and nothing else.
    pub fn combine(&self, matches: &[PatternMatch], semantic: &SemanticVerdict) -> UnifiedVerdict {
        let pattern_scores = category_scores(matches);
        let pattern_conf = pattern_confidence(matches);

        if !semantic.is_ok() {
            return self.degraded(
                pattern_scores,
                pattern_conf,
                semantic.api_error,
                semantic.error_message.clone(),
            );
        }

        let mut source_breakdown: BTreeMap<BiasCategory, CategorySource> = pattern_scores
            .keys()
            .map(|c| (*c, CategorySource::Pattern))
            .collect();
        for category in &semantic.categories {
            source_breakdown
                .entry(*category)
                .and_modify(|s| *s = CategorySource::Both)
                .or_insert(CategorySource::Semantic);
        }
        let categories: BTreeSet<BiasCategory> = source_breakdown.keys().copied().collect();

        let semantic_conf = semantic.confidence.clamp(0.0, 1.0);
        // Without pattern evidence the weights renormalize onto the semantic layer.
        let blended = if pattern_scores.is_empty() {
            semantic_conf
        } else {
            SEMANTIC_WEIGHT * semantic_conf + PATTERN_WEIGHT * pattern_conf
        };
        let confidence = blended.clamp(0.0, 1.0);

        let discussion_issues = if semantic.discussion_issues.is_empty() {
            generic_issues(pattern_scores.keys())
        } else {
            semantic.discussion_issues.clone()
        };
        let suggestions = if semantic.suggestions.is_empty() {
            generic_suggestions(categories.iter())
        } else {
            semantic.suggestions.clone()
        };

        let has_findings = !categories.is_empty() || !semantic.discussion_issues.is_empty();

        UnifiedVerdict {
            categories,
            confidence,
            pattern_confidence: pattern_conf,
            semantic_confidence: Some(semantic_conf),
            reasoning_quality: semantic.reasoning_quality,
            discussion_issues,
            suggestions,
            source_breakdown,
            pattern_scores,
            summary: semantic.summary.clone(),
            semantic_error: None,
            error_message: None,
            threshold: self.threshold,
            actionable: has_findings && self.is_actionable(confidence),
        }
    }

    /// Verdict from pattern matches alone, for runs without a semantic layer.
    pub fn combine_pattern_only(&self, matches: &[PatternMatch]) -> UnifiedVerdict {
        self.degraded(category_scores(matches), pattern_confidence(matches), None, None)
    }

    pub fn is_actionable(&self, confidence: f64) -> bool {
        confidence >= self.threshold
    }

    fn degraded(
        &self,
        pattern_scores: BTreeMap<BiasCategory, f64>,
        pattern_conf: f64,
        semantic_error: Option<ApiErrorKind>,
        error_message: Option<String>,
    ) -> UnifiedVerdict {
        let categories: BTreeSet<BiasCategory> = pattern_scores.keys().copied().collect();
        let source_breakdown = categories
            .iter()
            .map(|c| (*c, CategorySource::Pattern))
            .collect();

        UnifiedVerdict {
            discussion_issues: generic_issues(categories.iter()),
            suggestions: generic_suggestions(categories.iter()),
            actionable: !categories.is_empty() && self.is_actionable(pattern_conf),
            categories,
            confidence: pattern_conf,
            pattern_confidence: pattern_conf,
            semantic_confidence: None,
            reasoning_quality: ReasoningQuality::Fair,
            source_breakdown,
            pattern_scores,
            summary: None,
            semantic_error,
            error_message,
            threshold: self.threshold,
        }
    }
}

fn generic_issues<'a>(categories: impl Iterator<Item = &'a BiasCategory>) -> Vec<String> {
    categories
        .take(MAX_GENERIC_ITEMS)
        .map(|c| format!("{}: {}", c.display_name(), pattern_catalog::description(*c)))
        .collect()
}

fn generic_suggestions<'a>(categories: impl Iterator<Item = &'a BiasCategory>) -> Vec<String> {
    categories
        .take(MAX_GENERIC_ITEMS)
        .map(|c| pattern_catalog::advice(*c).to_string())
        .collect()
}
