// CogniBot Data Models
// Shared types for pattern matching, semantic analysis and the merged verdict

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

// ============ Bias Categories ============

/// Reasoning-pattern tag shared by the pattern catalog and the semantic layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasCategory {
    ConfirmationBias,
    AdHominem,
    Strawman,
    FalseDichotomy,
    AppealToAuthority,
    Bandwagon,
    SlipperySlope,
    CircularReasoning,
    HastyGeneralization,
    SurvivorshipBias,
    AnchoringBias,
    AvailabilityHeuristic,
    AffirmingTheConsequent,
}

impl BiasCategory {
    pub const ALL: [BiasCategory; 13] = [
        BiasCategory::ConfirmationBias,
        BiasCategory::AdHominem,
        BiasCategory::Strawman,
        BiasCategory::FalseDichotomy,
        BiasCategory::AppealToAuthority,
        BiasCategory::Bandwagon,
        BiasCategory::SlipperySlope,
        BiasCategory::CircularReasoning,
        BiasCategory::HastyGeneralization,
        BiasCategory::SurvivorshipBias,
        BiasCategory::AnchoringBias,
        BiasCategory::AvailabilityHeuristic,
        BiasCategory::AffirmingTheConsequent,
    ];

    /// Wire tag, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            BiasCategory::ConfirmationBias => "confirmation_bias",
            BiasCategory::AdHominem => "ad_hominem",
            BiasCategory::Strawman => "strawman",
            BiasCategory::FalseDichotomy => "false_dichotomy",
            BiasCategory::AppealToAuthority => "appeal_to_authority",
            BiasCategory::Bandwagon => "bandwagon",
            BiasCategory::SlipperySlope => "slippery_slope",
            BiasCategory::CircularReasoning => "circular_reasoning",
            BiasCategory::HastyGeneralization => "hasty_generalization",
            BiasCategory::SurvivorshipBias => "survivorship_bias",
            BiasCategory::AnchoringBias => "anchoring_bias",
            BiasCategory::AvailabilityHeuristic => "availability_heuristic",
            BiasCategory::AffirmingTheConsequent => "affirming_the_consequent",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            BiasCategory::ConfirmationBias => "Confirmation Bias",
            BiasCategory::AdHominem => "Ad Hominem",
            BiasCategory::Strawman => "Strawman",
            BiasCategory::FalseDichotomy => "False Dichotomy",
            BiasCategory::AppealToAuthority => "Appeal To Authority",
            BiasCategory::Bandwagon => "Bandwagon",
            BiasCategory::SlipperySlope => "Slippery Slope",
            BiasCategory::CircularReasoning => "Circular Reasoning",
            BiasCategory::HastyGeneralization => "Hasty Generalization",
            BiasCategory::SurvivorshipBias => "Survivorship Bias",
            BiasCategory::AnchoringBias => "Anchoring Bias",
            BiasCategory::AvailabilityHeuristic => "Availability Heuristic",
            BiasCategory::AffirmingTheConsequent => "Affirming The Consequent",
        }
    }

    /// Map a free-form label (as returned by a language model) onto the vocabulary.
    /// Accepts the wire tags, display names and a handful of common synonyms.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| *c != '\'' && *c != '’')
            .map(|c| if c.is_whitespace() || c == '-' || c == '/' { '_' } else { c })
            .collect();
        let normalized = normalized.trim_matches('_');

        let category = match normalized {
            "confirmation_bias" | "confirmation" => BiasCategory::ConfirmationBias,
            "ad_hominem" | "ad_hominem_attack" | "personal_attack" => BiasCategory::AdHominem,
            "strawman" | "straw_man" | "strawman_fallacy" | "straw_man_fallacy" => {
                BiasCategory::Strawman
            }
            "false_dichotomy" | "false_dilemma" | "black_and_white_thinking" | "either_or_fallacy" => {
                BiasCategory::FalseDichotomy
            }
            "appeal_to_authority" | "argument_from_authority" => BiasCategory::AppealToAuthority,
            "bandwagon" | "bandwagon_effect" | "bandwagon_fallacy" | "appeal_to_popularity" => {
                BiasCategory::Bandwagon
            }
            "slippery_slope" | "slippery_slope_fallacy" => BiasCategory::SlipperySlope,
            "circular_reasoning" | "begging_the_question" | "circular_argument" => {
                BiasCategory::CircularReasoning
            }
            "hasty_generalization" | "overgeneralization" | "hasty_generalisation" => {
                BiasCategory::HastyGeneralization
            }
            "survivorship_bias" | "survivorship" => BiasCategory::SurvivorshipBias,
            "anchoring_bias" | "anchoring" => BiasCategory::AnchoringBias,
            "availability_heuristic" | "availability_bias" => BiasCategory::AvailabilityHeuristic,
            "affirming_the_consequent"
            | "affirming_consequent"
            | "affirmation_of_the_consequent"
            | "converse_error"
            | "fallacy_of_the_converse" => BiasCategory::AffirmingTheConsequent,
            _ => return None,
        };
        Some(category)
    }
}

impl fmt::Display for BiasCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============ Reasoning Quality ============

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningQuality {
    Poor,
    #[default]
    Fair,
    Good,
    Excellent,
}

impl ReasoningQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasoningQuality::Poor => "poor",
            ReasoningQuality::Fair => "fair",
            ReasoningQuality::Good => "good",
            ReasoningQuality::Excellent => "excellent",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "poor" | "bad" | "weak" => Some(ReasoningQuality::Poor),
            "fair" | "average" | "moderate" => Some(ReasoningQuality::Fair),
            "good" | "sound" | "strong" => Some(ReasoningQuality::Good),
            "excellent" => Some(ReasoningQuality::Excellent),
            _ => None,
        }
    }
}

// ============ Pattern Matches ============

/// How strongly a pattern finding should be presented.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.8 {
            Severity::High
        } else if confidence >= 0.6 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSpan {
    /// UTF-8 byte offset (0-based) into the analyzed text.
    pub start: usize,
    /// UTF-8 byte offset (0-based, end-exclusive) into the analyzed text.
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMatch {
    pub category: BiasCategory,
    pub span: MatchSpan,
    pub raw_pattern: String,
    pub matched_text: String,
    /// Category-level confidence; identical for every match of one category.
    pub confidence: f64,
}

// ============ Semantic Verdict ============

/// Closed set of semantic-layer failures, decided once at the network boundary.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    InvalidCredentials,
    RateLimited,
    QuotaExceeded,
    ServiceUnavailable,
    ConnectionFailure,
    MalformedResponse,
}

impl ApiErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiErrorKind::InvalidCredentials => "invalid_credentials",
            ApiErrorKind::RateLimited => "rate_limited",
            ApiErrorKind::QuotaExceeded => "quota_exceeded",
            ApiErrorKind::ServiceUnavailable => "service_unavailable",
            ApiErrorKind::ConnectionFailure => "connection_failure",
            ApiErrorKind::MalformedResponse => "malformed_response",
        }
    }

    /// Short, non-technical explanation suitable for end users.
    pub fn user_message(self) -> &'static str {
        match self {
            ApiErrorKind::InvalidCredentials => {
                "The analysis service rejected the configured API key; it may be invalid or expired."
            }
            ApiErrorKind::RateLimited => {
                "The analysis service rate limit was reached for the moment."
            }
            ApiErrorKind::QuotaExceeded => {
                "The analysis service usage quota for this account has been used up."
            }
            ApiErrorKind::ServiceUnavailable => {
                "The analysis service is temporarily unavailable."
            }
            ApiErrorKind::ConnectionFailure => {
                "The analysis service could not be reached because of a network connection problem."
            }
            ApiErrorKind::MalformedResponse => {
                "The analysis service returned an answer that could not be parsed."
            }
        }
    }

    /// What an operator or user can do about the failure.
    pub fn recovery_hint(self) -> &'static str {
        match self {
            ApiErrorKind::InvalidCredentials => "Ask the bot administrator to check configuration of the API key.",
            ApiErrorKind::RateLimited => "Full analysis will resume shortly.",
            ApiErrorKind::QuotaExceeded => "Ask the bot administrator to check billing and usage limits.",
            ApiErrorKind::ServiceUnavailable => "Please try again later.",
            ApiErrorKind::ConnectionFailure => "Please check internet connectivity and try again.",
            ApiErrorKind::MalformedResponse => "Only pattern-based results are shown for this message.",
        }
    }

    /// Whether a caller may retry (with backoff) without external action.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ApiErrorKind::RateLimited | ApiErrorKind::ServiceUnavailable | ApiErrorKind::ConnectionFailure
        )
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SemanticVerdict {
    pub categories: BTreeSet<BiasCategory>,
    pub reasoning_quality: ReasoningQuality,
    pub discussion_issues: Vec<String>,
    pub suggestions: Vec<String>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Labels returned by the model that are outside the vocabulary.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmapped_labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_error: Option<ApiErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SemanticVerdict {
    pub fn failed(kind: ApiErrorKind) -> Self {
        Self {
            categories: BTreeSet::new(),
            reasoning_quality: ReasoningQuality::Fair,
            discussion_issues: Vec::new(),
            suggestions: Vec::new(),
            confidence: 0.0,
            summary: None,
            unmapped_labels: Vec::new(),
            api_error: Some(kind),
            error_message: Some(kind.user_message().to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.api_error.is_none()
    }

    pub fn has_findings(&self) -> bool {
        !self.categories.is_empty() || !self.discussion_issues.is_empty()
    }
}

// ============ Unified Verdict ============

/// Which analysis layer reported a category.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySource {
    Pattern,
    Semantic,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedVerdict {
    pub categories: BTreeSet<BiasCategory>,
    pub confidence: f64,
    pub pattern_confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_confidence: Option<f64>,
    pub reasoning_quality: ReasoningQuality,
    pub discussion_issues: Vec<String>,
    pub suggestions: Vec<String>,
    pub source_breakdown: BTreeMap<BiasCategory, CategorySource>,
    /// Highest pattern confidence per pattern-matched category.
    pub pattern_scores: BTreeMap<BiasCategory, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_error: Option<ApiErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub threshold: f64,
    pub actionable: bool,
}

impl UnifiedVerdict {
    pub fn is_degraded(&self) -> bool {
        self.semantic_confidence.is_none()
    }
}

// ============ Analysis Report ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub input_chars: usize,
    pub pattern_matches: Vec<PatternMatch>,
    pub verdict: UnifiedVerdict,
}
