// Response Formatter
// Renders a unified verdict as chat-ready Markdown.

use crate::models::{ApiErrorKind, CategorySource, ReasoningQuality, UnifiedVerdict};

const MAX_SUGGESTIONS: usize = 3;
const MAX_EXTRA_PATTERNS: usize = 3;
/// Pattern-only categories below this score are not listed as additional patterns.
const EXTRA_PATTERN_MIN_SCORE: f64 = 0.6;

const CONSTRUCTIVE_NOTE: &str =
    "💡 *This analysis aims to improve discussion quality, not to criticize. Consider this feedback constructively.*";

/// Whether the analysis was requested explicitly or triggered by the bot itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatStyle {
    #[default]
    Automatic,
    Manual,
}

#[derive(Debug, Clone, Default)]
pub struct ResponseFormatter {
    style: FormatStyle,
}

impl ResponseFormatter {
    pub fn new(style: FormatStyle) -> Self {
        Self { style }
    }

    pub fn format(&self, verdict: &UnifiedVerdict) -> String {
        self.format_with_reply(verdict, None)
    }

    /// Render the verdict, optionally followed by an educational reply.
    pub fn format_with_reply(&self, verdict: &UnifiedVerdict, educational: Option<&str>) -> String {
        let mut parts: Vec<String> = Vec::new();

        parts.push(match self.style {
            FormatStyle::Manual => "🔍 **Manual Analysis Results:**\n".to_string(),
            FormatStyle::Automatic => "🧠 **Cognitive Bias Analysis:**\n".to_string(),
        });

        match verdict.semantic_error {
            Some(kind) => parts.extend(degraded_section(kind, verdict)),
            None => parts.extend(summary_section(verdict)),
        }

        let extra: Vec<String> = verdict
            .pattern_scores
            .iter()
            .filter(|(category, score)| {
                **score >= EXTRA_PATTERN_MIN_SCORE
                    && verdict.source_breakdown.get(*category) == Some(&CategorySource::Pattern)
            })
            .take(MAX_EXTRA_PATTERNS)
            .map(|(category, score)| format!("• {} ({})", category.display_name(), percent(*score)))
            .collect();
        if !extra.is_empty() && !verdict.is_degraded() {
            parts.push("\n🔍 **Additional Patterns Detected:**".to_string());
            parts.extend(extra);
        }

        if let Some(reply) = educational.map(str::trim).filter(|r| !r.is_empty()) {
            parts.push(format!("\n📚 {}", reply));
        }

        if self.style == FormatStyle::Automatic {
            parts.push(format!("\n{}", CONSTRUCTIVE_NOTE));
        }

        parts.join("\n")
    }
}

/// Heading and icon for a failed semantic layer.
pub fn error_heading(kind: ApiErrorKind) -> (&'static str, &'static str) {
    match kind {
        ApiErrorKind::InvalidCredentials => ("🔧", "Configuration Issue"),
        ApiErrorKind::RateLimited => ("⏳", "Rate Limited"),
        ApiErrorKind::QuotaExceeded => ("💰", "Quota Exceeded"),
        ApiErrorKind::ServiceUnavailable => ("⚠️", "Service Unavailable"),
        ApiErrorKind::ConnectionFailure => ("🌐", "Connection Issue"),
        ApiErrorKind::MalformedResponse => ("❌", "Analysis Error"),
    }
}

fn quality_icon(quality: ReasoningQuality) -> &'static str {
    match quality {
        ReasoningQuality::Poor => "❌",
        ReasoningQuality::Fair => "⚠️",
        ReasoningQuality::Good => "✅",
        ReasoningQuality::Excellent => "🌟",
    }
}

fn confidence_icon(confidence: f64) -> &'static str {
    if confidence > 0.8 {
        "🔴"
    } else if confidence > 0.5 {
        "🟡"
    } else {
        "🟢"
    }
}

fn percent(value: f64) -> String {
    format!("{:.0}%", value.clamp(0.0, 1.0) * 100.0)
}

fn title_case(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn source_label(source: CategorySource) -> &'static str {
    match source {
        CategorySource::Pattern => "pattern",
        CategorySource::Semantic => "semantic",
        CategorySource::Both => "pattern + semantic",
    }
}

fn summary_section(verdict: &UnifiedVerdict) -> Vec<String> {
    if verdict.categories.is_empty() && verdict.discussion_issues.is_empty() {
        return vec![
            "✅ **Good Discussion Quality**: No significant cognitive biases or logical errors detected."
                .to_string(),
        ];
    }

    let mut lines = vec![format!(
        "{} **Cognitive Bias Analysis** (Confidence: {})",
        confidence_icon(verdict.confidence),
        percent(verdict.confidence)
    )];

    if !verdict.categories.is_empty() {
        lines.push("\n🧠 **Detected Issues:**".to_string());
        for category in &verdict.categories {
            let source = verdict
                .source_breakdown
                .get(category)
                .copied()
                .unwrap_or(CategorySource::Semantic);
            lines.push(format!("• {} ({})", category.display_name(), source_label(source)));
        }
    }

    lines.push(format!(
        "\n{} **Reasoning Quality:** {}",
        quality_icon(verdict.reasoning_quality),
        title_case(verdict.reasoning_quality.as_str())
    ));

    lines.extend(list_section("⚠️ **Discussion Issues:**", &verdict.discussion_issues, usize::MAX));
    lines.extend(list_section("💡 **Suggestions:**", &verdict.suggestions, MAX_SUGGESTIONS));

    if let Some(summary) = &verdict.summary {
        lines.push(format!("\n📝 **Summary:** {}", summary));
    }

    lines
}

fn degraded_section(kind: ApiErrorKind, verdict: &UnifiedVerdict) -> Vec<String> {
    let (icon, heading) = error_heading(kind);
    let message = verdict
        .error_message
        .as_deref()
        .unwrap_or_else(|| kind.user_message());

    let mut lines = vec![
        format!("{} **{}**: {}", icon, heading, message),
        kind.recovery_hint().to_string(),
    ];

    if verdict.categories.is_empty() {
        lines.push("\nNo patterns were detected locally.".to_string());
        return lines;
    }

    lines.push(format!(
        "\n🔍 **Pattern-Based Findings** (Confidence: {}):",
        percent(verdict.confidence)
    ));
    for (category, score) in &verdict.pattern_scores {
        lines.push(format!("• {} ({})", category.display_name(), percent(*score)));
    }
    lines.extend(list_section("💡 **Suggestions:**", &verdict.suggestions, MAX_SUGGESTIONS));
    lines
}

fn list_section(heading: &str, items: &[String], max: usize) -> Vec<String> {
    if items.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![format!("\n{}", heading)];
    lines.extend(items.iter().take(max).map(|item| format!("• {}", item)));
    lines
}
