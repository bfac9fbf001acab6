// Pattern Matcher
// Deterministic bias/fallacy detection over the static category registry.
// Pure and total: every input terminates with a (possibly empty) result.

use crate::models::{BiasCategory, MatchSpan, PatternMatch, Severity};
use regex::{Regex, RegexBuilder};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::pattern_catalog::{CategorySpec, CATEGORY_REGISTRY};

/// Confidence of a category matched by a single pattern in a text of full length.
const BASE_CONFIDENCE: f64 = 0.6;
/// Each further distinct pattern closes this fraction of the remaining gap less.
const PATTERN_DECAY: f64 = 0.6;
/// Word count at which the length factor saturates.
const FULL_LENGTH_WORDS: f64 = 10.0;
/// Length factor applied to an (almost) empty text.
const SHORT_TEXT_FACTOR: f64 = 0.75;
/// Added when the text also names what is under attack ("argument", "claim").
const BOOSTER_BONUS: f64 = 0.2;
/// Spans reported per pattern; further repeats add nothing to confidence either.
const MAX_SPANS_PER_PATTERN: usize = 16;
const CONTEXT_WINDOW_CHARS: usize = 50;

struct CompiledPattern {
    raw: String,
    regex: Regex,
}

struct CompiledCategory {
    category: BiasCategory,
    patterns: Vec<CompiledPattern>,
    boosters: Vec<String>,
}

pub struct PatternMatcher {
    categories: Vec<CompiledCategory>,
}

static SHARED_MATCHER: OnceLock<PatternMatcher> = OnceLock::new();

impl PatternMatcher {
    /// Matcher over the built-in registry, compiled once per process.
    pub fn shared() -> &'static PatternMatcher {
        SHARED_MATCHER.get_or_init(|| PatternMatcher::from_specs(CATEGORY_REGISTRY))
    }

    /// Build a matcher from any registration table.
    /// Patterns that fail to compile are skipped so matching itself stays infallible.
    pub fn from_specs(specs: &[CategorySpec]) -> Self {
        let categories = specs
            .iter()
            .map(|spec| {
                let patterns = spec
                    .patterns
                    .iter()
                    .filter_map(|raw| {
                        match RegexBuilder::new(raw).case_insensitive(true).build() {
                            Ok(regex) => Some(CompiledPattern {
                                raw: raw.to_string(),
                                regex,
                            }),
                            Err(e) => {
                                warn!(
                                    "[PATTERN] skipping invalid pattern for {}: {} ({})",
                                    spec.category, raw, e
                                );
                                None
                            }
                        }
                    })
                    .collect();
                CompiledCategory {
                    category: spec.category,
                    patterns,
                    boosters: spec.boosters.iter().map(|b| b.to_lowercase()).collect(),
                }
            })
            .collect();

        Self { categories }
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Detect every registered category in `text`.
    /// Matches are ordered by registry order, then by position.
    pub fn detect(&self, text: &str) -> Vec<PatternMatch> {
        if text.is_empty() {
            return Vec::new();
        }

        let word_count = text.split_whitespace().count();
        let lowered = text.to_lowercase();
        let mut results = Vec::new();

        for compiled in &self.categories {
            let mut hits: Vec<(&str, usize, usize)> = Vec::new();
            let mut distinct_patterns = 0usize;

            for pattern in &compiled.patterns {
                let before = hits.len();
                for m in pattern.regex.find_iter(text).take(MAX_SPANS_PER_PATTERN) {
                    hits.push((pattern.raw.as_str(), m.start(), m.end()));
                }
                if hits.len() > before {
                    distinct_patterns += 1;
                }
            }

            if distinct_patterns == 0 {
                continue;
            }

            let boosted = compiled.boosters.iter().any(|b| lowered.contains(b.as_str()));
            let confidence = category_confidence(distinct_patterns, word_count, boosted);
            debug!(
                "[PATTERN] {} matched: distinct_patterns={} hits={} confidence={:.3}",
                compiled.category,
                distinct_patterns,
                hits.len(),
                confidence
            );

            hits.sort_by_key(|(_, start, end)| (*start, *end));
            results.extend(hits.into_iter().map(|(raw, start, end)| PatternMatch {
                category: compiled.category,
                span: MatchSpan { start, end },
                raw_pattern: raw.to_string(),
                matched_text: text[start..end].to_string(),
                confidence,
            }));
        }

        results
    }
}

/// Diminishing-returns confidence: more distinct patterns approach but never exceed 1.0,
/// short texts are discounted, and repeated hits of one pattern are not counted.
pub fn category_confidence(distinct_patterns: usize, word_count: usize, boosted: bool) -> f64 {
    let n = distinct_patterns.max(1).min(i32::MAX as usize) as i32;
    let strength = 1.0 - (1.0 - BASE_CONFIDENCE) * PATTERN_DECAY.powi(n - 1);
    let strength = if boosted {
        (strength + BOOSTER_BONUS).min(1.0)
    } else {
        strength
    };

    let length_norm = (word_count as f64 / FULL_LENGTH_WORDS).min(1.0);
    let length_factor = SHORT_TEXT_FACTOR + (1.0 - SHORT_TEXT_FACTOR) * length_norm;

    (strength * length_factor).clamp(0.0, 1.0)
}

pub fn matched_categories(matches: &[PatternMatch]) -> BTreeSet<BiasCategory> {
    matches.iter().map(|m| m.category).collect()
}

pub fn category_scores(matches: &[PatternMatch]) -> BTreeMap<BiasCategory, f64> {
    let mut scores = BTreeMap::new();
    for m in matches {
        let entry = scores.entry(m.category).or_insert(0.0_f64);
        *entry = entry.max(m.confidence);
    }
    scores
}

/// Pattern-only confidence: the strongest category wins.
pub fn pattern_confidence(matches: &[PatternMatch]) -> f64 {
    matches
        .iter()
        .map(|m| m.confidence)
        .fold(0.0_f64, f64::max)
        .clamp(0.0, 1.0)
}

/// Text around a match, widened by up to 50 characters on each side.
/// Offsets are snapped outward to char boundaries, so any span is accepted.
pub fn context_snippet(text: &str, span: MatchSpan) -> String {
    let span_start = floor_char_boundary(text, span.start);
    let span_end = ceil_char_boundary(text, span.end.max(span.start));
    let start = text[..span_start]
        .char_indices()
        .rev()
        .nth(CONTEXT_WINDOW_CHARS.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let end = text[span_end..]
        .char_indices()
        .nth(CONTEXT_WINDOW_CHARS)
        .map(|(i, _)| span_end + i)
        .unwrap_or(text.len());
    text[start..end].trim().to_string()
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut i = index.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(text: &str, index: usize) -> usize {
    let mut i = index.min(text.len());
    while !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Plain-text digest of pattern findings.
pub fn summarize(matches: &[PatternMatch]) -> String {
    if matches.is_empty() {
        return "No significant cognitive biases or logical errors detected.".to_string();
    }

    let mut counts: BTreeMap<BiasCategory, usize> = BTreeMap::new();
    for m in matches {
        *counts.entry(m.category).or_insert(0) += 1;
    }

    let mut lines = vec!["Cognitive bias patterns:".to_string()];
    for (category, count) in &counts {
        lines.push(format!(
            "- {} ({} instance{})",
            category.display_name(),
            count,
            if *count > 1 { "s" } else { "" }
        ));
    }

    if let Some(strongest) = matches
        .iter()
        .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal))
    {
        let severity = match Severity::from_confidence(strongest.confidence) {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        };
        lines.push(format!(
            "Most significant: {} (confidence {:.0}%, {} severity)",
            strongest.category.display_name(),
            strongest.confidence * 100.0,
            severity
        ));
        lines.push(super::pattern_catalog::description(strongest.category).to_string());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories_of(text: &str) -> BTreeSet<BiasCategory> {
        matched_categories(&PatternMatcher::shared().detect(text))
    }

    #[test]
    fn test_ad_hominem_detected() {
        let matches = PatternMatcher::shared().detect("You're clearly an idiot if you believe that");
        let hit = matches
            .iter()
            .find(|m| m.category == BiasCategory::AdHominem)
            .expect("ad hominem");
        assert!(hit.confidence > 0.0);
        assert_eq!(hit.matched_text.to_lowercase(), "you're clearly an idiot");
    }

    #[test]
    fn test_bandwagon_detected() {
        assert!(categories_of("Everyone knows this is true").contains(&BiasCategory::Bandwagon));
    }

    #[test]
    fn test_empty_text() {
        assert!(PatternMatcher::shared().detect("").is_empty());
    }

    #[test]
    fn test_clean_text_has_no_findings() {
        assert!(categories_of("This is a well-reasoned argument with evidence.").is_empty());
    }

    #[test]
    fn test_short_text_still_evaluated() {
        assert!(categories_of("studies show").contains(&BiasCategory::AppealToAuthority));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(categories_of("EVERYONE KNOWS").contains(&BiasCategory::Bandwagon));
        assert!(categories_of("Всем известно, что это так").contains(&BiasCategory::Bandwagon));
    }

    #[test]
    fn test_russian_converse_error_detected() {
        let found = categories_of("Всякая селедка рыба, значит всякая рыба - селедка");
        assert!(found.contains(&BiasCategory::AffirmingTheConsequent));
    }

    #[test]
    fn test_multiple_categories() {
        let found = categories_of("You're an idiot! Everyone knows this is true, so you must agree.");
        assert!(found.contains(&BiasCategory::AdHominem));
        assert!(found.contains(&BiasCategory::Bandwagon));
    }

    #[test]
    fn test_repeated_pattern_does_not_raise_confidence() {
        let once = PatternMatcher::shared().detect("Everyone knows it, and that settles the whole matter for me.");
        let many = PatternMatcher::shared().detect(
            "Everyone knows it, everyone knows it, everyone knows it, everyone knows it, truly.",
        );
        assert_eq!(pattern_confidence(&once), pattern_confidence(&many));
        assert!(many.len() > once.len());
    }

    #[test]
    fn test_distinct_patterns_raise_confidence() {
        let one = PatternMatcher::shared().detect("Everyone knows that this plan is the best plan we have.");
        let two = PatternMatcher::shared()
            .detect("Everyone knows that this plan is best and most people agree with it anyway.");
        assert!(pattern_confidence(&two) > pattern_confidence(&one));
    }

    #[test]
    fn test_confidence_saturates() {
        for n in 1..50 {
            let c = category_confidence(n, 1000, true);
            assert!((0.0..=1.0).contains(&c));
        }
        assert!(category_confidence(3, 20, false) > category_confidence(2, 20, false));
        assert!(category_confidence(1, 2, false) < category_confidence(1, 20, false));
    }

    #[test]
    fn test_booster_words() {
        let plain = category_confidence(1, 20, false);
        let boosted = category_confidence(1, 20, true);
        assert!(boosted > plain);
        let matches = PatternMatcher::shared()
            .detect("Your argument is worthless, you're clearly an idiot and nobody should listen");
        assert!((pattern_confidence(&matches) - boosted).abs() < 1e-9);
    }

    #[test]
    fn test_idempotent() {
        let text = "So you're saying everyone knows experts say it?";
        let first = PatternMatcher::shared().detect(text);
        let second = PatternMatcher::shared().detect(text);
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_registry_and_invalid_pattern() {
        static CUSTOM: &[CategorySpec] = &[CategorySpec {
            category: BiasCategory::AnchoringBias,
            patterns: &[r"(unclosed", r"\bfirst\s+quote\b"],
            description: "test",
            advice: "test",
            boosters: &[],
        }];
        let matcher = PatternMatcher::from_specs(CUSTOM);
        assert_eq!(matcher.category_count(), 1);
        let matches = matcher.detect("The FIRST QUOTE was high");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].raw_pattern, r"\bfirst\s+quote\b");
        assert_eq!(matches[0].span, MatchSpan { start: 4, end: 15 });
    }

    #[test]
    fn test_context_snippet_respects_char_boundaries() {
        let text = "Ёжик сказал: все знают, что это правда, и спорить не о чем.";
        let matches = PatternMatcher::shared().detect(text);
        let m = matches.first().expect("bandwagon match");
        let snippet = context_snippet(text, m.span);
        assert!(snippet.contains("все знают"));
    }

    #[test]
    fn test_context_snippet_snaps_foreign_offsets() {
        let text = "Ёжик сказал: все знают, что это правда.";
        // 'Ё' is two bytes wide, so byte 1 falls inside it.
        let inside = context_snippet(text, MatchSpan { start: 1, end: 3 });
        assert!(inside.starts_with("Ёжик"));
        let past_end = context_snippet(text, MatchSpan { start: 1000, end: 2000 });
        assert!(past_end.ends_with("правда."));
        let inverted = context_snippet(text, MatchSpan { start: 9, end: 1 });
        assert!(inverted.contains("сказал"));
    }

    #[test]
    fn test_ad_hominem_needs_whole_insult_word() {
        assert!(!categories_of("Honestly you're dumbfounded by the results, as am I.").contains(&BiasCategory::AdHominem));
        assert!(!categories_of("I think you're foolishly optimistic about the schedule.").contains(&BiasCategory::AdHominem));
        assert!(!categories_of("You're ignoring the second half of the report.").contains(&BiasCategory::AdHominem));
        assert!(categories_of("You're clearly an idiot if you believe that").contains(&BiasCategory::AdHominem));
        assert!(categories_of("you're so dumb, honestly").contains(&BiasCategory::AdHominem));
    }

    #[test]
    fn test_single_boosted_pattern_clears_default_threshold() {
        let matches = PatternMatcher::shared()
            .detect("Your argument is worthless, you're clearly an idiot and nobody should listen");
        assert!(pattern_confidence(&matches) >= 0.7);
        assert!(category_confidence(1, 20, false) < 0.7);
        assert!(category_confidence(2, 20, false) >= 0.7);
    }

    #[test]
    fn test_summarize() {
        assert!(summarize(&[]).starts_with("No significant"));
        let matches = PatternMatcher::shared().detect("Everyone knows it. Everyone knows it.");
        let summary = summarize(&matches);
        assert!(summary.contains("Bandwagon (2 instances)"));
        assert!(summary.contains("Most significant: Bandwagon"));
    }
}
