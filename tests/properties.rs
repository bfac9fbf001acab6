use cognibot_lib::models::{
    ApiErrorKind, BiasCategory, MatchSpan, PatternMatch, ReasoningQuality, SemanticVerdict,
};
use cognibot_lib::services::{AnalysisAggregator, PatternMatcher};
use proptest::prelude::*;

fn any_category() -> impl Strategy<Value = BiasCategory> {
    (0..BiasCategory::ALL.len()).prop_map(|i| BiasCategory::ALL[i])
}

fn any_error_kind() -> impl Strategy<Value = ApiErrorKind> {
    prop_oneof![
        Just(ApiErrorKind::InvalidCredentials),
        Just(ApiErrorKind::RateLimited),
        Just(ApiErrorKind::QuotaExceeded),
        Just(ApiErrorKind::ServiceUnavailable),
        Just(ApiErrorKind::ConnectionFailure),
        Just(ApiErrorKind::MalformedResponse),
    ]
}

fn any_quality() -> impl Strategy<Value = ReasoningQuality> {
    prop_oneof![
        Just(ReasoningQuality::Poor),
        Just(ReasoningQuality::Fair),
        Just(ReasoningQuality::Good),
        Just(ReasoningQuality::Excellent),
    ]
}

fn any_matches() -> impl Strategy<Value = Vec<PatternMatch>> {
    prop::collection::vec((any_category(), 0.0f64..=1.0), 0..6).prop_map(|items| {
        items
            .into_iter()
            .map(|(category, confidence)| PatternMatch {
                category,
                span: MatchSpan { start: 0, end: 1 },
                raw_pattern: "p".into(),
                matched_text: "x".into(),
                confidence,
            })
            .collect()
    })
}

fn any_semantic() -> impl Strategy<Value = SemanticVerdict> {
    let ok = (
        prop::collection::btree_set(any_category(), 0..4),
        any_quality(),
        0.0f64..=1.0,
    )
        .prop_map(|(categories, reasoning_quality, confidence)| SemanticVerdict {
            categories,
            reasoning_quality,
            confidence,
            ..Default::default()
        });
    prop_oneof![ok, any_error_kind().prop_map(SemanticVerdict::failed)]
}

proptest! {
    #[test]
    fn detect_is_total_and_bounded(text in "\\PC{0,300}") {
        let matches = PatternMatcher::shared().detect(&text);
        for m in &matches {
            prop_assert!((0.0..=1.0).contains(&m.confidence));
            prop_assert!(m.span.start <= m.span.end && m.span.end <= text.len());
            prop_assert_eq!(&text[m.span.start..m.span.end], m.matched_text.as_str());
        }
    }

    #[test]
    fn detect_is_idempotent(text in "[a-zA-Z ,.'!?]{0,200}") {
        let matcher = PatternMatcher::shared();
        prop_assert_eq!(matcher.detect(&text), matcher.detect(&text));
    }

    #[test]
    fn detect_ignores_case(words in prop::sample::select(vec![
        "everyone knows this is true",
        "you're clearly an idiot if you believe that",
        "either you are with us or against us",
    ])) {
        let matcher = PatternMatcher::shared();
        let lower: Vec<BiasCategory> = matcher.detect(words).iter().map(|m| m.category).collect();
        let upper: Vec<BiasCategory> = matcher.detect(&words.to_uppercase()).iter().map(|m| m.category).collect();
        prop_assert_eq!(lower, upper);
    }

    #[test]
    fn combine_confidence_in_range(matches in any_matches(), semantic in any_semantic(), threshold in 0.0f64..=1.0) {
        let verdict = AnalysisAggregator::new(threshold).combine(&matches, &semantic);
        prop_assert!((0.0..=1.0).contains(&verdict.confidence));
        if verdict.actionable {
            prop_assert!(verdict.confidence >= threshold);
        }
    }

    #[test]
    fn combine_keeps_every_pattern_category(matches in any_matches(), semantic in any_semantic()) {
        let verdict = AnalysisAggregator::default().combine(&matches, &semantic);
        for m in &matches {
            prop_assert!(verdict.categories.contains(&m.category));
        }
    }

    #[test]
    fn failed_semantic_layer_is_pattern_only(matches in any_matches(), kind in any_error_kind()) {
        let verdict = AnalysisAggregator::default().combine(&matches, &SemanticVerdict::failed(kind));
        let pattern_only = matches.iter().map(|m| m.confidence).fold(0.0f64, f64::max);
        prop_assert_eq!(verdict.confidence, pattern_only);
        prop_assert_eq!(verdict.reasoning_quality, ReasoningQuality::Fair);
        prop_assert_eq!(verdict.semantic_error, Some(kind));
    }
}
