// Detection Module
// Bias/fallacy analysis core organized into specialized submodules:
// - pattern_catalog: Static category registry (patterns, descriptions, advice)
// - pattern_matcher: Regex-based detection over the registry
// - prompts: Instruction templates for the language model
// - semantic_analyzer: Single-shot model analysis with error classification
// - retry: Caller-side retry around the semantic analyzer
// - aggregation: Merges both layers into one unified verdict
// - pipeline: Input validation and concurrent end-to-end analysis

pub mod pattern_catalog;
pub mod pattern_matcher;
pub mod prompts;
pub mod semantic_analyzer;
pub mod retry;
pub mod aggregation;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used items
pub use pattern_catalog::{CategorySpec, CATEGORY_REGISTRY};
pub use pattern_matcher::{
    category_confidence,
    category_scores,
    context_snippet,
    matched_categories,
    pattern_confidence,
    summarize,
    PatternMatcher,
};
pub use semantic_analyzer::{parse_verdict, SemanticAnalyzer, SemanticSettings};
pub use retry::{retry_analyze, RetryPolicy};
pub use aggregation::{AnalysisAggregator, PATTERN_WEIGHT, SEMANTIC_WEIGHT};
pub use pipeline::{AnalysisPipeline, InputError};
