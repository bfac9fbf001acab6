// CogniBot Core Services

pub mod config_store;
pub mod providers;
pub mod detection;
pub mod formatter;

pub use config_store::*;
pub use providers::*;
pub use formatter::{error_heading, FormatStyle, ResponseFormatter};

// Re-export detection module items
pub use detection::{
    retry_analyze,
    AnalysisAggregator,
    AnalysisPipeline,
    CategorySpec,
    InputError,
    PatternMatcher,
    RetryPolicy,
    SemanticAnalyzer,
    SemanticSettings,
    CATEGORY_REGISTRY,
};
