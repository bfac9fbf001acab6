// Prompt Construction
// Instruction and message templates for the semantic analysis call.
// Language matching is part of the prompt contract; nothing is translated locally.

use crate::models::{BiasCategory, SemanticVerdict};

use super::pattern_catalog;

/// Longest prior message forwarded as context, in characters.
const CONTEXT_MESSAGE_MAX_CHARS: usize = 500;
/// Longest excerpt of the original message quoted in the follow-up prompt.
const EXCERPT_MAX_CHARS: usize = 500;

pub const EDUCATOR_SYSTEM_PROMPT: &str = "You are a helpful educator focused on improving critical thinking and discourse quality. \
Always answer in the same language as the original message.";

/// System instruction for the structured analysis call.
pub fn analysis_system_prompt(vocabulary: &[BiasCategory]) -> String {
    let labels: Vec<String> = vocabulary
        .iter()
        .map(|c| format!("- {}: {}", c.as_str(), pattern_catalog::description(*c)))
        .collect();

    format!(
        r#"You are an expert in cognitive psychology, logic, and critical thinking. Analyze the given text for:

1. Cognitive biases and logical fallacies, using ONLY these category labels:
{labels}
2. Reasoning quality, rated as one of: poor, fair, good, excellent.
3. Discussion quality issues (hostile tone, missing evidence, dogmatism) and concrete suggestions for improvement.
4. Your confidence in the analysis as a number between 0.0 and 1.0.

Write discussion_issues, suggestions and summary in the SAME LANGUAGE as the analyzed text. Do not translate the text. Keep category labels exactly as listed.

Respond with a JSON object only, in exactly this format:
{{
    "categories": ["label", ...],
    "reasoning_quality": "poor|fair|good|excellent",
    "discussion_issues": ["issue", ...],
    "suggestions": ["suggestion", ...],
    "confidence": 0.0,
    "summary": "Brief explanation of findings"
}}

Only flag genuine problems with clear evidence in the text. Be constructive and educational."#,
        labels = labels.join("\n")
    )
}

/// User message: the most recent `window` context messages (oldest first), then the text.
pub fn analysis_user_message(text: &str, context: &[String], window: usize) -> String {
    let recent: Vec<&String> = context
        .iter()
        .skip(context.len().saturating_sub(window))
        .filter(|m| !m.trim().is_empty())
        .collect();

    let mut message = String::new();
    if !recent.is_empty() {
        message.push_str("Previous messages in the conversation (oldest first):\n");
        for (i, prior) in recent.iter().enumerate() {
            message.push_str(&format!(
                "{}. {}\n",
                i + 1,
                truncate_chars(prior.trim(), CONTEXT_MESSAGE_MAX_CHARS)
            ));
        }
        message.push('\n');
    }
    message.push_str("Text to analyze:\n");
    message.push_str(text);
    message
}

/// Prompt asking for a short constructive reply about an analysis.
pub fn educational_prompt(verdict: &SemanticVerdict, original_text: &str) -> String {
    let categories: Vec<&str> = verdict.categories.iter().map(|c| c.display_name()).collect();
    format!(
        r#"Based on this analysis of a message, create a brief, educational response that:
1. Points out the cognitive biases or logical issues found
2. Explains WHY these are problematic
3. Suggests better ways to make the same point
4. Is respectful and constructive

Analysis results:
- Detected biases: {}
- Discussion issues: {}
- Reasoning quality: {}

Original message: {}

Create a response that's educational, not confrontational, written in the language of the original message."#,
        categories.join(", "),
        verdict.discussion_issues.join(", "),
        verdict.reasoning_quality.as_str(),
        truncate_chars(original_text, EXCERPT_MAX_CHARS)
    )
}

pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReasoningQuality;

    #[test]
    fn test_system_prompt_contract() {
        let prompt = analysis_system_prompt(&BiasCategory::ALL);
        assert!(prompt.contains("JSON"));
        assert!(prompt.contains("SAME LANGUAGE"));
        assert!(prompt.contains("- affirming_the_consequent:"));
        assert!(prompt.contains("\"reasoning_quality\""));
        assert!(prompt.contains("\"confidence\""));
    }

    #[test]
    fn test_user_message_keeps_recent_context() {
        let context: Vec<String> = (1..=7).map(|i| format!("message {i}")).collect();
        let msg = analysis_user_message("final text", &context, 3);
        assert!(!msg.contains("message 4"));
        assert!(msg.contains("1. message 5"));
        assert!(msg.contains("3. message 7"));
        assert!(msg.ends_with("Text to analyze:\nfinal text"));
    }

    #[test]
    fn test_user_message_without_context() {
        assert_eq!(analysis_user_message("hi", &[], 5), "Text to analyze:\nhi");
        assert_eq!(analysis_user_message("hi", &["older".to_string()], 0), "Text to analyze:\nhi");
    }

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("селедка", 3), "сел...");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }

    #[test]
    fn test_educational_prompt_mentions_findings() {
        let verdict = SemanticVerdict {
            categories: [BiasCategory::AdHominem].into_iter().collect(),
            reasoning_quality: ReasoningQuality::Poor,
            discussion_issues: vec!["hostile tone".into()],
            ..Default::default()
        };
        let prompt = educational_prompt(&verdict, "You're an idiot");
        assert!(prompt.contains("Ad Hominem"));
        assert!(prompt.contains("hostile tone"));
        assert!(prompt.contains("poor"));
    }
}
