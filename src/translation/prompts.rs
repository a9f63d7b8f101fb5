/*!
 * Prompt templates for summarization and batch translation.
 */

use super::verification::{ContractViolation, SUBMIT_TOOL_NAME};

/// System prompt for the one-off context summary
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a movie expert. Analyze the provided subtitle \
samples and filename to summarize the movie/series background, genre, main themes, and context \
that would help with accurate translation. Keep it concise (2-3 sentences).";

/// User message carrying the filename and the subtitle sample
pub fn summary_user_message(filename: &str, sample: &str) -> String {
    format!("Filename: {}\n\nSubtitle samples:\n{}", filename, sample)
}

/// System prompt for one translation group
#[derive(Debug, Clone)]
pub struct TranslationPrompt {
    template: &'static str,
}

impl TranslationPrompt {
    pub const BATCH_TRANSLATOR: &'static str = r#"You are a professional subtitle translator. You will receive a JSON array containing {count} {source_language} subtitle lines. Translate each line to {target_language}.

CRITICAL REQUIREMENTS:
1. You MUST call the `{tool}` tool with {"translations": [...]} containing EXACTLY {count} strings
2. Each input line becomes exactly ONE translated string, in the same order
3. Do NOT merge, split, add or drop lines
4. Do NOT answer with plain text; the tool call is the only accepted answer

Example input: ["Hello", "World"]
Example call: {tool}({"translations": ["你好", "世界"]})"#;

    pub fn new() -> Self {
        Self { template: Self::BATCH_TRANSLATOR }
    }

    /// Render the instruction for `count` lines, prefixed by the synopsis when present
    pub fn render(
        &self,
        count: usize,
        source_language: &str,
        target_language: &str,
        context: &str,
    ) -> String {
        let body = self
            .template
            .replace("{count}", &count.to_string())
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
            .replace("{tool}", SUBMIT_TOOL_NAME);

        if context.trim().is_empty() {
            body
        } else {
            format!(
                "Context: {}\n\n\
                 Use this context to keep names, tone and terminology consistent.\n\n{}",
                context.trim(),
                body
            )
        }
    }
}

impl Default for TranslationPrompt {
    fn default() -> Self {
        Self::new()
    }
}

/// Tool-result text for a rejected submission
pub fn tool_failure_message(reason: &str, expected: usize) -> String {
    format!(
        "Submission rejected: {}. Call {} again with exactly {} translations, one per input line.",
        reason, SUBMIT_TOOL_NAME, expected
    )
}

/// Corrective user turn after a free-text reply that could not be used
pub fn corrective_message(violation: &ContractViolation, expected: usize) -> String {
    format!(
        "Your reply was not accepted ({}). You must call the {} tool with \
         {{\"translations\": [...]}} containing exactly {} strings.",
        violation, SUBMIT_TOOL_NAME, expected
    )
}
