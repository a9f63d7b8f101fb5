/*!
 * Source-wide synopsis used to bias every translation request.
 */

use log::{debug, info};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::errors::ProviderError;
use crate::providers::{ChatMessage, ChatModel};
use crate::subtitle_processor::SubtitleItem;

use super::prompts::{summary_user_message, SUMMARY_SYSTEM_PROMPT};
use super::stats::TokenUsageStats;

/// Default character cap for the summarization sample
pub const DEFAULT_SAMPLE_CHAR_LIMIT: usize = 20_000;

/// Free-text synopsis of the whole job, empty until summarized
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationContext(String);

impl TranslationContext {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TranslationContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Join item texts with newlines until the next one would pass `char_limit`
///
/// Lengths are counted in characters, separators included. An item that
/// does not fit is dropped whole and the sample ends there.
pub fn build_sample(items: &[SubtitleItem], char_limit: usize) -> String {
    let mut sample = String::new();
    let mut chars = 0;

    for item in items {
        let separator = if sample.is_empty() { 0 } else { 1 };
        let item_chars = item.text.chars().count();
        if chars + separator + item_chars > char_limit {
            break;
        }
        if separator == 1 {
            sample.push('\n');
        }
        sample.push_str(&item.text);
        chars += separator + item_chars;
    }

    sample
}

/// Produces the synopsis with one model call
#[derive(Debug, Clone)]
pub struct ContextSummarizer {
    model: Arc<dyn ChatModel>,
    char_limit: usize,
}

impl ContextSummarizer {
    pub fn new(model: Arc<dyn ChatModel>, char_limit: usize) -> Self {
        Self { model, char_limit }
    }

    /// Summarize the source; the reply text is taken verbatim
    pub async fn summarize(
        &self,
        filename: &str,
        items: &[SubtitleItem],
        usage: &mut TokenUsageStats,
    ) -> Result<TranslationContext, ProviderError> {
        let sample = build_sample(items, self.char_limit);
        debug!("Summarization sample: {} chars from {} items", sample.chars().count(), items.len());

        let messages = vec![
            ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
            ChatMessage::user(summary_user_message(filename, &sample)),
        ];

        let started = Instant::now();
        let response = self.model.generate(&messages, &[]).await?;
        usage.add_api_duration(started.elapsed());
        usage.add_usage(response.usage);

        info!("Context summary: {}", response.content.trim());
        Ok(TranslationContext::new(response.content))
    }
}
