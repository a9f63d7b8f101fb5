/*!
 * Token and outcome accounting for a translation job.
 */

use std::time::{Duration, Instant};

use crate::providers::TokenUsage;

/// Token usage statistics for tracking API consumption
#[derive(Debug, Clone)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Total number of tokens
    pub total_tokens: u64,

    /// Number of responses that reported usage
    pub reported_responses: u64,

    /// Start time of token tracking
    pub start_time: Instant,

    /// Total time spent waiting on the model
    pub api_duration: Duration,

    /// Model name
    pub model: String,
}

impl Default for TokenUsageStats {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl TokenUsageStats {
    /// Create empty stats for a model
    pub fn new(model: String) -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            reported_responses: 0,
            start_time: Instant::now(),
            api_duration: Duration::from_secs(0),
            model,
        }
    }

    /// Add the usage reported with one response, if any
    pub fn add_usage(&mut self, usage: Option<TokenUsage>) {
        if let Some(usage) = usage {
            self.prompt_tokens += usage.prompt_tokens;
            self.completion_tokens += usage.completion_tokens;
            self.total_tokens += usage.prompt_tokens + usage.completion_tokens;
            self.reported_responses += 1;
        }
    }

    /// Add time spent in one model call
    pub fn add_api_duration(&mut self, duration: Duration) {
        self.api_duration += duration;
    }

    /// Calculate tokens per minute rate
    pub fn tokens_per_minute(&self) -> f64 {
        // Use the API duration for rate calculation, with fallback to elapsed time
        let duration_minutes = if self.api_duration.as_secs_f64() > 0.0 {
            self.api_duration.as_secs_f64() / 60.0
        } else {
            self.start_time.elapsed().as_secs_f64() / 60.0
        };

        if duration_minutes > 0.0 {
            self.total_tokens as f64 / duration_minutes
        } else {
            0.0
        }
    }

    /// Generate a summary of token usage
    pub fn summary(&self) -> String {
        if self.reported_responses == 0 {
            return format!("Token usage: not reported by {}", self.model);
        }

        format!(
            "Token usage: {} prompt + {} completion = {} total ({}), \
             {:.1}s in API calls, {:.0} tokens/min",
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            self.model,
            self.api_duration.as_secs_f64(),
            self.tokens_per_minute()
        )
    }
}

/// How a group's final translation was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOutcome {
    /// `submit_translation` passed verification
    ToolCall,
    /// A bare JSON array in the reply text had the right length
    FreeText,
    /// Attempts ran out without a valid submission
    Exhausted,
    /// A later attempt hit a transport error; earlier data was kept
    TransportDegraded,
}

/// Per-job translation statistics
#[derive(Debug, Clone, Default)]
pub struct TranslationStats {
    /// Groups in the job
    pub total_groups: usize,

    /// Groups that finished (any outcome)
    pub completed_groups: usize,

    /// Source lines in the job
    pub total_lines: usize,

    /// Model invocations made for translation
    pub model_calls: usize,

    /// Attempts beyond the first one of each group
    pub retries: usize,

    pub accepted_via_tool_call: usize,
    pub accepted_via_free_text: usize,
    pub exhausted_groups: usize,
    pub degraded_groups: usize,

    /// Lines whose output is their own source text
    pub fallback_lines: usize,

    /// Token accounting across summarization and translation
    pub token_usage: TokenUsageStats,
}

impl TranslationStats {
    /// Record the end of one group
    pub fn record_group(&mut self, outcome: GroupOutcome, fallback_lines: usize) {
        self.completed_groups += 1;
        self.fallback_lines += fallback_lines;
        match outcome {
            GroupOutcome::ToolCall => self.accepted_via_tool_call += 1,
            GroupOutcome::FreeText => self.accepted_via_free_text += 1,
            GroupOutcome::Exhausted => self.exhausted_groups += 1,
            GroupOutcome::TransportDegraded => self.degraded_groups += 1,
        }
    }

    /// One-line report for logs and the job message
    pub fn summary(&self) -> String {
        format!(
            "{}/{} groups, {} lines, {} model calls ({} retries), {} via tool call, \
             {} via free text, {} exhausted, {} degraded, {} lines fell back to source",
            self.completed_groups,
            self.total_groups,
            self.total_lines,
            self.model_calls,
            self.retries,
            self.accepted_via_tool_call,
            self.accepted_via_free_text,
            self.exhausted_groups,
            self.degraded_groups,
            self.fallback_lines
        )
    }
}
