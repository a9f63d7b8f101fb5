/*!
 * Subtitle translation through a chat model.
 *
 * The pipeline is split into small submodules, leaf-first:
 *
 * - `grouping`: time-gap grouping of subtitle lines
 * - `context`: one-off synopsis of the source used in every prompt
 * - `verification`: the `submit_translation` contract and its checks
 * - `conversation`: typed turn log for one group's retries
 * - `prompts`: prompt templates
 * - `batch`: the per-group retry state machine
 * - `merge`: binding translations back onto items
 * - `cancellation`: cooperative job cancellation
 * - `stats`: token and outcome accounting
 */

// Re-export main types for easier usage
pub use self::batch::{
    advance, AttemptState, BatchTranslation, BatchTranslator, GroupTranslation, NextAction,
};
pub use self::cancellation::CancellationToken;
pub use self::context::{build_sample, ContextSummarizer, TranslationContext};
pub use self::conversation::Conversation;
pub use self::grouping::{group_by_time, SubtitleGroup, TimeGrouper};
pub use self::merge::{assemble_group, TranslationMap, TranslationMerger};
pub use self::stats::{GroupOutcome, TokenUsageStats, TranslationStats};
pub use self::verification::{
    ContractViolation, ParsedTranslations, ValidationOutcome, SUBMIT_TOOL_NAME,
};

// Submodules
pub mod batch;
pub mod cancellation;
pub mod context;
pub mod conversation;
pub mod grouping;
pub mod merge;
pub mod prompts;
pub mod stats;
pub mod verification;
