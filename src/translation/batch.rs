/*!
 * Batch translation with a verified, bounded retry loop.
 *
 * Each group goes through the same protocol:
 * 1. Ask the model to translate the group's lines and submit them through
 *    the `submit_translation` tool.
 * 2. Check the submission (or a bare JSON array in free text) against the
 *    group's line count.
 * 3. On a violation, append the rejected answer and the reason to the
 *    conversation and ask again, up to `max_attempts` calls.
 * 4. Bind whatever was accepted (or last parsed) to the group's positions,
 *    falling back to source text for anything missing.
 *
 * Groups are processed strictly one after another.
 */

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;

use crate::app_config::{MismatchPolicy, TranslationSettings, MAX_ATTEMPTS};
use crate::errors::TranslationError;
use crate::providers::{ChatMessage, ChatModel, ChatResponse, ToolDefinition};

use super::cancellation::CancellationToken;
use super::context::TranslationContext;
use super::conversation::Conversation;
use super::grouping::SubtitleGroup;
use super::merge::{assemble_group, TranslationMap};
use super::prompts::{corrective_message, tool_failure_message, TranslationPrompt};
use super::stats::{GroupOutcome, TranslationStats};
use super::verification::{
    check_count, submit_translation_tool, ContractViolation, ParsedTranslations, ValidationOutcome,
    SUBMIT_TOOL_NAME,
};

/// Where an accepted answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    ToolCall,
    FreeText,
}

/// What the retry loop should do after one model reply
#[derive(Debug, Clone, PartialEq)]
pub enum NextAction {
    /// The answer passed verification
    Accept { translations: Vec<String>, via: Acceptance },
    /// Ask again with the extended conversation
    Retry { violation: ContractViolation },
    /// No attempts left; use the last parsed array, if any
    GiveUp { violation: ContractViolation, last_parsed: Option<Vec<String>> },
}

/// Retry-loop state for one group
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptState {
    /// Model replies consumed so far
    pub attempt: usize,
    pub max_attempts: usize,
    pub expected: usize,
    /// Most recent array that parsed, whatever its length
    pub last_parsed: Option<Vec<String>>,
    pub history: Conversation,
}

impl AttemptState {
    pub fn new(history: Conversation, expected: usize, max_attempts: usize) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS),
            expected,
            last_parsed: None,
            history,
        }
    }
}

/// Verdict on one reply plus the turns to append if it is rejected
struct Evaluation {
    verdict: Result<(Vec<String>, Acceptance), ContractViolation>,
    parsed: Option<Vec<String>>,
    feedback: Vec<ChatMessage>,
}

fn evaluate_tool_calls(response: &ChatResponse, expected: usize) -> Evaluation {
    let mut verdict = None;
    let mut parsed = None;
    let mut tool_turns = Vec::with_capacity(response.tool_calls.len());

    for call in &response.tool_calls {
        let reason = if call.name != SUBMIT_TOOL_NAME {
            ContractViolation::UnknownTool(call.name.clone()).to_string()
        } else if verdict.is_some() {
            "ignored: only the first submission is evaluated".to_string()
        } else {
            match ParsedTranslations::from_arguments(&call.arguments) {
                ParsedTranslations::Ok(translations) => {
                    let checked = check_count(&translations, expected);
                    let reason = ValidationOutcome::from_check(&checked, translations.len()).reason;
                    verdict = Some(checked.map(|()| (translations.clone(), Acceptance::ToolCall)));
                    parsed = Some(translations);
                    reason
                }
                ParsedTranslations::Failed(detail) => {
                    let violation = ContractViolation::MalformedArguments(detail);
                    let reason = violation.to_string();
                    verdict = Some(Err(violation));
                    reason
                }
            }
        };
        let message = tool_failure_message(&reason, expected);
        tool_turns.push(ChatMessage::tool(call.id.clone(), message));
    }

    let verdict = verdict.unwrap_or_else(|| {
        let name = response.tool_calls.first().map(|c| c.name.clone()).unwrap_or_default();
        Err(ContractViolation::UnknownTool(name))
    });

    let mut feedback = vec![ChatMessage::assistant(
        response.content.clone(),
        response.tool_calls.clone(),
    )];
    feedback.extend(tool_turns);

    Evaluation { verdict, parsed, feedback }
}

fn evaluate_free_text(response: &ChatResponse, expected: usize) -> Evaluation {
    let (verdict, parsed) = match ParsedTranslations::from_free_text(&response.content) {
        ParsedTranslations::Ok(translations) => {
            let verdict = check_count(&translations, expected)
                .map(|()| (translations.clone(), Acceptance::FreeText));
            (verdict, Some(translations))
        }
        ParsedTranslations::Failed(detail) => {
            (Err(ContractViolation::MissingToolCall(detail)), None)
        }
    };

    let feedback = match &verdict {
        Ok(_) => Vec::new(),
        Err(violation) => vec![
            ChatMessage::assistant(response.content.clone(), Vec::new()),
            ChatMessage::user(corrective_message(violation, expected)),
        ],
    };

    Evaluation { verdict, parsed, feedback }
}

/// Advance the retry loop by one model reply
///
/// Pure: the same state and reply always give the same action and state.
pub fn advance(state: AttemptState, response: &ChatResponse) -> (NextAction, AttemptState) {
    let evaluation = if response.tool_calls.is_empty() {
        evaluate_free_text(response, state.expected)
    } else {
        evaluate_tool_calls(response, state.expected)
    };

    let attempt = state.attempt + 1;
    let last_parsed = evaluation.parsed.or(state.last_parsed);

    match evaluation.verdict {
        Ok((translations, via)) => {
            let next = AttemptState { attempt, last_parsed, ..state };
            (NextAction::Accept { translations, via }, next)
        }
        Err(violation) => {
            let history = state.history.extended(evaluation.feedback);
            let action = if attempt >= state.max_attempts {
                NextAction::GiveUp { violation, last_parsed: last_parsed.clone() }
            } else {
                NextAction::Retry { violation }
            };
            let next = AttemptState { attempt, last_parsed, history, ..state };
            (action, next)
        }
    }
}

/// Final lines for one group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTranslation {
    /// `(position, text)` for every member
    pub lines: Vec<(usize, String)>,
    pub outcome: GroupOutcome,
    pub fallback_lines: usize,
    /// Model calls spent on the group
    pub attempts: usize,
}

/// Result of translating every group of a job
#[derive(Debug, Clone)]
pub struct BatchTranslation {
    pub translations: TranslationMap,
    pub stats: TranslationStats,
}

/// Translates groups one at a time through the verified retry loop
#[derive(Debug, Clone)]
pub struct BatchTranslator {
    model: Arc<dyn ChatModel>,
    max_attempts: usize,
    mismatch_policy: MismatchPolicy,
    source_language: String,
    target_language: String,
    prompt: TranslationPrompt,
    tools: Vec<ToolDefinition>,
}

impl BatchTranslator {
    /// Create a translator; languages are plain names used in the prompt
    pub fn new(
        model: Arc<dyn ChatModel>,
        settings: &TranslationSettings,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            model,
            max_attempts: settings.max_attempts.clamp(1, MAX_ATTEMPTS),
            mismatch_policy: settings.mismatch_policy,
            source_language: source_language.into(),
            target_language: target_language.into(),
            prompt: TranslationPrompt::new(),
            tools: vec![submit_translation_tool()],
        }
    }

    /// Translate every group in order
    ///
    /// `progress` is called with `(finished_groups, total_groups)` after each
    /// group. Transport errors abort the job; contract violations never do.
    pub async fn translate(
        &self,
        groups: &[SubtitleGroup],
        context: &TranslationContext,
        cancel: &CancellationToken,
        progress: &(dyn Fn(usize, usize) + Send + Sync),
    ) -> Result<BatchTranslation, TranslationError> {
        let mut stats = TranslationStats::default();
        stats.token_usage.model = self.model.model_name().to_string();
        self.translate_with_stats(groups, context, cancel, progress, stats).await
    }

    /// Same as `translate`, continuing from existing stats
    pub async fn translate_with_stats(
        &self,
        groups: &[SubtitleGroup],
        context: &TranslationContext,
        cancel: &CancellationToken,
        progress: &(dyn Fn(usize, usize) + Send + Sync),
        mut stats: TranslationStats,
    ) -> Result<BatchTranslation, TranslationError> {
        let total = groups.len();
        stats.total_groups = total;
        stats.total_lines = groups.iter().map(SubtitleGroup::len).sum();
        let mut translations = TranslationMap::new();

        for (n, group) in groups.iter().enumerate() {
            debug!("Translating group {}/{} ({} lines)", n + 1, total, group.len());

            let Some(result) = self.translate_group(group, context, cancel, &mut stats).await?
            else {
                warn!("Translation cancelled after {} of {} groups", n, total);
                return Err(TranslationError::Cancelled {
                    completed_groups: n,
                    total_groups: total,
                });
            };

            stats.record_group(result.outcome, result.fallback_lines);
            translations.extend(result.lines);
            progress(n + 1, total);
        }

        info!("Batch translation finished: {}", stats.summary());
        Ok(BatchTranslation { translations, stats })
    }

    /// Run the retry loop for one group
    ///
    /// Returns `Ok(None)` when cancelled; nothing from the group is kept.
    pub async fn translate_group(
        &self,
        group: &SubtitleGroup,
        context: &TranslationContext,
        cancel: &CancellationToken,
        stats: &mut TranslationStats,
    ) -> Result<Option<GroupTranslation>, TranslationError> {
        let expected = group.len();
        let system = self.prompt.render(
            expected,
            &self.source_language,
            &self.target_language,
            context.as_str(),
        );
        let user = serde_json::to_string(group.texts())?;
        let conversation = Conversation::new(system, user);
        let mut state = AttemptState::new(conversation, expected, self.max_attempts);

        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }

            stats.model_calls += 1;
            let started = Instant::now();
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(None),
                response = self.model.generate(state.history.turns(), &self.tools) => response,
            };
            stats.token_usage.add_api_duration(started.elapsed());

            let response = match response {
                Ok(response) => response,
                Err(e) if state.attempt == 0 => return Err(e.into()),
                Err(e) => {
                    warn!(
                        "Transport error on attempt {} for group starting at line {}: {}; \
                         keeping earlier data",
                        state.attempt + 1,
                        group.member_indices()[0] + 1,
                        e
                    );
                    return Ok(Some(self.finish(
                        group,
                        state.last_parsed.as_deref(),
                        GroupOutcome::TransportDegraded,
                        state.attempt + 1,
                    )));
                }
            };
            stats.token_usage.add_usage(response.usage);

            let (action, next) = advance(state, &response);
            state = next;

            match action {
                NextAction::Accept { translations, via } => {
                    let outcome = match via {
                        Acceptance::ToolCall => GroupOutcome::ToolCall,
                        Acceptance::FreeText => GroupOutcome::FreeText,
                    };
                    let attempts = state.attempt;
                    return Ok(Some(self.finish(group, Some(&translations), outcome, attempts)));
                }
                NextAction::Retry { violation } => {
                    stats.retries += 1;
                    warn!(
                        "Attempt {}/{} rejected: {}",
                        state.attempt, state.max_attempts, violation
                    );
                }
                NextAction::GiveUp { violation, last_parsed } => {
                    warn!(
                        "Giving up after {} attempts ({}); \
                         lines without a translation keep their source text",
                        state.attempt, violation
                    );
                    let kept = match self.mismatch_policy {
                        MismatchPolicy::KeepPartial => last_parsed,
                        MismatchPolicy::DiscardBatch => None,
                    };
                    let outcome = GroupOutcome::Exhausted;
                    return Ok(Some(self.finish(group, kept.as_deref(), outcome, state.attempt)));
                }
            }
        }
    }

    fn finish(
        &self,
        group: &SubtitleGroup,
        translations: Option<&[String]>,
        outcome: GroupOutcome,
        attempts: usize,
    ) -> GroupTranslation {
        let assembled = assemble_group(group, translations.unwrap_or_default());
        if assembled.fallback_lines > 0 {
            debug!(
                "{} of {} lines fell back to source text",
                assembled.fallback_lines,
                group.len()
            );
        }
        GroupTranslation {
            lines: assembled.lines,
            outcome,
            fallback_lines: assembled.fallback_lines,
            attempts,
        }
    }
}
