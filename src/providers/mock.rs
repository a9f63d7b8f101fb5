/*!
 * Mock chat model for testing.
 *
 * This module provides a fake `ChatModel` that never touches the network:
 * - `MockChatModel::working()` - Always submits one translation per input line
 * - `MockChatModel::scripted(..)` - Replays canned replies, one per call
 * - `MockChatModel::failing()` - Always fails with a transport error
 *
 * Every call is recorded so tests can inspect the conversation the retry
 * loop sent on each attempt.
 */

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::translation::SUBMIT_TOOL_NAME;
use super::{ChatMessage, ChatModel, ChatResponse, ToolCall, ToolDefinition};

/// One canned reply of a scripted mock
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Call `submit_translation` with these lines
    Submit(Vec<String>),
    /// Call `submit_translation` with raw (possibly malformed) arguments
    RawArguments(String),
    /// Call a tool with an arbitrary name and arguments
    OtherTool { name: String, arguments: String },
    /// Answer with free text and no tool call
    Text(String),
    /// Fail with an API error
    Fail { status_code: u16, message: String },
    /// Never answer (for cancellation tests)
    Hang,
}

impl MockReply {
    /// Convenience constructor for `Submit`
    pub fn submit<S: AsRef<str>>(lines: &[S]) -> Self {
        Self::Submit(lines.iter().map(|s| s.as_ref().to_string()).collect())
    }
}

/// Behavior mode for the mock model
#[derive(Debug, Clone)]
enum MockBehavior {
    /// Translate every line by prefixing it with a tag
    Working { tag: String },
    /// Replay replies in order; fail once they run out
    Scripted,
    /// Always fail
    Failing,
}

/// A single recorded invocation
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Conversation sent to the model
    pub messages: Vec<ChatMessage>,
    /// Names of the tools offered
    pub tool_names: Vec<String>,
}

/// Mock chat model for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockChatModel {
    behavior: MockBehavior,
    script: Arc<Mutex<VecDeque<MockReply>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    request_count: Arc<AtomicUsize>,
    summary: String,
}

impl MockChatModel {
    fn new(behavior: MockBehavior, script: Vec<MockReply>) -> Self {
        Self {
            behavior,
            script: Arc::new(Mutex::new(script.into())),
            calls: Arc::new(Mutex::new(Vec::new())),
            request_count: Arc::new(AtomicUsize::new(0)),
            summary: "A drama about a family reunion.".to_string(),
        }
    }

    /// Create a mock that translates every line as `[zh] <line>`
    pub fn working() -> Self {
        Self::with_tag("zh")
    }

    /// Create a working mock with a custom translation tag
    pub fn with_tag(tag: &str) -> Self {
        Self::new(MockBehavior::Working { tag: tag.to_string() }, Vec::new())
    }

    /// Create a mock that replays `replies` in order
    pub fn scripted(replies: Vec<MockReply>) -> Self {
        Self::new(MockBehavior::Scripted, replies)
    }

    /// Create a mock that always fails with a server error
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing, Vec::new())
    }

    /// Set the text returned for requests that offer no tools
    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = summary.to_string();
        self
    }

    /// Number of `generate` calls made so far (shared between clones)
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of every recorded call
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Replies left in the script
    pub fn remaining_replies(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or_default()
    }

    /// Produce the reply a working mock gives for this conversation
    fn working_reply(
        &self,
        tag: &str,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> ChatResponse {
        if tools.is_empty() {
            return ChatResponse::text(self.summary.clone());
        }

        let lines: Vec<String> = messages
            .iter()
            .find_map(|m| match m {
                ChatMessage::User { content } => serde_json::from_str::<Vec<String>>(content).ok(),
                _ => None,
            })
            .unwrap_or_default();

        let translated: Vec<String> = lines.iter().map(|l| format!("[{}] {}", tag, l)).collect();
        self.reply_to_response(MockReply::Submit(translated))
    }

    fn reply_to_response(&self, reply: MockReply) -> ChatResponse {
        let id = format!("call_{}", self.request_count.load(Ordering::SeqCst));
        match reply {
            MockReply::Submit(lines) => ChatResponse::with_tool_calls(vec![ToolCall {
                id,
                name: SUBMIT_TOOL_NAME.to_string(),
                arguments: serde_json::json!({ "translations": lines }).to_string(),
            }]),
            MockReply::RawArguments(arguments) => ChatResponse::with_tool_calls(vec![ToolCall {
                id,
                name: SUBMIT_TOOL_NAME.to_string(),
                arguments,
            }]),
            MockReply::OtherTool { name, arguments } => {
                ChatResponse::with_tool_calls(vec![ToolCall { id, name, arguments }])
            }
            MockReply::Text(text) => ChatResponse::text(text),
            // Handled in `generate`
            MockReply::Fail { .. } | MockReply::Hang => ChatResponse::default(),
        }
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                messages: messages.to_vec(),
                tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            });
        }
        let count = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;

        match &self.behavior {
            MockBehavior::Working { tag } => Ok(self.working_reply(tag, messages, tools)),

            MockBehavior::Failing => Err(ProviderError::ApiError {
                status_code: 500,
                message: "Simulated provider failure".to_string(),
            }),

            MockBehavior::Scripted => {
                let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
                match next {
                    Some(MockReply::Fail { status_code, message }) => {
                        Err(ProviderError::ApiError { status_code, message })
                    }
                    Some(MockReply::Hang) => {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Err(ProviderError::Timeout(3600))
                    }
                    Some(reply) => Ok(self.reply_to_response(reply)),
                    None => Err(ProviderError::RequestFailed(format!(
                        "Mock script exhausted at request #{}",
                        count
                    ))),
                }
            }
        }
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
