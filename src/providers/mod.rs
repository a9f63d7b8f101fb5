/*!
 * Chat model transport for translation requests.
 *
 * This module defines the conversation types exchanged with a chat model
 * and the `ChatModel` trait every backend implements:
 * - OpenAI: any OpenAI-compatible chat completions endpoint
 * - Mock: scripted fake used to exercise the retry loop without a network
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::errors::ProviderError;

/// A structured call the model asks us to perform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier used to pair the call with its result turn
    pub id: String,

    /// Name of the requested tool
    pub name: String,

    /// Raw JSON arguments exactly as produced by the model
    pub arguments: String,
}

/// A tool the model may call, described by a JSON schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,

    /// Human readable description shown to the model
    pub description: String,

    /// JSON schema of the arguments object
    pub parameters: serde_json::Value,
}

/// One typed turn of a conversation
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    /// Instructions for the model
    System { content: String },

    /// Input from our side
    User { content: String },

    /// A model reply, possibly carrying tool calls
    Assistant { content: String, tool_calls: Vec<ToolCall> },

    /// The result of a tool call, fed back to the model
    Tool { tool_call_id: String, content: String },
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System { content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User { content: content.into() }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant { content: content.into(), tool_calls }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool { tool_call_id: tool_call_id.into(), content: content.into() }
    }

    /// Role name as used on the wire
    pub fn role(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
            Self::Tool { .. } => "tool",
        }
    }

    /// Text content of the turn
    pub fn content(&self) -> &str {
        match self {
            Self::System { content }
            | Self::User { content }
            | Self::Assistant { content, .. }
            | Self::Tool { content, .. } => content,
        }
    }
}

/// Token usage information reported by the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of prompt tokens
    pub prompt_tokens: u64,
    /// Number of completion tokens
    pub completion_tokens: u64,
}

/// A model reply: free text, tool calls, or both
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    /// Free text content (empty when the model only called tools)
    pub content: String,

    /// Tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,

    /// Token usage, when the service reports it
    pub usage: Option<TokenUsage>,
}

impl ChatResponse {
    /// Create a plain text response
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), ..Default::default() }
    }

    /// Create a response consisting of tool calls only
    pub fn with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self { tool_calls, ..Default::default() }
    }
}

/// Common trait for chat model backends
///
/// Every invocation is a single blocking round trip from the caller's point of
/// view; implementations handle their own transport-level retries and timeouts.
#[async_trait]
pub trait ChatModel: Send + Sync + Debug {
    /// Generate a reply for the given conversation, offering the given tools
    ///
    /// # Arguments
    /// * `messages` - The conversation so far, oldest turn first
    /// * `tools` - Tools the model may call (may be empty)
    async fn generate(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse, ProviderError>;

    /// Name of the underlying model, for logging
    fn model_name(&self) -> &str;
}

pub mod mock;
pub mod openai;
