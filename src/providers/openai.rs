use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use super::{ChatMessage, ChatModel, ChatResponse, TokenUsage, ToolCall, ToolDefinition};

/// OpenAI-compatible chat completions client
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Base URL of the API, e.g. `https://api.openai.com/v1`
    endpoint: String,
    /// Model to request
    model: String,
    /// Sampling temperature
    temperature: Option<f32>,
    /// Request timeout, reported in timeout errors
    timeout_secs: u64,
    /// Maximum number of transport-level retries
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
    /// Optional rate limit in requests per minute
    rate_limit: Option<u32>,
    /// When the previous request was sent, for client-side pacing
    last_request: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for OpenAI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the API key
        f.debug_struct("OpenAI")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_retries", &self.max_retries)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

/// Chat completions request
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<OpenAIMessage>,

    /// Tools the model may call
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAITool>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Message in OpenAI wire format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIMessage {
    /// Role of the message sender (system, user, assistant, tool)
    pub role: String,

    /// Content of the message, absent on pure tool-call replies
    #[serde(default)]
    pub content: Option<String>,

    /// Tool calls carried by an assistant message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenAIToolCall>>,

    /// Id of the call a tool message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Tool call in OpenAI wire format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIToolCall {
    pub id: String,

    #[serde(rename = "type", default = "default_tool_type")]
    pub call_type: String,

    pub function: OpenAIFunctionCall,
}

/// Function name and raw JSON arguments of a tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIFunctionCall {
    pub name: String,

    #[serde(default)]
    pub arguments: String,
}

/// Tool declaration in OpenAI wire format
#[derive(Debug, Clone, Serialize)]
pub struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: String,

    function: OpenAIFunction,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// One choice in a chat completions response
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIMessage,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Chat completions response
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,

    #[serde(default)]
    pub usage: Option<OpenAIUsage>,
}

fn default_tool_type() -> String {
    "function".to_string()
}

impl Default for OpenAIRequest {
    fn default() -> Self {
        Self {
            model: String::new(),
            messages: Vec::new(),
            tools: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl OpenAIRequest {
    /// Create a new request for the given model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Add a plain message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(OpenAIMessage {
            role: role.into(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        });
        self
    }

    /// Append a typed conversation turn
    pub fn add_chat_message(mut self, message: &ChatMessage) -> Self {
        self.messages.push(OpenAIMessage::from(message));
        self
    }

    /// Offer a tool to the model
    pub fn add_tool(mut self, tool: &ToolDefinition) -> Self {
        self.tools.push(OpenAITool {
            tool_type: default_tool_type(),
            function: OpenAIFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of tokens to generate
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl From<&ChatMessage> for OpenAIMessage {
    fn from(message: &ChatMessage) -> Self {
        match message {
            ChatMessage::Assistant { content, tool_calls } if !tool_calls.is_empty() => Self {
                role: message.role().to_string(),
                content: if content.is_empty() { None } else { Some(content.clone()) },
                tool_calls: Some(
                    tool_calls
                        .iter()
                        .map(|call| OpenAIToolCall {
                            id: call.id.clone(),
                            call_type: default_tool_type(),
                            function: OpenAIFunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        })
                        .collect(),
                ),
                tool_call_id: None,
            },
            ChatMessage::Tool { tool_call_id, content } => Self {
                role: message.role().to_string(),
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: Some(tool_call_id.clone()),
            },
            other => Self {
                role: other.role().to_string(),
                content: Some(other.content().to_string()),
                tool_calls: None,
                tool_call_id: None,
            },
        }
    }
}

impl From<OpenAIResponse> for ChatResponse {
    fn from(response: OpenAIResponse) -> Self {
        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        });

        let Some(choice) = response.choices.into_iter().next() else {
            return ChatResponse { usage, ..Default::default() };
        };

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            usage,
        }
    }
}

impl OpenAI {
    /// Create a new client with default retry settings
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::build(api_key.into(), endpoint.into(), model.into(), None, 120, 2, 1000, None)
    }

    /// Create a new client from provider configuration
    pub fn new_with_config(config: &ProviderConfig) -> Self {
        Self::build(
            config.api_key.clone(),
            config.endpoint.clone(),
            config.model.clone(),
            Some(config.temperature),
            config.timeout_secs,
            config.retry_count,
            config.retry_backoff_ms,
            config.rate_limit,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        api_key: String,
        endpoint: String,
        model: String,
        temperature: Option<f32>,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
        rate_limit: Option<u32>,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_default(),
            api_key,
            endpoint,
            model,
            temperature,
            timeout_secs,
            max_retries,
            backoff_base_ms,
            rate_limit,
            last_request: Mutex::new(None),
        }
    }

    /// Full URL of the chat completions endpoint
    pub fn completions_url(&self) -> String {
        let base = if self.endpoint.is_empty() {
            "https://api.openai.com/v1"
        } else {
            self.endpoint.trim_end_matches('/')
        };
        format!("{}/chat/completions", base)
    }

    /// Complete a chat request, retrying transient failures with exponential backoff
    pub async fn complete(&self, request: &OpenAIRequest) -> Result<OpenAIResponse, ProviderError> {
        let url = self.completions_url();
        let mut attempt = 0;

        loop {
            self.wait_for_rate_limit().await;

            match self.send_once(&url, request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let backoff_ms =
                        self.backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(16));
                    warn!(
                        "OpenAI request failed: {} - retry {}/{} in {}ms",
                        e, attempt, self.max_retries, backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send a single request without retries
    async fn send_once(
        &self,
        url: &str,
        request: &OpenAIRequest,
    ) -> Result<OpenAIResponse, ProviderError> {
        let mut builder = self.client.post(url).json(request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                ProviderError::ConnectionError(e.to_string())
            } else {
                ProviderError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("OpenAI API error ({}): {}", status, error_text);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ProviderError::AuthenticationError(error_text)
                }
                StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(error_text),
                _ => ProviderError::ApiError { status_code: status.as_u16(), message: error_text },
            });
        }

        let body = response.text().await.map_err(|e| {
            ProviderError::RequestFailed(format!("Failed to read response body: {}", e))
        })?;

        serde_json::from_str::<OpenAIResponse>(&body).map_err(|e| {
            let preview: String = body.chars().take(500).collect();
            error!(
                "Failed to parse OpenAI response: {}. Raw response (first 500 chars): {}",
                e, preview
            );
            ProviderError::ParseError(e.to_string())
        })
    }

    /// Sleep until the configured requests-per-minute budget allows another request
    async fn wait_for_rate_limit(&self) {
        let Some(rate_limit) = self.rate_limit.filter(|r| *r > 0) else {
            return;
        };
        let min_interval = Duration::from_millis(60_000 / rate_limit as u64);

        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < min_interval {
                let wait = min_interval - elapsed;
                debug!("Rate limiting: waiting {:?} before next request", wait);
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Test the connection to the API
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = OpenAIRequest::new(&self.model)
            .add_message("user", "Hello")
            .max_tokens(5);

        self.complete(&request).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatModel for OpenAI {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse, ProviderError> {
        let mut request = OpenAIRequest::new(&self.model);
        for message in messages {
            request = request.add_chat_message(message);
        }
        for tool in tools {
            request = request.add_tool(tool);
        }
        if let Some(temperature) = self.temperature {
            request = request.temperature(temperature);
        }

        let response = self.complete(&request).await?;
        Ok(ChatResponse::from(response))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
