use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::Path;
use url::Url;

use crate::subtitle_processor::OutputFormat;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Chat model connection settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Grouping and retry settings
    #[serde(default)]
    pub translation: TranslationSettings,

    /// Output subtitle format
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Connection settings for the OpenAI-compatible chat service
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Model name
    #[serde(default = "default_model")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Transport retries for server errors and dropped connections
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: String::new(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            rate_limit: None,
            temperature: default_temperature(),
        }
    }
}

/// What to do when the context summary cannot be produced
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContextFailurePolicy {
    /// Log and continue with an empty context
    #[default]
    Degrade,
    /// Fail the whole job
    Abort,
}

/// What to do with a group whose retries ran out with a wrong-length answer
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MismatchPolicy {
    /// Keep the last answer by position, fall back for missing lines
    #[default]
    KeepPartial,
    /// Fall back to source text for the whole group
    DiscardBatch,
}

/// Upper bound on model invocations per group
pub const MAX_ATTEMPTS: usize = 3;

/// Settings for grouping and the batch retry loop
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationSettings {
    /// Largest gap between consecutive lines that keeps them in one group
    #[serde(default = "default_max_gap_seconds")]
    pub max_gap_seconds: f64,

    /// Model invocations allowed per group, at most `MAX_ATTEMPTS`
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Character cap for the summarization sample
    #[serde(default = "default_context_char_limit")]
    pub context_char_limit: usize,

    /// Whether to summarize the source before translating
    #[serde(default = "default_true")]
    pub summarize_context: bool,

    #[serde(default)]
    pub context_failure_policy: ContextFailurePolicy,

    #[serde(default)]
    pub mismatch_policy: MismatchPolicy,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            max_gap_seconds: default_max_gap_seconds(),
            max_attempts: default_max_attempts(),
            context_char_limit: default_context_char_limit(),
            summarize_context: true,
            context_failure_policy: ContextFailurePolicy::default(),
            mismatch_policy: MismatchPolicy::default(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching filter for the `log` facade
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "zh".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_retry_count() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_gap_seconds() -> f64 {
    3.0
}

fn default_max_attempts() -> usize {
    MAX_ATTEMPTS
}

fn default_context_char_limit() -> usize {
    20_000
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load a configuration file, writing a default one first if it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            return serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()));
        }

        log::warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Save the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        let _source_name = crate::language_utils::get_language_name(&self.source_language)?;
        let _target_name = crate::language_utils::get_language_name(&self.target_language)?;

        if self.provider.model.trim().is_empty() {
            return Err(anyhow!("A model name is required"));
        }

        if self.provider.api_key.trim().is_empty() {
            return Err(anyhow!("An API key is required (use --api-key or OPENAI_API_KEY)"));
        }

        if !self.provider.endpoint.is_empty() {
            Url::parse(&self.provider.endpoint)
                .map_err(|e| anyhow!("Invalid base URL '{}': {}", self.provider.endpoint, e))?;
        }

        let gap = self.translation.max_gap_seconds;
        if !gap.is_finite() || gap < 0.0 {
            return Err(anyhow!("max_gap_seconds must be a non-negative number, got {}", gap));
        }

        if !(1..=MAX_ATTEMPTS).contains(&self.translation.max_attempts) {
            return Err(anyhow!(
                "max_attempts must be between 1 and {}, got {}",
                MAX_ATTEMPTS,
                self.translation.max_attempts
            ));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            provider: ProviderConfig::default(),
            translation: TranslationSettings::default(),
            output_format: OutputFormat::default(),
            log_level: LogLevel::default(),
        }
    }
}
