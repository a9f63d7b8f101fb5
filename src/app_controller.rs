use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use indicatif::{ProgressBar, ProgressStyle};

use crate::app_config::{Config, ContextFailurePolicy};
use crate::errors::{AppError, TranslationError};
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::providers::ChatModel;
use crate::providers::openai::OpenAI;
use crate::subtitle_processor::{OutputFormat, SubtitleCollection};
use crate::translation::{
    group_by_time, BatchTranslator, CancellationToken, ContextSummarizer, TranslationContext,
    TranslationMerger, TranslationStats,
};

// @module: Application controller for subtitle translation jobs

/// Everything one job needs from its caller
#[derive(Debug, Clone, Default)]
pub struct JobInput {
    pub subtitle_path: PathBuf,
    pub output_path: PathBuf,
    /// `srt` or `ass`, case-insensitive; anything else means `srt`
    pub output_format: String,
    /// Empty values fall back to the configuration
    pub api_key: String,
    pub base_url: String,
    pub model_name: String,
}

/// What a job reports back
#[derive(Debug)]
pub struct JobOutput {
    pub success: bool,
    pub message: String,
    /// The bilingual subtitles, on success
    pub subtitle: Option<SubtitleCollection>,
    /// Translation statistics, when translation ran to completion
    pub stats: Option<TranslationStats>,
}

impl JobOutput {
    fn failed(error: &AppError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            subtitle: None,
            stats: None,
        }
    }
}

/// Main application controller for subtitle translation
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Injected model; built from the job input when absent
    model: Option<Arc<dyn ChatModel>>,

    // @field: Shared with whoever may interrupt the job
    cancel: CancellationToken,

    // @field: Draw a progress bar over groups
    show_progress: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            model: None,
            cancel: CancellationToken::new(),
            show_progress: true,
        }
    }

    /// Create a controller that uses `model` instead of an HTTP client
    pub fn with_model(config: Config, model: Arc<dyn ChatModel>) -> Self {
        Self {
            model: Some(model),
            ..Self::with_config(config)
        }
    }

    /// Enable or disable the progress bar
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Token that cancels the running job at the next model call boundary
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one job: parse, group, summarize, translate, merge, render, save
    ///
    /// Never returns an error; failures are reported in the output.
    pub async fn run(&self, input: JobInput) -> JobOutput {
        let start_time = Instant::now();
        info!("Starting job for {:?}", input.subtitle_path);

        match self.run_job(&input).await {
            Ok((subtitle, stats)) => {
                let message = format!(
                    "subtitle translated successfully, saved to {} \
                     ({} of {} lines fell back to source text)",
                    input.output_path.display(),
                    stats.fallback_lines,
                    stats.total_lines
                );
                info!("{}", stats.token_usage.summary());
                let elapsed = Self::format_duration(start_time.elapsed());
                info!("Job finished in {}: {}", elapsed, message);
                JobOutput {
                    success: true,
                    message,
                    subtitle: Some(subtitle),
                    stats: Some(stats),
                }
            }
            Err(e) => {
                error!("Job failed: {}", e);
                JobOutput::failed(&e)
            }
        }
    }

    async fn run_job(
        &self,
        input: &JobInput,
    ) -> Result<(SubtitleCollection, TranslationStats), AppError> {
        let settings = &self.config.translation;
        let format = OutputFormat::from_str_lossy(&input.output_format);

        let mut subtitles = SubtitleCollection::parse_file(&input.subtitle_path)?;
        info!("Parsed {} subtitle lines", subtitles.len());

        let groups = group_by_time(&subtitles.items, settings.max_gap_seconds);
        info!("Split into {} groups (max gap {}s)", groups.len(), settings.max_gap_seconds);

        let model = self.resolve_model(input)?;
        let mut stats = TranslationStats::default();
        stats.token_usage.model = model.model_name().to_string();

        let context = if settings.summarize_context && !subtitles.is_empty() {
            self.summarize(&model, &subtitles, groups.len(), &mut stats).await?
        } else {
            TranslationContext::empty()
        };

        let translator = BatchTranslator::new(
            model,
            settings,
            Self::language_name(&self.config.source_language),
            Self::language_name(&self.config.target_language),
        );

        let progress_bar = self.progress_bar(groups.len() as u64);
        let tick = |done: usize, _total: usize| progress_bar.set_position(done as u64);
        let result = translator
            .translate_with_stats(&groups, &context, &self.cancel, &tick, stats)
            .await;
        progress_bar.finish_and_clear();
        let batch = result?;

        let assigned = TranslationMerger::merge(&mut subtitles.items, &batch.translations);
        debug!("Merged {} translations", assigned);

        let content = subtitles.render(format);
        FileManager::write_to_file(&input.output_path, &content)
            .map_err(|e| AppError::Save(format!("{:#}", e)))?;
        info!("Saved {} output to {}", format, input.output_path.display());

        Ok((subtitles, batch.stats))
    }

    /// Produce the synopsis, applying the configured failure policy
    async fn summarize(
        &self,
        model: &Arc<dyn ChatModel>,
        subtitles: &SubtitleCollection,
        total_groups: usize,
        stats: &mut TranslationStats,
    ) -> Result<TranslationContext, AppError> {
        let settings = &self.config.translation;
        if self.cancel.is_cancelled() {
            return Err(TranslationError::Cancelled { completed_groups: 0, total_groups }.into());
        }

        let summarizer = ContextSummarizer::new(model.clone(), settings.context_char_limit);
        let file_name = subtitles.file_name();
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                let cancelled = TranslationError::Cancelled { completed_groups: 0, total_groups };
                return Err(cancelled.into());
            }
            result = summarizer.summarize(&file_name, &subtitles.items, &mut stats.token_usage) => {
                result
            }
        };

        match (result, settings.context_failure_policy) {
            (Ok(context), _) => Ok(context),
            (Err(e), ContextFailurePolicy::Degrade) => {
                warn!("Context summary failed, continuing without context: {}", e);
                Ok(TranslationContext::empty())
            }
            (Err(e), ContextFailurePolicy::Abort) => Err(AppError::Provider(e)),
        }
    }

    /// The injected model, or an OpenAI client built from config plus job overrides
    fn resolve_model(&self, input: &JobInput) -> Result<Arc<dyn ChatModel>, AppError> {
        if let Some(model) = &self.model {
            return Ok(model.clone());
        }

        let mut provider = self.config.provider.clone();
        if !input.api_key.is_empty() {
            provider.api_key = input.api_key.clone();
        }
        if !input.base_url.is_empty() {
            provider.endpoint = input.base_url.clone();
        }
        if !input.model_name.is_empty() {
            provider.model = input.model_name.clone();
        }

        if provider.api_key.trim().is_empty() {
            return Err(AppError::Config("An API key is required".to_string()));
        }
        if provider.model.trim().is_empty() {
            return Err(AppError::Config("A model name is required".to_string()));
        }

        info!("Using model {} at {}", provider.model, provider.endpoint);
        Ok(Arc::new(OpenAI::new_with_config(&provider)))
    }

    fn language_name(code: &str) -> String {
        language_utils::get_language_name(code).unwrap_or_else(|_| code.to_string())
    }

    fn progress_bar(&self, total_groups: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress_bar = ProgressBar::new(total_groups);
        let style = ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} groups \
                 ({percent}%) {eta}",
            )
            .or_else(|_| {
                ProgressStyle::default_bar()
                    .template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%)")
            })
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
