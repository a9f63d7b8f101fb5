// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow, Context};
use log::{error, warn, info, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use subai::app_config::{self, Config};
use subai::app_controller::{Controller, JobInput};
use subai::file_utils::FileManager;
use subai::providers::openai::OpenAI;
use subai::subtitle_processor::OutputFormat;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for subai
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// subai - bilingual subtitles with an LLM
///
/// Translates a subtitle file line by line through an OpenAI-compatible chat
/// model and writes a bilingual SRT or ASS file.
#[derive(Parser, Debug)]
#[command(name = "subai")]
#[command(version)]
#[command(about = "Bilingual subtitle translation with an LLM")]
#[command(long_about = "subai groups subtitle lines by timing, translates each group through an \
OpenAI-compatible chat model that must submit exactly one translation per line, and writes \
a bilingual subtitle file.

EXAMPLES:
    subai -i movie.srt                           # Write movie.zh.srt next to the input
    subai -i movie.srt -o out.ass -f ass         # Bilingual ASS output
    subai -i movie.vtt -m gpt-4o-mini -t ja      # Other model and target language
    subai -i movie.srt -u http://localhost:1234/v1 -k local
    subai -c subai.json -i movie.srt             # Load (or create) a config file
    subai --test-connection -m gpt-4o-mini       # Check key, endpoint and model
    subai completions bash > subai.bash          # Generate bash completions

CONFIGURATION:
    Without --config built-in defaults are used. With --config the JSON file is
    loaded, or created with defaults when missing. Command line flags override
    the file.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// API key for the chat service
    #[arg(short = 'k', long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the OpenAI-compatible service
    #[arg(short = 'u', long)]
    base_url: Option<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Input subtitle file (srt, vtt, ass, ssa)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file; defaults to <input stem>.<target>.<format> next to the input
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format: srt or ass (default srt)
    #[arg(short = 'f', long)]
    format: Option<String>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'zh', 'ja', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Largest gap in seconds between lines translated together
    #[arg(long, value_name = "SECONDS")]
    max_gap: Option<f64>,

    /// Skip the context summary request
    #[arg(long)]
    no_context: bool,

    /// Send one small request to check the key, endpoint and model, then exit
    #[arg(long)]
    test_connection: bool,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let (color, tag) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace is the ceiling; the effective level is set once config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "subai", &mut std::io::stdout());
        return Ok(());
    }

    match run_translate(cli).await {
        Ok(message) => {
            println!("{}", message);
            Ok(())
        }
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

/// Load the config file (or defaults) and apply command line overrides
fn build_config(options: &CommandLineOptions) -> Result<Config> {
    let mut config = match &options.config {
        Some(path) => Config::load_or_create(path)?,
        None => Config::default(),
    };

    if let Some(api_key) = &options.api_key {
        config.provider.api_key = api_key.clone();
    }
    if let Some(base_url) = &options.base_url {
        config.provider.endpoint = base_url.clone();
    }
    if let Some(model) = &options.model {
        config.provider.model = model.clone();
    }
    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(max_gap) = options.max_gap {
        config.translation.max_gap_seconds = max_gap;
    }
    if options.no_context {
        config.translation.summarize_context = false;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
    if let Some(format) = &options.format {
        config.output_format = OutputFormat::from_str_lossy(format);
    }

    Ok(config)
}

async fn run_translate(options: CommandLineOptions) -> Result<String> {
    // Apply a command line level before the config file is read
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config = build_config(&options)?;
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());

    if options.test_connection {
        let client = OpenAI::new_with_config(&config.provider);
        client.test_connection().await.context("Connection test failed")?;
        return Ok(format!(
            "Connected to {} with model {}",
            client.completions_url(),
            config.provider.model
        ));
    }

    let input = options
        .input
        .clone()
        .ok_or_else(|| anyhow!("An input subtitle file is required (-i/--input)"))?;
    if !FileManager::file_exists(&input) {
        return Err(anyhow!("Input file does not exist: {:?}", input));
    }

    let output_path = options.output.clone().unwrap_or_else(|| {
        FileManager::generate_output_path(&input, &config.target_language, config.output_format)
    });

    let job = JobInput {
        subtitle_path: input,
        output_path,
        output_format: config.output_format.to_string(),
        api_key: config.provider.api_key.clone(),
        base_url: config.provider.endpoint.clone(),
        model_name: config.provider.model.clone(),
    };

    let controller = Controller::with_config(config);

    let cancel = controller.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping at the next request boundary");
            cancel.cancel();
        }
    });

    info!("Translating {:?} -> {:?}", job.subtitle_path, job.output_path);
    let output = controller.run(job).await;

    if output.success {
        Ok(output.message)
    } else {
        Err(anyhow!(output.message))
    }
}
