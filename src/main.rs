//! Command-line entry point.
//!
//! # Startup sequence
//!
//! 1. Initialise logging (`RUST_LOG` overrides the `info` default).
//! 2. Load [`AppConfig`] from `--config` or the platform settings file.
//! 3. Build the media toolchain and provider registries.
//! 4. Create the root [`CancellationToken`]; Ctrl-C cancels it.
//! 5. Run the requested job on a child token.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use speech_tasks::{
    config::AppConfig,
    media::{FfmpegToolchain, MediaToolchain},
    notify::{LogSink, SharedSink},
    queue::WorkItem,
    registry::ProviderRegistry,
    stt::{HttpRecognizer, Recognizer},
    task::{
        report_failure, JobOutcome, SpeechToTextRequest, SpeechToTextTask, TextToSpeechRequest,
        TextToSpeechTask,
    },
    tts::{HttpTtsExecutor, ItemExecutor},
};

#[derive(Parser)]
#[command(name = "speech-tasks")]
#[command(about = "Speech recognition and batch dubbing jobs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Settings file (defaults to the platform config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe an audio or video file into an `.srt` subtitle.
    Recognize {
        source: PathBuf,

        /// Output directory (defaults to `<home>/recogn`).
        #[arg(long)]
        target_dir: Option<PathBuf>,

        /// Spoken language, or `auto`.
        #[arg(long)]
        language: Option<String>,

        /// Remove the source once the subtitle is written.
        #[arg(long)]
        delete_source: bool,
    },

    /// Render every line of a JSON work-item array to audio.
    Dub {
        queue: PathBuf,

        /// Language passed to the TTS service.
        #[arg(long)]
        language: Option<String>,

        /// Play the first line instead of post-processing the batch.
        #[arg(long)]
        play: bool,
    },
}

async fn wait_for_shutdown_signal(root: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            log::info!("Ctrl-C received, cancelling running jobs");
            root.cancel();
        }
        Err(e) => log::error!("failed to install Ctrl-C handler: {e}"),
    }
}

async fn recognize(
    config: &AppConfig,
    media: Arc<dyn MediaToolchain>,
    request: SpeechToTextRequest,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut recognizers: ProviderRegistry<dyn Recognizer> = ProviderRegistry::new();
    recognizers.register("http", Arc::new(HttpRecognizer::from_config(&config.recognition)));

    let sink: SharedSink = Arc::new(LogSink::new("speech2text"));
    let task = SpeechToTextTask::new(config, Arc::new(recognizers), media, sink);

    match task.run(&request, cancel).await? {
        JobOutcome::Completed(subtitle) => println!("{}", subtitle.display()),
        JobOutcome::Cancelled => log::warn!("recognition cancelled"),
    }
    Ok(())
}

async fn dub(
    config: &AppConfig,
    media: Arc<dyn MediaToolchain>,
    queue: PathBuf,
    language: String,
    play: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let content = tokio::fs::read_to_string(&queue)
        .await
        .with_context(|| format!("reading {}", queue.display()))?;
    let items: Vec<WorkItem> =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", queue.display()))?;

    let sink: SharedSink = Arc::new(LogSink::new("dubbing"));
    let executor = HttpTtsExecutor::from_config(&config.dubbing, language, Arc::clone(&media))
        .map_err(|e| report_failure("dubbing", &sink, e))?;
    let mut executors: ProviderRegistry<dyn ItemExecutor> = ProviderRegistry::new();
    executors.register("http", Arc::new(executor));

    let task = TextToSpeechTask::new(config, Arc::new(executors), media, sink);

    match task.run(&TextToSpeechRequest::new(items).play(play), cancel).await? {
        JobOutcome::Completed(report) => log::info!(
            "dubbing done: {}/{} line(s) rendered",
            report.total - report.failed,
            report.total
        ),
        JobOutcome::Cancelled => log::warn!("dubbing cancelled"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // 2. Configuration
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}), using defaults");
            AppConfig::default()
        }),
    };

    // 3. Collaborators
    let media: Arc<dyn MediaToolchain> = Arc::new(FfmpegToolchain::new());

    // 4. Cancellation
    let root = CancellationToken::new();
    tokio::spawn(wait_for_shutdown_signal(root.clone()));
    let job = root.child_token();

    // 5. Job
    match cli.command {
        Command::Recognize {
            source,
            target_dir,
            language,
            delete_source,
        } => {
            let mut request = SpeechToTextRequest::new(source);
            if let Some(dir) = target_dir {
                request = request.target_dir(dir);
            }
            if let Some(language) = language {
                request = request.language(language);
            }
            if delete_source {
                request = request.delete_source(true);
            }
            recognize(&config, media, request, &job).await
        }
        Command::Dub {
            queue,
            language,
            play,
        } => {
            let language = language.unwrap_or_else(|| config.general.default_language.clone());
            dub(&config, media, queue, language, play, &job).await
        }
    }
}
