// Logging behavior:
// - Writes logs to both stderr and a daily-rotated file at logs/chyron.log.
// - Default log level is INFO. Control via RUST_LOG environment variable:
//   * RUST_LOG=info                      # Standard logging (default)
//   * RUST_LOG=debug                     # Verbose debugging
//   * RUST_LOG=chyron_core=trace         # Fine-grained per-module control
// - The logs/ directory is created on startup if missing; file output uses a non-blocking writer.
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chyron_app::demo_source::DemoAudioSource;
use chyron_app::pipeline::{Pipeline, PipelineOptions};
use chyron_app::Settings;
use chyron_audio::AudioBufferConfig;
use chyron_foundation::clock::real_clock;
use chyron_foundation::error::ChyronError;
use chyron_foundation::shutdown::ShutdownHandler;
use chyron_foundation::state::{AppState, StateManager};
use chyron_stt::mock::MockEngine;
use chyron_telemetry::CaptionMetrics;

fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>>
{
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "chyron.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr);
    let file_layer = fmt::layer().with_writer(non_blocking_file).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

#[derive(Parser, Debug)]
#[command(name = "chyron", author, version, about = "Live captioning pipeline")]
struct Cli {
    /// Path to the settings JSON file (default: platform app-data directory)
    #[arg(long = "settings")]
    settings_path: Option<PathBuf>,

    /// WAV file to stream in place of a live capture device
    #[arg(long = "source", required = true)]
    source: PathBuf,

    /// Path to the STT model (passed through to the engine, unused by the mock engine)
    #[arg(long = "model", default_value = "model.bin")]
    model: PathBuf,

    /// Playback speed multiplier for the demo source
    #[arg(long = "speed", default_value_t = 1.0)]
    speed: f64,

    /// Override the configured silence-commit duration, in milliseconds
    #[arg(long = "silence-ms")]
    silence_ms: Option<u64>,

    /// Override the configured inference throttle interval, in milliseconds
    #[arg(long = "inference-interval-ms")]
    inference_interval_ms: Option<u64>,

    /// Override the configured caption line width, in characters
    #[arg(long = "chars-per-line")]
    chars_per_line: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _log_guard = init_logging()?;
    tracing::info!("starting chyron");

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.settings_path.as_deref());

    if let Some(ms) = cli.silence_ms {
        settings.segmenter.silence_ms = ms;
    }
    if let Some(ms) = cli.inference_interval_ms {
        settings.segmenter.inference_interval_ms = ms;
    }
    if let Some(n) = cli.chars_per_line {
        settings.renderer.chars_per_line = n;
    }
    settings.validate();

    let state_manager = StateManager::new();
    let shutdown = ShutdownHandler::new();
    let _ctrl_c = shutdown.spawn_ctrl_c_listener();

    let metrics = CaptionMetrics::new();
    let opts = PipelineOptions {
        language: settings.language.clone(),
        model_path: cli.model,
        audio: AudioBufferConfig::default(),
        segmenter: chyron_core::SegmenterConfig {
            silence_ms: settings.segmenter.silence_ms,
            inference_interval_ms: settings.segmenter.inference_interval_ms,
            ..chyron_core::SegmenterConfig::default()
        },
        renderer: chyron_core::RendererConfig {
            chars_per_line: settings.renderer.chars_per_line,
            show_audio_tags: settings.show_audio_tags,
            filter_profanity: settings.filter_profanity,
            ..chyron_core::RendererConfig::default()
        },
    };

    let engine = Box::new(MockEngine::with_text(""));
    let pipeline = Pipeline::new(engine, opts, real_clock(), metrics.clone())
        .await
        .map_err(|e: ChyronError| -> Box<dyn std::error::Error> { Box::new(e) })?;

    state_manager.transition(AppState::Running)?;
    tracing::info!("state transition: Running");

    let pipeline = std::sync::Arc::new(pipeline);
    let source = DemoAudioSource::new(&cli.source, cli.speed);
    let pipeline_for_data = pipeline.clone();
    let pipeline_for_level = pipeline.clone();
    let audio_task = source.start(
        move |bytes| pipeline_for_data.push_audio(bytes),
        move |level| pipeline_for_level.report_level(level),
    )?;

    pipeline.start(
        |segment| tracing::debug!(text = %segment.text, is_final = segment.is_final, "segment"),
        |line1| tracing::info!(%line1, "line1"),
        |line2| tracing::info!(%line2, "line2"),
    );

    let mut stats_interval = tokio::time::interval(Duration::from_secs(30));
    tokio::select! {
        _ = shutdown.wait() => {
            tracing::debug!("shutdown signal received");
        }
        _ = async {
            loop {
                stats_interval.tick().await;
                tracing::info!("chyron running");
            }
        } => {}
    }

    tracing::debug!("beginning graceful shutdown");
    state_manager.transition(AppState::Stopping)?;
    source.stop();
    let _ = audio_task.await;
    pipeline.shutdown().await;
    state_manager.transition(AppState::Stopped)?;

    if let Err(err) = settings.save(cli.settings_path.as_deref()) {
        tracing::warn!(error = %err, "failed to persist settings");
    }
    tracing::debug!("shutdown complete");

    Ok(())
}
