//! Facade wiring an audio source, the single-flight STT worker, the
//! segmenter, and the output renderer into one runnable unit (spec.md §4.5).

use chyron_audio::{AudioBuffer, AudioBufferConfig};
use chyron_core::{OutputRenderer, RenderedLines, Segment, Segmenter};
use chyron_core::{RendererConfig, SegmenterConfig};
use chyron_foundation::clock::SharedClock;
use chyron_foundation::error::ChyronError;
use chyron_foundation::shutdown::ShutdownHandler;
use chyron_stt::engine::SttEngine;
use chyron_stt::SttWorker;
use chyron_telemetry::CaptionMetrics;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct PipelineOptions {
    pub language: String,
    pub model_path: PathBuf,
    pub audio: AudioBufferConfig,
    pub segmenter: SegmenterConfig,
    pub renderer: RendererConfig,
}

pub struct Pipeline {
    audio: Arc<AudioBuffer>,
    segmenter: Arc<Segmenter>,
    renderer: Arc<Mutex<OutputRenderer>>,
    shutdown: ShutdownHandler,
    run_handle: Mutex<Option<JoinHandle<()>>>,
    metrics: CaptionMetrics,
}

impl Pipeline {
    /// Initializes the STT engine synchronously: `ModelError` is surfaced
    /// to the caller before the pipeline is considered constructed
    /// (spec.md §7's policy for startup errors).
    pub async fn new(
        mut engine: Box<dyn SttEngine>,
        opts: PipelineOptions,
        clock: SharedClock,
        metrics: CaptionMetrics,
    ) -> Result<Self, ChyronError> {
        engine.initialize(&opts.model_path).await?;

        let audio = Arc::new(AudioBuffer::with_metrics(opts.audio, metrics.clone(), clock.clone()));
        let stt = Arc::new(SttWorker::new(engine, opts.language));
        let segmenter = Arc::new(
            Segmenter::new(audio.clone(), stt, opts.segmenter, clock).with_metrics(metrics.clone()),
        );
        let renderer = Arc::new(Mutex::new(OutputRenderer::new(opts.renderer)));

        Ok(Self {
            audio,
            segmenter,
            renderer,
            shutdown: ShutdownHandler::new(),
            run_handle: Mutex::new(None),
            metrics,
        })
    }

    pub fn push_audio(&self, bytes: &[u8]) {
        self.audio.push(bytes);
    }

    pub fn report_level(&self, level: f32) {
        self.audio.report_level(level);
    }

    pub fn metrics(&self) -> &CaptionMetrics {
        &self.metrics
    }

    /// Starts the segmenter loop. Every emitted `Segment` is handed to
    /// `on_segment`, then fed through the renderer whose two display lines
    /// are handed to `set_line1`/`set_line2` (spec.md §6).
    pub fn start<S, L1, L2>(&self, mut on_segment: S, mut set_line1: L1, mut set_line2: L2)
    where
        S: FnMut(&Segment) + Send + 'static,
        L1: FnMut(&str) + Send + 'static,
        L2: FnMut(&str) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Segment>();
        let segmenter = self.segmenter.clone();
        let shutdown = self.shutdown.clone();
        let run_task = tokio::spawn(async move {
            segmenter.run(tx, shutdown.wait()).await;
        });

        let renderer = self.renderer.clone();
        let forward_task = tokio::spawn(async move {
            while let Some(segment) = rx.recv().await {
                on_segment(&segment);
                let rendered: Option<RenderedLines> = {
                    let mut renderer = renderer.lock().unwrap();
                    renderer.on_text(&segment.text, segment.is_final)
                };
                if let Some(lines) = rendered {
                    set_line1(&lines.line1);
                    set_line2(&lines.line2);
                }
            }
        });

        let combined = tokio::spawn(async move {
            let _ = tokio::join!(run_task, forward_task);
        });
        *self.run_handle.lock().unwrap() = Some(combined);
    }

    pub async fn shutdown(&self) {
        self.shutdown.shutdown();
        self.audio.clear_session();
        let handle = self.run_handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}
