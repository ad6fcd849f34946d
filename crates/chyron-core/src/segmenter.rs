//! Cooperative inference loop and silence-timer commit (spec.md §4.3).
//!
//! The silence timer and the inference loop are two logically independent
//! actors sharing [`SegmenterState`] under one lock: the timer must still
//! fire a commit while the loop is suspended inside a `transcribe()` call.

use crate::config::SegmenterConfig;
use crate::filters::apply_filters;
use crate::hallucination::should_force_commit;
use chyron_audio::AudioBuffer;
use chyron_foundation::clock::SharedClock;
use chyron_stt::SttWorker;
use chyron_telemetry::CaptionMetrics;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc;

/// One `(text, final)` emission from the segmenter (spec.md §5's ordering
/// guarantee: zero or more `final=false` followed by exactly one
/// `final=true` per voice-activity period).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub is_final: bool,
}

struct SegmenterState {
    last_partial: String,
    committed: bool,
    last_inference_at: Option<Instant>,
    tag_streak_start: Option<Instant>,
}

impl Default for SegmenterState {
    fn default() -> Self {
        Self {
            last_partial: String::new(),
            committed: true,
            last_inference_at: None,
            tag_streak_start: None,
        }
    }
}

pub struct Segmenter {
    audio: Arc<AudioBuffer>,
    stt: Arc<SttWorker>,
    config: SegmenterConfig,
    clock: SharedClock,
    metrics: Option<CaptionMetrics>,
    state: Mutex<SegmenterState>,
}

impl Segmenter {
    pub fn new(
        audio: Arc<AudioBuffer>,
        stt: Arc<SttWorker>,
        config: SegmenterConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            audio,
            stt,
            config,
            clock,
            metrics: None,
            state: Mutex::new(SegmenterState::default()),
        }
    }

    pub fn with_metrics(mut self, metrics: CaptionMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Runs the cooperative loop until `shutdown` resolves. The silence
    /// timer is polled on its own branch so it fires even while `tick` is
    /// suspended inside `transcribe()` (spec.md §5/§9).
    pub async fn run<F>(&self, events: mpsc::UnboundedSender<Segment>, shutdown: F)
    where
        F: std::future::Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut silence_poll = tokio::time::interval(std::time::Duration::from_millis(50));
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = silence_poll.tick() => {
                    self.check_silence_timer(&events);
                }
                _ = self.audio.wait_for_frame() => {
                    self.tick(&events).await;
                }
            }
        }
    }

    /// Spec.md §4.3.1. Independent of the inference loop: fires a commit
    /// purely from elapsed silence, regardless of whether the loop is busy.
    pub fn check_silence_timer(&self, events: &mpsc::UnboundedSender<Segment>) {
        let silence_s = self.config.silence_ms as f64 / 1000.0;
        if self.audio.seconds_since_last_voice() < silence_s {
            return;
        }
        let text = {
            let mut state = self.state.lock().unwrap();
            if state.committed || state.last_partial.is_empty() {
                return;
            }
            state.committed = true;
            std::mem::take(&mut state.last_partial)
        };
        self.audio.clear_session();
        if let Some(metrics) = &self.metrics {
            metrics.record_final();
        }
        let _ = events.send(Segment {
            text,
            is_final: true,
        });
    }

    /// Spec.md §4.3.2, steps 2-10. Step 1 (await a frame signal) is the
    /// caller's responsibility (`run`'s `wait_for_frame` branch).
    pub async fn tick(&self, events: &mpsc::UnboundedSender<Segment>) {
        if self.stt.busy() {
            self.audio.drain_into_window();
            if let Some(metrics) = &self.metrics {
                metrics.record_skipped_busy();
            }
            return;
        }
        if !self.audio.try_consume_frame() {
            return;
        }

        let frame_size = self.audio.frame_size();
        if self.audio.byte_count() < self.config.min_infer_frames * frame_size {
            return;
        }

        if self.throttled() {
            if let Some(metrics) = &self.metrics {
                metrics.record_throttled();
            }
            return;
        }

        let snapshot = self.audio.snapshot();
        let start = self.clock.now();
        let raw = self.stt.transcribe(&snapshot).await;
        let latency_ms = self.clock.now().duration_since(start).as_millis() as u64;
        {
            let mut state = self.state.lock().unwrap();
            state.last_inference_at = Some(self.clock.now());
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_inference(latency_ms);
        }

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }

        let filtered = {
            let mut state = self.state.lock().unwrap();
            apply_filters(
                trimmed,
                &mut state.tag_streak_start,
                self.clock.now(),
                self.config.tag_hold_s,
            )
        };
        let Some(text) = filtered.text else {
            if filtered.was_pure_tag {
                if let Some(metrics) = &self.metrics {
                    metrics.record_tag_hold_suppressed();
                }
            }
            return;
        };
        if filtered.was_pure_tag {
            if let Some(metrics) = &self.metrics {
                metrics.record_tag_hold_passed();
            }
        }

        if self.force_commit_if_hallucinated(&text, events) {
            return;
        }

        self.update_partial(text, frame_size, events);
        self.apply_stale_silence();
    }

    fn throttled(&self) -> bool {
        let state = self.state.lock().unwrap();
        match state.last_inference_at {
            Some(last) => {
                self.clock.now().duration_since(last).as_millis()
                    < self.config.inference_interval_ms as u128
            }
            None => false,
        }
    }

    /// Spec.md §4.3.4. Returns true if the tick ended here (old partial
    /// forcibly committed, new text started as a fresh partial).
    fn force_commit_if_hallucinated(
        &self,
        text: &str,
        events: &mpsc::UnboundedSender<Segment>,
    ) -> bool {
        let old_partial = {
            let state = self.state.lock().unwrap();
            if !should_force_commit(&state.last_partial, text) {
                return false;
            }
            state.last_partial.clone()
        };

        {
            let mut state = self.state.lock().unwrap();
            state.last_partial = text.to_string();
            state.committed = false;
        }
        self.audio.clear_session();
        if let Some(metrics) = &self.metrics {
            metrics.record_hallucination_drop();
            metrics.record_final();
            metrics.record_partial();
        }
        let _ = events.send(Segment {
            text: old_partial,
            is_final: true,
        });
        let _ = events.send(Segment {
            text: text.to_string(),
            is_final: false,
        });
        true
    }

    /// Spec.md §4.3.5.
    fn update_partial(&self, text: String, frame_size: usize, events: &mpsc::UnboundedSender<Segment>) {
        let hit_length_cap = self.audio.byte_count() >= self.config.max_segment_frames * frame_size;
        {
            let mut state = self.state.lock().unwrap();
            state.last_partial = text.clone();
            state.committed = false;
        }

        if hit_length_cap {
            {
                let mut state = self.state.lock().unwrap();
                state.last_partial.clear();
                state.committed = true;
            }
            self.audio.clear_session();
            if let Some(metrics) = &self.metrics {
                metrics.record_final();
            }
            let _ = events.send(Segment {
                text,
                is_final: true,
            });
        } else {
            if let Some(metrics) = &self.metrics {
                metrics.record_partial();
            }
            let _ = events.send(Segment {
                text,
                is_final: false,
            });
        }
    }

    /// Spec.md §4.3.2 step 10.
    fn apply_stale_silence(&self) {
        if self.audio.seconds_since_last_voice() > self.config.stale_silence_s {
            self.audio.clear_session();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chyron_audio::{AudioBuffer, AudioBufferConfig};
    use chyron_foundation::clock::{test_clock, TestClock};
    use chyron_stt::mock::MockEngine;
    use chyron_stt::SttWorker;

    fn small_config() -> AudioBufferConfig {
        AudioBufferConfig {
            frame_size: 4,
            max_frames: 1000,
            voice_threshold: 0.05,
        }
    }

    fn harness(text: &str, segmenter_config: SegmenterConfig) -> (Arc<AudioBuffer>, Arc<Segmenter>) {
        let clock = test_clock();
        let audio = Arc::new(AudioBuffer::new(small_config(), clock.clone()));
        let engine = MockEngine::with_text(text);
        let stt = Arc::new(SttWorker::new(Box::new(engine), "en"));
        let segmenter = Arc::new(Segmenter::new(audio.clone(), stt, segmenter_config, clock));
        (audio, segmenter)
    }

    #[tokio::test]
    async fn basic_tick_emits_partial() {
        let (audio, segmenter) = harness(
            "hello world",
            SegmenterConfig {
                min_infer_frames: 1,
                ..SegmenterConfig::default()
            },
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        audio.push(&[0u8; 4]);
        segmenter.tick(&tx).await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.text, "hello world");
        assert!(!event.is_final);
    }

    #[tokio::test]
    async fn length_safety_forces_final_commit() {
        let (audio, segmenter) = harness(
            "a b c d",
            SegmenterConfig {
                min_infer_frames: 1,
                max_segment_frames: 1,
                inference_interval_ms: 0,
                ..SegmenterConfig::default()
            },
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        audio.push(&[0u8; 4]);
        segmenter.tick(&tx).await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.text, "a b c d");
        assert!(event.is_final);
        assert_eq!(audio.byte_count(), 0);
    }

    #[tokio::test]
    async fn throttling_skips_second_tick_within_interval() {
        let (audio, segmenter) = harness(
            "hello",
            SegmenterConfig {
                min_infer_frames: 1,
                inference_interval_ms: 60_000,
                ..SegmenterConfig::default()
            },
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        audio.push(&[0u8; 4]);
        segmenter.tick(&tx).await;
        rx.recv().await.unwrap();

        audio.push(&[0u8; 4]);
        segmenter.tick(&tx).await;
        assert!(rx.try_recv().is_err(), "second tick should have been throttled");
    }

    #[tokio::test]
    async fn hallucination_drop_commits_old_partial_then_starts_new() {
        let (audio, segmenter) = harness(
            "cat",
            SegmenterConfig {
                min_infer_frames: 1,
                inference_interval_ms: 0,
                ..SegmenterConfig::default()
            },
        );
        {
            let mut state = segmenter.state.lock().unwrap();
            state.last_partial = "the quick brown fox jumps over".to_string();
            state.committed = false;
        }
        let (tx, mut rx) = mpsc::unbounded_channel();
        audio.push(&[0u8; 4]);
        segmenter.tick(&tx).await;

        let first = rx.recv().await.unwrap();
        assert_eq!(first.text, "the quick brown fox jumps over");
        assert!(first.is_final);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.text, "cat");
        assert!(!second.is_final);
    }

    #[tokio::test]
    async fn silence_timer_commits_pending_partial() {
        let clock = Arc::new(TestClock::new());
        let audio = Arc::new(AudioBuffer::new(small_config(), clock.clone()));
        let stt = Arc::new(SttWorker::new(Box::new(MockEngine::with_text("x")), "en"));
        let segmenter = Segmenter::new(
            audio.clone(),
            stt,
            SegmenterConfig {
                silence_ms: 1,
                ..SegmenterConfig::default()
            },
            clock.clone(),
        );
        {
            let mut state = segmenter.state.lock().unwrap();
            state.last_partial = "hello world".to_string();
            state.committed = false;
        }
        audio.report_level(0.5);
        clock.advance(std::time::Duration::from_millis(5));

        let (tx, mut rx) = mpsc::unbounded_channel();
        segmenter.check_silence_timer(&tx);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.text, "hello world");
        assert!(event.is_final);
    }

    #[tokio::test]
    async fn tag_hold_suppresses_then_passes() {
        let (audio, segmenter) = harness(
            "[music]",
            SegmenterConfig {
                min_infer_frames: 1,
                inference_interval_ms: 0,
                tag_hold_s: 4.0,
                ..SegmenterConfig::default()
            },
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        audio.push(&[0u8; 4]);
        segmenter.tick(&tx).await;
        assert!(rx.try_recv().is_err());

        {
            let mut state = segmenter.state.lock().unwrap();
            let started = state.tag_streak_start.unwrap();
            state.tag_streak_start = Some(started - std::time::Duration::from_secs(5));
        }
        audio.push(&[0u8; 4]);
        segmenter.tick(&tx).await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.text, "[music]");
        assert!(!event.is_final);
    }
}
