//! Bounded rolling audio window feeding the segmenter.
//!
//! `AudioBuffer` owns three things behind one mutex: a scratch byte
//! accumulator for partial frames, a FIFO of completed frames waiting to be
//! consumed, and the bounded session window those frames graduate into. A
//! `tokio::sync::Notify` stands in for a counting semaphore: it is notified
//! once per frame enqueued and awaited by `wait_for_frame`.

use chyron_foundation::clock::{real_clock, SharedClock};
use chyron_telemetry::CaptionMetrics;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Instant;
use tokio::sync::Notify;

/// 16 kHz mono S16LE: 0.25s frames are 8000 bytes.
pub const DEFAULT_FRAME_SIZE: usize = 8000;
/// 120 frames * 0.25s = 30s rolling window.
pub const DEFAULT_MAX_FRAMES: usize = 120;
/// Level above which audio counts as voice activity.
pub const DEFAULT_VOICE_THRESHOLD: f32 = 0.05;

#[derive(Debug, Clone, Copy)]
pub struct AudioBufferConfig {
    pub frame_size: usize,
    pub max_frames: usize,
    pub voice_threshold: f32,
}

impl Default for AudioBufferConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            max_frames: DEFAULT_MAX_FRAMES,
            voice_threshold: DEFAULT_VOICE_THRESHOLD,
        }
    }
}

struct Inner {
    config: AudioBufferConfig,
    scratch: Vec<u8>,
    ready: VecDeque<Vec<u8>>,
    window: VecDeque<Vec<u8>>,
    last_voice_at: Option<Instant>,
    level: f32,
}

pub struct AudioBuffer {
    inner: Mutex<Inner>,
    notify: Notify,
    metrics: Option<CaptionMetrics>,
    clock: SharedClock,
}

impl AudioBuffer {
    /// Voice-activity timestamps are stamped from `clock` rather than calling
    /// `Instant::now()` directly, so `seconds_since_last_voice()` can be
    /// driven by a `TestClock` in scenario tests without a wall-clock sleep.
    pub fn new(config: AudioBufferConfig, clock: SharedClock) -> Self {
        Self {
            inner: Mutex::new(Inner {
                config,
                scratch: Vec::with_capacity(config.frame_size * 2),
                ready: VecDeque::new(),
                window: VecDeque::new(),
                last_voice_at: None,
                level: 0.0,
            }),
            notify: Notify::new(),
            metrics: None,
            clock,
        }
    }

    pub fn with_metrics(config: AudioBufferConfig, metrics: CaptionMetrics, clock: SharedClock) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::new(config, clock)
        }
    }

    /// Appends raw bytes to the scratch accumulator. Every time the
    /// accumulator holds at least one full frame, the frame is moved to the
    /// ready queue and the frame-available signal is raised. An odd trailing
    /// byte is carried over to the next call untouched.
    pub fn push(&self, bytes: &[u8]) {
        let mut notify_count = 0usize;
        {
            let mut inner = self.inner.lock();
            inner.scratch.extend_from_slice(bytes);
            let frame_size = inner.config.frame_size;
            while inner.scratch.len() >= frame_size {
                let frame: Vec<u8> = inner.scratch.drain(0..frame_size).collect();
                inner.ready.push_back(frame);
                notify_count += 1;
            }
        }
        for _ in 0..notify_count {
            if let Some(metrics) = &self.metrics {
                metrics.record_frame_pushed();
            }
            self.notify.notify_one();
        }
    }

    /// Updates voice-activity tracking and the published level. `level` is
    /// expected in `[0, 1]`.
    pub fn report_level(&self, level: f32) {
        let mut inner = self.inner.lock();
        inner.level = level;
        if level > inner.config.voice_threshold {
            inner.last_voice_at = Some(self.clock.now());
        }
    }

    pub fn current_level(&self) -> f32 {
        self.inner.lock().level
    }

    /// Cooperatively waits until at least one ready frame exists.
    pub async fn wait_for_frame(&self) {
        loop {
            {
                let inner = self.inner.lock();
                if !inner.ready.is_empty() {
                    return;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Moves one frame from the ready queue into the session window,
    /// evicting the oldest window frame if over bound. Returns `false` if
    /// the ready queue was empty.
    pub fn try_consume_frame(&self) -> bool {
        let mut inner = self.inner.lock();
        let Some(frame) = inner.ready.pop_front() else {
            return false;
        };
        let max_frames = inner.config.max_frames;
        let evicted = inner.window.len() >= max_frames;
        if evicted {
            inner.window.pop_front();
        }
        inner.window.push_back(frame);
        drop(inner);
        if let Some(metrics) = &self.metrics {
            metrics.record_frame_consumed();
            if evicted {
                metrics.record_frame_evicted();
            }
        }
        true
    }

    /// Drains every queued frame into the session window. Used when the STT
    /// worker is busy, so audio is retained rather than dropped from the
    /// ready queue.
    pub fn drain_into_window(&self) {
        while self.try_consume_frame() {}
    }

    /// Contiguous copy of the current session window, in frame order.
    pub fn snapshot(&self) -> Vec<u8> {
        let inner = self.inner.lock();
        let mut out = Vec::with_capacity(inner.window.len() * inner.config.frame_size);
        for frame in &inner.window {
            out.extend_from_slice(frame);
        }
        out
    }

    pub fn byte_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.window.len() * inner.config.frame_size
    }

    pub fn frame_size(&self) -> usize {
        self.inner.lock().config.frame_size
    }

    pub fn clear_session(&self) {
        self.inner.lock().window.clear();
    }

    pub fn seconds_since_last_voice(&self) -> f64 {
        let inner = self.inner.lock();
        match inner.last_voice_at {
            Some(instant) => self.clock.now().duration_since(instant).as_secs_f64(),
            None => f64::INFINITY,
        }
    }
}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self::new(AudioBufferConfig::default(), real_clock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> AudioBufferConfig {
        AudioBufferConfig {
            frame_size: 4,
            max_frames: 3,
            voice_threshold: 0.05,
        }
    }

    #[test]
    fn frame_count_matches_floor_division() {
        let buffer = AudioBuffer::new(small_config(), real_clock());
        buffer.push(&[0u8; 10]);
        let mut consumed = 0;
        while buffer.try_consume_frame() {
            consumed += 1;
        }
        assert_eq!(consumed, 10 / 4);
    }

    #[test]
    fn odd_trailing_bytes_carry_over() {
        let buffer = AudioBuffer::new(small_config(), real_clock());
        buffer.push(&[1, 2, 3]);
        assert!(!buffer.try_consume_frame());
        buffer.push(&[4]);
        assert!(buffer.try_consume_frame());
        assert!(!buffer.try_consume_frame());
    }

    #[test]
    fn byte_count_bounded_by_max_frames() {
        let buffer = AudioBuffer::new(small_config(), real_clock());
        for _ in 0..10 {
            buffer.push(&[0u8; 4]);
        }
        buffer.drain_into_window();
        assert!(buffer.byte_count() <= 3 * 4);
        assert_eq!(buffer.byte_count(), 3 * 4);
    }

    #[test]
    fn clear_session_empties_window_but_not_ready_queue() {
        let buffer = AudioBuffer::new(small_config(), real_clock());
        buffer.push(&[0u8; 4]);
        buffer.try_consume_frame();
        assert_eq!(buffer.byte_count(), 4);
        buffer.clear_session();
        assert_eq!(buffer.byte_count(), 0);
    }

    #[test]
    fn level_below_threshold_does_not_update_last_voice() {
        let buffer = AudioBuffer::new(small_config(), real_clock());
        assert!(buffer.seconds_since_last_voice().is_infinite());
        buffer.report_level(0.01);
        assert!(buffer.seconds_since_last_voice().is_infinite());
        buffer.report_level(0.5);
        assert!(buffer.seconds_since_last_voice() < 1.0);
    }

    #[test]
    fn seconds_since_last_voice_tracks_a_test_clock_without_sleeping() {
        use chyron_foundation::clock::TestClock;
        use std::sync::Arc;
        use std::time::Duration;

        let clock = Arc::new(TestClock::new());
        let buffer = AudioBuffer::new(small_config(), clock.clone());
        buffer.report_level(0.5);
        assert!(buffer.seconds_since_last_voice() < 0.001);

        clock.advance(Duration::from_millis(900));
        assert!((buffer.seconds_since_last_voice() - 0.9).abs() < 0.001);
    }

    #[tokio::test]
    async fn wait_for_frame_resolves_after_push() {
        let buffer = AudioBuffer::new(small_config(), real_clock());
        buffer.push(&[0u8; 4]);
        tokio::time::timeout(std::time::Duration::from_millis(100), buffer.wait_for_frame())
            .await
            .expect("wait_for_frame should resolve once a frame is ready");
    }
}
