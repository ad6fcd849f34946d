use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared, lock-free counters describing pipeline health, read periodically
/// by the owning application's logging tick. Updated from the audio-buffer
/// push path and the inference loop without taking any lock.
#[derive(Clone)]
pub struct CaptionMetrics {
    pub frames_pushed: Arc<AtomicU64>,
    pub frames_evicted: Arc<AtomicU64>,
    pub frames_consumed: Arc<AtomicU64>,

    pub inferences_attempted: Arc<AtomicU64>,
    pub inferences_throttled: Arc<AtomicU64>,
    pub inferences_skipped_busy: Arc<AtomicU64>,
    pub last_inference_latency_ms: Arc<AtomicU64>,

    pub partials_emitted: Arc<AtomicU64>,
    pub finals_emitted: Arc<AtomicU64>,
    pub hallucination_drops: Arc<AtomicU64>,
    pub tag_holds_suppressed: Arc<AtomicU64>,
    pub tag_holds_passed: Arc<AtomicU64>,
}

impl Default for CaptionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptionMetrics {
    pub fn new() -> Self {
        Self {
            frames_pushed: Arc::new(AtomicU64::new(0)),
            frames_evicted: Arc::new(AtomicU64::new(0)),
            frames_consumed: Arc::new(AtomicU64::new(0)),
            inferences_attempted: Arc::new(AtomicU64::new(0)),
            inferences_throttled: Arc::new(AtomicU64::new(0)),
            inferences_skipped_busy: Arc::new(AtomicU64::new(0)),
            last_inference_latency_ms: Arc::new(AtomicU64::new(0)),
            partials_emitted: Arc::new(AtomicU64::new(0)),
            finals_emitted: Arc::new(AtomicU64::new(0)),
            hallucination_drops: Arc::new(AtomicU64::new(0)),
            tag_holds_suppressed: Arc::new(AtomicU64::new(0)),
            tag_holds_passed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_frame_pushed(&self) {
        self.frames_pushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_evicted(&self) {
        self.frames_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_consumed(&self) {
        self.frames_consumed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_inference(&self, latency_ms: u64) {
        self.inferences_attempted.fetch_add(1, Ordering::Relaxed);
        self.last_inference_latency_ms
            .store(latency_ms, Ordering::Relaxed);
    }

    pub fn record_throttled(&self) {
        self.inferences_throttled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_busy(&self) {
        self.inferences_skipped_busy.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_partial(&self) {
        self.partials_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_final(&self) {
        self.finals_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hallucination_drop(&self) {
        self.hallucination_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tag_hold_suppressed(&self) {
        self.tag_holds_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tag_hold_passed(&self) {
        self.tag_holds_passed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Smoothed rate tracker (events/sec), sampled once per second of wall time.
#[derive(Debug)]
pub struct RateTracker {
    last_update: Instant,
    count: u64,
}

impl RateTracker {
    pub fn new() -> Self {
        Self {
            last_update: Instant::now(),
            count: 0,
        }
    }

    /// Call once per event; returns `Some(rate)` when a full second has
    /// elapsed since the last sample, else `None`.
    pub fn tick(&mut self) -> Option<f64> {
        self.count += 1;
        let elapsed = self.last_update.elapsed();
        if elapsed.as_secs_f64() >= 1.0 {
            let rate = self.count as f64 / elapsed.as_secs_f64();
            self.last_update = Instant::now();
            self.count = 0;
            Some(rate)
        } else {
            None
        }
    }
}

impl Default for RateTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let metrics = CaptionMetrics::default();
        assert_eq!(metrics.frames_pushed.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.finals_emitted.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn record_methods_increment() {
        let metrics = CaptionMetrics::default();
        metrics.record_frame_pushed();
        metrics.record_frame_pushed();
        metrics.record_inference(42);
        metrics.record_final();
        assert_eq!(metrics.frames_pushed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.inferences_attempted.load(Ordering::Relaxed), 1);
        assert_eq!(
            metrics.last_inference_latency_ms.load(Ordering::Relaxed),
            42
        );
        assert_eq!(metrics.finals_emitted.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn rate_tracker_is_none_before_a_second_elapses() {
        let mut tracker = RateTracker::new();
        assert_eq!(tracker.tick(), None);
    }
}
