//! Tunables for the segmenter and renderer (spec.md §4.3.7).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Silence duration to auto-commit.
    pub silence_ms: u64,
    /// Minimum gap between STT calls.
    pub inference_interval_ms: u64,
    /// Level above which audio counts as voice.
    pub voice_threshold: f32,
    /// Minimum frames before first inference.
    pub min_infer_frames: usize,
    /// Hard cap before forced final commit.
    pub max_segment_frames: usize,
    /// After this many seconds of silence, the session window is cleared.
    pub stale_silence_s: f64,
    /// Non-speech tag must persist this long to be shown.
    pub tag_hold_s: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            silence_ms: 800,
            inference_interval_ms: 300,
            voice_threshold: 0.05,
            min_infer_frames: 2,
            max_segment_frames: 100,
            stale_silence_s: 3.0,
            tag_hold_s: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub chars_per_line: usize,
    pub show_audio_tags: bool,
    pub filter_profanity: bool,
    pub max_history_lines: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            chars_per_line: 42,
            show_audio_tags: true,
            filter_profanity: false,
            max_history_lines: 4,
        }
    }
}
