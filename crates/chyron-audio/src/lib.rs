pub mod audio_buffer;

pub use audio_buffer::{AudioBuffer, AudioBufferConfig, DEFAULT_FRAME_SIZE, DEFAULT_MAX_FRAMES, DEFAULT_VOICE_THRESHOLD};
