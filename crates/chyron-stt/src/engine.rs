//! The external STT engine capability: a black box that loads a model and
//! turns a byte buffer of PCM into recognized text segments.

use crate::types::Segment;
use async_trait::async_trait;
use chyron_foundation::error::{ModelError, TranscribeError};
use std::path::Path;

#[async_trait]
pub trait SttEngine: Send + Sync {
    /// Loads the model. Idempotent on success.
    async fn initialize(&mut self, model_ref: &Path) -> Result<(), ModelError>;

    /// Whether the engine has a usable model loaded.
    fn is_available(&self) -> bool;

    /// Transcribes one buffer of S16LE PCM at 16 kHz mono. May return
    /// multiple segments for a single call.
    async fn transcribe(&mut self, pcm: &[u8]) -> Result<Vec<Segment>, TranscribeError>;
}
