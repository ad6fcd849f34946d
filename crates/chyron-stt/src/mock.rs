//! In-memory STT engine for tests: configurable fixed output, latency, and
//! failure injection, in place of a real model-backed engine.

use crate::engine::SttEngine;
use crate::types::Segment;
use async_trait::async_trait;
use chyron_foundation::error::{ModelError, TranscribeError};
use std::path::Path;
use std::time::Duration;

pub struct MockEngine {
    segments: Vec<Segment>,
    delay: Duration,
    fail: bool,
    available: bool,
}

impl MockEngine {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::with_segments(vec![Segment::new(text)])
    }

    pub fn with_segments(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            delay: Duration::ZERO,
            fail: false,
            available: true,
        }
    }

    pub fn with_delay_ms(ms: u64) -> Self {
        Self {
            segments: vec![Segment::new("hello world")],
            delay: Duration::from_millis(ms),
            fail: false,
            available: true,
        }
    }

    pub fn failing() -> Self {
        Self {
            segments: Vec::new(),
            delay: Duration::ZERO,
            fail: true,
            available: true,
        }
    }
}

#[async_trait]
impl SttEngine for MockEngine {
    async fn initialize(&mut self, model_ref: &Path) -> Result<(), ModelError> {
        if !model_ref.as_os_str().is_empty() && !self.available {
            return Err(ModelError::NotFound {
                path: model_ref.to_path_buf(),
            });
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn transcribe(&mut self, _pcm: &[u8]) -> Result<Vec<Segment>, TranscribeError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(TranscribeError::EngineFailed("mock failure".to_string()));
        }
        Ok(self.segments.clone())
    }
}
