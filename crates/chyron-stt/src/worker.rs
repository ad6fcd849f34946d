//! Single-flight adapter over an [`SttEngine`], matching the non-reentrant
//! `transcribe(bytes) -> string` / `busy` contract.

use crate::engine::SttEngine;
use chyron_foundation::error::ModelError;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

pub struct SttWorker {
    engine: Mutex<Box<dyn SttEngine>>,
    busy: AtomicBool,
    language: String,
}

impl SttWorker {
    pub fn new(engine: Box<dyn SttEngine>, language: impl Into<String>) -> Self {
        Self {
            engine: Mutex::new(engine),
            busy: AtomicBool::new(false),
            language: language.into(),
        }
    }

    pub async fn initialize(&self, model_ref: &Path) -> Result<(), ModelError> {
        self.engine.lock().await.initialize(model_ref).await
    }

    pub fn busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Returns the empty string immediately if already busy. Otherwise
    /// claims the single-flight slot, calls the engine, concatenates
    /// segments matching the configured language (trimmed), and releases
    /// the slot. Engine failures are swallowed into an empty result per the
    /// `TranscribeError` policy: logged, treated as empty, loop continues.
    pub async fn transcribe(&self, bytes: &[u8]) -> String {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return String::new();
        }

        let result = {
            let mut engine = self.engine.lock().await;
            engine.transcribe(bytes).await
        };

        self.busy.store(false, Ordering::Release);

        match result {
            Ok(segments) => segments
                .into_iter()
                .filter(|s| match &s.language {
                    Some(lang) => lang.eq_ignore_ascii_case(&self.language),
                    None => true,
                })
                .map(|s| s.text)
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string(),
            Err(err) => {
                tracing::warn!(error = %err, "stt engine call failed, treating as empty result");
                String::new()
            }
        }
    }
}
