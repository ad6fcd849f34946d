use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type surfaced by the pipeline facade and logged by the
/// inference loop. Each domain error wraps transparently so a `?` from deep
/// inside any crate composes without manual conversion.
#[derive(Error, Debug)]
pub enum ChyronError {
    #[error(transparent)]
    AudioSource(#[from] AudioSourceError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Transcribe(#[from] TranscribeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Shutdown requested")]
    ShutdownRequested,

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("Transient error, will retry: {0}")]
    Transient(String),
}

impl From<tokio::task::JoinError> for ChyronError {
    fn from(err: tokio::task::JoinError) -> Self {
        ChyronError::Transient(format!("task join failed: {err}"))
    }
}

impl ChyronError {
    /// Startup errors (audio source, model) are fatal to the facade; runtime
    /// transcription errors are not.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ChyronError::AudioSource(_) | ChyronError::Model(_) | ChyronError::Fatal(_)
        )
    }
}

/// The audio capture collaborator could not start. Reported to the UI; the
/// pipeline remains stopped.
#[derive(Debug, Error)]
pub enum AudioSourceError {
    #[error("audio device not found: {name:?}")]
    DeviceNotFound { name: Option<String> },

    #[error("audio format not supported: {format}")]
    FormatNotSupported { format: String },

    #[error("audio source failed to start: {0}")]
    StartFailed(String),
}

/// The STT model is missing or corrupt. Reported to the UI; the pipeline
/// remains stopped.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model not found at {path}")]
    NotFound { path: PathBuf },

    #[error("model at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("model load failed: {0}")]
    LoadFailed(String),
}

/// A transient STT failure. Logged and treated as an empty result; the
/// inference loop continues.
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("engine is not initialized")]
    NotInitialized,

    #[error("engine call failed: {0}")]
    EngineFailed(String),

    #[error("engine timed out after {0}ms")]
    Timeout(u64),
}

/// The settings file could not be read or parsed. Logged; defaults are
/// applied and startup continues.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration parse error: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("configuration io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid value for {field}: {reason}")]
    Validation { field: String, reason: String },
}
