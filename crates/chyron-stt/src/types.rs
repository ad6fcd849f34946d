//! Core types exchanged between the worker and its external STT engine.

/// One recognized segment of text, as produced by a streaming engine. Some
/// engines emit several of these per call; the worker concatenates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    /// ISO 639-1 language tag, when the engine reports one. Segments whose
    /// tag differs from the configured language are dropped by the worker.
    pub language: Option<String>,
}

impl Segment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: None,
        }
    }

    pub fn with_language(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: Some(language.into()),
        }
    }
}
