//! Speech-to-text abstraction layer: wraps an external, black-box streaming
//! STT engine behind a single-flight worker.

pub mod engine;
pub mod mock;
pub mod types;
pub mod worker;

pub use engine::SttEngine;
pub use types::Segment;
pub use worker::SttWorker;
