pub mod demo_source;
pub mod pipeline;

pub use chyron_foundation::settings::Settings;
pub use pipeline::{Pipeline, PipelineOptions};
