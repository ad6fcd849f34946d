pub mod config;
pub mod filters;
pub mod hallucination;
pub mod renderer;
pub mod segmenter;

pub use config::{RendererConfig, SegmenterConfig};
pub use renderer::{OutputRenderer, RenderedLines};
pub use segmenter::{Segment, Segmenter};
