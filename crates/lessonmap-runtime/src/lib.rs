//! LessonMap Runtime: turns lesson text into a finished mind map and
//! re-normalizes maps already in the store.

pub mod builder;
pub mod pipeline;
pub mod reprocess;
pub mod types;

#[cfg(test)]
mod testing;

pub use builder::{placeholder, SinglePassBuilder};
pub use pipeline::MindMapPipeline;
pub use reprocess::{minimal_model, reprocess_mindmap, Reprocessor};
pub use types::*;
