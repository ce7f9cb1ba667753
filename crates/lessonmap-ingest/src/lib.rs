//! LessonMap Ingest: content sanitizing and sentence-aware chunking.

pub mod chunking;
pub mod sanitize;

pub use chunking::{needs_chunking, ChunkSplitter};
pub use sanitize::{content_hash, sanitize_content};
