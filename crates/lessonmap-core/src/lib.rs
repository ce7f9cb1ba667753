//! LessonMap Core: shared errors, settings and the content language type.

pub mod config;
pub mod error;
pub mod language;

pub use config::{DataPaths, LessonMapConfig, MindMapSettings};
pub use error::{Error, Result};
pub use language::Language;
