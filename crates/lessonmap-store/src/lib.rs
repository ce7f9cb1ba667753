//! LessonMap Store: SQLite persistence for finalized mind maps.

pub mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::SqliteStore;
pub use types::*;
