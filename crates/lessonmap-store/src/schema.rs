//! Database schema SQL.

/// Mind-map table. The tree and metadata are stored as JSON text.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS mindmaps (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    language TEXT NOT NULL,
    content_hash TEXT UNIQUE,
    mindmap_json TEXT NOT NULL,
    metadata_json TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_mindmaps_hash ON mindmaps(content_hash);
CREATE INDEX IF NOT EXISTS idx_mindmaps_created ON mindmaps(created_at);
"#;
