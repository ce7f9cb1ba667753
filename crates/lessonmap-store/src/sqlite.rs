//! SQLite-backed mind-map store.

use std::path::{Path, PathBuf};

use lessonmap_core::{Error, Language, Result};
use lessonmap_map::MindMap;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};

use crate::schema::SCHEMA_SQL;
use crate::types::*;

const RECORD_COLUMNS: &str = "id, uuid, title, language, content_hash, mindmap_json, metadata_json, created_at, updated_at";

/// SQLite store for finalized mind maps.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl SqliteStore {
    /// Open or create the SQLite store.
    ///
    /// `db_dir` is the directory (e.g., `data/db/`). The file will be `db_dir/lessonmap.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("lessonmap.db");

        let conn = Self::create_connection(&db_path)?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        info!(
            "SqliteStore initialized: {} mind maps, path={}",
            store.count()?,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(conn)
    }

    // ---------------------------------------------------------------
    // Mind-map CRUD
    // ---------------------------------------------------------------

    /// Insert a mind map. Returns the new row ID.
    pub fn save(&self, title: &str, mindmap: &MindMap, opts: SaveMindMapOptions) -> Result<i64> {
        let now = opts.created_at.unwrap_or_else(now_ms);
        let uuid = uuid::Uuid::new_v4().to_string();
        let mindmap_json = serde_json::to_string(mindmap)?;
        let meta_json = opts.metadata.as_ref().map(serde_json::to_string).transpose()?;

        let conn = self.conn.lock();
        let id = conn
            .prepare_cached(
                "INSERT INTO mindmaps (uuid, title, language, content_hash, mindmap_json, metadata_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .insert(params![
                uuid,
                title,
                opts.language.to_string(),
                opts.content_hash,
                mindmap_json,
                meta_json,
                now
            ])
            .map_err(|e| {
                if e.to_string().contains("UNIQUE constraint") {
                    Error::DuplicateContent(opts.content_hash.clone().unwrap_or_default())
                } else {
                    Error::Database(e.to_string())
                }
            })?;

        info!("Saved mind map {} ({} nodes): {}", id, mindmap.len(), title);
        Ok(id)
    }

    /// Get a mind map by ID.
    pub fn get(&self, id: i64) -> Result<Option<MindMapRecord>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM mindmaps WHERE id = ?1", RECORD_COLUMNS);
        let row = conn
            .prepare_cached(&sql)
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![id], |row| Ok(Self::row_to_record(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row)
    }

    /// Find a mind map by the hash of its source content.
    pub fn find_by_hash(&self, content_hash: &str) -> Result<Option<MindMapRecord>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM mindmaps WHERE content_hash = ?1", RECORD_COLUMNS);
        let row = conn
            .prepare_cached(&sql)
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![content_hash], |row| Ok(Self::row_to_record(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row)
    }

    /// Count stored mind maps.
    pub fn count(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM mindmaps", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }

    /// Newest first, 1-based pages. Returns (records, total_count).
    pub fn list(&self, page: usize, page_size: usize) -> Result<(Vec<MindMapRecord>, i64)> {
        let total = self.count()?;
        let offset = page.saturating_sub(1) * page_size;

        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM mindmaps ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
            RECORD_COLUMNS
        );
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![page_size as i64, offset as i64], |row| {
                Ok(Self::row_to_record(row))
            })
            .map_err(|e| Error::Database(e.to_string()))?;

        let records: Vec<MindMapRecord> = rows.filter_map(|r| r.ok()).collect();
        Ok((records, total))
    }

    /// Every stored mind map, oldest first.
    pub fn all(&self) -> Result<Vec<MindMapRecord>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM mindmaps ORDER BY created_at ASC, id ASC",
            RECORD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| Ok(Self::row_to_record(row)))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Replace the stored tree.
    pub fn update_mindmap(&self, id: i64, mindmap: &MindMap) -> Result<bool> {
        let mindmap_json = serde_json::to_string(mindmap)?;
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE mindmaps SET mindmap_json = ?1, updated_at = ?2 WHERE id = ?3",
                params![mindmap_json, now_ms(), id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Update (merge) metadata on a mind map.
    pub fn update_metadata(&self, id: i64, updates: &serde_json::Value) -> Result<bool> {
        let conn = self.conn.lock();

        let existing_json: Option<String> = conn
            .prepare_cached("SELECT metadata_json FROM mindmaps WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![id], |row| row.get(0))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?
            .flatten();

        let mut existing: serde_json::Map<String, serde_json::Value> = existing_json
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();

        if let serde_json::Value::Object(map) = updates {
            for (k, v) in map {
                existing.insert(k.clone(), v.clone());
            }
        }

        let new_json = serde_json::to_string(&existing)?;
        let count = conn
            .execute(
                "UPDATE mindmaps SET metadata_json = ?1, updated_at = ?2 WHERE id = ?3",
                params![new_json, now_ms(), id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Delete a mind map.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute("DELETE FROM mindmaps WHERE id = ?1", params![id])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    // ---------------------------------------------------------------
    // Stats
    // ---------------------------------------------------------------

    /// Get store statistics.
    pub fn get_stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock();
        let (total, arabic, english, nodes): (i64, i64, i64, i64) = conn
            .query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(language = 'arabic'), 0),
                        COALESCE(SUM(language = 'english'), 0),
                        COALESCE(SUM(json_array_length(mindmap_json, '$.nodeDataArray')), 0)
                 FROM mindmaps",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        drop(conn);

        let db_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(StoreStats {
            total_mindmaps: total,
            arabic_mindmaps: arabic,
            english_mindmaps: english,
            total_nodes: nodes.max(0) as usize,
            db_path: self.db_path.to_string_lossy().to_string(),
            db_size_mb: db_size as f64 / (1024.0 * 1024.0),
        })
    }

    // ---------------------------------------------------------------
    // Row Mapping
    // ---------------------------------------------------------------

    fn row_to_record(row: &rusqlite::Row<'_>) -> MindMapRecord {
        let id: i64 = row.get("id").unwrap_or(0);
        let mindmap = row
            .get::<_, String>("mindmap_json")
            .ok()
            .and_then(|s| serde_json::from_str::<serde_json::Value>(&s).ok())
            .and_then(|v| MindMap::from_value(v).ok())
            .unwrap_or_else(|| {
                warn!("Mind map {} has an unreadable tree", id);
                MindMap::default()
            });

        MindMapRecord {
            id,
            uuid: row.get("uuid").unwrap_or_default(),
            title: row.get("title").unwrap_or_default(),
            language: row
                .get::<_, String>("language")
                .ok()
                .and_then(|l| l.parse::<Language>().ok())
                .unwrap_or_default(),
            content_hash: row.get("content_hash").ok().flatten(),
            mindmap,
            metadata: row
                .get::<_, Option<String>>("metadata_json")
                .ok()
                .flatten()
                .and_then(|s| serde_json::from_str(&s).ok()),
            created_at: row.get("created_at").unwrap_or(0),
            updated_at: row.get("updated_at").ok().flatten(),
        }
    }
}
