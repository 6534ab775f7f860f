//! SQLite-backed durable store.
//!
//! Single source of truth for indexed files/links, extracted content,
//! embeddings, and the search query log. The in-memory vector indexes are
//! built from full scans of this store and never written back.
//!
//! Concurrency: one `rusqlite::Connection` behind a mutex, shared via `Arc`.
//! Every write is a single statement, so readers observe either the old or
//! the new row, never a partial one. Embedding writes are upserts keyed by
//! entity id, which makes concurrent regeneration of the same id idempotent.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::records::{
    ContentStats, EmbeddingStats, FileContentRecord, IndexedFile, IndexedLink, NewFile, NewLink,
};

/// Errors surfaced by store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed vector blob ({0} bytes)")]
    MalformedVector(usize),

    #[error("store lock poisoned")]
    Poisoned,
}

/// A stored embedding row, ready for index loading.
#[derive(Debug, Clone)]
pub struct StoredEmbedding {
    pub entity_id: i64,
    pub vector: Vec<f32>,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS indexed_files (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        message_id TEXT NOT NULL,
        channel_id TEXT NOT NULL,
        channel_name TEXT,
        guild_id TEXT,
        guild_name TEXT,
        author_id TEXT NOT NULL,
        author_name TEXT,
        filename TEXT NOT NULL,
        file_url TEXT NOT NULL,
        file_size INTEGER,
        file_type TEXT,
        message_content TEXT,
        timestamp DATETIME NOT NULL,
        indexed_at DATETIME NOT NULL,
        UNIQUE(message_id, file_url)
    );

    CREATE TABLE IF NOT EXISTS indexed_links (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        message_id TEXT NOT NULL,
        channel_id TEXT NOT NULL,
        channel_name TEXT,
        guild_id TEXT,
        guild_name TEXT,
        author_id TEXT NOT NULL,
        author_name TEXT,
        link_url TEXT NOT NULL,
        link_domain TEXT,
        message_content TEXT,
        timestamp DATETIME NOT NULL,
        indexed_at DATETIME NOT NULL,
        UNIQUE(message_id, link_url)
    );

    CREATE TABLE IF NOT EXISTS file_content (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file_id INTEGER NOT NULL UNIQUE REFERENCES indexed_files(id) ON DELETE CASCADE,
        content_text TEXT NOT NULL,
        extraction_method TEXT NOT NULL,
        extracted_at DATETIME NOT NULL,
        file_size_bytes INTEGER
    );

    CREATE TABLE IF NOT EXISTS file_embeddings (
        file_id INTEGER PRIMARY KEY REFERENCES indexed_files(id) ON DELETE CASCADE,
        embedding BLOB NOT NULL,
        content_text TEXT NOT NULL,
        embedding_model TEXT NOT NULL,
        updated_at DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS link_embeddings (
        link_id INTEGER PRIMARY KEY REFERENCES indexed_links(id) ON DELETE CASCADE,
        embedding BLOB NOT NULL,
        content_text TEXT NOT NULL,
        embedding_model TEXT NOT NULL,
        updated_at DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS search_queries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER,
        query_text TEXT NOT NULL,
        query_embedding BLOB,
        results_count INTEGER NOT NULL,
        search_time_ms INTEGER NOT NULL,
        created_at DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_files_channel ON indexed_files(channel_id);
    CREATE INDEX IF NOT EXISTS idx_files_timestamp ON indexed_files(timestamp);
    CREATE INDEX IF NOT EXISTS idx_links_channel ON indexed_links(channel_id);
    CREATE INDEX IF NOT EXISTS idx_links_timestamp ON indexed_links(timestamp);
";

/// Handle to the SQLite store. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "busy_timeout", 30_000)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store, used by tests and ad-hoc tooling.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    // --- files / links -----------------------------------------------------

    /// Insert a file row. Returns the new id, or `None` when the
    /// (message_id, file_url) pair is already indexed.
    pub fn insert_file(&self, file: &NewFile) -> Result<Option<i64>, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO indexed_files
                (message_id, channel_id, channel_name, guild_id, guild_name,
                 author_id, author_name, filename, file_url, file_size,
                 file_type, message_content, timestamp, indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            rusqlite::params![
                file.message_id,
                file.channel_id,
                file.channel_name,
                file.guild_id,
                file.guild_name,
                file.author_id,
                file.author_name,
                file.filename,
                file.file_url,
                file.file_size,
                file.file_type,
                file.message_content,
                file.timestamp,
                Utc::now(),
            ],
        )?;
        Ok((changed > 0).then(|| conn.last_insert_rowid()))
    }

    /// Insert a link row. Returns the new id, or `None` for a duplicate
    /// (message_id, link_url) pair.
    pub fn insert_link(&self, link: &NewLink) -> Result<Option<i64>, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO indexed_links
                (message_id, channel_id, channel_name, guild_id, guild_name,
                 author_id, author_name, link_url, link_domain,
                 message_content, timestamp, indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
                link.message_id,
                link.channel_id,
                link.channel_name,
                link.guild_id,
                link.guild_name,
                link.author_id,
                link.author_name,
                link.link_url,
                link.link_domain,
                link.message_content,
                link.timestamp,
                Utc::now(),
            ],
        )?;
        Ok((changed > 0).then(|| conn.last_insert_rowid()))
    }

    pub fn get_file(&self, id: i64) -> Result<Option<IndexedFile>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, message_id, channel_id, channel_name, guild_id, guild_name,
                        author_id, author_name, filename, file_url, file_size, file_type,
                        message_content, timestamp, indexed_at
                 FROM indexed_files WHERE id = ?1",
                [id],
                file_from_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn get_link(&self, id: i64) -> Result<Option<IndexedLink>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, message_id, channel_id, channel_name, guild_id, guild_name,
                        author_id, author_name, link_url, link_domain,
                        message_content, timestamp, indexed_at
                 FROM indexed_links WHERE id = ?1",
                [id],
                link_from_row,
            )
            .optional()?;
        Ok(row)
    }

    // --- embeddings --------------------------------------------------------

    /// Replace-or-insert the embedding for a file. Exactly one row per file
    /// survives regardless of how often this is called.
    pub fn upsert_file_embedding(
        &self,
        file_id: i64,
        vector: &[f32],
        content_text: &str,
        model: &str,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO file_embeddings (file_id, embedding, content_text, embedding_model, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(file_id) DO UPDATE SET
                embedding = ?2, content_text = ?3, embedding_model = ?4, updated_at = ?5",
            rusqlite::params![file_id, encode_vector(vector), content_text, model, Utc::now()],
        )?;
        Ok(())
    }

    pub fn upsert_link_embedding(
        &self,
        link_id: i64,
        vector: &[f32],
        content_text: &str,
        model: &str,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO link_embeddings (link_id, embedding, content_text, embedding_model, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(link_id) DO UPDATE SET
                embedding = ?2, content_text = ?3, embedding_model = ?4, updated_at = ?5",
            rusqlite::params![link_id, encode_vector(vector), content_text, model, Utc::now()],
        )?;
        Ok(())
    }

    /// File ids present in `indexed_files` but absent from `file_embeddings`.
    pub fn files_missing_embeddings(&self) -> Result<Vec<i64>, StoreError> {
        self.missing_ids(
            "SELECT f.id FROM indexed_files f
             LEFT JOIN file_embeddings fe ON f.id = fe.file_id
             WHERE fe.file_id IS NULL ORDER BY f.id",
        )
    }

    pub fn links_missing_embeddings(&self) -> Result<Vec<i64>, StoreError> {
        self.missing_ids(
            "SELECT l.id FROM indexed_links l
             LEFT JOIN link_embeddings le ON l.id = le.link_id
             WHERE le.link_id IS NULL ORDER BY l.id",
        )
    }

    fn missing_ids(&self, sql: &str) -> Result<Vec<i64>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// All stored file embeddings, ordered by id, for index building.
    /// Rows with malformed blobs fail the whole load; the store is the
    /// source of truth and a bad row means something corrupted it.
    pub fn load_file_embeddings(&self) -> Result<Vec<StoredEmbedding>, StoreError> {
        self.load_embeddings("SELECT file_id, embedding FROM file_embeddings ORDER BY file_id")
    }

    pub fn load_link_embeddings(&self) -> Result<Vec<StoredEmbedding>, StoreError> {
        self.load_embeddings("SELECT link_id, embedding FROM link_embeddings ORDER BY link_id")
    }

    fn load_embeddings(&self, sql: &str) -> Result<Vec<StoredEmbedding>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(entity_id, blob)| {
                Ok(StoredEmbedding {
                    entity_id,
                    vector: decode_vector(&blob)?,
                })
            })
            .collect()
    }

    /// A file row joined with the text its embedding was built from.
    pub fn file_with_embedding_text(
        &self,
        id: i64,
    ) -> Result<Option<(IndexedFile, String)>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT f.id, f.message_id, f.channel_id, f.channel_name, f.guild_id,
                        f.guild_name, f.author_id, f.author_name, f.filename, f.file_url,
                        f.file_size, f.file_type, f.message_content, f.timestamp, f.indexed_at,
                        fe.content_text
                 FROM indexed_files f
                 JOIN file_embeddings fe ON f.id = fe.file_id
                 WHERE f.id = ?1",
                [id],
                |row| Ok((file_from_row(row)?, row.get::<_, String>(15)?)),
            )
            .optional()?;
        Ok(row)
    }

    pub fn link_with_embedding_text(
        &self,
        id: i64,
    ) -> Result<Option<(IndexedLink, String)>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT l.id, l.message_id, l.channel_id, l.channel_name, l.guild_id,
                        l.guild_name, l.author_id, l.author_name, l.link_url, l.link_domain,
                        l.message_content, l.timestamp, l.indexed_at,
                        le.content_text
                 FROM indexed_links l
                 JOIN link_embeddings le ON l.id = le.link_id
                 WHERE l.id = ?1",
                [id],
                |row| Ok((link_from_row(row)?, row.get::<_, String>(13)?)),
            )
            .optional()?;
        Ok(row)
    }

    // --- file content ------------------------------------------------------

    pub fn has_content(&self, file_id: i64) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT 1 FROM file_content WHERE file_id = ?1")?;
        Ok(stmt.exists([file_id])?)
    }

    pub fn upsert_file_content(
        &self,
        file_id: i64,
        content_text: &str,
        extraction_method: &str,
        file_size_bytes: i64,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO file_content (file_id, content_text, extraction_method, extracted_at, file_size_bytes)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(file_id) DO UPDATE SET
                content_text = ?2, extraction_method = ?3, extracted_at = ?4, file_size_bytes = ?5",
            rusqlite::params![file_id, content_text, extraction_method, Utc::now(), file_size_bytes],
        )?;
        Ok(())
    }

    pub fn get_file_content(&self, file_id: i64) -> Result<Option<FileContentRecord>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT file_id, content_text, extraction_method, extracted_at, file_size_bytes
                 FROM file_content WHERE file_id = ?1",
                [file_id],
                |row| {
                    Ok(FileContentRecord {
                        file_id: row.get(0)?,
                        content_text: row.get(1)?,
                        extraction_method: row.get(2)?,
                        extracted_at: row.get(3)?,
                        file_size_bytes: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Files with no extracted content yet, newest first.
    pub fn files_missing_content(&self) -> Result<Vec<IndexedFile>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT f.id, f.message_id, f.channel_id, f.channel_name, f.guild_id, f.guild_name,
                    f.author_id, f.author_name, f.filename, f.file_url, f.file_size, f.file_type,
                    f.message_content, f.timestamp, f.indexed_at
             FROM indexed_files f
             LEFT JOIN file_content fc ON f.id = fc.file_id
             WHERE fc.file_id IS NULL
             ORDER BY f.indexed_at DESC",
        )?;
        let files = stmt
            .query_map([], file_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(files)
    }

    /// Case-insensitive substring candidates for the lexical scan, newest
    /// first. `LIKE` is case-insensitive for ASCII in SQLite, which matches
    /// the lowercased scoring pass in `search::lexical`.
    pub fn content_candidates(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<(IndexedFile, String, String)>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT f.id, f.message_id, f.channel_id, f.channel_name, f.guild_id, f.guild_name,
                    f.author_id, f.author_name, f.filename, f.file_url, f.file_size, f.file_type,
                    f.message_content, f.timestamp, f.indexed_at,
                    fc.content_text, fc.extraction_method
             FROM indexed_files f
             JOIN file_content fc ON f.id = fc.file_id
             WHERE fc.content_text LIKE ?1 ESCAPE '\\'
             ORDER BY f.timestamp DESC
             LIMIT ?2",
        )?;
        let pattern = format!("%{}%", escape_like(query));
        let rows = stmt
            .query_map(rusqlite::params![pattern, limit as i64], |row| {
                Ok((
                    file_from_row(row)?,
                    row.get::<_, String>(15)?,
                    row.get::<_, String>(16)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // --- query log and stats -----------------------------------------------

    pub fn log_search_query(
        &self,
        user_id: Option<i64>,
        query_text: &str,
        query_vector: &[f32],
        results_count: usize,
        search_time_ms: u64,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO search_queries
                (user_id, query_text, query_embedding, results_count, search_time_ms, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                user_id,
                query_text,
                encode_vector(query_vector),
                results_count as i64,
                search_time_ms as i64,
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    pub fn search_query_count(&self) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM search_queries", [], |r| r.get(0))?)
    }

    pub fn embedding_stats(&self) -> Result<EmbeddingStats, StoreError> {
        let conn = self.lock()?;
        let count = |sql: &str| -> Result<i64, rusqlite::Error> {
            conn.query_row(sql, [], |r| r.get(0))
        };
        let file_embeddings = count("SELECT COUNT(*) FROM file_embeddings")?;
        let link_embeddings = count("SELECT COUNT(*) FROM link_embeddings")?;
        let total_files = count("SELECT COUNT(*) FROM indexed_files")?;
        let total_links = count("SELECT COUNT(*) FROM indexed_links")?;
        Ok(EmbeddingStats {
            file_embeddings,
            link_embeddings,
            total_files,
            total_links,
            files_coverage: coverage(file_embeddings, total_files),
            links_coverage: coverage(link_embeddings, total_links),
        })
    }

    pub fn content_stats(&self) -> Result<ContentStats, StoreError> {
        let conn = self.lock()?;
        let files_with_content: i64 =
            conn.query_row("SELECT COUNT(*) FROM file_content", [], |r| r.get(0))?;
        let total_files: i64 =
            conn.query_row("SELECT COUNT(*) FROM indexed_files", [], |r| r.get(0))?;
        let total_content_characters: i64 = conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(content_text)), 0) FROM file_content",
            [],
            |r| r.get(0),
        )?;
        let mut stmt = conn.prepare(
            "SELECT extraction_method, COUNT(*) FROM file_content GROUP BY extraction_method",
        )?;
        let extraction_methods = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(String, i64)>, _>>()?;
        Ok(ContentStats {
            files_with_content,
            total_files,
            coverage_percentage: coverage(files_with_content, total_files),
            extraction_methods,
            total_content_characters,
        })
    }
}

fn coverage(have: i64, total: i64) -> f64 {
    if total > 0 {
        have as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

fn file_from_row(row: &Row<'_>) -> Result<IndexedFile, rusqlite::Error> {
    Ok(IndexedFile {
        id: row.get(0)?,
        message_id: row.get(1)?,
        channel_id: row.get(2)?,
        channel_name: row.get(3)?,
        guild_id: row.get(4)?,
        guild_name: row.get(5)?,
        author_id: row.get(6)?,
        author_name: row.get(7)?,
        filename: row.get(8)?,
        file_url: row.get(9)?,
        file_size: row.get(10)?,
        file_type: row.get(11)?,
        message_content: row.get(12)?,
        timestamp: row.get(13)?,
        indexed_at: row.get(14)?,
    })
}

fn link_from_row(row: &Row<'_>) -> Result<IndexedLink, rusqlite::Error> {
    Ok(IndexedLink {
        id: row.get(0)?,
        message_id: row.get(1)?,
        channel_id: row.get(2)?,
        channel_name: row.get(3)?,
        guild_id: row.get(4)?,
        guild_name: row.get(5)?,
        author_id: row.get(6)?,
        author_name: row.get(7)?,
        link_url: row.get(8)?,
        link_domain: row.get(9)?,
        message_content: row.get(10)?,
        timestamp: row.get(11)?,
        indexed_at: row.get(12)?,
    })
}

/// Vectors are stored as little-endian f32 bytes.
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

pub fn decode_vector(blob: &[u8]) -> Result<Vec<f32>, StoreError> {
    if blob.len() % 4 != 0 {
        return Err(StoreError::MalformedVector(blob.len()));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Escape LIKE wildcards in user-supplied query text.
fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn test_file(message_id: &str, url: &str) -> NewFile {
        NewFile {
            message_id: message_id.to_string(),
            channel_id: "c1".to_string(),
            channel_name: Some("general".to_string()),
            guild_id: Some("g1".to_string()),
            guild_name: Some("Test Guild".to_string()),
            author_id: "u1".to_string(),
            author_name: Some("alice".to_string()),
            filename: "report.pdf".to_string(),
            file_url: url.to_string(),
            file_size: Some(1234),
            file_type: Some("application/pdf".to_string()),
            message_content: Some("see attached".to_string()),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn test_link(message_id: &str, url: &str) -> NewLink {
        NewLink {
            message_id: message_id.to_string(),
            channel_id: "c1".to_string(),
            channel_name: Some("general".to_string()),
            guild_id: Some("g1".to_string()),
            guild_name: Some("Test Guild".to_string()),
            author_id: "u1".to_string(),
            author_name: Some("alice".to_string()),
            link_url: url.to_string(),
            link_domain: Some("example.com".to_string()),
            message_content: Some("check this out".to_string()),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init_schema().unwrap();
        db
    }

    #[cfg(unix)]
    #[test]
    fn open_accepts_non_utf8_paths() {
        use std::os::unix::ffi::OsStringExt;

        let dir = tempfile::tempdir().unwrap();
        let name = std::ffi::OsString::from_vec(b"caf\xE9.db".to_vec());
        let db = Database::open(dir.path().join(name)).unwrap();
        db.init_schema().unwrap();
        assert!(db.insert_file(&test_file("m1", "https://cdn/a.pdf")).unwrap().is_some());
    }

    #[test]
    fn insert_file_roundtrip() {
        let db = db();
        let id = db.insert_file(&test_file("m1", "https://cdn/a.pdf")).unwrap().unwrap();
        let file = db.get_file(id).unwrap().unwrap();
        assert_eq!(file.filename, "report.pdf");
        assert_eq!(file.author_name.as_deref(), Some("alice"));
    }

    #[test]
    fn duplicate_file_is_ignored() {
        let db = db();
        let first = db.insert_file(&test_file("m1", "https://cdn/a.pdf")).unwrap();
        let second = db.insert_file(&test_file("m1", "https://cdn/a.pdf")).unwrap();
        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[test]
    fn duplicate_link_is_ignored() {
        let db = db();
        assert!(db.insert_link(&test_link("m1", "https://example.com")).unwrap().is_some());
        assert!(db.insert_link(&test_link("m1", "https://example.com")).unwrap().is_none());
        // Same URL from a different message is a distinct row.
        assert!(db.insert_link(&test_link("m2", "https://example.com")).unwrap().is_some());
    }

    #[test]
    fn embedding_upsert_replaces() {
        let db = db();
        let id = db.insert_file(&test_file("m1", "https://cdn/a.pdf")).unwrap().unwrap();
        db.upsert_file_embedding(id, &[1.0, 0.0], "first", "test-model").unwrap();
        db.upsert_file_embedding(id, &[0.0, 1.0], "second", "test-model").unwrap();

        let rows = db.load_file_embeddings().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].vector, vec![0.0, 1.0]);

        let (_, text) = db.file_with_embedding_text(id).unwrap().unwrap();
        assert_eq!(text, "second");
    }

    #[test]
    fn missing_embeddings_anti_join() {
        let db = db();
        let a = db.insert_file(&test_file("m1", "https://cdn/a.pdf")).unwrap().unwrap();
        let b = db.insert_file(&test_file("m2", "https://cdn/b.pdf")).unwrap().unwrap();
        db.upsert_file_embedding(a, &[1.0], "a", "test-model").unwrap();

        assert_eq!(db.files_missing_embeddings().unwrap(), vec![b]);
    }

    #[test]
    fn content_unique_per_file() {
        let db = db();
        let id = db.insert_file(&test_file("m1", "https://cdn/a.pdf")).unwrap().unwrap();
        db.upsert_file_content(id, "hello world", "pdf-extract", 10).unwrap();
        db.upsert_file_content(id, "hello again", "pdf-extract", 11).unwrap();

        let record = db.get_file_content(id).unwrap().unwrap();
        assert_eq!(record.content_text, "hello again");
        assert!(db.has_content(id).unwrap());
        assert!(db.files_missing_content().unwrap().is_empty());
    }

    #[test]
    fn cascade_removes_children() {
        let db = db();
        let id = db.insert_file(&test_file("m1", "https://cdn/a.pdf")).unwrap().unwrap();
        db.upsert_file_embedding(id, &[1.0], "text", "test-model").unwrap();
        db.upsert_file_content(id, "body", "pdf-extract", 4).unwrap();

        {
            let conn = db.conn.lock().unwrap();
            conn.execute("DELETE FROM indexed_files WHERE id = ?1", [id]).unwrap();
        }
        assert!(db.load_file_embeddings().unwrap().is_empty());
        assert!(!db.has_content(id).unwrap());
    }

    #[test]
    fn content_candidates_match_substring() {
        let db = db();
        let id = db.insert_file(&test_file("m1", "https://cdn/a.pdf")).unwrap().unwrap();
        db.upsert_file_content(id, "Quarterly Revenue Report", "pdf-extract", 24).unwrap();

        let hits = db.content_candidates("revenue", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.id, id);

        assert!(db.content_candidates("nonexistent", 10).unwrap().is_empty());
        // LIKE wildcards in the query must not act as wildcards.
        assert!(db.content_candidates("%", 10).unwrap().is_empty());
    }

    #[test]
    fn coverage_stats() {
        let db = db();
        for i in 0..10 {
            db.insert_file(&test_file(&format!("m{i}"), &format!("https://cdn/{i}.pdf")))
                .unwrap();
        }
        for id in 1..=3 {
            db.upsert_file_embedding(id, &[1.0], "t", "test-model").unwrap();
        }
        let stats = db.embedding_stats().unwrap();
        assert_eq!(stats.total_files, 10);
        assert_eq!(stats.file_embeddings, 3);
        assert!((stats.files_coverage - 30.0).abs() < f64::EPSILON);
        // Zero totals must not divide by zero.
        assert_eq!(stats.links_coverage, 0.0);
    }

    #[test]
    fn vector_blob_roundtrip() {
        let v = vec![0.25_f32, -1.5, 3.0];
        let blob = encode_vector(&v);
        assert_eq!(decode_vector(&blob).unwrap(), v);
        assert!(matches!(
            decode_vector(&blob[..5]),
            Err(StoreError::MalformedVector(5))
        ));
    }

    #[test]
    fn query_log_append() {
        let db = db();
        db.log_search_query(Some(7), "budget", &[0.1, 0.2], 3, 12).unwrap();
        db.log_search_query(None, "budget", &[0.1, 0.2], 0, 4).unwrap();
        assert_eq!(db.search_query_count().unwrap(), 2);
    }
}
