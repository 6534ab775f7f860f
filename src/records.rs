//! Row types for the durable store.
//!
//! These mirror the SQLite schema in `db.rs`. Files and links are
//! immutable once inserted; embeddings and content rows are upserted.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A file shared in a chat message, as captured by the ingestion bot.
#[derive(Debug, Clone, Serialize)]
pub struct IndexedFile {
    pub id: i64,
    pub message_id: String,
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub guild_id: Option<String>,
    pub guild_name: Option<String>,
    pub author_id: String,
    pub author_name: Option<String>,
    pub filename: String,
    pub file_url: String,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub message_content: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub indexed_at: DateTime<Utc>,
}

/// A URL shared in a chat message.
#[derive(Debug, Clone, Serialize)]
pub struct IndexedLink {
    pub id: i64,
    pub message_id: String,
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub guild_id: Option<String>,
    pub guild_name: Option<String>,
    pub author_id: String,
    pub author_name: Option<String>,
    pub link_url: String,
    pub link_domain: Option<String>,
    pub message_content: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub indexed_at: DateTime<Utc>,
}

/// Insert payload for a file row. The store assigns `id` and `indexed_at`.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub message_id: String,
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub guild_id: Option<String>,
    pub guild_name: Option<String>,
    pub author_id: String,
    pub author_name: Option<String>,
    pub filename: String,
    pub file_url: String,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub message_content: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Insert payload for a link row.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub message_id: String,
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub guild_id: Option<String>,
    pub guild_name: Option<String>,
    pub author_id: String,
    pub author_name: Option<String>,
    pub link_url: String,
    pub link_domain: Option<String>,
    pub message_content: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Extracted plain text for a file. At most one row per file.
#[derive(Debug, Clone, Serialize)]
pub struct FileContentRecord {
    pub file_id: i64,
    pub content_text: String,
    pub extraction_method: String,
    pub extracted_at: DateTime<Utc>,
    pub file_size_bytes: i64,
}

/// Embedding coverage counters reported by `embedding_stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingStats {
    pub file_embeddings: i64,
    pub link_embeddings: i64,
    pub total_files: i64,
    pub total_links: i64,
    pub files_coverage: f64,
    pub links_coverage: f64,
}

/// Content-extraction coverage counters.
#[derive(Debug, Clone, Serialize)]
pub struct ContentStats {
    pub files_with_content: i64,
    pub total_files: i64,
    pub coverage_percentage: f64,
    pub extraction_methods: Vec<(String, i64)>,
    pub total_content_characters: i64,
}

/// Counters for a batch content-extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentRunStats {
    /// Files that were missing content when the run started.
    pub total: usize,
    /// Extractions that produced text and were stored.
    pub stored: usize,
    /// Unsupported types and files whose extraction found no text.
    pub skipped: usize,
    /// Download or extraction failures.
    pub failed: usize,
}

/// Counters for a batch embedding run. `*_processed` counts successes;
/// `total_*` counts how many ids were missing embeddings at the start.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmbedRunStats {
    pub files_processed: usize,
    pub links_processed: usize,
    pub total_files: usize,
    pub total_links: usize,
}
