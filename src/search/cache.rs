//! Cached per-kind vector indexes with explicit invalidation.
//!
//! The indexes are built once per process from a full scan of the embedding
//! store and are not kept in sync with writes. Rebuild happens only when a
//! search finds no cached pair (first search, or after `invalidate()`).
//! A rebuild produces a fresh `Arc`; in-flight searches holding the old
//! instance are unaffected.

use std::sync::{Arc, Mutex};

use crate::db::{Database, StoreError};
use crate::search::index::VectorIndex;

/// The file and link indexes, built from the same store snapshot.
pub struct IndexPair {
    pub files: VectorIndex,
    pub links: VectorIndex,
}

pub struct IndexCache {
    current: Mutex<Option<Arc<IndexPair>>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    /// Return the cached pair, building it from the store on a miss.
    pub fn get_or_build(&self, db: &Database) -> Result<Arc<IndexPair>, StoreError> {
        let mut guard = self.current.lock().map_err(|_| StoreError::Poisoned)?;
        if let Some(pair) = guard.as_ref() {
            return Ok(Arc::clone(pair));
        }

        let file_rows = db.load_file_embeddings()?;
        let link_rows = db.load_link_embeddings()?;
        log::info!(
            "building vector indexes: {} file embeddings, {} link embeddings",
            file_rows.len(),
            link_rows.len()
        );
        let pair = Arc::new(IndexPair {
            files: VectorIndex::build(
                file_rows.into_iter().map(|r| (r.entity_id, r.vector)).collect(),
            ),
            links: VectorIndex::build(
                link_rows.into_iter().map(|r| (r.entity_id, r.vector)).collect(),
            ),
        });
        *guard = Some(Arc::clone(&pair));
        Ok(pair)
    }

    /// Drop the cached pair so the next search rebuilds from the store.
    /// Call after a batch embedding run.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.current.lock() {
            *guard = None;
        }
    }

    pub fn is_built(&self) -> bool {
        self.current
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::NewFile;
    use chrono::{TimeZone, Utc};

    fn new_file_template() -> NewFile {
        NewFile {
            message_id: "m1".to_string(),
            channel_id: "c1".to_string(),
            channel_name: None,
            guild_id: None,
            guild_name: None,
            author_id: "u1".to_string(),
            author_name: None,
            filename: "a.txt".to_string(),
            file_url: "https://cdn/a.txt".to_string(),
            file_size: None,
            file_type: None,
            message_content: None,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init_schema().unwrap();
        let id = db.insert_file(&new_file_template()).unwrap().unwrap();
        db.upsert_file_embedding(id, &[1.0, 0.0], "text", "test-model")
            .unwrap();
        db
    }

    #[test]
    fn builds_on_first_access_only() {
        let db = seeded_db();
        let cache = IndexCache::new();
        assert!(!cache.is_built());

        let first = cache.get_or_build(&db).unwrap();
        assert!(cache.is_built());
        assert_eq!(first.files.len(), 1);
        assert!(first.links.is_empty());

        // New embeddings are invisible until invalidation.
        let mut other = NewFile {
            message_id: "m2".to_string(),
            file_url: "https://cdn/b.txt".to_string(),
            ..new_file_template()
        };
        other.filename = "b.txt".to_string();
        let id = db.insert_file(&other).unwrap().unwrap();
        db.upsert_file_embedding(id, &[0.0, 1.0], "other", "test-model")
            .unwrap();
        let second = cache.get_or_build(&db).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.files.len(), 1);

        cache.invalidate();
        assert_eq!(cache.get_or_build(&db).unwrap().files.len(), 2);
    }

    #[test]
    fn invalidate_triggers_rebuild() {
        let db = seeded_db();
        let cache = IndexCache::new();
        let first = cache.get_or_build(&db).unwrap();

        cache.invalidate();
        assert!(!cache.is_built());
        let second = cache.get_or_build(&db).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        // The old pair is still usable by in-flight readers.
        assert_eq!(first.files.len(), 1);
    }

    #[test]
    fn empty_store_builds_empty_pair() {
        let db = Database::open_in_memory().unwrap();
        db.init_schema().unwrap();
        let cache = IndexCache::new();
        let pair = cache.get_or_build(&db).unwrap();
        assert!(pair.files.is_empty());
        assert!(pair.links.is_empty());
    }
}
