//! Hybrid search orchestration and embedding generation.
//!
//! `SearchService` is the entry point the dashboard/API calls. It owns the
//! embedder, the index cache, and a handle to the store, and coordinates:
//! query embedding, per-kind vector search, the lexical content scan,
//! result fusion, and query logging.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::db::{Database, StoreError};
use crate::records::{EmbedRunStats, EmbeddingStats, IndexedFile, IndexedLink};
use crate::search::cache::IndexCache;
use crate::search::compose::{file_embedding_text, link_embedding_text};
use crate::search::embedder::{EmbedError, Embedder};
use crate::search::index::IndexError;
use crate::search::lexical::score_content;

/// Errors surfaced to search callers.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbedError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Per-item outcome of embedding generation. Lets callers distinguish
/// "entity does not exist" from an actual failure without parsing logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedOutcome {
    Stored,
    NotFound,
    Failed,
}

/// Search request parameters.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
    pub include_files: bool,
    pub include_links: bool,
    pub user_id: Option<i64>,
    pub include_content: bool,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: 20,
            include_files: true,
            include_links: true,
            user_id: None,
            include_content: true,
        }
    }
}

/// A file result with its fused score.
#[derive(Debug, Clone, Serialize)]
pub struct FileHit {
    #[serde(flatten)]
    pub file: IndexedFile,
    /// Text the stored embedding was built from, or extracted content for
    /// lexical-only hits.
    pub content_text: String,
    pub extraction_method: Option<String>,
    /// Cosine similarity for embedding hits, term-frequency score for
    /// lexical hits, max of the two when both matched. The two scales are
    /// incompatible; max-fusion avoids inventing a calibration, at the cost
    /// of not truly blending signal strength.
    pub similarity_score: f32,
    /// True when the lexical content scan matched this file.
    pub content_match: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkHit {
    #[serde(flatten)]
    pub link: IndexedLink,
    pub content_text: String,
    pub similarity_score: f32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResponse {
    pub files: Vec<FileHit>,
    pub links: Vec<LinkHit>,
}

pub struct SearchService {
    db: Database,
    embedder: Arc<dyn Embedder>,
    cache: IndexCache,
}

impl SearchService {
    pub fn new(db: Database, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            db,
            embedder,
            cache: IndexCache::new(),
        }
    }

    /// Drop the cached indexes; the next search rebuilds from the store.
    pub fn invalidate_indexes(&self) {
        self.cache.invalidate();
    }

    // --- embedding generation ----------------------------------------------

    /// Embed a file's metadata text and upsert it into the store.
    pub fn generate_for_file(&self, file_id: i64) -> EmbedOutcome {
        let file = match self.db.get_file(file_id) {
            Ok(Some(file)) => file,
            Ok(None) => return EmbedOutcome::NotFound,
            Err(e) => {
                log::error!("loading file {} for embedding: {}", file_id, e);
                return EmbedOutcome::Failed;
            }
        };
        let text = file_embedding_text(&file);
        self.embed_and_store(file_id, &text, |vector| {
            self.db
                .upsert_file_embedding(file_id, vector, &text, self.embedder.model_name())
        })
    }

    pub fn generate_for_link(&self, link_id: i64) -> EmbedOutcome {
        let link = match self.db.get_link(link_id) {
            Ok(Some(link)) => link,
            Ok(None) => return EmbedOutcome::NotFound,
            Err(e) => {
                log::error!("loading link {} for embedding: {}", link_id, e);
                return EmbedOutcome::Failed;
            }
        };
        let text = link_embedding_text(&link);
        self.embed_and_store(link_id, &text, |vector| {
            self.db
                .upsert_link_embedding(link_id, vector, &text, self.embedder.model_name())
        })
    }

    fn embed_and_store<F>(&self, id: i64, text: &str, store: F) -> EmbedOutcome
    where
        F: FnOnce(&[f32]) -> Result<(), StoreError>,
    {
        let vector = match self.embedder.embed(text) {
            Ok(vector) => vector,
            Err(e) => {
                log::error!("embedding entity {}: {}", id, e);
                return EmbedOutcome::Failed;
            }
        };
        match store(&vector) {
            Ok(()) => EmbedOutcome::Stored,
            Err(e) => {
                log::error!("storing embedding for entity {}: {}", id, e);
                EmbedOutcome::Failed
            }
        }
    }

    /// Generate embeddings for every file and link that lacks one.
    /// Each item is committed independently; a failing item never blocks
    /// the rest of the batch.
    pub fn generate_all_missing(&self, batch_size: usize) -> Result<EmbedRunStats, StoreError> {
        let batch_size = batch_size.max(1);
        let file_ids = self.db.files_missing_embeddings()?;
        let link_ids = self.db.links_missing_embeddings()?;

        let mut stats = EmbedRunStats {
            total_files: file_ids.len(),
            total_links: link_ids.len(),
            ..EmbedRunStats::default()
        };

        for batch in file_ids.chunks(batch_size) {
            for &id in batch {
                if self.generate_for_file(id) == EmbedOutcome::Stored {
                    stats.files_processed += 1;
                }
            }
            log::debug!(
                "embedding batch done: {}/{} files",
                stats.files_processed,
                stats.total_files
            );
        }
        for batch in link_ids.chunks(batch_size) {
            for &id in batch {
                if self.generate_for_link(id) == EmbedOutcome::Stored {
                    stats.links_processed += 1;
                }
            }
        }

        log::info!(
            "embedding run: {}/{} files, {}/{} links",
            stats.files_processed,
            stats.total_files,
            stats.links_processed,
            stats.total_links
        );
        Ok(stats)
    }

    pub fn embedding_stats(&self) -> Result<EmbeddingStats, StoreError> {
        self.db.embedding_stats()
    }

    // --- search ------------------------------------------------------------

    /// Hybrid search across files and links.
    ///
    /// Degraded states return partial results rather than errors: an empty
    /// index yields an empty list for that kind, and a query-log failure is
    /// swallowed. The only fast failure is an empty query, which cannot be
    /// embedded.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        if request.query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let started = Instant::now();

        // Raw query text, no field labels; must match how stored texts were
        // embedded through the same model.
        let query_vector = self.embedder.embed(&request.query)?;
        let indexes = self.cache.get_or_build(&self.db)?;

        let mut response = SearchResponse::default();

        if request.include_files {
            response.files = self.search_files(request, &query_vector, &indexes.files)?;
        }
        if request.include_links {
            response.links = self.search_links(request, &query_vector, &indexes.links)?;
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let total = response.files.len() + response.links.len();
        if let Err(e) = self.db.log_search_query(
            request.user_id,
            &request.query,
            &query_vector,
            total,
            elapsed_ms,
        ) {
            // Analytics only; never let logging break the search itself.
            log::error!("recording search query: {}", e);
        }

        Ok(response)
    }

    fn search_files(
        &self,
        request: &SearchRequest,
        query_vector: &[f32],
        index: &crate::search::index::VectorIndex,
    ) -> Result<Vec<FileHit>, SearchError> {
        let mut hits: Vec<FileHit> = Vec::new();

        for scored in index.search(query_vector, request.limit)? {
            match self.db.file_with_embedding_text(scored.id)? {
                Some((file, content_text)) => hits.push(FileHit {
                    file,
                    content_text,
                    extraction_method: None,
                    similarity_score: scored.score,
                    content_match: false,
                }),
                // Embedding row outlived its file between index build and
                // resolution; skip rather than fail the search.
                None => log::warn!("stale index entry for file {}", scored.id),
            }
        }

        if request.include_content {
            if let Err(e) = self.fuse_content_matches(request, &mut hits) {
                log::error!("content scan failed, returning embedding results only: {}", e);
            }
        }

        hits.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(hits)
    }

    /// Merge lexical-scan results into the embedding hits: a file found by
    /// both keeps the max of the two scores and is marked as a content
    /// match; lexical-only files are appended.
    fn fuse_content_matches(
        &self,
        request: &SearchRequest,
        hits: &mut Vec<FileHit>,
    ) -> Result<(), SearchError> {
        let candidates = self
            .db
            .content_candidates(&request.query, request.limit * 2)?;

        for (file, content_text, extraction_method) in candidates {
            let score = score_content(&request.query, &content_text);
            if let Some(existing) = hits.iter_mut().find(|h| h.file.id == file.id) {
                existing.similarity_score = existing.similarity_score.max(score);
                existing.content_match = true;
                existing.extraction_method = Some(extraction_method);
            } else {
                hits.push(FileHit {
                    file,
                    content_text,
                    extraction_method: Some(extraction_method),
                    similarity_score: score,
                    content_match: true,
                });
            }
        }
        Ok(())
    }

    fn search_links(
        &self,
        request: &SearchRequest,
        query_vector: &[f32],
        index: &crate::search::index::VectorIndex,
    ) -> Result<Vec<LinkHit>, SearchError> {
        let mut hits: Vec<LinkHit> = Vec::new();
        for scored in index.search(query_vector, request.limit)? {
            match self.db.link_with_embedding_text(scored.id)? {
                Some((link, content_text)) => hits.push(LinkHit {
                    link,
                    content_text,
                    similarity_score: scored.score,
                }),
                None => log::warn!("stale index entry for link {}", scored.id),
            }
        }
        hits.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(hits)
    }
}
