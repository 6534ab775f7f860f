//! Semantic + lexical search core.
//!
//! # Architecture
//!
//! - `embedder`: sentence-embedding model behind the `Embedder` trait
//! - `compose`: labeled-fragment text construction for files and links
//! - `index`: exact cosine-similarity index over normalized vectors
//! - `cache`: per-kind index pair with explicit invalidation
//! - `lexical`: term-frequency scoring over extracted file content
//! - `service`: hybrid orchestrator and embedding batch generation

pub mod cache;
pub mod compose;
pub mod embedder;
pub mod index;
pub mod lexical;
pub mod service;

pub use embedder::{EmbedError, Embedder, FastembedEmbedder};
pub use service::{SearchRequest, SearchResponse, SearchService};

/// Default embedding model; 384-dimension vectors, small enough to embed
/// the whole corpus on CPU.
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";
