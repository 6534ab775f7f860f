//! Embedding model wrapper for fastembed.
//!
//! The model is expensive to load, so `FastembedEmbedder` defers
//! initialization until the first `embed` call and keeps the model for the
//! process lifetime. The wrapper is owned by the application root and shared
//! by reference; interior locking makes it safe to call from multiple
//! threads (fastembed's `embed()` needs `&mut self`).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use fastembed::{InitOptions, TextEmbedding};

/// Error type for embedding operations.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("model initialization failed: {0}")]
    InitFailed(String),

    #[error("embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("invalid model name: {0}")]
    InvalidModel(String),

    #[error("cannot embed empty text")]
    EmptyInput,
}

/// Anything that can turn text into a fixed-dimension vector.
///
/// The production implementation is [`FastembedEmbedder`]; tests use a
/// deterministic stub so they run without model downloads.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Identifier persisted alongside each stored embedding.
    fn model_name(&self) -> &str;
}

struct LoadedModel {
    model: TextEmbedding,
    dimensions: usize,
}

/// Lazily-initialized fastembed model.
pub struct FastembedEmbedder {
    model_name: String,
    cache_dir: PathBuf,
    state: Mutex<Option<LoadedModel>>,
}

impl FastembedEmbedder {
    /// The model is validated by name here but downloaded/loaded on first
    /// `embed` call. Models are cached under `cache_dir/models`.
    pub fn new(model_name: &str, cache_dir: PathBuf) -> Result<Self, EmbedError> {
        // Fail fast on unknown names instead of at first embed.
        parse_model_name(model_name)?;
        Ok(Self {
            model_name: model_name.to_string(),
            cache_dir,
            state: Mutex::new(None),
        })
    }

    /// Dimensions of the loaded model, or `None` before first use.
    pub fn dimensions(&self) -> Option<usize> {
        self.state
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|m| m.dimensions))
    }

    fn load(&self) -> Result<LoadedModel, EmbedError> {
        log::info!("loading embedding model '{}'", self.model_name);
        let model_enum = parse_model_name(&self.model_name)?;

        let models_dir = self.cache_dir.join("models");
        std::fs::create_dir_all(&models_dir).map_err(|e| {
            EmbedError::InitFailed(format!("failed to create models directory: {}", e))
        })?;

        let options = InitOptions::new(model_enum)
            .with_cache_dir(models_dir)
            .with_show_download_progress(true);
        let mut model =
            TextEmbedding::try_new(options).map_err(|e| EmbedError::InitFailed(e.to_string()))?;

        let dimensions = probe_dimensions(&mut model)?;
        log::info!(
            "embedding model '{}' ready ({} dimensions)",
            self.model_name,
            dimensions
        );
        Ok(LoadedModel { model, dimensions })
    }
}

impl Embedder for FastembedEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.trim().is_empty() {
            return Err(EmbedError::EmptyInput);
        }

        let mut guard = self
            .state
            .lock()
            .map_err(|e| EmbedError::EmbeddingFailed(format!("model lock poisoned: {}", e)))?;
        if guard.is_none() {
            *guard = Some(self.load()?);
        }
        let loaded = guard.as_mut().expect("state populated above");

        let embeddings = loaded
            .model
            .embed(vec![text], None)
            .map_err(|e| EmbedError::EmbeddingFailed(e.to_string()))?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::EmbeddingFailed("no embedding returned".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

fn probe_dimensions(model: &mut TextEmbedding) -> Result<usize, EmbedError> {
    let test = model
        .embed(vec!["test"], None)
        .map_err(|e| EmbedError::InitFailed(format!("failed to probe dimensions: {}", e)))?;
    test.first()
        .map(|v| v.len())
        .ok_or_else(|| EmbedError::InitFailed("model returned no embedding".to_string()))
}

fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel, EmbedError> {
    let normalized: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    let aliases: HashMap<&str, fastembed::EmbeddingModel> = HashMap::from([
        ("allminilml6v2", fastembed::EmbeddingModel::AllMiniLML6V2),
        ("allminilml6v2q", fastembed::EmbeddingModel::AllMiniLML6V2Q),
        ("bgesmallenv15", fastembed::EmbeddingModel::BGESmallENV15),
        ("bgesmallenv15q", fastembed::EmbeddingModel::BGESmallENV15Q),
        ("bgebaseenv15", fastembed::EmbeddingModel::BGEBaseENV15),
        ("bgebaseenv15q", fastembed::EmbeddingModel::BGEBaseENV15Q),
        ("bgelargeenv15", fastembed::EmbeddingModel::BGELargeENV15),
        ("bgelargeenv15q", fastembed::EmbeddingModel::BGELargeENV15Q),
    ]);
    aliases.get(normalized.as_str()).cloned().ok_or_else(|| {
        EmbedError::InvalidModel(format!(
            "unknown model: {}. Supported: all-MiniLM-L6-v2, bge-small-en-v1.5, \
             bge-base-en-v1.5, bge-large-en-v1.5 (add -q suffix for quantized)",
            name
        ))
    })
}
