use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const DEFAULT_DB_FILE: &str = "chatdex.db";
const DEFAULT_BATCH_SIZE: usize = 32;
const DEFAULT_SEARCH_LIMIT: usize = 20;
const DEFAULT_OCR_LANG: &str = "eng";

/// Configuration for embedding generation and semantic search
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticConfig {
    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_model")]
    pub model: String,

    /// Parent directory for the `models/` download cache; defaults to the
    /// base directory
    #[serde(default)]
    pub model_cache_dir: Option<String>,

    /// Items per progress-logged batch during embedding generation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            model: crate::search::DEFAULT_MODEL.to_string(),
            model_cache_dir: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

fn default_model() -> String {
    crate::search::DEFAULT_MODEL.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Configuration for content extraction
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Tesseract language code
    #[serde(default = "default_ocr_lang")]
    pub ocr_lang: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ocr_lang: DEFAULT_OCR_LANG.to_string(),
        }
    }
}

fn default_ocr_lang() -> String {
    DEFAULT_OCR_LANG.to_string()
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database file, relative to the base directory unless absolute
    #[serde(default = "default_db_file")]
    pub db_file: String,

    /// Default result limit for searches
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    #[serde(default)]
    pub semantic: SemanticConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

fn default_db_file() -> String {
    DEFAULT_DB_FILE.to_string()
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

impl Config {
    fn validate(&mut self) {
        if self.semantic.batch_size == 0 {
            self.semantic.batch_size = 1;
        }
        if self.search_limit == 0 {
            self.search_limit = DEFAULT_SEARCH_LIMIT;
        }
        if self.extraction.ocr_lang.trim().is_empty() {
            panic!("extraction.ocr_lang must not be empty");
        }
    }

    /// Base directory: `CHATDEX_BASE_PATH`, or the current directory.
    pub fn base_path() -> PathBuf {
        std::env::var("CHATDEX_BASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
    }

    pub fn load() -> Self {
        Self::load_with(&Self::base_path())
    }

    pub fn load_with(base_path: &Path) -> Self {
        let config_path = base_path.join("config.yaml");

        // create new if does not exist
        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent).expect("cannot create config directory");
            }
            std::fs::write(
                &config_path,
                serde_yml::to_string(&Self::default()).unwrap(),
            )
            .expect("cannot write default config");
        }

        let config_str =
            std::fs::read_to_string(&config_path).expect("config file is not valid utf8");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_path_buf();
        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).unwrap() {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let config_str = serde_yml::to_string(&self).unwrap();
        std::fs::write(self.base_path.join("config.yaml"), config_str)
            .expect("cannot write config");
    }

    pub fn db_path(&self) -> PathBuf {
        let db = Path::new(&self.db_file);
        if db.is_absolute() {
            db.to_path_buf()
        } else {
            self.base_path.join(db)
        }
    }

    pub fn model_cache_dir(&self) -> PathBuf {
        match &self.semantic.model_cache_dir {
            Some(dir) => PathBuf::from(dir),
            None => self.base_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_creates_default_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_with(dir.path());
        assert!(dir.path().join("config.yaml").exists());
        assert_eq!(config.db_file, DEFAULT_DB_FILE);
        assert_eq!(config.semantic.model, crate::search::DEFAULT_MODEL);
        assert_eq!(config.semantic.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn partial_config_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.yaml"), "search_limit: 5\n").unwrap();
        let config = Config::load_with(dir.path());
        assert_eq!(config.search_limit, 5);
        assert_eq!(config.semantic.model, crate::search::DEFAULT_MODEL);
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "semantic:\n  batch_size: 0\n",
        )
        .unwrap();
        let config = Config::load_with(dir.path());
        assert_eq!(config.semantic.batch_size, 1);
    }

    #[test]
    fn relative_db_path_joins_base() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_with(dir.path());
        assert_eq!(config.db_path(), dir.path().join(DEFAULT_DB_FILE));
    }
}
