use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ranking;

/// Default embedding model, multilingual so Greek feeds work out of the box
const DEFAULT_EMBEDDING_MODEL: &str = "paraphrase-multilingual-minilm-l12-v2";
/// Directory under the data dir where trained models are stored
const DEFAULT_MODELS_DIR: &str = "models";

/// Configuration for the embedding backend
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name, or "hash" for the lightweight hashing embedder
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Where downloaded model weights live; defaults inside the data dir
    #[serde(default)]
    pub cache_dir: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            cache_dir: None,
        }
    }
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

/// Configuration for scoring and ranking
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results returned when the request has no limit
    #[serde(default = "default_search_limit")]
    pub default_limit: usize,

    /// Weight of semantic similarity in the fused score
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    /// Weight of lexical similarity in the fused score
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: ranking::DEFAULT_LIMIT,
            semantic_weight: ranking::DEFAULT_SEMANTIC_WEIGHT,
            lexical_weight: ranking::DEFAULT_LEXICAL_WEIGHT,
        }
    }
}

fn default_search_limit() -> usize {
    ranking::DEFAULT_LIMIT
}

fn default_semantic_weight() -> f32 {
    ranking::DEFAULT_SEMANTIC_WEIGHT
}

fn default_lexical_weight() -> f32 {
    ranking::DEFAULT_LEXICAL_WEIGHT
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory for trained model artifacts, relative to the data dir
    #[serde(default)]
    pub models_dir: Option<String>,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Config {
    fn validate(&mut self) {
        if self.search.default_limit == 0 {
            self.search.default_limit = 1
        }

        let search = &self.search;
        for (name, weight) in [
            ("search.semantic_weight", search.semantic_weight),
            ("search.lexical_weight", search.lexical_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                panic!("{name} must be a non-negative number, got {weight}");
            }
        }
        if search.semantic_weight == 0.0 && search.lexical_weight == 0.0 {
            panic!("search.semantic_weight and search.lexical_weight cannot both be 0");
        }

        if self.embedding.model.is_empty() {
            panic!("embedding.model cannot be empty");
        }
    }

    pub fn load_with(base_path: &str) -> Self {
        std::fs::create_dir_all(base_path).expect("failed to create data directory");
        let config_path = Path::new(base_path).join("config.yaml");

        // create new if does not exist
        if !config_path.exists() {
            std::fs::write(
                &config_path,
                serde_yml::to_string(&Self::default()).unwrap().as_bytes(),
            )
            .expect("failed to write default config");
        }

        let config_str =
            std::fs::read_to_string(&config_path).expect("config file is not readable");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_string();

        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).unwrap() {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let config_path = Path::new(&self.base_path).join("config.yaml");

        let config_str = serde_yml::to_string(&self).unwrap();
        std::fs::write(config_path, config_str.as_bytes()).expect("failed to write config");
    }

    /// Absolute or data-dir-relative location of trained model artifacts.
    pub fn models_dir(&self) -> PathBuf {
        let dir = self.models_dir.as_deref().unwrap_or(DEFAULT_MODELS_DIR);
        self.resolve(dir)
    }

    /// Where fastembed keeps downloaded weights.
    pub fn model_cache_dir(&self) -> PathBuf {
        let dir = self.embedding.cache_dir.as_deref().unwrap_or("model-cache");
        self.resolve(dir)
    }

    fn resolve(&self, dir: &str) -> PathBuf {
        let path = Path::new(dir);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.base_path).join(path)
        }
    }
}
