//! Shared in-memory state: per-shop index cache, training statuses,
//! and the lazily constructed embedder.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::OnceCell;

use crate::config::Config;
use crate::embedding::{EmbeddingError, FastembedEmbedder, HashEmbedder, TextEmbedder};
use crate::errors::SearchError;
use crate::index::TenantIndex;
use crate::ranking::{self, SearchHit, SearchParams};
use crate::store::{ArtifactSummary, ModelStore, StoreError};
use crate::trainer::TrainingStatus;

/// One registry serves all shops for the lifetime of the process.
///
/// Loaded indexes stay cached until replaced by a retrain; there is no
/// eviction. The embedder is built on first use so that commands which
/// never embed anything do not pay for model initialization.
pub struct SearchRegistry {
    config: Config,
    store: ModelStore,
    indexes: RwLock<HashMap<String, Arc<TenantIndex>>>,
    statuses: RwLock<HashMap<String, TrainingStatus>>,
    embedder: OnceCell<Arc<dyn TextEmbedder>>,
}

impl SearchRegistry {
    pub fn new(config: Config) -> Result<Self, StoreError> {
        let store = ModelStore::new(config.models_dir())?;
        Ok(Self {
            config,
            store,
            indexes: RwLock::new(HashMap::new()),
            statuses: RwLock::new(HashMap::new()),
            embedder: OnceCell::new(),
        })
    }

    /// Registry with a preset embedder, bypassing lazy construction.
    pub fn with_embedder(
        config: Config,
        embedder: Arc<dyn TextEmbedder>,
    ) -> Result<Self, StoreError> {
        let registry = Self::new(config)?;
        let _ = registry.embedder.set(embedder);
        Ok(registry)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// The process-wide embedder, constructed on first call.
    ///
    /// Construction may download model weights, so first call can take a
    /// while; later calls return the cached instance.
    pub fn embedder(&self) -> Result<Arc<dyn TextEmbedder>, EmbeddingError> {
        self.embedder
            .get_or_try_init(|| {
                let model = &self.config.embedding.model;
                let embedder: Arc<dyn TextEmbedder> = if model == "hash" {
                    Arc::new(HashEmbedder::default())
                } else {
                    Arc::new(FastembedEmbedder::new(model, self.config.model_cache_dir())?)
                };
                log::info!("embedding model {} ready", embedder.model_name());
                Ok(embedder)
            })
            .map(Arc::clone)
    }

    /// Cached index for a shop, falling back to disk on first access.
    pub fn get_or_load(&self, shop_id: &str) -> Result<Option<Arc<TenantIndex>>, StoreError> {
        if let Some(index) = self.indexes.read().unwrap().get(shop_id) {
            return Ok(Some(Arc::clone(index)));
        }

        let Some(index) = self.store.load(shop_id)? else {
            return Ok(None);
        };
        log::info!(
            "loaded model for shop {shop_id} from disk ({} products)",
            index.len()
        );

        let index = Arc::new(index);
        let mut indexes = self.indexes.write().unwrap();
        // a concurrent load may have won the race; keep whichever is in
        let entry = indexes
            .entry(shop_id.to_string())
            .or_insert_with(|| Arc::clone(&index));
        Ok(Some(Arc::clone(entry)))
    }

    /// Publish a freshly trained index, replacing any cached one.
    pub fn install_index(&self, index: Arc<TenantIndex>) {
        let mut indexes = self.indexes.write().unwrap();
        indexes.insert(index.shop_id.clone(), index);
    }

    pub fn set_status(&self, shop_id: &str, status: TrainingStatus) {
        let mut statuses = self.statuses.write().unwrap();
        statuses.insert(shop_id.to_string(), status);
    }

    /// Training status for a shop; unknown when no training was ever started
    /// in this process.
    pub fn training_status(&self, shop_id: &str) -> TrainingStatus {
        self.statuses
            .read()
            .unwrap()
            .get(shop_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Rank a shop's products for a query.
    ///
    /// Fails with [`SearchError::NotTrained`] when the shop has no model;
    /// scoring faults inside the pipeline degrade to an empty list instead.
    pub fn search(
        &self,
        shop_id: &str,
        query: &str,
        params: &SearchParams,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let index = self
            .get_or_load(shop_id)?
            .ok_or_else(|| SearchError::NotTrained(shop_id.to_string()))?;
        let embedder = self.embedder()?;
        Ok(ranking::search_index(&index, embedder.as_ref(), query, params))
    }

    /// All shops with a persisted model, regardless of cache state.
    pub fn shops(&self) -> Result<Vec<ArtifactSummary>, StoreError> {
        self.store.list()
    }
}
