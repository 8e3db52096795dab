//! Durable per-shop model artifacts.
//!
//! One JSON document per shop at `<models_dir>/shop_<id>.json`, holding the
//! product list, the embedding matrix, and the training timestamp. Writes go
//! to a temp file first and are renamed into place, so readers never see a
//! torn artifact. A missing artifact is a normal "not trained" outcome; a
//! present-but-unreadable one is a distinct storage error.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::feed::ProductRecord;
use crate::index::{now_secs, IndexError, TenantIndex};

/// Errors that can occur during artifact storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("artifact for shop {shop_id} is corrupt: {reason}")]
    Corrupt { shop_id: String, reason: String },
}

/// Summary of one persisted artifact, as reported by `/shops`.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    pub shop_id: String,
    pub products_count: usize,
    pub trained_at: f64,
}

/// Storage manager for per-shop artifacts.
pub struct ModelStore {
    models_dir: PathBuf,
}

impl ModelStore {
    /// Create a store rooted at `models_dir`, creating the directory if needed.
    pub fn new(models_dir: PathBuf) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&models_dir)?;
        Ok(Self { models_dir })
    }

    pub fn artifact_path(&self, shop_id: &str) -> PathBuf {
        self.models_dir.join(format!("shop_{}.json", shop_id))
    }

    pub fn exists(&self, shop_id: &str) -> bool {
        self.artifact_path(shop_id).exists()
    }

    /// Build and persist a shop's index, stamping `trained_at` now.
    ///
    /// Replaces any previous artifact for the shop atomically. Returns the
    /// persisted index so the caller can install it in the cache.
    pub fn persist(
        &self,
        shop_id: &str,
        products: Vec<ProductRecord>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<TenantIndex, StoreError> {
        let index = TenantIndex::new(shop_id.to_string(), products, embeddings, now_secs())?;

        let path = self.artifact_path(shop_id);
        let temp_path = path.with_extension("tmp");

        let result = write_json(&temp_path, &index);
        if let Err(err) = result {
            let _ = std::fs::remove_file(&temp_path);
            return Err(err);
        }

        std::fs::rename(&temp_path, &path)?;

        Ok(index)
    }

    /// Load a shop's artifact.
    ///
    /// Returns `Ok(None)` when no artifact exists. An artifact that cannot
    /// be read or violates the row-count invariant is a `Corrupt` error.
    pub fn load(&self, shop_id: &str) -> Result<Option<TenantIndex>, StoreError> {
        let path = self.artifact_path(shop_id);

        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let index: TenantIndex =
            serde_json::from_str(&data).map_err(|err| StoreError::Corrupt {
                shop_id: shop_id.to_string(),
                reason: err.to_string(),
            })?;

        if index.products.len() != index.embeddings.len() {
            return Err(StoreError::Corrupt {
                shop_id: shop_id.to_string(),
                reason: format!(
                    "product count {} does not match embedding row count {}",
                    index.products.len(),
                    index.embeddings.len()
                ),
            });
        }

        Ok(Some(index))
    }

    /// Summaries of every readable artifact, sorted by shop id.
    ///
    /// Unreadable artifacts are skipped with a warning rather than failing
    /// the whole listing.
    pub fn list(&self) -> Result<Vec<ArtifactSummary>, StoreError> {
        let mut shops = Vec::new();

        for entry in std::fs::read_dir(&self.models_dir)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();

            let Some(shop_id) = file_name
                .strip_prefix("shop_")
                .and_then(|rest| rest.strip_suffix(".json"))
            else {
                continue;
            };

            match self.load(shop_id) {
                Ok(Some(index)) => shops.push(ArtifactSummary {
                    shop_id: index.shop_id.clone(),
                    products_count: index.len(),
                    trained_at: index.trained_at,
                }),
                Ok(None) => {}
                Err(err) => {
                    log::warn!("skipping unreadable artifact {}: {}", file_name, err);
                }
            }
        }

        shops.sort_by(|a, b| a.shop_id.cmp(&b.shop_id));
        Ok(shops)
    }
}

fn write_json(path: &Path, index: &TenantIndex) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(index)?;
    std::fs::write(path, json)?;
    Ok(())
}
