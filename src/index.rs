//! Per-shop searchable index.
//!
//! A [`TenantIndex`] is what a successful training run produces and what the
//! persisted artifact deserializes into: the ordered product list, one
//! embedding row per product, and the training timestamp. Row i of the
//! embedding matrix always corresponds to `products[i].search_text`.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::feed::ProductRecord;

/// Errors that can occur constructing an index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("product count {products} does not match embedding row count {rows}")]
    RowMismatch { products: usize, rows: usize },
}

/// A shop's loaded, ready-to-query index.
///
/// Serialized as-is into the per-shop artifact; the field names are the
/// durable contract other tooling reads, so they stay exactly as below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantIndex {
    pub shop_id: String,
    pub products: Vec<ProductRecord>,
    pub embeddings: Vec<Vec<f32>>,
    pub trained_at: f64,
}

impl TenantIndex {
    /// Build an index, enforcing the row-count invariant.
    pub fn new(
        shop_id: String,
        products: Vec<ProductRecord>,
        embeddings: Vec<Vec<f32>>,
        trained_at: f64,
    ) -> Result<Self, IndexError> {
        if products.len() != embeddings.len() {
            return Err(IndexError::RowMismatch {
                products: products.len(),
                rows: embeddings.len(),
            });
        }

        Ok(Self {
            shop_id,
            products,
            embeddings,
            trained_at,
        })
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Embedding dimensions, or 0 for an empty index.
    pub fn dimensions(&self) -> usize {
        self.embeddings.first().map(Vec::len).unwrap_or(0)
    }

    /// Inner product of the query embedding with every product embedding,
    /// in product order. The embedder emits normalized vectors, so this is
    /// cosine similarity.
    pub fn semantic_scores(&self, query_embedding: &[f32]) -> Vec<f32> {
        self.embeddings
            .iter()
            .map(|row| {
                row.iter()
                    .zip(query_embedding)
                    .map(|(a, b)| a * b)
                    .sum::<f32>()
            })
            .collect()
    }
}

/// Wall-clock seconds since the epoch, as stored in `trained_at`.
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs_f64()
}
