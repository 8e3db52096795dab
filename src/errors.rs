//! Application-level error taxonomy.
//!
//! Every core operation returns a `Result` with one of these variants; the
//! web layer maps them to status codes and the training task captures them
//! into the shop's status record. A missing artifact is not an error here;
//! it surfaces as `NotTrained`, a definite reportable outcome.

use crate::embedding::EmbeddingError;
use crate::feed::FeedError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("{0} is required")]
    MissingParam(&'static str),

    #[error("invalid shop_id: only letters and digits are allowed")]
    InvalidShopId,

    #[error("feed parsing failed: {0}")]
    Parse(#[from] FeedError),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("storage failed: {0}")]
    Storage(#[from] StoreError),

    #[error("model not trained for shop {0}")]
    NotTrained(String),
}

/// Reject shop ids that could escape the artifact directory.
///
/// Matches the ingestion side's contract: ids are opaque alphanumeric
/// strings (Unicode letters allowed, so Greek shop names work).
pub fn validate_shop_id(shop_id: &str) -> Result<(), SearchError> {
    if shop_id.is_empty() || !shop_id.chars().all(char::is_alphanumeric) {
        return Err(SearchError::InvalidShopId);
    }
    Ok(())
}
