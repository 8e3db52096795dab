//! Background training of per-shop models.
//!
//! Training runs on a plain thread because embedding a whole feed is
//! CPU-bound work that can take minutes. Status transitions are published
//! through the registry so the web layer can answer polls; a failed or
//! panicked run never touches the shop's previously installed index.

use std::sync::Arc;
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};

use crate::errors::SearchError;
use crate::index::{now_secs, TenantIndex};
use crate::registry::SearchRegistry;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingState {
    /// No training was ever started for the shop in this process.
    #[default]
    Unknown,
    Training,
    Completed,
    Failed,
}

/// Lifecycle record for one shop's most recent training run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrainingStatus {
    pub state: TrainingState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrainingStatus {
    pub fn training(started_at: f64) -> Self {
        Self {
            state: TrainingState::Training,
            started_at: Some(started_at),
            ..Default::default()
        }
    }

    pub fn completed(started_at: f64, products_count: usize) -> Self {
        Self {
            state: TrainingState::Completed,
            started_at: Some(started_at),
            completed_at: Some(now_secs()),
            products_count: Some(products_count),
            ..Default::default()
        }
    }

    pub fn failed(started_at: f64, error: String) -> Self {
        Self {
            state: TrainingState::Failed,
            started_at: Some(started_at),
            completed_at: Some(now_secs()),
            error: Some(error),
            ..Default::default()
        }
    }
}

/// Train a shop's model from raw feed XML and publish the result.
///
/// Blocking. On success the new index is persisted to disk and swapped into
/// the registry cache; on any failure the previous model, both on disk and
/// in memory, stays in place.
pub fn run_training(
    registry: &SearchRegistry,
    shop_id: &str,
    feed_xml: &str,
) -> Result<Arc<TenantIndex>, SearchError> {
    let started = std::time::Instant::now();

    let products = crate::feed::parse_feed(feed_xml)?;
    log::info!("training shop {shop_id}: {} products parsed", products.len());

    let embedder = registry.embedder()?;
    let texts: Vec<String> = products
        .iter()
        .map(|product| product.search_text.clone())
        .collect();
    let embeddings = embedder.encode(&texts)?;

    let index = Arc::new(registry.store().persist(shop_id, products, embeddings)?);
    registry.install_index(Arc::clone(&index));

    log::info!(
        "training shop {shop_id} done: {} products, {} dimensions in {:?}",
        index.len(),
        index.dimensions(),
        started.elapsed()
    );
    Ok(index)
}

/// Kick off training in the background.
///
/// The shop's status flips to `training` before this returns, so a poll
/// right after the call already sees the run. The returned handle belongs
/// to the monitor thread and finishes once a terminal status is published;
/// callers that don't care can drop it.
pub fn spawn_training(
    registry: Arc<SearchRegistry>,
    shop_id: String,
    feed_xml: String,
) -> JoinHandle<()> {
    let started_at = now_secs();
    registry.set_status(&shop_id, TrainingStatus::training(started_at));

    let worker = std::thread::spawn({
        let registry = Arc::clone(&registry);
        let shop_id = shop_id.clone();
        move || match run_training(&registry, &shop_id, &feed_xml) {
            Ok(index) => {
                registry.set_status(&shop_id, TrainingStatus::completed(started_at, index.len()));
            }
            Err(err) => {
                log::error!("training failed for shop {shop_id}: {err}");
                registry.set_status(&shop_id, TrainingStatus::failed(started_at, err.to_string()));
            }
        }
    });

    // set a terminal status even if the worker dies mid-run
    std::thread::spawn(move || {
        if let Err(err) = worker.join() {
            log::error!("training thread for shop {shop_id} panicked: {err:?}");
            registry.set_status(
                &shop_id,
                TrainingStatus::failed(started_at, "training task panicked".to_string()),
            );
        }
    })
}
