use std::fmt::Debug;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::signal;

use crate::{
    config::Config,
    errors::{validate_shop_id, SearchError},
    ranking::{BoostConfig, SearchHit, SearchParams},
    registry::SearchRegistry,
    store::ArtifactSummary,
    trainer::{self, TrainingStatus},
};

#[derive(Clone)]
struct SharedState {
    registry: Arc<SearchRegistry>,
}

/// The full route table; also used directly by the router tests.
pub fn router(registry: Arc<SearchRegistry>) -> Router {
    let shared_state = Arc::new(SharedState { registry });

    Router::new()
        .route("/health", get(health))
        .route("/train", post(train))
        .route("/search", get(search))
        .route("/status", get(status))
        .route("/training-status", get(training_status))
        .route("/shops", get(shops))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn start_app(registry: Arc<SearchRegistry>, host: &str, port: u16) {
    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    let app = router(registry);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    log::info!("listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

pub fn start_daemon(registry: Arc<SearchRegistry>, host: &str, port: u16) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { start_app(registry, host, port).await });
}

// Make our own error that wraps `SearchError`.
#[derive(Debug)]
struct HttpError(SearchError);

// Tell axum how to convert `SearchError` into a response.
impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        match self.0 {
            SearchError::MissingParam(_) | SearchError::InvalidShopId | SearchError::Parse(_) => (
                axum::http::StatusCode::BAD_REQUEST,
                json!({"error": self.0.to_string()}).to_string(),
            ),
            SearchError::NotTrained(_) => (
                axum::http::StatusCode::NOT_FOUND,
                json!({"error": self.0.to_string()}).to_string(),
            ),
            SearchError::Embedding(_) => {
                log::error!("{self:?}");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": self.0.to_string()}).to_string(),
                )
            }
            SearchError::Storage(_) => {
                log::error!("{self:?}");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": self.0.to_string()}).to_string(),
                )
            }
        }
        .into_response()
    }
}

// This enables using `?` on functions that return `Result<_, SearchError>` to turn them into
// `Result<_, HttpError>`. That way you don't need to do that manually.
impl<E> From<E> for HttpError
where
    E: Into<SearchError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(json!({
        "status": "healthy",
        "service": "shop-search-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Clone, Deserialize)]
pub struct TrainRequest {
    #[serde(default)]
    pub shop_id: String,

    /// Raw product feed XML.
    #[serde(default)]
    pub xml: String,
}

impl Debug for TrainRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TrainRequest {{ shop_id: {:?}, xml: [{} bytes] }}",
            self.shop_id,
            self.xml.len()
        )
    }
}

async fn train(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<TrainRequest>,
) -> Result<impl IntoResponse, HttpError> {
    log::debug!("payload: {payload:?}");

    if payload.shop_id.is_empty() {
        return Err(SearchError::MissingParam("shop_id").into());
    }
    validate_shop_id(&payload.shop_id)?;
    if payload.xml.trim().is_empty() {
        return Err(SearchError::MissingParam("xml").into());
    }

    trainer::spawn_training(
        state.registry.clone(),
        payload.shop_id.clone(),
        payload.xml,
    );

    Ok((
        axum::http::StatusCode::ACCEPTED,
        axum::Json(json!({"accepted": true, "shop_id": payload.shop_id})),
    ))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    pub shop_id: Option<String>,
    pub q: Option<String>,

    /// Maximum results to return; falls back to the configured default.
    pub limit: Option<usize>,

    /// Drop results scoring below this after boosts.
    pub threshold: Option<f32>,

    pub boost_season: Option<f32>,
    pub boost_category: Option<f32>,
    pub boost_manufacturer: Option<f32>,
    pub boost_color: Option<f32>,
    pub boost_gender: Option<f32>,
    pub boost_fit: Option<f32>,
    pub boost_kind_of: Option<f32>,
}

impl SearchRequest {
    fn to_params(&self, config: &Config) -> SearchParams {
        let mut boosts = BoostConfig::default();
        for (attribute, weight) in [
            ("season", self.boost_season),
            ("category", self.boost_category),
            ("manufacturer", self.boost_manufacturer),
            ("color", self.boost_color),
            ("gender", self.boost_gender),
            ("fit", self.boost_fit),
            ("kind_of", self.boost_kind_of),
        ] {
            if let Some(weight) = weight {
                boosts.set(attribute, weight.max(0.0));
            }
        }

        SearchParams {
            limit: self.limit.unwrap_or(config.search.default_limit),
            min_threshold: self.threshold.unwrap_or(0.0).max(0.0),
            boosts,
            semantic_weight: config.search.semantic_weight,
            lexical_weight: config.search.lexical_weight,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub shop_id: String,
    pub query: String,
    pub results: Vec<SearchHit>,
    pub count: usize,
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Query(payload): Query<SearchRequest>,
) -> Result<axum::Json<SearchResponse>, HttpError> {
    log::debug!("payload: {payload:?}");

    let shop_id = payload
        .shop_id
        .clone()
        .ok_or(SearchError::MissingParam("shop_id"))?;
    validate_shop_id(&shop_id)?;
    let query = payload
        .q
        .clone()
        .filter(|q| !q.trim().is_empty())
        .ok_or(SearchError::MissingParam("q"))?;

    let params = payload.to_params(state.registry.config());
    let registry = state.registry.clone();

    let results = tokio::task::block_in_place({
        let shop_id = shop_id.clone();
        let query = query.clone();
        move || registry.search(&shop_id, &query, &params)
    })?;

    let count = results.len();
    Ok(axum::Json(SearchResponse {
        success: true,
        shop_id,
        query,
        results,
        count,
    }))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShopRequest {
    pub shop_id: Option<String>,
}

impl ShopRequest {
    fn shop_id(&self) -> Result<String, SearchError> {
        let shop_id = self
            .shop_id
            .clone()
            .ok_or(SearchError::MissingParam("shop_id"))?;
        validate_shop_id(&shop_id)?;
        Ok(shop_id)
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub shop_id: String,
    pub trained: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<f64>,
}

async fn status(
    State(state): State<Arc<SharedState>>,
    Query(payload): Query<ShopRequest>,
) -> Result<axum::Json<StatusResponse>, HttpError> {
    log::debug!("payload: {payload:?}");

    let shop_id = payload.shop_id()?;
    let registry = state.registry.clone();

    let index = tokio::task::block_in_place({
        let shop_id = shop_id.clone();
        move || registry.get_or_load(&shop_id)
    })?;

    let response = match index {
        Some(index) => StatusResponse {
            shop_id,
            trained: true,
            products_count: Some(index.len()),
            trained_at: Some(index.trained_at),
        },
        None => StatusResponse {
            shop_id,
            trained: false,
            products_count: None,
            trained_at: None,
        },
    };
    Ok(axum::Json(response))
}

#[derive(Debug, Serialize)]
pub struct TrainingStatusResponse {
    pub shop_id: String,
    #[serde(flatten)]
    pub status: TrainingStatus,
}

async fn training_status(
    State(state): State<Arc<SharedState>>,
    Query(payload): Query<ShopRequest>,
) -> Result<axum::Json<TrainingStatusResponse>, HttpError> {
    log::debug!("payload: {payload:?}");

    let shop_id = payload.shop_id()?;
    let status = state.registry.training_status(&shop_id);

    Ok(axum::Json(TrainingStatusResponse { shop_id, status }))
}

#[derive(Debug, Serialize)]
pub struct ShopsResponse {
    pub shops: Vec<ArtifactSummary>,
    pub count: usize,
}

async fn shops(
    State(state): State<Arc<SharedState>>,
) -> Result<axum::Json<ShopsResponse>, HttpError> {
    let registry = state.registry.clone();
    let shops = tokio::task::block_in_place(move || registry.shops())?;

    let count = shops.len();
    Ok(axum::Json(ShopsResponse { shops, count }))
}
