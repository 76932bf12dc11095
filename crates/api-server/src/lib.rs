pub mod config;
pub mod hybrid_routes;
pub mod valuation_routes;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use valuation_core::{ModelKind, ValuationError};
use valuation_models::DcfParams;
use valuation_orchestrator::{
    BatchComparator, CachedSnapshotProvider, JsonSnapshotStore, SnapshotProvider, ValuationPipeline, ValuationScreener,
};

use adjustment_client::{AdjustmentConfig, HttpAdjustmentSource};
pub use config::ServerConfig;

/// Shared handles for every route.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ValuationPipeline>,
    pub batch: Arc<BatchComparator>,
    pub screener: Arc<ValuationScreener>,
    /// DCF parameters used when a request does not override them
    pub dcf: DcfParams,
}

impl AppState {
    pub fn new(pipeline: ValuationPipeline, dcf: DcfParams) -> Self {
        let pipeline = Arc::new(pipeline);
        Self {
            batch: Arc::new(BatchComparator::new(Arc::clone(&pipeline))),
            screener: Arc::new(ValuationScreener::new(Arc::clone(&pipeline))),
            pipeline,
            dcf,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Error returned by handlers; rendered as a failed [`ApiResponse`].
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn bad_request(message: impl std::fmt::Display) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!("{}", message))
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.error);
        } else {
            tracing::debug!("Request rejected ({}): {}", self.status, self.error);
        }
        (self.status, Json(ApiResponse::<()>::error(self.error.to_string()))).into_response()
    }
}

/// Maps a pipeline error onto the HTTP status the caller should see.
pub fn valuation_err(context: &str, e: ValuationError) -> AppError {
    let status = match &e {
        ValuationError::UnknownTicker(_) => StatusCode::NOT_FOUND,
        ValuationError::InvalidRequest(_) | ValuationError::InvalidParameter(_) | ValuationError::InvalidWeights(_) => {
            StatusCode::BAD_REQUEST
        }
        ValuationError::DataSource(_) | ValuationError::AdjustmentUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ValuationError::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    AppError::with_status(status, anyhow::anyhow!("{}: {}", context, e))
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub models: Vec<&'static str>,
    pub adjustment_source: bool,
    pub weights: valuation_core::Weights,
}

pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::success(HealthStatus {
        status: "healthy",
        service: "valuation-api",
        models: ModelKind::ALL.iter().map(|k| k.as_str()).collect(),
        adjustment_source: state.pipeline.has_adjustment_source(),
        weights: *state.pipeline.weights(),
    }))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(valuation_routes::valuation_routes())
        .merge(hybrid_routes::hybrid_routes())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(120)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Builds the pipeline from configuration.
pub async fn build_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let store = JsonSnapshotStore::load_file(&config.snapshot_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load snapshots: {}", e))?;
    if store.is_empty() {
        tracing::warn!("Snapshot store at {} contains no stocks", config.snapshot_path);
    }

    let provider: Arc<dyn SnapshotProvider> =
        Arc::new(CachedSnapshotProvider::new(Arc::new(store), config.snapshot_cache_ttl_secs));

    let mut pipeline = ValuationPipeline::new(provider, config.weights, config.pipeline_config())
        .map_err(|e| anyhow::anyhow!("Failed to build valuation pipeline: {}", e))?;

    match &config.adjustment_service_url {
        Some(url) => {
            let source = HttpAdjustmentSource::new(AdjustmentConfig::new(
                url.clone(),
                Duration::from_secs(config.adjustment_timeout_secs),
            ))?;
            match source.health().await {
                Ok(true) => tracing::info!("Adjustment service reachable at {}", url),
                Ok(false) => tracing::warn!("Adjustment service at {} reported unhealthy", url),
                Err(e) => tracing::warn!("Adjustment service at {} not reachable yet: {}", url, e),
            }
            pipeline = pipeline.with_adjustment_source(Arc::new(source));
        }
        None => tracing::info!("ADJUSTMENT_SERVICE_URL not set, hybrid analysis runs without adjustments"),
    }

    Ok(AppState::new(pipeline, config.dcf))
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;
    let state = build_state(&config).await?;
    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Valuation API listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
