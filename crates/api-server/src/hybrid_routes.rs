use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use valuation_orchestrator::{AnalysisOptions, BatchReport, HybridComparison, HybridReport, HybridSummary, SignalReport, SortField};

use crate::{health, valuation_err, ApiResponse, AppError, AppState};

pub fn hybrid_routes() -> Router<AppState> {
    Router::new()
        .route("/api/hybrid/health", get(health))
        .route("/api/hybrid/batch", post(hybrid_batch))
        .route("/api/hybrid/:ticker", get(hybrid_valuation))
        .route("/api/hybrid/:ticker/comparison", get(hybrid_comparison))
        .route("/api/hybrid/:ticker/traditional-only", get(traditional_only))
        .route("/api/hybrid/:ticker/ai-only", get(signals_only))
}

#[derive(Debug, Deserialize)]
pub struct HybridQuery {
    #[serde(default = "default_true")]
    pub include_ai: bool,
    #[serde(default = "default_true")]
    pub include_sentiment: bool,
    #[serde(default = "default_true")]
    pub explain: bool,
}

#[derive(Debug, Deserialize)]
pub struct HybridBatchRequest {
    pub tickers: Vec<String>,
    /// "summary" (default) or "full"
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub sort_by: Option<String>,
}

fn default_true() -> bool {
    true
}
fn default_mode() -> String {
    "summary".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchMode {
    Summary,
    Full,
}

impl BatchMode {
    fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(BatchMode::Summary),
            "full" => Ok(BatchMode::Full),
            other => Err(AppError::bad_request(format!(
                "mode must be 'summary' or 'full', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum HybridBatchResponse {
    Summary(BatchReport<HybridSummary>),
    Full(BatchReport<HybridReport>),
}

/// GET /api/hybrid/:ticker
async fn hybrid_valuation(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<HybridQuery>,
) -> Result<Json<ApiResponse<HybridReport>>, AppError> {
    let options = AnalysisOptions {
        include_ai_adjustment: params.include_ai,
        include_sentiment: params.include_sentiment,
        explain_differences: params.explain,
        include_details: true,
        dcf: state.dcf,
        weights: None,
    };

    let report = state
        .pipeline
        .hybrid(&ticker, &options)
        .await
        .map_err(|e| valuation_err("Hybrid valuation failed", e))?;

    Ok(Json(ApiResponse::success(report)))
}

/// GET /api/hybrid/:ticker/comparison
async fn hybrid_comparison(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<HybridQuery>,
) -> Result<Json<ApiResponse<HybridComparison>>, AppError> {
    let options = AnalysisOptions {
        include_sentiment: params.include_sentiment,
        explain_differences: params.explain,
        dcf: state.dcf,
        ..AnalysisOptions::default()
    };

    let comparison = state
        .pipeline
        .comparison(&ticker, &options)
        .await
        .map_err(|e| valuation_err("Hybrid comparison failed", e))?;

    Ok(Json(ApiResponse::success(comparison)))
}

/// GET /api/hybrid/:ticker/ai-only
async fn signals_only(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<HybridQuery>,
) -> Result<Json<ApiResponse<SignalReport>>, AppError> {
    let options = AnalysisOptions {
        include_sentiment: params.include_sentiment,
        dcf: state.dcf,
        ..AnalysisOptions::default()
    };

    let report = state
        .pipeline
        .signals_only(&ticker, &options)
        .await
        .map_err(|e| valuation_err("Signal lookup failed", e))?;

    Ok(Json(ApiResponse::success(report)))
}

/// GET /api/hybrid/:ticker/traditional-only
async fn traditional_only(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<ApiResponse<HybridReport>>, AppError> {
    let options = AnalysisOptions {
        include_details: true,
        dcf: state.dcf,
        ..AnalysisOptions::traditional()
    };

    let report = state
        .pipeline
        .hybrid(&ticker, &options)
        .await
        .map_err(|e| valuation_err("Traditional valuation failed", e))?;

    Ok(Json(ApiResponse::success(report)))
}

/// POST /api/hybrid/batch
async fn hybrid_batch(
    State(state): State<AppState>,
    Json(request): Json<HybridBatchRequest>,
) -> Result<Json<ApiResponse<HybridBatchResponse>>, AppError> {
    let mode = BatchMode::parse(&request.mode)?;
    let sort_by = request
        .sort_by
        .as_deref()
        .map(str::parse::<SortField>)
        .transpose()
        .map_err(|e| valuation_err("Bad sort field", e))?;

    let options = AnalysisOptions {
        include_details: mode == BatchMode::Full,
        explain_differences: mode == BatchMode::Full,
        dcf: state.dcf,
        ..AnalysisOptions::default()
    };

    let report = state
        .batch
        .compare_hybrid(&request.tickers, sort_by, options)
        .await
        .map_err(|e| valuation_err("Hybrid batch failed", e))?;

    let response = match mode {
        BatchMode::Full => HybridBatchResponse::Full(report),
        BatchMode::Summary => HybridBatchResponse::Summary(report.map(|r| HybridSummary::from(r))),
    };

    Ok(Json(ApiResponse::success(response)))
}
