use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use valuation_core::{CompositeResult, ModelKind, ValuationResult, Weights};
use valuation_orchestrator::{AnalysisOptions, BatchReport, ScreenerResult, SortField};

use crate::{health, valuation_err, ApiResponse, AppError, AppState};

pub fn valuation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/valuation/health", get(health))
        .route("/api/valuation/compare", post(compare_valuations))
        .route("/api/valuation/screen/top", get(screen_top))
        .route("/api/valuation/:ticker", get(quick_valuation))
        .route("/api/valuation/:ticker/comprehensive", get(comprehensive_valuation))
        .route("/api/valuation/:ticker/model/:model", get(single_model))
}

#[derive(Debug, Deserialize)]
pub struct ComprehensiveQuery {
    #[serde(default = "default_true")]
    pub include_details: bool,
    pub dcf_wacc: Option<f64>,
    pub dcf_growth: Option<f64>,
    pub weight_dcf: Option<f64>,
    pub weight_relative: Option<f64>,
    pub weight_graham: Option<f64>,
    pub weight_magic: Option<f64>,
}

impl ComprehensiveQuery {
    /// Any weight given overrides the configured one; the rest keep their configured values.
    fn weights(&self, configured: &Weights) -> Option<Weights> {
        let overrides = [self.weight_dcf, self.weight_relative, self.weight_graham, self.weight_magic];
        if overrides.iter().all(Option::is_none) {
            return None;
        }
        Some(Weights {
            dcf: self.weight_dcf.unwrap_or(configured.dcf),
            relative: self.weight_relative.unwrap_or(configured.relative),
            graham: self.weight_graham.unwrap_or(configured.graham),
            magic: self.weight_magic.unwrap_or(configured.magic),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ModelQuery {
    pub wacc: Option<f64>,
    pub terminal_growth: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub tickers: Vec<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub weights: Option<Weights>,
}

#[derive(Debug, Deserialize)]
pub struct ScreenQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
}

fn default_true() -> bool {
    true
}
fn default_limit() -> usize {
    20
}
fn default_min_score() -> f64 {
    60.0
}

const MAX_SCREEN_LIMIT: usize = 100;

/// GET /api/valuation/:ticker
async fn quick_valuation(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<ApiResponse<CompositeResult>>, AppError> {
    let options = AnalysisOptions {
        dcf: state.dcf,
        ..AnalysisOptions::traditional()
    };

    let composite = state
        .pipeline
        .comprehensive(&ticker, &options)
        .await
        .map_err(|e| valuation_err("Valuation failed", e))?;

    Ok(Json(ApiResponse::success(composite)))
}

/// GET /api/valuation/:ticker/comprehensive
async fn comprehensive_valuation(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<ComprehensiveQuery>,
) -> Result<Json<ApiResponse<CompositeResult>>, AppError> {
    let options = AnalysisOptions {
        include_details: params.include_details,
        dcf: state.dcf.with_overrides(params.dcf_wacc, params.dcf_growth),
        weights: params.weights(state.pipeline.weights()),
        ..AnalysisOptions::traditional()
    };

    let composite = state
        .pipeline
        .comprehensive(&ticker, &options)
        .await
        .map_err(|e| valuation_err("Comprehensive valuation failed", e))?;

    Ok(Json(ApiResponse::success(composite)))
}

/// GET /api/valuation/:ticker/model/:model
async fn single_model(
    State(state): State<AppState>,
    Path((ticker, model)): Path<(String, String)>,
    Query(params): Query<ModelQuery>,
) -> Result<Json<ApiResponse<ValuationResult>>, AppError> {
    let kind: ModelKind = model.parse().map_err(|e| valuation_err("Bad model", e))?;
    let dcf = state.dcf.with_overrides(params.wacc, params.terminal_growth);

    let result = state
        .pipeline
        .run_model(&ticker, kind, Some(dcf))
        .await
        .map_err(|e| valuation_err("Model valuation failed", e))?;

    Ok(Json(ApiResponse::success(result)))
}

/// POST /api/valuation/compare
async fn compare_valuations(
    State(state): State<AppState>,
    Json(request): Json<CompareRequest>,
) -> Result<Json<ApiResponse<BatchReport<CompositeResult>>>, AppError> {
    let sort_by = request
        .sort_by
        .as_deref()
        .map(str::parse::<SortField>)
        .transpose()
        .map_err(|e| valuation_err("Bad sort field", e))?;

    let options = AnalysisOptions {
        dcf: state.dcf,
        weights: request.weights,
        ..AnalysisOptions::traditional()
    };

    let report = state
        .batch
        .compare(&request.tickers, sort_by, options)
        .await
        .map_err(|e| valuation_err("Comparison failed", e))?;

    Ok(Json(ApiResponse::success(report)))
}

/// GET /api/valuation/screen/top
async fn screen_top(
    State(state): State<AppState>,
    Query(params): Query<ScreenQuery>,
) -> Result<Json<ApiResponse<ScreenerResult>>, AppError> {
    if params.limit == 0 || params.limit > MAX_SCREEN_LIMIT {
        return Err(AppError::bad_request(format!(
            "limit must be between 1 and {}",
            MAX_SCREEN_LIMIT
        )));
    }
    if !params.min_score.is_finite() {
        return Err(AppError::bad_request("min_score must be a number"));
    }

    let result = state
        .screener
        .screen_top(params.limit, params.min_score)
        .await
        .map_err(|e| valuation_err("Screen failed", e))?;

    Ok(Json(ApiResponse::success(result)))
}
