use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use valuation_core::{CompositeRating, CompositeResult, ModelKind, RecommendationAction, Score, ValuationError};

use crate::pipeline::{AnalysisOptions, ValuationPipeline};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenPick {
    pub ticker: String,
    pub name: String,
    pub composite_score: f64,
    pub rating: CompositeRating,
    pub recommendation_action: RecommendationAction,
    pub model_scores: BTreeMap<ModelKind, Score>,
    pub strengths: Vec<String>,
}

impl From<CompositeResult> for ScreenPick {
    fn from(c: CompositeResult) -> Self {
        Self {
            ticker: c.ticker,
            name: c.name,
            composite_score: c.base_score,
            rating: c.rating,
            recommendation_action: c.recommendation_action,
            model_scores: c.model_scores,
            strengths: c.strengths,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerResult {
    pub picks: Vec<ScreenPick>,
    pub total_analyzed: usize,
    pub total_passed_filters: usize,
    pub min_score: f64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Scores the provider's active universe and keeps the best composites.
pub struct ValuationScreener {
    pipeline: Arc<ValuationPipeline>,
}

impl ValuationScreener {
    pub fn new(pipeline: Arc<ValuationPipeline>) -> Self {
        Self { pipeline }
    }

    pub async fn screen_top(&self, limit: usize, min_score: f64) -> Result<ScreenerResult, ValuationError> {
        let symbols = self.pipeline.provider().universe().await?;
        let total_analyzed = symbols.len();

        tracing::info!("Starting valuation screen of {} symbols (min score {})", total_analyzed, min_score);

        let permits = Arc::new(Semaphore::new(self.pipeline.config().batch_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for symbol in symbols {
            let pipeline = Arc::clone(&self.pipeline);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let result = pipeline.comprehensive(&symbol, &AnalysisOptions::traditional()).await;
                (symbol, result)
            });
        }

        let mut picks = Vec::new();

        while let Some(result) = tasks.join_next().await {
            match result {
                Ok((_symbol, Ok(composite))) => {
                    if !composite.insufficient_data && composite.base_score >= min_score {
                        picks.push(ScreenPick::from(composite));
                    }
                }
                Ok((symbol, Err(e))) => {
                    tracing::warn!("Failed to analyze {}: {}", symbol, e);
                }
                Err(e) => {
                    tracing::error!("Task error: {}", e);
                }
            }
        }

        let total_passed_filters = picks.len();

        // Highest first, ticker as tie-break so results are stable
        picks.sort_by(|a, b| {
            b.composite_score
                .partial_cmp(&a.composite_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.ticker.cmp(&b.ticker))
        });

        picks.truncate(limit);

        tracing::info!(
            "Screen complete: {}/{} stocks passed, returning top {}",
            total_passed_filters,
            total_analyzed,
            picks.len()
        );

        Ok(ScreenerResult {
            picks,
            total_analyzed,
            total_passed_filters,
            min_score,
            timestamp: chrono::Utc::now(),
        })
    }
}
