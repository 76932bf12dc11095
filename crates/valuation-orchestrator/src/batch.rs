use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use valuation_core::{CompositeResult, ModelKind, ValuationError};

use crate::pipeline::{AnalysisOptions, HybridReport, ValuationPipeline};

/// Field a batch is ranked by. Absent model scores rank as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    CompositeScore,
    AdjustedScore,
    Dcf,
    Relative,
    Graham,
    Magic,
}

impl SortField {
    fn model(&self) -> Option<ModelKind> {
        match self {
            SortField::Dcf => Some(ModelKind::Dcf),
            SortField::Relative => Some(ModelKind::Relative),
            SortField::Graham => Some(ModelKind::Graham),
            SortField::Magic => Some(ModelKind::Magic),
            SortField::CompositeScore | SortField::AdjustedScore => None,
        }
    }
}

impl FromStr for SortField {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "composite_score" | "composite" => Ok(SortField::CompositeScore),
            "adjusted_score" | "adjusted" => Ok(SortField::AdjustedScore),
            "dcf" => Ok(SortField::Dcf),
            "relative" => Ok(SortField::Relative),
            "graham" => Ok(SortField::Graham),
            "magic" => Ok(SortField::Magic),
            other => Err(ValuationError::InvalidRequest(format!("unknown sort field '{}'", other))),
        }
    }
}

/// Anything a batch can be ranked on.
pub trait Rankable {
    fn sort_value(&self, field: SortField) -> f64;
}

impl Rankable for CompositeResult {
    fn sort_value(&self, field: SortField) -> f64 {
        match field.model() {
            Some(kind) => self.model_score(kind).unwrap_or(0.0),
            None => self.base_score,
        }
    }
}

impl Rankable for HybridReport {
    fn sort_value(&self, field: SortField) -> f64 {
        match field {
            SortField::AdjustedScore => self.hybrid.adjusted_score,
            SortField::CompositeScore => self.traditional.base_score,
            other => self.traditional.sort_value(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub ticker: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchEntry<T> {
    Success(T),
    Failure(BatchFailure),
}

/// Ranked successes followed by failures in request order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport<T> {
    pub results: Vec<BatchEntry<T>>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub sort_by: SortField,
    pub analysed_at: DateTime<Utc>,
}

impl<T> BatchReport<T> {
    pub fn successes(&self) -> impl Iterator<Item = &T> {
        self.results.iter().filter_map(|e| match e {
            BatchEntry::Success(v) => Some(v),
            BatchEntry::Failure(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &BatchFailure> {
        self.results.iter().filter_map(|e| match e {
            BatchEntry::Failure(f) => Some(f),
            BatchEntry::Success(_) => None,
        })
    }

    /// Maps every success, keeping order and failures.
    pub fn map<U>(self, f: impl Fn(&T) -> U) -> BatchReport<U> {
        BatchReport {
            results: self
                .results
                .into_iter()
                .map(|e| match e {
                    BatchEntry::Success(v) => BatchEntry::Success(f(&v)),
                    BatchEntry::Failure(fail) => BatchEntry::Failure(fail),
                })
                .collect(),
            total: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
            sort_by: self.sort_by,
            analysed_at: self.analysed_at,
        }
    }
}

/// Upper-cases, trims and de-duplicates tickers, then enforces `1..=max`.
pub fn validate_tickers(tickers: &[String], max: usize) -> Result<Vec<String>, ValuationError> {
    let mut seen = HashSet::new();
    let cleaned: Vec<String> = tickers
        .iter()
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect();

    if cleaned.is_empty() {
        return Err(ValuationError::InvalidRequest("at least one ticker is required".to_string()));
    }
    if cleaned.len() > max {
        return Err(ValuationError::InvalidRequest(format!(
            "at most {} tickers per request, got {}",
            max,
            cleaned.len()
        )));
    }
    Ok(cleaned)
}

/// Runs the pipeline over many tickers with bounded concurrency.
pub struct BatchComparator {
    pipeline: Arc<ValuationPipeline>,
}

impl BatchComparator {
    pub fn new(pipeline: Arc<ValuationPipeline>) -> Self {
        Self { pipeline }
    }

    async fn run<T, F, Fut>(&self, tickers: Vec<String>, sort_by: SortField, task: F) -> BatchReport<T>
    where
        T: Rankable + Send + 'static,
        F: Fn(Arc<ValuationPipeline>, String) -> Fut,
        Fut: Future<Output = Result<T, ValuationError>> + Send + 'static,
    {
        let total = tickers.len();
        let permits = Arc::new(Semaphore::new(self.pipeline.config().batch_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (idx, ticker) in tickers.iter().enumerate() {
            let permits = Arc::clone(&permits);
            let fut = task(Arc::clone(&self.pipeline), ticker.clone());
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (idx, fut.await)
            });
        }

        let mut outcomes: Vec<Option<Result<T, ValuationError>>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, outcome)) => outcomes[idx] = Some(outcome),
                Err(e) => tracing::error!("Task error: {}", e),
            }
        }

        let mut successes = Vec::new();
        let mut failures = Vec::new();
        for (ticker, outcome) in tickers.into_iter().zip(outcomes) {
            match outcome {
                Some(Ok(value)) => successes.push(value),
                Some(Err(e)) => {
                    tracing::warn!("Failed to analyze {}: {}", ticker, e);
                    failures.push(BatchFailure { ticker, error: e.to_string() });
                }
                None => failures.push(BatchFailure { ticker, error: "analysis task aborted".to_string() }),
            }
        }

        successes.sort_by(|a, b| {
            b.sort_value(sort_by)
                .partial_cmp(&a.sort_value(sort_by))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let succeeded = successes.len();
        let failed = failures.len();
        tracing::info!("Batch complete: {}/{} succeeded, sorted by {:?}", succeeded, total, sort_by);

        let mut results: Vec<BatchEntry<T>> = successes.into_iter().map(BatchEntry::Success).collect();
        results.extend(failures.into_iter().map(BatchEntry::Failure));

        BatchReport {
            results,
            total,
            succeeded,
            failed,
            sort_by,
            analysed_at: Utc::now(),
        }
    }

    /// Composite valuation for each ticker, ranked by `sort_by` (default composite score).
    pub async fn compare(
        &self,
        tickers: &[String],
        sort_by: Option<SortField>,
        options: AnalysisOptions,
    ) -> Result<BatchReport<CompositeResult>, ValuationError> {
        let tickers = validate_tickers(tickers, self.pipeline.config().valuation_batch_max)?;
        options.validate()?;
        let sort_by = sort_by.unwrap_or(SortField::CompositeScore);
        tracing::info!("Comparing {} tickers", tickers.len());

        Ok(self
            .run(tickers, sort_by, move |pipeline, ticker| async move { pipeline.comprehensive(&ticker, &options).await })
            .await)
    }

    /// Hybrid analysis for each ticker, ranked by `sort_by` (default adjusted score).
    pub async fn compare_hybrid(
        &self,
        tickers: &[String],
        sort_by: Option<SortField>,
        options: AnalysisOptions,
    ) -> Result<BatchReport<HybridReport>, ValuationError> {
        let tickers = validate_tickers(tickers, self.pipeline.config().hybrid_batch_max)?;
        options.validate()?;
        let sort_by = sort_by.unwrap_or(SortField::AdjustedScore);
        tracing::info!("Running hybrid batch over {} tickers", tickers.len());

        Ok(self
            .run(tickers, sort_by, move |pipeline, ticker| async move { pipeline.hybrid(&ticker, &options).await })
            .await)
    }
}
