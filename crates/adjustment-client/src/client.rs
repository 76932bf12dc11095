use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use valuation_core::{
    AdjustmentRequest, AdjustmentSignals, AdjustmentSource, CompositeRating, FinancialSnapshot, ModelKind, ValuationError,
};

use crate::error::{AdjustmentError, AdjustmentResult};
use crate::schema::parse_signals;

/// Connection settings for the adjustment service.
#[derive(Debug, Clone)]
pub struct AdjustmentConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl AdjustmentConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[derive(Debug, Serialize)]
struct CompositeSummary {
    base_score: f64,
    rating: CompositeRating,
    model_scores: BTreeMap<ModelKind, Option<f64>>,
}

#[derive(Debug, Serialize)]
struct SignalsRequest<'a> {
    ticker: &'a str,
    name: &'a str,
    sector: Option<&'a str>,
    financials: Option<&'a FinancialSnapshot>,
    history: Vec<&'a FinancialSnapshot>,
    composite: CompositeSummary,
    include_sentiment: bool,
}

impl<'a> SignalsRequest<'a> {
    fn from_request(req: &AdjustmentRequest<'a>) -> Self {
        let composite = CompositeSummary {
            base_score: req.composite.base_score,
            rating: req.composite.rating,
            model_scores: req.composite.model_scores.iter().map(|(k, s)| (*k, s.value())).collect(),
        };
        Self {
            ticker: req.ticker,
            name: &req.profile.name,
            sector: req.profile.sector.as_deref(),
            financials: req.snapshot,
            history: req.history.window(4).iter().collect(),
            composite,
            include_sentiment: req.include_sentiment,
        }
    }
}

/// Adjustment source backed by an HTTP service that answers `POST /adjustments`.
#[derive(Clone)]
pub struct HttpAdjustmentSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAdjustmentSource {
    pub fn new(config: AdjustmentConfig) -> AdjustmentResult<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch and validate the signals for one ticker.
    pub async fn request_signals(&self, request: &AdjustmentRequest<'_>) -> AdjustmentResult<AdjustmentSignals> {
        let body = SignalsRequest::from_request(request);

        let response = self
            .client
            .post(format!("{}/adjustments", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { AdjustmentError::Timeout } else { AdjustmentError::RequestFailed(e) })?;

        if !response.status().is_success() {
            return Err(AdjustmentError::ServiceUnavailable(format!("Status: {}", response.status())));
        }

        let text = response.text().await?;
        parse_signals(&text)
    }

    /// Check service health
    pub async fn health(&self) -> AdjustmentResult<bool> {
        let response = self.client.get(format!("{}/health", self.base_url)).send().await?;

        Ok(response.status().is_success())
    }
}

#[async_trait]
impl AdjustmentSource for HttpAdjustmentSource {
    async fn fetch(&self, request: &AdjustmentRequest<'_>) -> Result<AdjustmentSignals, ValuationError> {
        self.request_signals(request).await.map_err(|e| {
            tracing::warn!("Adjustment service failed for {}: {}", request.ticker, e);
            ValuationError::from(e)
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}
