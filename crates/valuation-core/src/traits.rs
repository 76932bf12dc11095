use async_trait::async_trait;

use crate::{AdjustmentSignals, CompositeResult, FinancialHistory, FinancialSnapshot, ModelKind, StockProfile, ValuationError, ValuationInput, ValuationResult};

/// A valuation model. Missing inputs produce an unavailable result, never an error.
pub trait ValuationModel: Send + Sync {
    fn kind(&self) -> ModelKind;

    fn calculate(&self, input: &ValuationInput<'_>) -> ValuationResult;
}

/// What an adjustment source gets to look at for one ticker.
#[derive(Debug, Clone, Copy)]
pub struct AdjustmentRequest<'a> {
    pub ticker: &'a str,
    pub profile: &'a StockProfile,
    pub snapshot: Option<&'a FinancialSnapshot>,
    pub history: &'a FinancialHistory,
    pub composite: &'a CompositeResult,
    pub include_sentiment: bool,
}

/// External provider of qualitative signals (financial quality, sentiment, anomalies).
#[async_trait]
pub trait AdjustmentSource: Send + Sync {
    async fn fetch(&self, request: &AdjustmentRequest<'_>) -> Result<AdjustmentSignals, ValuationError>;

    fn name(&self) -> &str;
}
