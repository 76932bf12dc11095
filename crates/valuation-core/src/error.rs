use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValuationError {
    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Adjustment source unavailable: {0}")]
    AdjustmentUnavailable(String),

    #[error("Data source error: {0}")]
    DataSource(String),
}

impl ValuationError {
    /// True for errors that reject the request itself rather than a single model or signal.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ValuationError::UnknownTicker(_) | ValuationError::InvalidRequest(_) | ValuationError::InvalidWeights(_)
        )
    }
}
