use thiserror::Error;
use valuation_core::ValuationError;

#[derive(Error, Debug)]
pub enum AdjustmentError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AdjustmentResult<T> = Result<T, AdjustmentError>;

impl From<AdjustmentError> for ValuationError {
    fn from(err: AdjustmentError) -> Self {
        ValuationError::AdjustmentUnavailable(err.to_string())
    }
}
