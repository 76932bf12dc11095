use async_trait::async_trait;
use valuation_core::{PeerAggregate, StockSnapshot, ValuationError};

/// Read-only access to per-ticker financial data.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Snapshot for a ticker, or [`ValuationError::UnknownTicker`].
    async fn load(&self, ticker: &str) -> Result<StockSnapshot, ValuationError>;

    /// Sector averages over active peers. `None` when the sector has no usable peers.
    async fn peer_aggregate(&self, sector: &str) -> Result<Option<PeerAggregate>, ValuationError>;

    /// Active tickers available for screening.
    async fn universe(&self) -> Result<Vec<String>, ValuationError>;

    /// Active stocks of a sector, used for the Magic Formula ranking.
    async fn sector_members(&self, sector: &str) -> Result<Vec<StockSnapshot>, ValuationError>;
}

/// Upper-cased, trimmed ticker. Empty input is rejected.
pub fn normalize_ticker(ticker: &str) -> Result<String, ValuationError> {
    let t = ticker.trim();
    if t.is_empty() {
        return Err(ValuationError::InvalidRequest("ticker must not be empty".to_string()));
    }
    Ok(t.to_uppercase())
}
