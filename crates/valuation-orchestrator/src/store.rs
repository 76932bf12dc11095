use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use valuation_core::{FinancialHistory, FinancialSnapshot, PeerAggregate, PriceSnapshot, StockProfile, StockSnapshot, ValuationError};

use crate::provider::{normalize_ticker, SnapshotProvider};

#[derive(Debug, Deserialize)]
struct StoreDocument {
    stocks: Vec<StoredStock>,
}

#[derive(Debug, Deserialize)]
struct StoredStock {
    #[serde(flatten)]
    profile: StockProfile,
    #[serde(default)]
    financials: Vec<FinancialSnapshot>,
    #[serde(default)]
    price: Option<PriceSnapshot>,
    #[serde(default)]
    dividend_years: u32,
}

/// In-memory snapshot store loaded from a JSON document.
///
/// ```json
/// { "stocks": [ { "ticker": "005930", "name": "...", "sector": "...", "financials": [...], "price": {...}, "dividend_years": 5 } ] }
/// ```
#[derive(Debug, Default)]
pub struct JsonSnapshotStore {
    stocks: HashMap<String, StockSnapshot>,
    order: Vec<String>,
}

impl JsonSnapshotStore {
    pub fn from_stocks(stocks: Vec<StockSnapshot>) -> Self {
        let mut store = Self::default();
        for mut stock in stocks {
            let key = stock.profile.ticker.trim().to_uppercase();
            stock.profile.ticker = key.clone();
            if store.stocks.insert(key.clone(), stock).is_none() {
                store.order.push(key);
            }
        }
        store
    }

    pub fn from_json_str(json: &str) -> Result<Self, ValuationError> {
        let doc: StoreDocument =
            serde_json::from_str(json).map_err(|e| ValuationError::DataSource(format!("invalid snapshot document: {}", e)))?;

        let stocks = doc
            .stocks
            .into_iter()
            .map(|s| StockSnapshot {
                profile: s.profile,
                history: FinancialHistory::new(s.financials),
                price: s.price,
                dividend_years: s.dividend_years,
            })
            .collect();
        Ok(Self::from_stocks(stocks))
    }

    pub async fn load_file(path: impl AsRef<Path>) -> Result<Self, ValuationError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ValuationError::DataSource(format!("cannot read {}: {}", path.display(), e)))?;
        let store = Self::from_json_str(&json)?;
        tracing::info!("Loaded {} stocks from {}", store.len(), path.display());
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }

    fn active_in_sector<'a>(&'a self, sector: &'a str) -> impl Iterator<Item = &'a StockSnapshot> + 'a {
        self.order
            .iter()
            .filter_map(move |t| self.stocks.get(t))
            .filter(move |s| s.profile.active && s.profile.sector.as_deref() == Some(sector))
    }
}

#[async_trait]
impl SnapshotProvider for JsonSnapshotStore {
    async fn load(&self, ticker: &str) -> Result<StockSnapshot, ValuationError> {
        let key = normalize_ticker(ticker)?;
        self.stocks.get(&key).cloned().ok_or(ValuationError::UnknownTicker(key))
    }

    async fn peer_aggregate(&self, sector: &str) -> Result<Option<PeerAggregate>, ValuationError> {
        let peers = self
            .active_in_sector(sector)
            .filter_map(|s| match (s.latest(), s.price.as_ref()) {
                (Some(fs), Some(px)) => Some((fs, px)),
                _ => None,
            });
        Ok(PeerAggregate::from_peers(sector, peers))
    }

    async fn universe(&self) -> Result<Vec<String>, ValuationError> {
        Ok(self
            .order
            .iter()
            .filter(|t| self.stocks.get(*t).is_some_and(|s| s.profile.active))
            .cloned()
            .collect())
    }

    async fn sector_members(&self, sector: &str) -> Result<Vec<StockSnapshot>, ValuationError> {
        Ok(self.active_in_sector(sector).cloned().collect())
    }
}
