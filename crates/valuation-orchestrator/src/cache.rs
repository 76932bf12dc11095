use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use valuation_core::{PeerAggregate, StockSnapshot, ValuationError};

use crate::provider::{normalize_ticker, SnapshotProvider};

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

impl<T: Clone> CacheEntry<T> {
    fn fresh(&self, ttl_secs: i64) -> Option<T> {
        let age = (Utc::now() - self.cached_at).num_seconds();
        if age < ttl_secs {
            Some(self.data.clone())
        } else {
            None
        }
    }
}

pub const DEFAULT_CACHE_TTL_SECS: i64 = 300;

/// TTL cache in front of any [`SnapshotProvider`]. Errors are never cached.
pub struct CachedSnapshotProvider {
    inner: Arc<dyn SnapshotProvider>,
    ttl_secs: i64,
    /// Snapshots per upper-cased ticker
    snapshots: DashMap<String, CacheEntry<StockSnapshot>>,
    /// Peer aggregates per sector
    peers: DashMap<String, CacheEntry<Option<PeerAggregate>>>,
}

impl CachedSnapshotProvider {
    pub fn new(inner: Arc<dyn SnapshotProvider>, ttl_secs: i64) -> Self {
        Self {
            inner,
            ttl_secs,
            snapshots: DashMap::new(),
            peers: DashMap::new(),
        }
    }

    pub fn clear(&self) {
        self.snapshots.clear();
        self.peers.clear();
    }
}

#[async_trait]
impl SnapshotProvider for CachedSnapshotProvider {
    async fn load(&self, ticker: &str) -> Result<StockSnapshot, ValuationError> {
        let cache_key = normalize_ticker(ticker)?;
        if let Some(hit) = self.snapshots.get(&cache_key).and_then(|e| e.fresh(self.ttl_secs)) {
            tracing::debug!("Snapshot cache hit for {}", cache_key);
            return Ok(hit);
        }

        let snapshot = self.inner.load(&cache_key).await?;
        self.snapshots.insert(cache_key, CacheEntry {
            data: snapshot.clone(),
            cached_at: Utc::now(),
        });
        Ok(snapshot)
    }

    async fn peer_aggregate(&self, sector: &str) -> Result<Option<PeerAggregate>, ValuationError> {
        if let Some(hit) = self.peers.get(sector).and_then(|e| e.fresh(self.ttl_secs)) {
            tracing::debug!("Peer cache hit for sector {}", sector);
            return Ok(hit);
        }

        let aggregate = self.inner.peer_aggregate(sector).await?;
        self.peers.insert(sector.to_string(), CacheEntry {
            data: aggregate.clone(),
            cached_at: Utc::now(),
        });
        Ok(aggregate)
    }

    async fn universe(&self) -> Result<Vec<String>, ValuationError> {
        self.inner.universe().await
    }

    async fn sector_members(&self, sector: &str) -> Result<Vec<StockSnapshot>, ValuationError> {
        self.inner.sector_members(sector).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use valuation_core::{FinancialHistory, StockProfile};

    #[derive(Default)]
    struct CountingProvider {
        loads: AtomicUsize,
        peer_calls: AtomicUsize,
    }

    #[async_trait]
    impl SnapshotProvider for CountingProvider {
        async fn load(&self, ticker: &str) -> Result<StockSnapshot, ValuationError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if ticker == "MISSING" {
                return Err(ValuationError::UnknownTicker(ticker.to_string()));
            }
            Ok(StockSnapshot {
                profile: StockProfile {
                    ticker: ticker.to_string(),
                    name: ticker.to_string(),
                    sector: None,
                    market: None,
                    active: true,
                },
                history: FinancialHistory::default(),
                price: None,
                dividend_years: 0,
            })
        }

        async fn peer_aggregate(&self, _sector: &str) -> Result<Option<PeerAggregate>, ValuationError> {
            self.peer_calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        async fn universe(&self) -> Result<Vec<String>, ValuationError> {
            Ok(vec![])
        }

        async fn sector_members(&self, _sector: &str) -> Result<Vec<StockSnapshot>, ValuationError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_second_load_is_cached() {
        let inner = Arc::new(CountingProvider::default());
        let cached = CachedSnapshotProvider::new(inner.clone(), DEFAULT_CACHE_TTL_SECS);

        cached.load("abc").await.unwrap();
        cached.load("ABC").await.unwrap();
        assert_eq!(inner.loads.load(Ordering::SeqCst), 1);

        cached.peer_aggregate("Tech").await.unwrap();
        cached.peer_aggregate("Tech").await.unwrap();
        assert_eq!(inner.peer_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_and_expired_entries_are_refetched() {
        let inner = Arc::new(CountingProvider::default());
        let cached = CachedSnapshotProvider::new(inner.clone(), 0);

        cached.load("ABC").await.unwrap();
        cached.load("ABC").await.unwrap();
        assert_eq!(inner.loads.load(Ordering::SeqCst), 2);

        assert!(cached.load("missing").await.is_err());
        assert!(cached.load("missing").await.is_err());
        assert_eq!(inner.loads.load(Ordering::SeqCst), 4);
    }
}
