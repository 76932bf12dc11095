pub mod batch;
pub mod cache;
pub mod comparison;
pub mod composite;
pub mod hybrid;
pub mod pipeline;
pub mod provider;
pub mod screener;
pub mod store;

pub use batch::{validate_tickers, BatchComparator, BatchEntry, BatchFailure, BatchReport, Rankable, SortField};
pub use cache::{CachedSnapshotProvider, DEFAULT_CACHE_TTL_SECS};
pub use comparison::{AgreementLevel, HybridComparison, SignalReport};
pub use composite::{models_disagree, weighted_composite, CompositeScorer};
pub use hybrid::{adjustments_from_signals, confidence_level, HybridIntegrator, SignalAdjustments};
pub use pipeline::{AnalysisOptions, HybridReport, HybridSummary, PipelineConfig, SourceStatus, ValuationPipeline};
pub use provider::{normalize_ticker, SnapshotProvider};
pub use screener::{ScreenPick, ScreenerResult, ValuationScreener};
pub use store::JsonSnapshotStore;
