use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use valuation_core::{
    AdjustmentRequest, AdjustmentSignals, AdjustmentSource, CompositeRating, CompositeResult, ConfidenceLevel, HybridResult, ModelKind,
    PeerAggregate, Score, StockProfile, StockSnapshot, ValuationError, ValuationInput, ValuationResult, Weights,
};
use valuation_models::{rank_in_universe, DcfParams, ModelSuite};

use crate::comparison::{HybridComparison, SignalReport};
use crate::composite::CompositeScorer;
use crate::hybrid::{adjustments_from_signals, HybridIntegrator};
use crate::provider::{normalize_ticker, SnapshotProvider};

/// Runtime limits for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub adjustment_timeout: Duration,
    pub batch_concurrency: usize,
    pub valuation_batch_max: usize,
    pub hybrid_batch_max: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            adjustment_timeout: Duration::from_secs(10),
            batch_concurrency: 4,
            valuation_batch_max: 20,
            hybrid_batch_max: 10,
        }
    }
}

/// Per-request switches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub include_ai_adjustment: bool,
    pub include_sentiment: bool,
    pub explain_differences: bool,
    pub include_details: bool,
    pub dcf: DcfParams,
    /// Per-request model weights; `None` uses the pipeline's configured weights.
    #[serde(default)]
    pub weights: Option<Weights>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            include_ai_adjustment: true,
            include_sentiment: true,
            explain_differences: true,
            include_details: true,
            dcf: DcfParams::default(),
            weights: None,
        }
    }
}

impl AnalysisOptions {
    /// Checks request-level parameters before any data is loaded.
    pub fn validate(&self) -> Result<(), ValuationError> {
        self.dcf.validate()?;
        if let Some(weights) = &self.weights {
            weights.validate()?;
        }
        Ok(())
    }

    /// Composite only: no adjustment source, no per-model details.
    pub fn traditional() -> Self {
        Self {
            include_ai_adjustment: false,
            include_sentiment: false,
            explain_differences: false,
            include_details: false,
            ..Self::default()
        }
    }
}

/// What happened with the adjustment source for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Disabled,
    Applied,
    Unavailable { reason: String },
    /// Not consulted because no model produced a score.
    Skipped { reason: String },
}

/// Full hybrid analysis for one ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridReport {
    pub profile: StockProfile,
    pub traditional: CompositeResult,
    pub signals: Option<AdjustmentSignals>,
    pub source_status: SourceStatus,
    pub hybrid: HybridResult,
    pub summary: String,
    pub analysed_at: DateTime<Utc>,
}

/// Compact view of a [`HybridReport`] for batch listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridSummary {
    pub ticker: String,
    pub name: String,
    pub base_score: f64,
    pub adjusted_score: f64,
    pub score_change: f64,
    pub final_rating: CompositeRating,
    pub confidence_level: ConfidenceLevel,
    pub adjustment_count: usize,
    pub source_status: SourceStatus,
}

impl From<&HybridReport> for HybridSummary {
    fn from(report: &HybridReport) -> Self {
        Self {
            ticker: report.profile.ticker.clone(),
            name: report.profile.name.clone(),
            base_score: report.hybrid.base_score,
            adjusted_score: report.hybrid.adjusted_score,
            score_change: report.hybrid.score_change,
            final_rating: report.hybrid.final_rating,
            confidence_level: report.hybrid.confidence_level,
            adjustment_count: report.hybrid.adjustment_count,
            source_status: report.source_status.clone(),
        }
    }
}

fn summarize(name: &str, hybrid: &HybridResult, status: &SourceStatus) -> String {
    let direction = if hybrid.score_change > 0.0 {
        format!("raised from {:.1} to {:.1}", hybrid.base_score, hybrid.adjusted_score)
    } else if hybrid.score_change < 0.0 {
        format!("lowered from {:.1} to {:.1}", hybrid.base_score, hybrid.adjusted_score)
    } else {
        format!("unchanged at {:.1}", hybrid.adjusted_score)
    };
    let source = match status {
        SourceStatus::Disabled => " Contextual adjustments were not requested.".to_string(),
        SourceStatus::Applied => String::new(),
        SourceStatus::Unavailable { reason } => format!(" Contextual signals unavailable ({}); traditional score used.", reason),
        SourceStatus::Skipped { reason } => format!(" Contextual adjustments skipped: {}.", reason),
    };
    format!(
        "{}: score {} ({}), {} confidence.{}",
        name,
        direction,
        hybrid.final_rating.to_label(),
        hybrid.confidence_level.to_label(),
        source
    )
}

/// Per-ticker valuation pipeline: snapshot, models, composite, optional adjustments.
pub struct ValuationPipeline {
    provider: Arc<dyn SnapshotProvider>,
    source: Option<Arc<dyn AdjustmentSource>>,
    scorer: CompositeScorer,
    integrator: HybridIntegrator,
    config: PipelineConfig,
}

impl ValuationPipeline {
    pub fn new(provider: Arc<dyn SnapshotProvider>, weights: Weights, config: PipelineConfig) -> Result<Self, ValuationError> {
        Ok(Self {
            provider,
            source: None,
            scorer: CompositeScorer::new(weights)?,
            integrator: HybridIntegrator::new(),
            config,
        })
    }

    pub fn with_adjustment_source(mut self, source: Arc<dyn AdjustmentSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn has_adjustment_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn weights(&self) -> &Weights {
        self.scorer.weights()
    }

    pub fn provider(&self) -> &Arc<dyn SnapshotProvider> {
        &self.provider
    }

    async fn load(&self, ticker: &str) -> Result<(StockSnapshot, Option<PeerAggregate>), ValuationError> {
        let ticker = normalize_ticker(ticker)?;
        let stock = self.provider.load(&ticker).await?;
        let peers = match stock.profile.sector.as_deref() {
            Some(sector) => self.provider.peer_aggregate(sector).await.unwrap_or_else(|e| {
                tracing::warn!("Peer aggregate for {} failed: {}", sector, e);
                None
            }),
            None => None,
        };
        Ok((stock, peers))
    }

    /// Adds the ticker's ROIC rank within its sector to a Magic Formula result.
    async fn rank_magic(&self, stock: &StockSnapshot, result: &mut ValuationResult) {
        let (Some(roic), Some(sector)) = (result.details.get("roic").and_then(|v| v.as_f64()), stock.profile.sector.as_deref()) else {
            return;
        };
        let members = match self.provider.sector_members(sector).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Sector members for {} failed: {}", sector, e);
                return;
            }
        };
        let peer_roics: Vec<f64> = members
            .iter()
            .filter(|m| m.profile.ticker != stock.profile.ticker)
            .filter_map(|m| {
                let fs = m.latest()?;
                let ebit = fs.operating_income?;
                let ic = fs.total_assets? - fs.total_liabilities?;
                if ebit > 0.0 && ic > 0.0 {
                    Some(ebit / ic * 100.0)
                } else {
                    None
                }
            })
            .collect();

        let rank = rank_in_universe(roic, &peer_roics);
        result.details.insert("roic_rank".to_string(), json!(rank.roic_rank));
        result.details.insert("total_stocks".to_string(), json!(rank.total_stocks));
        result.details.insert("percentile".to_string(), json!(rank.percentile));
    }

    async fn run_models(&self, stock: &StockSnapshot, peers: Option<&PeerAggregate>, dcf: DcfParams) -> Vec<ValuationResult> {
        let input = ValuationInput::from_stock(stock, peers);
        let mut results = ModelSuite::new(dcf).calculate_all(&input);
        for result in results.iter_mut() {
            if result.model == ModelKind::Magic && result.score.is_present() {
                self.rank_magic(stock, result).await;
            }
            if let Score::Absent { reason } = &result.score {
                tracing::warn!("{} unavailable for {}: {}", result.model.display_name(), stock.profile.ticker, reason);
            }
        }
        results
    }

    /// One model in isolation.
    pub async fn run_model(&self, ticker: &str, kind: ModelKind, dcf: Option<DcfParams>) -> Result<ValuationResult, ValuationError> {
        let dcf = dcf.unwrap_or_default();
        dcf.validate()?;
        let (stock, peers) = self.load(ticker).await?;
        let input = ValuationInput::from_stock(&stock, peers.as_ref());
        let mut result = ModelSuite::new(dcf).calculate(kind, &input);
        if kind == ModelKind::Magic && result.score.is_present() {
            self.rank_magic(&stock, &mut result).await;
        }
        Ok(result)
    }

    fn scorer_for(&self, options: &AnalysisOptions) -> Result<CompositeScorer, ValuationError> {
        match options.weights {
            Some(weights) => CompositeScorer::new(weights),
            None => Ok(self.scorer.clone()),
        }
    }

    async fn composite_for(
        &self,
        stock: &StockSnapshot,
        peers: Option<&PeerAggregate>,
        options: &AnalysisOptions,
    ) -> Result<CompositeResult, ValuationError> {
        let scorer = self.scorer_for(options)?;
        let results = self.run_models(stock, peers, options.dcf).await;
        let composite = scorer.analyze(&stock.profile, results, options.include_details);
        if composite.insufficient_data {
            tracing::warn!("No model produced a score for {}", stock.profile.ticker);
        }
        Ok(composite)
    }

    /// Composite valuation across the four models.
    pub async fn comprehensive(&self, ticker: &str, options: &AnalysisOptions) -> Result<CompositeResult, ValuationError> {
        options.validate()?;
        let (stock, peers) = self.load(ticker).await?;
        tracing::info!("Running comprehensive valuation for {}", stock.profile.ticker);
        self.composite_for(&stock, peers.as_ref(), options).await
    }

    async fn fetch_signals(
        &self,
        stock: &StockSnapshot,
        composite: &CompositeResult,
        options: &AnalysisOptions,
    ) -> (Option<AdjustmentSignals>, SourceStatus) {
        let source = match (&self.source, options.include_ai_adjustment) {
            (Some(source), true) => source,
            _ => return (None, SourceStatus::Disabled),
        };
        if composite.insufficient_data {
            return (
                None,
                SourceStatus::Skipped {
                    reason: "no valuation model produced a score".to_string(),
                },
            );
        }

        let request = AdjustmentRequest {
            ticker: &stock.profile.ticker,
            profile: &stock.profile,
            snapshot: stock.latest(),
            history: &stock.history,
            composite,
            include_sentiment: options.include_sentiment,
        };

        match tokio::time::timeout(self.config.adjustment_timeout, source.fetch(&request)).await {
            Ok(Ok(mut signals)) => {
                if !options.include_sentiment {
                    signals.sentiment = None;
                }
                (Some(signals), SourceStatus::Applied)
            }
            Ok(Err(e)) => {
                tracing::warn!("Adjustment source {} failed for {}: {}", source.name(), stock.profile.ticker, e);
                (None, SourceStatus::Unavailable { reason: e.to_string() })
            }
            Err(_) => {
                tracing::warn!(
                    "Adjustment source {} timed out for {} after {:?}",
                    source.name(),
                    stock.profile.ticker,
                    self.config.adjustment_timeout
                );
                (
                    None,
                    SourceStatus::Unavailable {
                        reason: format!("timed out after {}s", self.config.adjustment_timeout.as_secs_f64()),
                    },
                )
            }
        }
    }

    /// Composite plus contextual adjustments. A failing source degrades to the traditional score.
    pub async fn hybrid(&self, ticker: &str, options: &AnalysisOptions) -> Result<HybridReport, ValuationError> {
        options.validate()?;
        let (stock, peers) = self.load(ticker).await?;
        tracing::info!("Running hybrid valuation for {}", stock.profile.ticker);

        let traditional = self.composite_for(&stock, peers.as_ref(), options).await?;
        let (signals, source_status) = self.fetch_signals(&stock, &traditional, options).await;

        let hybrid = match &signals {
            Some(s) => {
                let adjustments = adjustments_from_signals(traditional.base_score, s);
                self.integrator.integrate(traditional.base_score, adjustments, options.explain_differences)
            }
            None => self.integrator.passthrough(traditional.base_score),
        };

        tracing::info!(
            "Hybrid valuation for {}: {:.2} -> {:.2} ({} adjustments)",
            stock.profile.ticker,
            hybrid.base_score,
            hybrid.adjusted_score,
            hybrid.adjustment_count
        );

        let summary = summarize(&stock.profile.name, &hybrid, &source_status);
        Ok(HybridReport {
            profile: stock.profile,
            traditional,
            signals,
            source_status,
            hybrid,
            summary,
            analysed_at: Utc::now(),
        })
    }

    /// Traditional composite next to the adjusted score, with an agreement band.
    pub async fn comparison(&self, ticker: &str, options: &AnalysisOptions) -> Result<HybridComparison, ValuationError> {
        let report = self.hybrid(ticker, options).await?;
        Ok(HybridComparison::from(&report))
    }

    /// Only the contextual signals for a ticker. The composite is still computed as request context.
    pub async fn signals_only(&self, ticker: &str, options: &AnalysisOptions) -> Result<SignalReport, ValuationError> {
        options.validate()?;
        let (stock, peers) = self.load(ticker).await?;
        tracing::info!("Fetching contextual signals for {}", stock.profile.ticker);

        let traditional = self.composite_for(&stock, peers.as_ref(), options).await?;
        let (signals, source_status) = self.fetch_signals(&stock, &traditional, options).await;

        Ok(SignalReport {
            ticker: stock.profile.ticker,
            name: stock.profile.name,
            signals,
            source_status,
            analysed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use valuation_core::{FinancialHistory, FinancialSnapshot, PriceSnapshot, QualityCheck};

    use crate::comparison::AgreementLevel;
    use crate::store::JsonSnapshotStore;

    pub(crate) fn stock(ticker: &str, sector: &str, operating_income: f64, eps: f64, close: f64) -> StockSnapshot {
        let latest = FinancialSnapshot {
            fiscal_period: "2024-12".to_string(),
            revenue: Some(operating_income * 8.0),
            operating_income: Some(operating_income),
            net_income: Some(operating_income * 0.75),
            total_assets: Some(operating_income * 10.0),
            total_liabilities: Some(operating_income * 4.0),
            total_equity: Some(operating_income * 6.0),
            current_assets: Some(operating_income * 3.0),
            current_liabilities: Some(operating_income),
            eps: Some(eps),
            bps: Some(eps * 8.0),
            sps: Some(eps * 10.0),
            roe: Some(16.0),
            debt_ratio: Some(66.0),
            ..Default::default()
        };
        let older = FinancialSnapshot {
            fiscal_period: "2021-12".to_string(),
            net_income: Some(operating_income * 0.5),
            ..Default::default()
        };
        StockSnapshot {
            profile: StockProfile {
                ticker: ticker.to_string(),
                name: format!("{} Corp", ticker),
                sector: Some(sector.to_string()),
                market: Some("KOSPI".to_string()),
                active: true,
            },
            history: FinancialHistory::new(vec![latest, older]),
            price: Some(PriceSnapshot { close, trade_date: NaiveDate::from_ymd_opt(2024, 12, 30).unwrap() }),
            dividend_years: 5,
        }
    }

    pub(crate) fn store() -> Arc<dyn SnapshotProvider> {
        let mut empty = stock("EMPTY", "Retail", 1.0, 1.0, 1.0);
        empty.history = FinancialHistory::default();
        empty.price = None;
        Arc::new(JsonSnapshotStore::from_stocks(vec![
            stock("AAA", "Tech", 1_000.0, 10.0, 60.0),
            stock("BBB", "Tech", 2_000.0, 20.0, 300.0),
            stock("CCC", "Tech", 500.0, 5.0, 40.0),
            empty,
        ]))
    }

    pub(crate) struct FixedSource {
        pub signals: AdjustmentSignals,
        pub delay: Duration,
        pub fail: bool,
    }

    #[async_trait]
    impl AdjustmentSource for FixedSource {
        async fn fetch(&self, _request: &AdjustmentRequest<'_>) -> Result<AdjustmentSignals, ValuationError> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(ValuationError::AdjustmentUnavailable("malformed response".to_string()));
            }
            Ok(self.signals.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    pub(crate) fn quality_signals(delta: f64) -> AdjustmentSignals {
        AdjustmentSignals {
            financial_quality: Some(QualityCheck {
                delta,
                reason: "cash conversion weakening".to_string(),
                confidence: None,
                quality_score: None,
                issues: vec![],
                warnings: vec![],
                strengths: vec![],
            }),
            ..Default::default()
        }
    }

    fn pipeline() -> ValuationPipeline {
        ValuationPipeline::new(store(), Weights::default(), PipelineConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_comprehensive_uses_all_models() {
        let composite = pipeline().comprehensive("aaa", &AnalysisOptions::default()).await.unwrap();
        assert_eq!(composite.ticker, "AAA");
        assert_eq!(composite.available_models(), 4);
        assert!((0.0..=100.0).contains(&composite.base_score));
        assert_eq!(composite.model_details.as_ref().map(|d| d.len()), Some(4));
    }

    #[tokio::test]
    async fn test_magic_result_carries_sector_rank() {
        let result = pipeline().run_model("AAA", ModelKind::Magic, None).await.unwrap();
        assert!(result.score.is_present());
        assert_eq!(result.details["total_stocks"], json!(3));
    }

    #[tokio::test]
    async fn test_unknown_ticker_is_rejected() {
        let err = pipeline().comprehensive("NOPE", &AnalysisOptions::default()).await.unwrap_err();
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn test_no_data_yields_insufficient_composite() {
        let composite = pipeline().comprehensive("EMPTY", &AnalysisOptions::traditional()).await.unwrap();
        assert!(composite.insufficient_data);
        assert_eq!(composite.base_score, 0.0);
    }

    #[tokio::test]
    async fn test_invalid_dcf_params_rejected() {
        let options = AnalysisOptions {
            dcf: DcfParams { wacc: 2.0, terminal_growth: 3.0, tax_rate: 22.0 },
            ..AnalysisOptions::default()
        };
        let err = pipeline().run_model("AAA", ModelKind::Dcf, Some(options.dcf)).await.unwrap_err();
        assert!(matches!(err, ValuationError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_hybrid_without_source_matches_composite() {
        let report = pipeline().hybrid("AAA", &AnalysisOptions::default()).await.unwrap();
        assert_eq!(report.source_status, SourceStatus::Disabled);
        assert!(report.hybrid.adjustments.is_empty());
        assert_relative_eq!(report.hybrid.adjusted_score, report.traditional.base_score);
        assert_eq!(report.hybrid.final_rating, report.traditional.rating);
        assert_eq!(report.hybrid.confidence_level, ConfidenceLevel::High);
    }

    #[tokio::test]
    async fn test_hybrid_applies_source_adjustments() {
        let source = FixedSource { signals: quality_signals(-3.0), delay: Duration::ZERO, fail: false };
        let report = pipeline()
            .with_adjustment_source(Arc::new(source))
            .hybrid("AAA", &AnalysisOptions::default())
            .await
            .unwrap();
        assert_eq!(report.source_status, SourceStatus::Applied);
        assert_eq!(report.hybrid.adjustment_count, 1);
        let expected = (report.traditional.base_score - 3.0).clamp(0.0, 100.0);
        assert_relative_eq!(report.hybrid.adjusted_score, expected, epsilon = 1e-6);
        assert!(report.hybrid.explanation.is_some());
    }

    #[tokio::test]
    async fn test_failing_source_falls_back_to_traditional() {
        let source = FixedSource { signals: quality_signals(-3.0), delay: Duration::ZERO, fail: true };
        let report = pipeline()
            .with_adjustment_source(Arc::new(source))
            .hybrid("AAA", &AnalysisOptions::default())
            .await
            .unwrap();
        assert!(matches!(report.source_status, SourceStatus::Unavailable { .. }));
        assert_eq!(report.hybrid.adjustment_count, 0);
        assert_relative_eq!(report.hybrid.adjusted_score, report.traditional.base_score);
    }

    #[tokio::test]
    async fn test_slow_source_times_out() {
        let config = PipelineConfig { adjustment_timeout: Duration::from_millis(20), ..PipelineConfig::default() };
        let source = FixedSource { signals: quality_signals(-3.0), delay: Duration::from_secs(5), fail: false };
        let pipeline = ValuationPipeline::new(store(), Weights::default(), config)
            .unwrap()
            .with_adjustment_source(Arc::new(source));

        let report = pipeline.hybrid("AAA", &AnalysisOptions::default()).await.unwrap();
        match report.source_status {
            SourceStatus::Unavailable { reason } => assert!(reason.contains("timed out")),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(report.hybrid.adjustments.is_empty());
    }

    #[tokio::test]
    async fn test_request_weights_override_configured_weights() {
        let options = AnalysisOptions {
            weights: Some(Weights { dcf: 2.0, relative: 0.0, graham: 0.0, magic: 0.0 }),
            ..AnalysisOptions::traditional()
        };
        let composite = pipeline().comprehensive("AAA", &options).await.unwrap();
        let dcf = composite.model_score(ModelKind::Dcf).unwrap();
        assert_relative_eq!(composite.weights.dcf, 1.0);
        assert_relative_eq!(composite.base_score, (dcf * 100.0).round() / 100.0, epsilon = 1e-9);

        let default = pipeline().comprehensive("AAA", &AnalysisOptions::traditional()).await.unwrap();
        assert_relative_eq!(default.weights.dcf, 0.30, epsilon = 1e-9);
    }

    #[tokio::test]
    async fn test_zero_request_weights_rejected() {
        let options = AnalysisOptions {
            weights: Some(Weights { dcf: 0.0, relative: 0.0, graham: 0.0, magic: 0.0 }),
            ..AnalysisOptions::traditional()
        };
        let err = pipeline().comprehensive("AAA", &options).await.unwrap_err();
        assert!(matches!(err, ValuationError::InvalidWeights(_)));
    }

    #[tokio::test]
    async fn test_no_data_skips_adjustments() {
        let source = FixedSource { signals: quality_signals(5.0), delay: Duration::ZERO, fail: false };
        let report = pipeline()
            .with_adjustment_source(Arc::new(source))
            .hybrid("EMPTY", &AnalysisOptions::default())
            .await
            .unwrap();
        assert!(report.traditional.insufficient_data);
        assert!(matches!(report.source_status, SourceStatus::Skipped { .. }));
        assert_eq!(report.hybrid.adjusted_score, 0.0);
        assert_eq!(report.hybrid.adjustment_count, 0);
    }

    #[tokio::test]
    async fn test_comparison_reports_agreement() {
        let source = FixedSource { signals: quality_signals(-5.0), delay: Duration::ZERO, fail: false };
        let comparison = pipeline()
            .with_adjustment_source(Arc::new(source))
            .comparison("AAA", &AnalysisOptions::default())
            .await
            .unwrap();
        assert_eq!(comparison.ticker, "AAA");
        assert_eq!(comparison.adjustments.len(), 1);
        assert_relative_eq!(
            comparison.score_difference,
            comparison.adjusted_score - comparison.traditional_score,
            epsilon = 0.05
        );
        assert!(comparison.agreement_level <= AgreementLevel::MostlyAgree);
    }

    #[tokio::test]
    async fn test_signals_only_returns_source_payload() {
        let source = FixedSource { signals: quality_signals(-2.0), delay: Duration::ZERO, fail: false };
        let report = pipeline()
            .with_adjustment_source(Arc::new(source))
            .signals_only("aaa", &AnalysisOptions::default())
            .await
            .unwrap();
        assert_eq!(report.ticker, "AAA");
        assert_eq!(report.source_status, SourceStatus::Applied);
        assert_eq!(report.signals.and_then(|s| s.financial_quality).map(|q| q.delta), Some(-2.0));

        let without = pipeline().signals_only("AAA", &AnalysisOptions::default()).await.unwrap();
        assert_eq!(without.source_status, SourceStatus::Disabled);
        assert!(without.signals.is_none());
    }

    #[tokio::test]
    async fn test_ai_adjustment_can_be_switched_off() {
        let source = FixedSource { signals: quality_signals(-3.0), delay: Duration::ZERO, fail: false };
        let options = AnalysisOptions { include_ai_adjustment: false, ..AnalysisOptions::default() };
        let report = pipeline().with_adjustment_source(Arc::new(source)).hybrid("AAA", &options).await.unwrap();
        assert_eq!(report.source_status, SourceStatus::Disabled);
        assert!(report.signals.is_none());
    }
}
