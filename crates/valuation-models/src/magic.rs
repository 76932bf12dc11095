use serde::Serialize;
use serde_json::json;
use valuation_core::stats::clamp_score;
use valuation_core::{
    normalize_score, Direction, ModelKind, ModelRating, QualityBand, Score, Thresholds, ValuationError, ValuationInput, ValuationModel,
    ValuationResult,
};

use crate::shares::estimate_shares;

const ROIC_THRESHOLDS: Thresholds = Thresholds::new(20.0, 10.0, 5.0);
const EARNINGS_YIELD_THRESHOLDS: Thresholds = Thresholds::new(10.0, 5.0, 2.0);

/// Position of a ticker's ROIC within a peer universe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UniverseRank {
    pub roic_rank: usize,
    pub total_stocks: usize,
    pub percentile: f64,
}

/// Rank is 1 + the number of peers with a strictly higher ROIC. `peer_roics` excludes the ticker itself.
pub fn rank_in_universe(roic: f64, peer_roics: &[f64]) -> UniverseRank {
    let higher = peer_roics.iter().filter(|&&r| r > roic).count();
    let roic_rank = higher + 1;
    let total_stocks = peer_roics.len() + 1;
    let percentile = (1.0 - roic_rank as f64 / total_stocks as f64) * 100.0;
    UniverseRank { roic_rank, total_stocks, percentile }
}

/// Greenblatt's Magic Formula: return on invested capital and earnings yield.
#[derive(Debug, Clone, Default)]
pub struct MagicFormulaModel;

impl MagicFormulaModel {
    pub fn new() -> Self {
        Self
    }

    fn evaluate(&self, input: &ValuationInput<'_>) -> Result<ValuationResult, ValuationError> {
        let (snapshot, price) = input.require_basics()?;

        let ebit = snapshot
            .operating_income
            .ok_or_else(|| ValuationError::InsufficientData("operating income not reported".to_string()))?;
        if ebit <= 0.0 {
            return Err(ValuationError::InsufficientData("EBIT is not positive".to_string()));
        }

        let invested_capital = match (snapshot.total_assets, snapshot.total_liabilities) {
            (Some(assets), Some(liabilities)) => assets - liabilities,
            _ => return Err(ValuationError::InsufficientData("balance sheet totals not reported".to_string())),
        };
        if invested_capital <= 0.0 {
            return Err(ValuationError::InvalidParameter("invested capital is not positive".to_string()));
        }

        let (shares, _) = estimate_shares(snapshot)
            .ok_or_else(|| ValuationError::InsufficientData("cannot estimate shares outstanding".to_string()))?;
        let market_cap = price * shares;

        let roic = ebit / invested_capital * 100.0;
        let earnings_yield = ebit / market_cap * 100.0;

        let roic_score = normalize_score(Some(roic), ROIC_THRESHOLDS, Direction::HigherIsBetter);
        let ey_score = normalize_score(Some(earnings_yield), EARNINGS_YIELD_THRESHOLDS, Direction::HigherIsBetter);
        let score = clamp_score(roic_score * 0.5 + ey_score * 0.5);
        let band = QualityBand::from_score(score);

        let mut details = serde_json::Map::new();
        details.insert("roic".to_string(), json!(roic));
        details.insert("earnings_yield".to_string(), json!(earnings_yield));
        details.insert("ebit".to_string(), json!(ebit));
        details.insert("invested_capital".to_string(), json!(invested_capital));
        details.insert("market_cap".to_string(), json!(market_cap));
        details.insert("roic_score".to_string(), json!(roic_score));
        details.insert("earnings_yield_score".to_string(), json!(ey_score));

        let interpretation = format!(
            "ROIC of {:.1}% and earnings yield of {:.1}%: {} business at a {} price.",
            roic,
            earnings_yield,
            if roic_score >= 80.0 { "a high-return" } else { "an ordinary-return" },
            if ey_score >= 80.0 { "cheap" } else { "full" }
        );

        Ok(ValuationResult {
            model: ModelKind::Magic,
            score: Score::Present(score),
            rating: ModelRating::Quality(band),
            details,
            interpretation,
        })
    }
}

impl ValuationModel for MagicFormulaModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Magic
    }

    fn calculate(&self, input: &ValuationInput<'_>) -> ValuationResult {
        self.evaluate(input).unwrap_or_else(|e| {
            tracing::debug!("Magic Formula unavailable for {}: {}", input.ticker, e);
            ValuationResult::unavailable(ModelKind::Magic, e.to_string())
        })
    }
}
