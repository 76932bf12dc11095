use serde_json::json;
use valuation_core::stats::{clamp_score, mean};
use valuation_core::{
    normalize_score, Direction, ModelKind, ModelRating, QualityBand, Score, Thresholds, ValuationError, ValuationInput, ValuationModel,
    ValuationResult,
};

use crate::shares::{net_income_cagr, Multiples};

const SECTOR_RATIO_THRESHOLDS: Thresholds = Thresholds::new(0.7, 0.9, 1.1);
const PEG_THRESHOLDS: Thresholds = Thresholds::new(0.7, 1.0, 1.5);
const PEG_WEIGHT: f64 = 1.2;

fn ratio_to(value: Option<f64>, average: Option<f64>) -> Option<f64> {
    match (value, average) {
        (Some(v), Some(avg)) if avg > 0.0 => Some(v / avg),
        _ => None,
    }
}

/// Peer-multiple valuation against sector averages.
#[derive(Debug, Clone, Default)]
pub struct RelativeModel;

impl RelativeModel {
    pub fn new() -> Self {
        Self
    }

    fn evaluate(&self, input: &ValuationInput<'_>) -> Result<ValuationResult, ValuationError> {
        let (snapshot, price) = input.require_basics()?;
        let peers = match input.peers {
            Some(p) if p.peer_count > 0 => p,
            _ => return Err(ValuationError::InsufficientData("no sector peers".to_string())),
        };

        let multiples = Multiples::at_price(snapshot, price);
        let per_to_sector = ratio_to(multiples.per, peers.avg_per);
        let pbr_to_sector = ratio_to(multiples.pbr, peers.avg_pbr);
        let psr_to_sector = ratio_to(multiples.psr, peers.avg_psr);

        let growth_rate = net_income_cagr(input.history);
        let peg_ratio = match (multiples.per, growth_rate) {
            (Some(per), Some(g)) if g > 0.0 => Some(per / g),
            _ => None,
        };

        let mut components = Vec::with_capacity(3);
        if per_to_sector.is_some() {
            components.push(normalize_score(per_to_sector, SECTOR_RATIO_THRESHOLDS, Direction::LowerIsBetter));
        }
        if pbr_to_sector.is_some() {
            components.push(normalize_score(pbr_to_sector, SECTOR_RATIO_THRESHOLDS, Direction::LowerIsBetter));
        }
        if peg_ratio.is_some() {
            components.push(normalize_score(peg_ratio, PEG_THRESHOLDS, Direction::LowerIsBetter) * PEG_WEIGHT);
        }

        let score = if components.is_empty() { 50.0 } else { clamp_score(mean(&components)) };
        let band = QualityBand::from_score(score);

        let mut details = serde_json::Map::new();
        details.insert("per".to_string(), json!(multiples.per));
        details.insert("pbr".to_string(), json!(multiples.pbr));
        details.insert("psr".to_string(), json!(multiples.psr));
        details.insert("roe".to_string(), json!(snapshot.roe));
        details.insert("sector".to_string(), json!(peers.sector));
        details.insert("sector_avg_per".to_string(), json!(peers.avg_per));
        details.insert("sector_avg_pbr".to_string(), json!(peers.avg_pbr));
        details.insert("sector_avg_psr".to_string(), json!(peers.avg_psr));
        details.insert("sector_avg_roe".to_string(), json!(peers.avg_roe));
        details.insert("per_to_sector".to_string(), json!(per_to_sector));
        details.insert("pbr_to_sector".to_string(), json!(pbr_to_sector));
        details.insert("psr_to_sector".to_string(), json!(psr_to_sector));
        details.insert("growth_rate".to_string(), json!(growth_rate));
        details.insert("peg_ratio".to_string(), json!(peg_ratio));
        details.insert("peer_count".to_string(), json!(peers.peer_count));

        let interpretation = match per_to_sector {
            Some(r) if r < 1.0 => format!(
                "Trades at {:.0}% of the {} sector PER across {} peers.",
                r * 100.0,
                peers.sector,
                peers.peer_count
            ),
            Some(r) => format!(
                "Trades at a {:.0}% premium to the {} sector PER across {} peers.",
                (r - 1.0) * 100.0,
                peers.sector,
                peers.peer_count
            ),
            None => format!("No comparable PER against the {} sector; scored on the remaining multiples.", peers.sector),
        };

        Ok(ValuationResult {
            model: ModelKind::Relative,
            score: Score::Present(score),
            rating: ModelRating::Quality(band),
            details,
            interpretation,
        })
    }
}

impl ValuationModel for RelativeModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Relative
    }

    fn calculate(&self, input: &ValuationInput<'_>) -> ValuationResult {
        self.evaluate(input).unwrap_or_else(|e| {
            tracing::debug!("Relative valuation unavailable for {}: {}", input.ticker, e);
            ValuationResult::unavailable(ModelKind::Relative, e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use valuation_core::{FinancialHistory, FinancialSnapshot, PeerAggregate, PriceSnapshot};

    fn peers(avg_per: f64, avg_pbr: f64) -> PeerAggregate {
        PeerAggregate {
            sector: "Semiconductors".to_string(),
            avg_per: Some(avg_per),
            avg_pbr: Some(avg_pbr),
            avg_psr: Some(2.0),
            avg_roe: Some(10.0),
            peer_count: 12,
        }
    }

    fn annual(period: &str, net_income: f64, eps: f64, bps: f64) -> FinancialSnapshot {
        FinancialSnapshot {
            fiscal_period: period.to_string(),
            net_income: Some(net_income),
            eps: Some(eps),
            bps: Some(bps),
            sps: Some(50.0),
            ..Default::default()
        }
    }

    fn run(history: &FinancialHistory, close: f64, peer: Option<&PeerAggregate>) -> ValuationResult {
        let px = PriceSnapshot { close, trade_date: NaiveDate::from_ymd_opt(2024, 12, 30).unwrap() };
        let input = ValuationInput {
            ticker: "REL",
            sector: Some("Semiconductors"),
            snapshot: history.latest(),
            history,
            price: Some(&px),
            peers: peer,
            dividend_years: 0,
        };
        RelativeModel::new().calculate(&input)
    }

    #[test]
    fn test_cheap_stock_with_growth() {
        // PER 6 vs 10 (0.6), PBR 0.5 vs 1 (0.5), CAGR 10% -> PEG 0.6
        let history = FinancialHistory::new(vec![
            annual("2024-12", 133.1, 10.0, 120.0),
            annual("2023-12", 121.0, 9.0, 110.0),
            annual("2022-12", 110.0, 8.0, 100.0),
            annual("2021-12", 100.0, 7.0, 90.0),
        ]);
        let peer = peers(10.0, 1.0);
        let result = run(&history, 60.0, Some(&peer));

        assert_relative_eq!(result.details["per_to_sector"].as_f64().unwrap(), 0.6, epsilon = 1e-9);
        assert_relative_eq!(result.details["peg_ratio"].as_f64().unwrap(), 0.6, epsilon = 1e-6);
        // (100 + 100 + 120) / 3, clamped
        assert_relative_eq!(result.score.value().unwrap(), 100.0);
        assert_eq!(result.rating, ModelRating::Quality(QualityBand::Excellent));
    }

    #[test]
    fn test_expensive_stock_without_growth() {
        // PER 20 vs 10 (2.0 -> 40), PBR 1.0 vs 1.0 (-> 60), shrinking earnings -> no PEG
        let history = FinancialHistory::new(vec![annual("2024-12", 90.0, 10.0, 200.0), annual("2023-12", 100.0, 11.0, 190.0)]);
        let peer = peers(10.0, 1.0);
        let result = run(&history, 200.0, Some(&peer));
        assert!(result.details["peg_ratio"].is_null());
        assert_relative_eq!(result.score.value().unwrap(), 50.0);
    }

    #[test]
    fn test_no_components_is_neutral() {
        let history = FinancialHistory::new(vec![annual("2024-12", -5.0, -1.0, -1.0)]);
        let peer = peers(10.0, 1.0);
        let result = run(&history, 100.0, Some(&peer));
        assert_eq!(result.score, Score::Present(50.0));
    }

    #[test]
    fn test_missing_peers_is_unavailable() {
        let history = FinancialHistory::new(vec![annual("2024-12", 100.0, 10.0, 100.0)]);
        assert!(!run(&history, 100.0, None).score.is_present());

        let empty = PeerAggregate { peer_count: 0, ..peers(10.0, 1.0) };
        assert!(!run(&history, 100.0, Some(&empty)).score.is_present());
    }
}
