use serde_json::json;
use valuation_core::{ModelKind, ModelRating, QualityBand, Score, ValuationError, ValuationInput, ValuationModel, ValuationResult};

use crate::shares::{net_income_grew, Multiples};

const CRITERIA_COUNT: usize = 7;
const CRITERIA_POINTS: f64 = 70.0;
const SAFETY_POINTS: f64 = 30.0;

/// `sqrt(22.5 * EPS * BPS)`, undefined unless both are positive.
pub fn graham_number(eps: Option<f64>, bps: Option<f64>) -> Option<f64> {
    match (eps, bps) {
        (Some(e), Some(b)) if e > 0.0 && b > 0.0 => Some((22.5 * e * b).sqrt()),
        _ => None,
    }
}

/// Discount of price to the Graham Number, in percent.
pub fn margin_of_safety(graham_number: f64, price: f64) -> f64 {
    (graham_number - price) / graham_number * 100.0
}

/// Points out of 30 from the margin of safety: 0% gives 15, +30% or more gives 30.
fn safety_points(margin: Option<f64>) -> f64 {
    match margin {
        Some(m) => ((m + 30.0) / 60.0 * SAFETY_POINTS).clamp(0.0, SAFETY_POINTS),
        None => 0.0,
    }
}

fn graham_band(criteria_passed: usize, margin: Option<f64>) -> QualityBand {
    let m = margin.unwrap_or(0.0);
    match criteria_passed {
        n if n >= 6 && m > 20.0 => QualityBand::Excellent,
        n if n >= 6 => QualityBand::Good,
        n if n >= 4 && m > 10.0 => QualityBand::Good,
        n if n >= 4 => QualityBand::Fair,
        n if n >= 2 => QualityBand::Fair,
        _ => QualityBand::Poor,
    }
}

/// Graham's defensive-investor screen.
#[derive(Debug, Clone, Default)]
pub struct GrahamModel;

impl GrahamModel {
    pub fn new() -> Self {
        Self
    }

    fn evaluate(&self, input: &ValuationInput<'_>) -> Result<ValuationResult, ValuationError> {
        let (snapshot, price) = input.require_basics()?;
        let multiples = Multiples::at_price(snapshot, price);

        let current_ratio = match (snapshot.current_assets, snapshot.current_liabilities) {
            (Some(ca), Some(cl)) if cl > 0.0 => Some(ca / cl * 100.0),
            _ => None,
        };

        let criteria = [
            ("per_below_15", multiples.per.is_some_and(|v| v < 15.0)),
            ("pbr_below_1_5", multiples.pbr.is_some_and(|v| v < 1.5)),
            ("debt_ratio_below_200", snapshot.debt_ratio.is_some_and(|v| v < 200.0)),
            ("current_ratio_above_200", current_ratio.is_some_and(|v| v > 200.0)),
            ("earnings_growth", net_income_grew(input.history)),
            ("dividend_history", input.dividend_years >= 3),
            ("roe_above_15", snapshot.roe.is_some_and(|v| v > 15.0)),
        ];
        let criteria_passed = criteria.iter().filter(|(_, passed)| *passed).count();

        let gn = graham_number(snapshot.eps, snapshot.bps);
        let margin = gn.map(|g| margin_of_safety(g, price));

        let score = (criteria_passed as f64 / CRITERIA_COUNT as f64) * CRITERIA_POINTS + safety_points(margin);
        let band = graham_band(criteria_passed, margin);

        let mut criteria_map = serde_json::Map::new();
        for (name, passed) in criteria {
            criteria_map.insert(name.to_string(), json!(passed));
        }

        let mut details = serde_json::Map::new();
        details.insert("graham_number".to_string(), json!(gn));
        details.insert("margin_of_safety".to_string(), json!(margin));
        details.insert("current_price".to_string(), json!(price));
        details.insert("criteria_passed".to_string(), json!(criteria_passed));
        details.insert("criteria_total".to_string(), json!(CRITERIA_COUNT));
        details.insert("criteria".to_string(), serde_json::Value::Object(criteria_map));
        details.insert("per".to_string(), json!(multiples.per));
        details.insert("pbr".to_string(), json!(multiples.pbr));
        details.insert("current_ratio".to_string(), json!(current_ratio));

        let interpretation = match margin {
            Some(m) if m >= 0.0 => format!(
                "Passes {}/{} defensive criteria; trades {:.1}% below its Graham Number of {:.0}.",
                criteria_passed,
                CRITERIA_COUNT,
                m,
                gn.unwrap_or_default()
            ),
            Some(m) => format!(
                "Passes {}/{} defensive criteria; trades {:.1}% above its Graham Number of {:.0}.",
                criteria_passed,
                CRITERIA_COUNT,
                m.abs(),
                gn.unwrap_or_default()
            ),
            None => format!(
                "Passes {}/{} defensive criteria; Graham Number undefined (EPS or BPS not positive).",
                criteria_passed, CRITERIA_COUNT
            ),
        };

        Ok(ValuationResult {
            model: ModelKind::Graham,
            score: Score::Present(score),
            rating: ModelRating::Quality(band),
            details,
            interpretation,
        })
    }
}

impl ValuationModel for GrahamModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Graham
    }

    fn calculate(&self, input: &ValuationInput<'_>) -> ValuationResult {
        self.evaluate(input).unwrap_or_else(|e| {
            tracing::debug!("Graham unavailable for {}: {}", input.ticker, e);
            ValuationResult::unavailable(ModelKind::Graham, e.to_string())
        })
    }
}
