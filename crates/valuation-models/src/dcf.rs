use serde::{Deserialize, Serialize};
use serde_json::json;
use valuation_core::stats::clamp_score;
use valuation_core::{ModelKind, ModelRating, Score, UpsideBand, ValuationError, ValuationInput, ValuationModel, ValuationResult};

use crate::shares::estimate_shares;

/// DCF assumptions, all in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DcfParams {
    pub wacc: f64,
    pub terminal_growth: f64,
    pub tax_rate: f64,
}

impl Default for DcfParams {
    fn default() -> Self {
        Self {
            wacc: 8.0,
            terminal_growth: 2.0,
            tax_rate: 22.0,
        }
    }
}

impl DcfParams {
    pub fn validate(&self) -> Result<(), ValuationError> {
        if !self.wacc.is_finite() || !self.terminal_growth.is_finite() || !self.tax_rate.is_finite() {
            return Err(ValuationError::InvalidParameter("DCF parameters must be finite".to_string()));
        }
        if self.wacc <= self.terminal_growth {
            return Err(ValuationError::InvalidParameter(format!(
                "WACC ({}%) must exceed terminal growth ({}%)",
                self.wacc, self.terminal_growth
            )));
        }
        if !(0.0..100.0).contains(&self.tax_rate) {
            return Err(ValuationError::InvalidParameter(format!("tax rate {}% out of range", self.tax_rate)));
        }
        Ok(())
    }

    /// Returns a copy with any provided override applied.
    pub fn with_overrides(self, wacc: Option<f64>, terminal_growth: Option<f64>) -> Self {
        Self {
            wacc: wacc.unwrap_or(self.wacc),
            terminal_growth: terminal_growth.unwrap_or(self.terminal_growth),
            ..self
        }
    }
}

/// Gordon-growth DCF on operating income after tax.
#[derive(Debug, Clone, Default)]
pub struct DcfModel {
    params: DcfParams,
}

impl DcfModel {
    pub fn new(params: DcfParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DcfParams {
        &self.params
    }

    fn evaluate(&self, input: &ValuationInput<'_>) -> Result<ValuationResult, ValuationError> {
        self.params.validate()?;
        let (snapshot, price) = input.require_basics()?;

        let operating_income = snapshot
            .operating_income
            .ok_or_else(|| ValuationError::InsufficientData("operating income not reported".to_string()))?;
        let fcf = operating_income * (1.0 - self.params.tax_rate / 100.0);
        if fcf <= 0.0 {
            return Err(ValuationError::InsufficientData(format!("free cash flow is not positive ({:.0})", fcf)));
        }

        let (shares, basis) = estimate_shares(snapshot)
            .ok_or_else(|| ValuationError::InsufficientData("cannot estimate shares outstanding".to_string()))?;

        let growth = self.params.terminal_growth / 100.0;
        let discount = (self.params.wacc - self.params.terminal_growth) / 100.0;
        let terminal_value = fcf * (1.0 + growth) / discount;
        let intrinsic_value = terminal_value / shares;
        let upside_pct = (intrinsic_value - price) / price * 100.0;

        let score = clamp_score(upside_pct + 50.0);
        let band = UpsideBand::from_upside(upside_pct);

        let mut details = serde_json::Map::new();
        details.insert("fcf".to_string(), json!(fcf));
        details.insert("fcf_per_share".to_string(), json!(fcf / shares));
        details.insert("operating_income".to_string(), json!(operating_income));
        details.insert("shares_outstanding".to_string(), json!(shares));
        details.insert("share_basis".to_string(), json!(basis));
        details.insert("terminal_value".to_string(), json!(terminal_value));
        details.insert("intrinsic_value".to_string(), json!(intrinsic_value));
        details.insert("current_price".to_string(), json!(price));
        details.insert("upside_pct".to_string(), json!(upside_pct));
        details.insert("wacc".to_string(), json!(self.params.wacc));
        details.insert("terminal_growth".to_string(), json!(self.params.terminal_growth));
        details.insert("tax_rate".to_string(), json!(self.params.tax_rate));

        let interpretation = if upside_pct >= 0.0 {
            format!(
                "Intrinsic value of {:.0} per share sits {:.1}% above the current price of {:.0} (WACC {}%, terminal growth {}%).",
                intrinsic_value, upside_pct, price, self.params.wacc, self.params.terminal_growth
            )
        } else {
            format!(
                "Intrinsic value of {:.0} per share sits {:.1}% below the current price of {:.0} (WACC {}%, terminal growth {}%).",
                intrinsic_value,
                upside_pct.abs(),
                price,
                self.params.wacc,
                self.params.terminal_growth
            )
        };

        Ok(ValuationResult {
            model: ModelKind::Dcf,
            score: Score::Present(score),
            rating: ModelRating::Upside(band),
            details,
            interpretation,
        })
    }
}

impl ValuationModel for DcfModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Dcf
    }

    fn calculate(&self, input: &ValuationInput<'_>) -> ValuationResult {
        self.evaluate(input).unwrap_or_else(|e| {
            tracing::debug!("DCF unavailable for {}: {}", input.ticker, e);
            ValuationResult::unavailable(ModelKind::Dcf, e.to_string())
        })
    }
}
