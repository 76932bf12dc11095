use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValuationError;
use crate::rating::ModelRating;
use crate::stats;

/// Annual financial statement, as reported. Every figure is optional: `None` means "not reported".
///
/// Money figures are in the reporting currency; ratios are plain percentages (15.0 means 15%).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub fiscal_period: String,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub operating_income: Option<f64>,
    #[serde(default)]
    pub net_income: Option<f64>,
    #[serde(default)]
    pub total_assets: Option<f64>,
    #[serde(default)]
    pub total_liabilities: Option<f64>,
    #[serde(default)]
    pub total_equity: Option<f64>,
    #[serde(default)]
    pub current_assets: Option<f64>,
    #[serde(default)]
    pub current_liabilities: Option<f64>,
    #[serde(default)]
    pub eps: Option<f64>,
    #[serde(default)]
    pub bps: Option<f64>,
    #[serde(default)]
    pub sps: Option<f64>,
    #[serde(default)]
    pub roe: Option<f64>,
    #[serde(default)]
    pub debt_ratio: Option<f64>,
    #[serde(default)]
    pub sales_growth: Option<f64>,
    #[serde(default)]
    pub operating_income_growth: Option<f64>,
}

impl FinancialSnapshot {
    /// Operating income as a percentage of revenue.
    pub fn operating_margin(&self) -> Option<f64> {
        match (self.operating_income, self.revenue) {
            (Some(oi), Some(rev)) if rev > 0.0 => Some(oi / rev * 100.0),
            _ => None,
        }
    }
}

/// Annual snapshots for one ticker, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinancialHistory(Vec<FinancialSnapshot>);

impl FinancialHistory {
    /// Builds a history, sorting by fiscal period so the newest snapshot comes first.
    pub fn new(mut snapshots: Vec<FinancialSnapshot>) -> Self {
        snapshots.sort_by(|a, b| b.fiscal_period.cmp(&a.fiscal_period));
        Self(snapshots)
    }

    pub fn latest(&self) -> Option<&FinancialSnapshot> {
        self.0.first()
    }

    /// The newest `count` snapshots.
    pub fn window(&self, count: usize) -> &[FinancialSnapshot] {
        &self.0[..count.min(self.0.len())]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FinancialSnapshot> {
        self.0.iter()
    }

    /// Net income of the newest and oldest snapshot in a `years + 1` window.
    /// Returns `None` when fewer than two snapshots exist or either figure is missing.
    pub fn net_income_span(&self, years: usize) -> Option<(f64, f64, usize)> {
        let window = self.window(years + 1);
        if window.len() < 2 {
            return None;
        }
        let latest = window.first()?.net_income?;
        let oldest = window.last()?.net_income?;
        Some((latest, oldest, window.len() - 1))
    }
}

/// Latest close price for a ticker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub close: f64,
    pub trade_date: NaiveDate,
}

/// Sector averages of the price multiples across active peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerAggregate {
    pub sector: String,
    pub avg_per: Option<f64>,
    pub avg_pbr: Option<f64>,
    pub avg_psr: Option<f64>,
    pub avg_roe: Option<f64>,
    pub peer_count: usize,
}

impl PeerAggregate {
    /// Averages PER/PBR/PSR over peers with a price and a positive denominator, and ROE over
    /// peers reporting it. Returns `None` when there are no peers at all.
    pub fn from_peers<'a, I>(sector: &str, peers: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a FinancialSnapshot, &'a PriceSnapshot)>,
    {
        let mut pers = Vec::new();
        let mut pbrs = Vec::new();
        let mut psrs = Vec::new();
        let mut roes = Vec::new();
        let mut count = 0usize;

        for (fs, price) in peers {
            count += 1;
            if let Some(per) = price_multiple(price.close, fs.eps) {
                pers.push(per);
            }
            if let Some(pbr) = price_multiple(price.close, fs.bps) {
                pbrs.push(pbr);
            }
            if let Some(psr) = price_multiple(price.close, fs.sps) {
                psrs.push(psr);
            }
            if let Some(roe) = fs.roe {
                roes.push(roe);
            }
        }

        if count == 0 {
            return None;
        }

        Some(Self {
            sector: sector.to_string(),
            avg_per: stats::mean_opt(&pers),
            avg_pbr: stats::mean_opt(&pbrs),
            avg_psr: stats::mean_opt(&psrs),
            avg_roe: stats::mean_opt(&roes),
            peer_count: count,
        })
    }
}

/// `price / per_share` when the per-share figure is positive.
pub fn price_multiple(price: f64, per_share: Option<f64>) -> Option<f64> {
    match per_share {
        Some(v) if v > 0.0 && price > 0.0 => Some(price / v),
        _ => None,
    }
}

/// Static listing information for a ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockProfile {
    pub ticker: String,
    pub name: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Everything the data layer returns for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub profile: StockProfile,
    pub history: FinancialHistory,
    pub price: Option<PriceSnapshot>,
    /// Number of years with a recorded dividend payment.
    #[serde(default)]
    pub dividend_years: u32,
}

impl StockSnapshot {
    pub fn latest(&self) -> Option<&FinancialSnapshot> {
        self.history.latest()
    }
}

/// Borrowed view handed to each valuation model.
#[derive(Debug, Clone, Copy)]
pub struct ValuationInput<'a> {
    pub ticker: &'a str,
    pub sector: Option<&'a str>,
    pub snapshot: Option<&'a FinancialSnapshot>,
    pub history: &'a FinancialHistory,
    pub price: Option<&'a PriceSnapshot>,
    pub peers: Option<&'a PeerAggregate>,
    pub dividend_years: u32,
}

impl<'a> ValuationInput<'a> {
    pub fn from_stock(stock: &'a StockSnapshot, peers: Option<&'a PeerAggregate>) -> Self {
        Self {
            ticker: &stock.profile.ticker,
            sector: stock.profile.sector.as_deref(),
            snapshot: stock.latest(),
            history: &stock.history,
            price: stock.price.as_ref(),
            peers,
            dividend_years: stock.dividend_years,
        }
    }

    /// Snapshot and positive close price, or the reason the model cannot run.
    pub fn require_basics(&self) -> Result<(&'a FinancialSnapshot, f64), ValuationError> {
        let snapshot = self
            .snapshot
            .ok_or_else(|| ValuationError::InsufficientData("no financial snapshot".to_string()))?;
        let price = match self.price {
            Some(p) if p.close > 0.0 => p.close,
            Some(_) => return Err(ValuationError::InsufficientData("non-positive price".to_string())),
            None => return Err(ValuationError::InsufficientData("no price".to_string())),
        };
        Ok((snapshot, price))
    }
}

/// The four valuation models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Dcf,
    Relative,
    Graham,
    Magic,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [ModelKind::Dcf, ModelKind::Relative, ModelKind::Graham, ModelKind::Magic];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Dcf => "dcf",
            ModelKind::Relative => "relative",
            ModelKind::Graham => "graham",
            ModelKind::Magic => "magic",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::Dcf => "DCF",
            ModelKind::Relative => "Relative Valuation",
            ModelKind::Graham => "Graham Number",
            ModelKind::Magic => "Magic Formula",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dcf" => Ok(ModelKind::Dcf),
            "relative" => Ok(ModelKind::Relative),
            "graham" => Ok(ModelKind::Graham),
            "magic" | "magic_formula" => Ok(ModelKind::Magic),
            other => Err(ValuationError::InvalidParameter(format!("unknown model '{}'", other))),
        }
    }
}

/// A model score, or the reason the model could not produce one.
///
/// `Absent` is never a zero: it carries no weight in the composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Score {
    Present(f64),
    Absent { reason: String },
}

impl Score {
    pub fn absent(reason: impl Into<String>) -> Self {
        Score::Absent { reason: reason.into() }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Score::Present(v) => Some(*v),
            Score::Absent { .. } => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Score::Present(_))
    }
}

/// Output of one valuation model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub model: ModelKind,
    pub score: Score,
    pub rating: ModelRating,
    pub details: serde_json::Map<String, serde_json::Value>,
    pub interpretation: String,
}

impl ValuationResult {
    pub fn unavailable(model: ModelKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            model,
            interpretation: format!("{} could not be computed: {}", model.display_name(), reason),
            score: Score::absent(reason),
            rating: ModelRating::NotAvailable,
            details: serde_json::Map::new(),
        }
    }
}
