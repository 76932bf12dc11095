//! Helpers shared by the models: share-count estimate, price multiples, earnings growth.

use serde::Serialize;
use valuation_core::stats::cagr;
use valuation_core::{price_multiple, FinancialHistory, FinancialSnapshot};

/// Window used for earnings-growth checks (latest vs. three years earlier).
pub const GROWTH_YEARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareBasis {
    EquityOverBps,
    NetIncomeOverEps,
}

/// Shares outstanding, from `equity / BPS` or else `net_income / EPS`.
pub fn estimate_shares(snapshot: &FinancialSnapshot) -> Option<(f64, ShareBasis)> {
    if let (Some(equity), Some(bps)) = (snapshot.total_equity, snapshot.bps) {
        if equity > 0.0 && bps > 0.0 {
            return Some((equity / bps, ShareBasis::EquityOverBps));
        }
    }
    if let (Some(net_income), Some(eps)) = (snapshot.net_income, snapshot.eps) {
        if net_income > 0.0 && eps > 0.0 {
            return Some((net_income / eps, ShareBasis::NetIncomeOverEps));
        }
    }
    None
}

/// Price multiples for a snapshot at a given price.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Multiples {
    pub per: Option<f64>,
    pub pbr: Option<f64>,
    pub psr: Option<f64>,
}

impl Multiples {
    pub fn at_price(snapshot: &FinancialSnapshot, price: f64) -> Self {
        Self {
            per: price_multiple(price, snapshot.eps),
            pbr: price_multiple(price, snapshot.bps),
            psr: price_multiple(price, snapshot.sps),
        }
    }
}

/// Net-income CAGR (%) over the growth window. Needs at least two snapshots and positive endpoints.
pub fn net_income_cagr(history: &FinancialHistory) -> Option<f64> {
    let (latest, oldest, years) = history.net_income_span(GROWTH_YEARS)?;
    cagr(latest, oldest, years)
}

/// Latest net income above the oldest in the growth window, with a positive oldest figure.
pub fn net_income_grew(history: &FinancialHistory) -> bool {
    match history.net_income_span(GROWTH_YEARS) {
        Some((latest, oldest, _)) => oldest > 0.0 && latest > oldest,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn annual(period: &str, net_income: f64) -> FinancialSnapshot {
        FinancialSnapshot {
            fiscal_period: period.to_string(),
            net_income: Some(net_income),
            ..Default::default()
        }
    }

    #[test]
    fn test_share_estimate_prefers_book_value() {
        let snap = FinancialSnapshot {
            total_equity: Some(1e11),
            bps: Some(10_000.0),
            net_income: Some(5e9),
            eps: Some(250.0),
            ..Default::default()
        };
        let (shares, basis) = estimate_shares(&snap).unwrap();
        assert_relative_eq!(shares, 1e7);
        assert_eq!(basis, ShareBasis::EquityOverBps);
    }

    #[test]
    fn test_share_estimate_falls_back_to_eps() {
        let snap = FinancialSnapshot {
            total_equity: Some(1e11),
            bps: Some(-1.0),
            net_income: Some(5e9),
            eps: Some(250.0),
            ..Default::default()
        };
        let (shares, basis) = estimate_shares(&snap).unwrap();
        assert_relative_eq!(shares, 2e7);
        assert_eq!(basis, ShareBasis::NetIncomeOverEps);

        assert!(estimate_shares(&FinancialSnapshot::default()).is_none());
    }

    #[test]
    fn test_growth_window() {
        let history = FinancialHistory::new(vec![
            annual("2024-12", 133.1),
            annual("2023-12", 121.0),
            annual("2022-12", 110.0),
            annual("2021-12", 100.0),
            annual("2020-12", 500.0),
        ]);
        assert_relative_eq!(net_income_cagr(&history).unwrap(), 10.0, epsilon = 1e-9);
        assert!(net_income_grew(&history));

        let shrinking = FinancialHistory::new(vec![annual("2024-12", 90.0), annual("2023-12", 100.0)]);
        assert!(!net_income_grew(&shrinking));
        assert!(net_income_cagr(&shrinking).unwrap() < 0.0);
    }
}
