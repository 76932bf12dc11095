use serde::{Deserialize, Serialize};

/// DCF band, keyed on upside percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsideBand {
    StrongSell,
    Overvalued,
    Fair,
    Undervalued,
    Buy,
    StrongBuy,
}

impl UpsideBand {
    pub fn from_upside(upside_pct: f64) -> Self {
        match upside_pct {
            u if u >= 50.0 => UpsideBand::StrongBuy,
            u if u >= 30.0 => UpsideBand::Buy,
            u if u >= 10.0 => UpsideBand::Undervalued,
            u if u >= -10.0 => UpsideBand::Fair,
            u if u >= -30.0 => UpsideBand::Overvalued,
            _ => UpsideBand::StrongSell,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            UpsideBand::StrongBuy => "Strong Buy",
            UpsideBand::Buy => "Buy",
            UpsideBand::Undervalued => "Undervalued",
            UpsideBand::Fair => "Fair Value",
            UpsideBand::Overvalued => "Overvalued",
            UpsideBand::StrongSell => "Strong Sell",
        }
    }
}

/// Generic per-model band on a 0-100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityBand {
    VeryPoor,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityBand {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 85.0 => QualityBand::Excellent,
            s if s >= 70.0 => QualityBand::Good,
            s if s >= 50.0 => QualityBand::Fair,
            s if s >= 30.0 => QualityBand::Poor,
            _ => QualityBand::VeryPoor,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            QualityBand::Excellent => "Excellent",
            QualityBand::Good => "Good",
            QualityBand::Fair => "Fair",
            QualityBand::Poor => "Poor",
            QualityBand::VeryPoor => "Very Poor",
        }
    }
}

/// Rating attached to a single model result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelRating {
    Upside(UpsideBand),
    Quality(QualityBand),
    NotAvailable,
}

impl ModelRating {
    pub fn to_label(&self) -> &'static str {
        match self {
            ModelRating::Upside(b) => b.to_label(),
            ModelRating::Quality(b) => b.to_label(),
            ModelRating::NotAvailable => "N/A",
        }
    }
}

/// Band for composite and hybrid scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeRating {
    Sell,
    Reduce,
    Hold,
    Accumulate,
    Buy,
    StrongBuy,
}

impl CompositeRating {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 85.0 => CompositeRating::StrongBuy,
            s if s >= 70.0 => CompositeRating::Buy,
            s if s >= 55.0 => CompositeRating::Accumulate,
            s if s >= 45.0 => CompositeRating::Hold,
            s if s >= 30.0 => CompositeRating::Reduce,
            _ => CompositeRating::Sell,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            CompositeRating::StrongBuy => "Strong Buy",
            CompositeRating::Buy => "Buy",
            CompositeRating::Accumulate => "Accumulate",
            CompositeRating::Hold => "Hold",
            CompositeRating::Reduce => "Reduce",
            CompositeRating::Sell => "Sell",
        }
    }
}

/// Coarser five-band restatement of the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationAction {
    SellReview,
    Hold,
    Accumulate,
    Buy,
    StrongBuy,
}

impl RecommendationAction {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 80.0 => RecommendationAction::StrongBuy,
            s if s >= 65.0 => RecommendationAction::Buy,
            s if s >= 50.0 => RecommendationAction::Accumulate,
            s if s >= 40.0 => RecommendationAction::Hold,
            _ => RecommendationAction::SellReview,
        }
    }

    /// Recommendation sentence shown to users.
    pub fn to_text(&self) -> &'static str {
        match self {
            RecommendationAction::StrongBuy => "Strong buy: most models point to clear undervaluation.",
            RecommendationAction::Buy => "Buy: valuation is attractive on balance.",
            RecommendationAction::Accumulate => "Accumulate: modestly attractive, consider building gradually.",
            RecommendationAction::Hold => "Hold: roughly fairly valued.",
            RecommendationAction::SellReview => "Sell or review: valuation looks unfavourable.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn to_label(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
        }
    }
}
