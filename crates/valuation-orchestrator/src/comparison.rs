use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use valuation_core::stats::round_to;
use valuation_core::{Adjustment, AdjustmentSignals, CompositeRating};

use crate::pipeline::{HybridReport, SourceStatus};

/// How closely the adjusted score tracks the traditional composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementLevel {
    StrongAgree,
    MostlyAgree,
    SomeDisagreement,
    StrongDisagreement,
}

impl AgreementLevel {
    /// Bands on `|difference|`: ≤3, ≤8, ≤15, above.
    pub fn from_difference(difference: f64) -> Self {
        match difference.abs() {
            d if d <= 3.0 => AgreementLevel::StrongAgree,
            d if d <= 8.0 => AgreementLevel::MostlyAgree,
            d if d <= 15.0 => AgreementLevel::SomeDisagreement,
            _ => AgreementLevel::StrongDisagreement,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgreementLevel::StrongAgree => "Traditional and adjusted scores strongly agree",
            AgreementLevel::MostlyAgree => "Traditional and adjusted scores mostly agree",
            AgreementLevel::SomeDisagreement => "Traditional and adjusted scores differ somewhat",
            AgreementLevel::StrongDisagreement => "Traditional and adjusted scores strongly disagree",
        }
    }
}

/// Side-by-side view of the traditional composite and the adjusted score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridComparison {
    pub ticker: String,
    pub name: String,
    pub traditional_score: f64,
    pub traditional_rating: CompositeRating,
    pub adjusted_score: f64,
    pub adjusted_rating: CompositeRating,
    pub score_difference: f64,
    pub agreement_level: AgreementLevel,
    pub agreement_description: String,
    pub adjustments: Vec<Adjustment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub source_status: SourceStatus,
    pub interpretation: String,
}

impl From<&HybridReport> for HybridComparison {
    fn from(report: &HybridReport) -> Self {
        let difference = report.hybrid.adjusted_score - report.traditional.base_score;
        let agreement = AgreementLevel::from_difference(difference);
        Self {
            ticker: report.profile.ticker.clone(),
            name: report.profile.name.clone(),
            traditional_score: report.traditional.base_score,
            traditional_rating: report.traditional.rating,
            adjusted_score: report.hybrid.adjusted_score,
            adjusted_rating: report.hybrid.final_rating,
            score_difference: round_to(difference, 1),
            agreement_level: agreement,
            agreement_description: agreement.description().to_string(),
            adjustments: report.hybrid.adjustments.clone(),
            explanation: report.hybrid.explanation.clone(),
            source_status: report.source_status.clone(),
            interpretation: report.summary.clone(),
        }
    }
}

/// Contextual signals alone, without the valuation models in the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalReport {
    pub ticker: String,
    pub name: String,
    pub signals: Option<AdjustmentSignals>,
    pub source_status: SourceStatus,
    pub analysed_at: DateTime<Utc>,
}
