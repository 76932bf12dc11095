use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::adjustment::{Adjustment, RiskFactor};
use crate::rating::{CompositeRating, ConfidenceLevel, ModelRating, RecommendationAction};
use crate::types::{ModelKind, Score, ValuationResult};
use crate::weights::Weights;

/// Weighted blend of the four model scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    pub ticker: String,
    pub name: String,
    pub base_score: f64,
    pub rating: CompositeRating,
    pub recommendation: String,
    pub recommendation_action: RecommendationAction,
    pub models_disagree: bool,
    pub model_scores: BTreeMap<ModelKind, Score>,
    pub model_ratings: BTreeMap<ModelKind, ModelRating>,
    /// Normalized weights used for the blend.
    pub weights: Weights,
    pub valid_weight: f64,
    /// No model produced a score; `base_score` is 0 and is not a sell signal.
    pub insufficient_data: bool,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub interpretation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_details: Option<Vec<ValuationResult>>,
}

impl CompositeResult {
    pub fn model_score(&self, kind: ModelKind) -> Option<f64> {
        self.model_scores.get(&kind).and_then(Score::value)
    }

    pub fn available_models(&self) -> usize {
        self.model_scores.values().filter(|s| s.is_present()).count()
    }
}

/// Composite score after contextual adjustments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridResult {
    pub base_score: f64,
    pub adjusted_score: f64,
    pub score_change: f64,
    pub base_rating: CompositeRating,
    pub final_rating: CompositeRating,
    pub confidence_level: ConfidenceLevel,
    pub adjustments: Vec<Adjustment>,
    pub adjustment_count: usize,
    pub risk_factors: Vec<RiskFactor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl HybridResult {
    pub fn rating_changed(&self) -> bool {
        self.base_rating != self.final_rating
    }
}
