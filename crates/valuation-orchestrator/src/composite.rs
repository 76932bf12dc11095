use std::collections::BTreeMap;
use valuation_core::stats::{clamp_score, round_to};
use valuation_core::{
    CompositeRating, CompositeResult, ModelKind, ModelRating, RecommendationAction, Score, StockProfile, ValuationError, ValuationResult,
    Weights,
};

const STRENGTH_THRESHOLD: f64 = 75.0;
const WEAKNESS_THRESHOLD: f64 = 40.0;
const DISAGREEMENT_SPREAD: f64 = 40.0;
const DISAGREEMENT_MIN_MODELS: usize = 3;

/// Weighted composite over the model scores that are present.
///
/// Returns `(composite, valid_weight)`. With normalized weights `Σ(all) = 1`, so
/// `weighted_sum / valid_weight * Σ(all)` reduces to renormalizing over the valid models.
pub fn weighted_composite(scores: &BTreeMap<ModelKind, Score>, weights: &Weights) -> (f64, f64) {
    let mut weighted_sum = 0.0;
    let mut valid_weight = 0.0;

    for (kind, score) in scores {
        if let Score::Present(value) = score {
            let w = weights.get(*kind);
            weighted_sum += w * value;
            valid_weight += w;
        }
    }

    if valid_weight <= 0.0 {
        return (0.0, 0.0);
    }
    (clamp_score(weighted_sum / valid_weight * weights.total()), valid_weight)
}

/// True when at least three models are present and their scores spread by more than 40 points.
pub fn models_disagree(scores: &BTreeMap<ModelKind, Score>) -> bool {
    let values: Vec<f64> = scores.values().filter_map(Score::value).collect();
    if values.len() < DISAGREEMENT_MIN_MODELS {
        return false;
    }
    let max = values.iter().cloned().fold(f64::MIN, f64::max);
    let min = values.iter().cloned().fold(f64::MAX, f64::min);
    max - min > DISAGREEMENT_SPREAD
}

/// Blends per-model results into a [`CompositeResult`].
#[derive(Debug, Clone)]
pub struct CompositeScorer {
    weights: Weights,
}

impl CompositeScorer {
    /// Weights are normalized to sum to 1 on construction.
    pub fn new(weights: Weights) -> Result<Self, ValuationError> {
        Ok(Self { weights: weights.normalized()? })
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn analyze(&self, profile: &StockProfile, results: Vec<ValuationResult>, include_details: bool) -> CompositeResult {
        let mut model_scores = BTreeMap::new();
        let mut model_ratings = BTreeMap::new();
        for kind in ModelKind::ALL {
            model_scores.insert(kind, Score::absent("model not run"));
            model_ratings.insert(kind, ModelRating::NotAvailable);
        }
        for result in &results {
            model_scores.insert(result.model, result.score.clone());
            model_ratings.insert(result.model, result.rating);
        }

        let (raw, valid_weight) = weighted_composite(&model_scores, &self.weights);
        // Ratings come from the reported score so the payload never contradicts itself
        let composite = round_to(raw, 2);
        let insufficient_data = valid_weight <= 0.0;
        let rating = CompositeRating::from_score(composite);
        let action = RecommendationAction::from_score(composite);
        let disagree = models_disagree(&model_scores);

        let mut strengths = Vec::new();
        let mut weaknesses = Vec::new();
        for (kind, score) in &model_scores {
            match score.value() {
                Some(v) if v >= STRENGTH_THRESHOLD => {
                    strengths.push(format!("{} scores {:.1}", kind.display_name(), v));
                }
                Some(v) if v < WEAKNESS_THRESHOLD => {
                    weaknesses.push(format!("{} scores {:.1}", kind.display_name(), v));
                }
                _ => {}
            }
        }

        let mut recommendation = action.to_text().to_string();
        if disagree {
            recommendation.push_str(" Models disagree, review the individual valuations.");
        }

        let available = model_scores.values().filter(|s| s.is_present()).count();
        let interpretation = if insufficient_data {
            format!("{}: no valuation model could be computed; insufficient data.", profile.ticker)
        } else {
            format!(
                "{} ({}) scores {:.1}/100 ({}) from {} of {} models.",
                profile.name,
                profile.ticker,
                composite,
                rating.to_label(),
                available,
                ModelKind::ALL.len()
            )
        };

        CompositeResult {
            ticker: profile.ticker.clone(),
            name: profile.name.clone(),
            base_score: composite,
            rating,
            recommendation,
            recommendation_action: action,
            models_disagree: disagree,
            model_scores,
            model_ratings,
            weights: self.weights,
            valid_weight: round_to(valid_weight, 4),
            insufficient_data,
            strengths,
            weaknesses,
            interpretation,
            model_details: if include_details { Some(results) } else { None },
        }
    }
}

impl Default for CompositeScorer {
    fn default() -> Self {
        Self { weights: Weights::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn profile() -> StockProfile {
        StockProfile {
            ticker: "005930".to_string(),
            name: "Samsung Electronics".to_string(),
            sector: Some("Semiconductors".to_string()),
            market: Some("KOSPI".to_string()),
            active: true,
        }
    }

    fn result(model: ModelKind, score: Option<f64>) -> ValuationResult {
        match score {
            Some(v) => ValuationResult {
                model,
                score: Score::Present(v),
                rating: ModelRating::NotAvailable,
                details: serde_json::Map::new(),
                interpretation: String::new(),
            },
            None => ValuationResult::unavailable(model, "missing input"),
        }
    }

    #[test]
    fn test_missing_model_renormalizes() {
        let results = vec![
            result(ModelKind::Dcf, Some(80.0)),
            result(ModelKind::Relative, None),
            result(ModelKind::Graham, Some(70.0)),
            result(ModelKind::Magic, Some(77.0)),
        ];
        let composite = CompositeScorer::default().analyze(&profile(), results, false);
        assert_relative_eq!(composite.valid_weight, 0.75, epsilon = 1e-9);
        assert_relative_eq!(composite.base_score, 75.87, epsilon = 1e-9);
        assert_eq!(composite.rating, CompositeRating::Buy);
        assert!(!composite.insufficient_data);
        assert!(composite.model_details.is_none());
        assert_eq!(composite.strengths, vec!["DCF scores 80.0".to_string(), "Magic Formula scores 77.0".to_string()]);
        assert!(composite.weaknesses.is_empty());
    }

    #[test]
    fn test_unnormalized_weights_give_same_composite() {
        let scorer = CompositeScorer::new(Weights { dcf: 3.0, relative: 2.5, graham: 2.5, magic: 2.0 }).unwrap();
        let results = vec![
            result(ModelKind::Dcf, Some(80.0)),
            result(ModelKind::Relative, None),
            result(ModelKind::Graham, Some(70.0)),
            result(ModelKind::Magic, Some(77.0)),
        ];
        let composite = scorer.analyze(&profile(), results, true);
        assert_relative_eq!(composite.base_score, 75.87, epsilon = 1e-9);
        assert_relative_eq!(composite.weights.total(), 1.0, epsilon = 1e-9);
        assert_eq!(composite.model_details.map(|d| d.len()), Some(4));
    }

    #[test]
    fn test_all_models_failed_is_insufficient_data() {
        let results = ModelKind::ALL.iter().map(|k| result(*k, None)).collect();
        let composite = CompositeScorer::default().analyze(&profile(), results, false);
        assert_eq!(composite.base_score, 0.0);
        assert_eq!(composite.valid_weight, 0.0);
        assert!(composite.insufficient_data);
        assert!(composite.strengths.is_empty() && composite.weaknesses.is_empty());
    }

    #[test]
    fn test_disagreement_needs_three_models() {
        let spread = vec![
            result(ModelKind::Dcf, Some(95.0)),
            result(ModelKind::Relative, Some(60.0)),
            result(ModelKind::Graham, Some(30.0)),
            result(ModelKind::Magic, None),
        ];
        let composite = CompositeScorer::default().analyze(&profile(), spread, false);
        assert!(composite.models_disagree);
        assert!(composite.recommendation.contains("Models disagree"));
        assert_eq!(composite.weaknesses, vec!["Graham Number scores 30.0".to_string()]);

        let two = vec![result(ModelKind::Dcf, Some(95.0)), result(ModelKind::Graham, Some(10.0))];
        assert!(!CompositeScorer::default().analyze(&profile(), two, false).models_disagree);
    }

    #[test]
    fn test_band_edge_rating_matches_reported_score() {
        let composite = CompositeScorer::default().analyze(&profile(), vec![result(ModelKind::Dcf, Some(69.996))], false);
        assert_eq!(composite.base_score, 70.0);
        assert_eq!(composite.rating, CompositeRating::Buy);

        let passthrough = crate::hybrid::HybridIntegrator::new().passthrough(composite.base_score);
        assert_eq!(passthrough.adjusted_score, composite.base_score);
        assert_eq!(passthrough.base_rating, composite.rating);
        assert_eq!(passthrough.final_rating, composite.rating);
    }

    #[test]
    fn test_scores_stay_in_bounds() {
        for a in [0.0, 25.0, 50.0, 100.0] {
            for b in [0.0, 40.0, 100.0] {
                let results = vec![result(ModelKind::Dcf, Some(a)), result(ModelKind::Magic, Some(b))];
                let c = CompositeScorer::default().analyze(&profile(), results, false);
                assert!((0.0..=100.0).contains(&c.base_score));
            }
        }
    }
}
