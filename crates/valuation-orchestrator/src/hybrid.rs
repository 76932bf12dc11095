use valuation_core::stats::{clamp_score, round_to};
use valuation_core::{
    Adjustment, AdjustmentConfidence, AdjustmentKind, AdjustmentSignals, CompositeRating, ConfidenceLevel, HybridResult, RiskFactor,
    SentimentImpact, Severity,
};

const LARGE_QUALITY_DELTA: f64 = 10.0;

/// Adjustments derived from a signal set, plus the risk factors they raise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalAdjustments {
    pub adjustments: Vec<Adjustment>,
    pub risk_factors: Vec<RiskFactor>,
}

fn anomaly_delta(severity: Severity) -> f64 {
    match severity {
        Severity::High => -10.0,
        Severity::Medium => -5.0,
        Severity::Low => -2.0,
    }
}

/// Turns raw signals into ordered adjustments: quality, sentiment, anomaly, then any others.
/// Zero deltas are dropped.
pub fn adjustments_from_signals(base_score: f64, signals: &AdjustmentSignals) -> SignalAdjustments {
    let mut out = SignalAdjustments::default();

    if let Some(quality) = &signals.financial_quality {
        if quality.delta != 0.0 {
            out.adjustments.push(Adjustment {
                kind: AdjustmentKind::FinancialQuality,
                delta: quality.delta,
                reason: quality.reason.clone(),
                confidence: Some(quality.confidence.unwrap_or(AdjustmentConfidence::Medium)),
            });
            if quality.delta.abs() > LARGE_QUALITY_DELTA {
                out.risk_factors.push(RiskFactor::LargeQualityAdjustment);
            }
        }
    }

    if let Some(sentiment) = &signals.sentiment {
        let impact = SentimentImpact::assess(sentiment);
        let delta = impact.delta(base_score);
        if delta != 0.0 {
            let tone = if delta < 0.0 { "negative" } else { "positive" };
            out.adjustments.push(Adjustment::new(
                AdjustmentKind::Sentiment,
                delta,
                format!("Market sentiment {} ({}, trend: {})", tone, impact.as_str(), sentiment.recent_trend.as_str()),
            ));
        }
        if sentiment.discrepancy.is_some() {
            out.risk_factors.push(RiskFactor::SentimentDiscrepancy);
        }
    }

    if let Some(anomaly) = &signals.anomaly {
        if anomaly.detected {
            let patterns = if anomaly.patterns.is_empty() {
                "unspecified".to_string()
            } else {
                anomaly.patterns.join(", ")
            };
            out.adjustments.push(Adjustment::new(
                AdjustmentKind::Anomaly,
                anomaly_delta(anomaly.severity),
                format!("{} severity anomaly detected ({})", anomaly.severity.as_str(), patterns),
            ));
            out.risk_factors.push(RiskFactor::anomaly(anomaly.severity));
        }
    }

    out.adjustments.extend(signals.other.iter().filter(|a| a.delta != 0.0).cloned());
    out
}

/// Confidence from total adjustment magnitude and the number of risk factors.
pub fn confidence_level(total_abs_adjustment: f64, risk_factor_count: usize) -> ConfidenceLevel {
    if total_abs_adjustment > 15.0 || risk_factor_count >= 3 {
        ConfidenceLevel::Low
    } else if total_abs_adjustment > 8.0 || risk_factor_count >= 2 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::High
    }
}

fn explain(base_score: f64, adjusted_score: f64, adjustments: &[Adjustment]) -> String {
    let mut msg = format!("Traditional score {:.0} adjusted to {:.0}\n", base_score, adjusted_score);
    for adj in adjustments {
        let sign = if adj.delta > 0.0 { "+" } else { "" };
        msg.push_str(&format!("\n• {}: {}{} points\n  reason: {}", adj.kind.as_str(), sign, adj.delta, adj.reason));
    }
    msg
}

/// Applies adjustments to a composite score.
#[derive(Debug, Clone, Copy, Default)]
pub struct HybridIntegrator;

impl HybridIntegrator {
    pub fn new() -> Self {
        Self
    }

    /// `adjusted = clamp(base + Σ delta, 0, 100)`, both rounded to 2 decimals before rating.
    pub fn integrate(&self, base_score: f64, signal: SignalAdjustments, explain_changes: bool) -> HybridResult {
        let SignalAdjustments { adjustments, risk_factors } = signal;

        let total_delta: f64 = adjustments.iter().map(|a| a.delta).sum();
        let total_abs: f64 = adjustments.iter().map(|a| a.delta.abs()).sum();
        let base_score = round_to(base_score, 2);
        let adjusted = round_to(clamp_score(base_score + total_delta), 2);

        let explanation = if explain_changes && !adjustments.is_empty() {
            Some(explain(base_score, adjusted, &adjustments))
        } else {
            None
        };

        HybridResult {
            base_score,
            adjusted_score: adjusted,
            score_change: round_to(adjusted - base_score, 2),
            base_rating: CompositeRating::from_score(base_score),
            final_rating: CompositeRating::from_score(adjusted),
            confidence_level: confidence_level(total_abs, risk_factors.len()),
            adjustment_count: adjustments.len(),
            adjustments,
            risk_factors,
            explanation,
        }
    }

    /// Result for the path with no adjustment source: identical to the composite.
    pub fn passthrough(&self, base_score: f64) -> HybridResult {
        self.integrate(base_score, SignalAdjustments::default(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use valuation_core::{AnomalySignal, QualityCheck, SentimentLabel, SentimentSignal, SentimentTrend};

    fn quality(delta: f64) -> QualityCheck {
        QualityCheck {
            delta,
            reason: "receivables outpacing revenue".to_string(),
            confidence: None,
            quality_score: None,
            issues: vec![],
            warnings: vec![],
            strengths: vec![],
        }
    }

    fn adjustments(deltas: &[f64]) -> SignalAdjustments {
        SignalAdjustments {
            adjustments: deltas.iter().map(|d| Adjustment::new(AdjustmentKind::Other, *d, "test")).collect(),
            risk_factors: vec![],
        }
    }

    #[test]
    fn test_quality_drop_moves_rating_down() {
        let signals = AdjustmentSignals {
            financial_quality: Some(quality(-3.0)),
            sentiment: Some(SentimentSignal {
                label: SentimentLabel::Neutral,
                score: 0.5,
                recent_trend: SentimentTrend::Stable,
                discrepancy: None,
            }),
            anomaly: None,
            other: vec![],
        };
        let adj = adjustments_from_signals(72.5, &signals);
        let result = HybridIntegrator::new().integrate(72.5, adj, true);

        assert_relative_eq!(result.adjusted_score, 69.5);
        assert_relative_eq!(result.score_change, -3.0);
        assert_eq!(result.base_rating, CompositeRating::Buy);
        assert_eq!(result.final_rating, CompositeRating::Accumulate);
        assert_eq!(result.adjustment_count, 1);
        assert_eq!(result.confidence_level, ConfidenceLevel::High);
        let explanation = result.explanation.unwrap();
        assert!(explanation.contains("• financial_quality: -3 points"));
    }

    #[test]
    fn test_clamp_then_reapply_differs_from_single_clamp() {
        let integrator = HybridIntegrator::new();
        let once = integrator.integrate(95.0, adjustments(&[10.0, -10.0]), false);
        assert_relative_eq!(once.adjusted_score, 95.0);

        let up = integrator.integrate(95.0, adjustments(&[10.0]), false);
        assert_relative_eq!(up.adjusted_score, 100.0);
        let down = integrator.integrate(up.adjusted_score, adjustments(&[-10.0]), false);
        assert_relative_eq!(down.adjusted_score, 90.0);
    }

    #[test]
    fn test_adjusted_score_clamped() {
        let integrator = HybridIntegrator::new();
        assert_eq!(integrator.integrate(5.0, adjustments(&[-10.0, -8.0]), false).adjusted_score, 0.0);
        assert_eq!(integrator.integrate(98.0, adjustments(&[15.0]), false).adjusted_score, 100.0);
    }

    #[test]
    fn test_confidence_thresholds() {
        assert_eq!(confidence_level(16.0, 0), ConfidenceLevel::Low);
        assert!(confidence_level(8.01, 0) <= ConfidenceLevel::Medium);
        assert_eq!(confidence_level(8.0, 0), ConfidenceLevel::High);
        assert_eq!(confidence_level(0.0, 0), ConfidenceLevel::High);
        assert_eq!(confidence_level(0.0, 2), ConfidenceLevel::Medium);
        assert_eq!(confidence_level(0.0, 3), ConfidenceLevel::Low);

        let none = HybridIntegrator::new().passthrough(61.234);
        assert_eq!(none.confidence_level, ConfidenceLevel::High);
        assert_eq!(none.adjustment_count, 0);
        assert!(none.explanation.is_none());
        assert_relative_eq!(none.adjusted_score, 61.23);
    }

    #[test]
    fn test_ratings_follow_rounded_scores() {
        let integrator = HybridIntegrator::new();
        let result = integrator.integrate(44.996, adjustments(&[25.0]), false);
        assert_relative_eq!(result.base_score, 45.0);
        assert_eq!(result.base_rating, CompositeRating::Hold);
        assert_relative_eq!(result.adjusted_score, 70.0);
        assert_eq!(result.final_rating, CompositeRating::Buy);
    }

    #[test]
    fn test_sixteen_points_of_adjustment_is_low_confidence() {
        let result = HybridIntegrator::new().integrate(60.0, adjustments(&[-8.0, -8.0]), false);
        assert_eq!(result.confidence_level, ConfidenceLevel::Low);
    }

    #[test]
    fn test_signal_mapping_and_risk_factors() {
        let signals = AdjustmentSignals {
            financial_quality: Some(quality(-12.0)),
            sentiment: Some(SentimentSignal {
                label: SentimentLabel::Positive,
                score: 0.9,
                recent_trend: SentimentTrend::Improving,
                discrepancy: Some("consensus still neutral".to_string()),
            }),
            anomaly: Some(AnomalySignal { detected: true, severity: Severity::High, patterns: vec!["margin spike".to_string()] }),
            other: vec![Adjustment::new(AdjustmentKind::Other, 0.0, "no-op")],
        };

        let mapped = adjustments_from_signals(65.0, &signals);
        let deltas: Vec<f64> = mapped.adjustments.iter().map(|a| a.delta).collect();
        assert_eq!(deltas, vec![-12.0, 5.0, -10.0]);
        assert_eq!(
            mapped.risk_factors,
            vec![RiskFactor::LargeQualityAdjustment, RiskFactor::SentimentDiscrepancy, RiskFactor::AnomalyHigh]
        );

        let result = HybridIntegrator::new().integrate(65.0, mapped, false);
        assert_relative_eq!(result.adjusted_score, 48.0);
        assert_eq!(result.confidence_level, ConfidenceLevel::Low);
    }

    #[test]
    fn test_positive_sentiment_ignored_for_high_scores() {
        let signals = AdjustmentSignals {
            sentiment: Some(SentimentSignal {
                label: SentimentLabel::Positive,
                score: 0.9,
                recent_trend: SentimentTrend::Improving,
                discrepancy: None,
            }),
            anomaly: Some(AnomalySignal { detected: false, severity: Severity::High, patterns: vec![] }),
            ..Default::default()
        };
        let mapped = adjustments_from_signals(82.0, &signals);
        assert!(mapped.adjustments.is_empty());
        assert!(mapped.risk_factors.is_empty());
    }
}
