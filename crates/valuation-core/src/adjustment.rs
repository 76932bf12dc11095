use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    FinancialQuality,
    Sentiment,
    Anomaly,
    Other,
}

impl AdjustmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentKind::FinancialQuality => "financial_quality",
            AdjustmentKind::Sentiment => "sentiment",
            AdjustmentKind::Anomaly => "anomaly",
            AdjustmentKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentConfidence {
    High,
    Medium,
    Low,
}

/// One signed, reason-tagged delta applied on top of the composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Adjustment {
    #[serde(rename = "type")]
    pub kind: AdjustmentKind,
    pub delta: f64,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<AdjustmentConfidence>,
}

impl Adjustment {
    pub fn new(kind: AdjustmentKind, delta: f64, reason: impl Into<String>) -> Self {
        Self {
            kind,
            delta,
            reason: reason.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: AdjustmentConfidence) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentTrend {
    Improving,
    Stable,
    Weakening,
    InsufficientData,
}

impl SentimentTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentTrend::Improving => "improving",
            SentimentTrend::Stable => "stable",
            SentimentTrend::Weakening => "weakening",
            SentimentTrend::InsufficientData => "insufficient_data",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

/// Result of a financial-quality review: a ready-made delta plus the findings behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QualityCheck {
    pub delta: f64,
    pub reason: String,
    #[serde(default)]
    pub confidence: Option<AdjustmentConfidence>,
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SentimentSignal {
    pub label: SentimentLabel,
    /// Classifier score in [0, 1].
    pub score: f64,
    pub recent_trend: SentimentTrend,
    /// Set when sentiment contradicts analyst consensus.
    #[serde(default)]
    pub discrepancy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnomalySignal {
    pub detected: bool,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Everything an adjustment source returns for one ticker. Each signal is independent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdjustmentSignals {
    #[serde(default)]
    pub financial_quality: Option<QualityCheck>,
    #[serde(default)]
    pub sentiment: Option<SentimentSignal>,
    #[serde(default)]
    pub anomaly: Option<AnomalySignal>,
    #[serde(default)]
    pub other: Vec<Adjustment>,
}

impl AdjustmentSignals {
    pub fn is_empty(&self) -> bool {
        self.financial_quality.is_none() && self.sentiment.is_none() && self.anomaly.is_none() && self.other.is_empty()
    }
}

/// Categorical effect of a sentiment signal on the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentImpact {
    NegativeStrong,
    NegativeModerate,
    Neutral,
    PositiveModerate,
    PositiveStrong,
}

impl SentimentImpact {
    pub fn assess(signal: &SentimentSignal) -> Self {
        match signal.label {
            SentimentLabel::Negative if signal.recent_trend == SentimentTrend::Weakening => SentimentImpact::NegativeStrong,
            SentimentLabel::Negative => SentimentImpact::NegativeModerate,
            SentimentLabel::Positive if signal.recent_trend == SentimentTrend::Improving => SentimentImpact::PositiveStrong,
            SentimentLabel::Positive => SentimentImpact::PositiveModerate,
            SentimentLabel::Neutral => SentimentImpact::Neutral,
        }
    }

    /// Score delta for this impact. Positive impacts only apply below 70.
    pub fn delta(&self, base_score: f64) -> f64 {
        match self {
            SentimentImpact::NegativeStrong => -8.0,
            SentimentImpact::NegativeModerate => -4.0,
            SentimentImpact::PositiveStrong if base_score < 70.0 => 5.0,
            SentimentImpact::PositiveModerate if base_score < 70.0 => 2.0,
            _ => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentImpact::NegativeStrong => "negative_strong",
            SentimentImpact::NegativeModerate => "negative_moderate",
            SentimentImpact::Neutral => "neutral",
            SentimentImpact::PositiveModerate => "positive_moderate",
            SentimentImpact::PositiveStrong => "positive_strong",
        }
    }
}

/// Flags that lower confidence in the adjusted score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    LargeQualityAdjustment,
    SentimentDiscrepancy,
    AnomalyHigh,
    AnomalyMedium,
    AnomalyLow,
}

impl RiskFactor {
    pub fn anomaly(severity: Severity) -> Self {
        match severity {
            Severity::High => RiskFactor::AnomalyHigh,
            Severity::Medium => RiskFactor::AnomalyMedium,
            Severity::Low => RiskFactor::AnomalyLow,
        }
    }
}
