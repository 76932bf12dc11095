//! Strict validation of the adjustment-service response.
//!
//! The body must be a single JSON object matching [`AdjustmentSignals`] exactly. Unknown fields,
//! unknown enum values, out-of-range deltas or scores reject the whole response.

use valuation_core::{Adjustment, AdjustmentSignals};

use crate::error::{AdjustmentError, AdjustmentResult};

/// Largest magnitude accepted for a single delta.
pub const MAX_ABS_DELTA: f64 = 15.0;

pub fn parse_signals(body: &str) -> AdjustmentResult<AdjustmentSignals> {
    let signals: AdjustmentSignals = serde_json::from_str(body)?;
    validate_signals(&signals)?;
    Ok(signals)
}

pub fn validate_signals(signals: &AdjustmentSignals) -> AdjustmentResult<()> {
    if let Some(quality) = &signals.financial_quality {
        check_delta("financial_quality", quality.delta)?;
        if quality.reason.trim().is_empty() {
            return Err(AdjustmentError::InvalidResponse("financial_quality has no reason".to_string()));
        }
        if let Some(score) = quality.quality_score {
            if !score.is_finite() {
                return Err(AdjustmentError::InvalidResponse("quality_score is not finite".to_string()));
            }
        }
    }

    if let Some(sentiment) = &signals.sentiment {
        if !(0.0..=1.0).contains(&sentiment.score) {
            return Err(AdjustmentError::InvalidResponse(format!(
                "sentiment score {} outside [0, 1]",
                sentiment.score
            )));
        }
    }

    for Adjustment { kind, delta, reason, .. } in &signals.other {
        check_delta(kind.as_str(), *delta)?;
        if reason.trim().is_empty() {
            return Err(AdjustmentError::InvalidResponse(format!("{} adjustment has no reason", kind.as_str())));
        }
    }

    Ok(())
}

fn check_delta(field: &str, delta: f64) -> AdjustmentResult<()> {
    if !delta.is_finite() || delta.abs() > MAX_ABS_DELTA {
        return Err(AdjustmentError::InvalidResponse(format!(
            "{} delta {} outside [-{}, {}]",
            field, delta, MAX_ABS_DELTA, MAX_ABS_DELTA
        )));
    }
    Ok(())
}
