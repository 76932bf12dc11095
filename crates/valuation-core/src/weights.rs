use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::types::ModelKind;

/// Per-model weights for the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub dcf: f64,
    pub relative: f64,
    pub graham: f64,
    pub magic: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            dcf: 0.30,
            relative: 0.25,
            graham: 0.25,
            magic: 0.20,
        }
    }
}

impl Weights {
    pub fn get(&self, kind: ModelKind) -> f64 {
        match kind {
            ModelKind::Dcf => self.dcf,
            ModelKind::Relative => self.relative,
            ModelKind::Graham => self.graham,
            ModelKind::Magic => self.magic,
        }
    }

    pub fn total(&self) -> f64 {
        self.dcf + self.relative + self.graham + self.magic
    }

    /// Rejects negative or non-finite weights and an all-zero map.
    pub fn validate(&self) -> Result<(), ValuationError> {
        for kind in ModelKind::ALL {
            let w = self.get(kind);
            if !w.is_finite() || w < 0.0 {
                return Err(ValuationError::InvalidWeights(format!("{} weight must be non-negative, got {}", kind, w)));
            }
        }
        if self.total() <= 0.0 {
            return Err(ValuationError::InvalidWeights("weights sum to zero".to_string()));
        }
        Ok(())
    }

    /// Scales every weight by `1 / total` so they sum to 1.
    pub fn normalized(&self) -> Result<Self, ValuationError> {
        self.validate()?;
        let total = self.total();
        Ok(Self {
            dcf: self.dcf / total,
            relative: self.relative / total,
            graham: self.graham / total,
            magic: self.magic / total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_weights_sum_to_one() {
        assert_relative_eq!(Weights::default().total(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_normalized_sums_to_one() {
        let samples = [
            Weights { dcf: 3.0, relative: 2.5, graham: 2.5, magic: 2.0 },
            Weights { dcf: 0.001, relative: 0.0, graham: 0.0, magic: 0.0 },
            Weights { dcf: 1e6, relative: 7.0, graham: 0.3, magic: 42.0 },
            Weights { dcf: 0.1, relative: 0.1, graham: 0.1, magic: 0.1 },
        ];
        for w in samples {
            let n = w.normalized().unwrap();
            assert_relative_eq!(n.total(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_normalized_keeps_proportions() {
        let n = Weights { dcf: 3.0, relative: 2.5, graham: 2.5, magic: 2.0 }.normalized().unwrap();
        assert_relative_eq!(n.dcf, 0.30, epsilon = 1e-12);
        assert_relative_eq!(n.magic, 0.20, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let zero = Weights { dcf: 0.0, relative: 0.0, graham: 0.0, magic: 0.0 };
        assert!(zero.normalized().is_err());

        let negative = Weights { dcf: -0.1, ..Weights::default() };
        assert!(matches!(negative.validate(), Err(ValuationError::InvalidWeights(_))));

        let nan = Weights { graham: f64::NAN, ..Weights::default() };
        assert!(nan.validate().is_err());
    }
}
