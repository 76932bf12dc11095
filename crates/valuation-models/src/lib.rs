pub mod dcf;
pub mod graham;
pub mod magic;
pub mod relative;
pub mod shares;

pub use dcf::{DcfModel, DcfParams};
pub use graham::GrahamModel;
pub use magic::{rank_in_universe, MagicFormulaModel, UniverseRank};
pub use relative::RelativeModel;

use valuation_core::{ModelKind, ValuationInput, ValuationModel, ValuationResult};

/// The four models, run together or one at a time.
pub struct ModelSuite {
    models: Vec<Box<dyn ValuationModel>>,
}

impl ModelSuite {
    pub fn new(dcf: DcfParams) -> Self {
        Self {
            models: vec![
                Box::new(DcfModel::new(dcf)),
                Box::new(RelativeModel::new()),
                Box::new(GrahamModel::new()),
                Box::new(MagicFormulaModel::new()),
            ],
        }
    }

    pub fn calculate_all(&self, input: &ValuationInput<'_>) -> Vec<ValuationResult> {
        self.models.iter().map(|m| m.calculate(input)).collect()
    }

    pub fn calculate(&self, kind: ModelKind, input: &ValuationInput<'_>) -> ValuationResult {
        match self.models.iter().find(|m| m.kind() == kind) {
            Some(model) => model.calculate(input),
            None => ValuationResult::unavailable(kind, "model not registered"),
        }
    }
}

impl Default for ModelSuite {
    fn default() -> Self {
        Self::new(DcfParams::default())
    }
}
