/// Thresholds for a piecewise sub-score. Order is excellent, good, fair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub excellent: f64,
    pub good: f64,
    pub fair: f64,
}

impl Thresholds {
    pub const fn new(excellent: f64, good: f64, fair: f64) -> Self {
        Self { excellent, good, fair }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Larger values score better (ROIC, earnings yield).
    HigherIsBetter,
    /// Smaller values score better (multiples relative to sector, PEG).
    LowerIsBetter,
}

/// Maps a metric onto {100, 80, 60, 40}. A missing value is neutral (50).
pub fn normalize_score(value: Option<f64>, thresholds: Thresholds, direction: Direction) -> f64 {
    let Some(v) = value else {
        return 50.0;
    };

    match direction {
        Direction::HigherIsBetter => {
            if v >= thresholds.excellent {
                100.0
            } else if v >= thresholds.good {
                80.0
            } else if v >= thresholds.fair {
                60.0
            } else {
                40.0
            }
        }
        Direction::LowerIsBetter => {
            if v <= thresholds.excellent {
                100.0
            } else if v <= thresholds.good {
                80.0
            } else if v <= thresholds.fair {
                60.0
            } else {
                40.0
            }
        }
    }
}
