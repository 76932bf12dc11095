//! Small numeric helpers shared by the models and the pipeline.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn mean_opt(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(mean(values))
    }
}

/// Compound annual growth rate as a percentage. `None` unless both ends are positive and `years > 0`.
pub fn cagr(latest: f64, oldest: f64, years: usize) -> Option<f64> {
    if years == 0 || latest <= 0.0 || oldest <= 0.0 {
        return None;
    }
    Some(((latest / oldest).powf(1.0 / years as f64) - 1.0) * 100.0)
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

pub fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}
