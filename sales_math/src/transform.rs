//! Value transforms applied around model fitting and reporting

/// Apply `ln(1 + x)` elementwise.
///
/// Sales series are non-negative and heavy-tailed, so models are trained on
/// the log1p scale.
pub fn log1p_all(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| v.ln_1p()).collect()
}

/// Apply `exp(x) - 1` elementwise, undoing [`log1p_all`].
pub fn expm1_all(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| v.exp_m1()).collect()
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    let rounded = (value * factor).round() / factor;
    // Avoid reporting "-0.0"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Round to two decimal places, the precision used for reported sales.
pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}
