//! Division and rounding used by every percentage in the crate.

/// `numerator / denominator`, or `0.0` when the denominator is not a
/// positive number.
///
/// Never returns `NaN` or an infinity: a slice of data with a zero total
/// renders as zero instead of failing.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if !(denominator > 0.0) || !denominator.is_finite() {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// `part` as a percentage of `total`, routed through [`safe_ratio`].
pub fn percent_of(part: f64, total: f64) -> f64 {
    safe_ratio(part, total) * 100.0
}

/// Round to a fixed number of decimals, halves away from zero.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
