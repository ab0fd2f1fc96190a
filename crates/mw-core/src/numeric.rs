use crate::MwError;

/// Pass `v` through if it is finite.
pub fn ensure_finite(v: f64, what: &'static str) -> Result<f64, MwError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(MwError::NonFinite { what, value: v })
    }
}

/// Limit the magnitude of `dx` to `limit`, keeping its sign.
///
/// A zero increment maps to `-0.0`.
pub fn limit_magnitude(dx: f64, limit: f64) -> f64 {
    let sign = if dx > 0.0 { 1.0 } else { -1.0 };
    sign * dx.abs().min(limit)
}
