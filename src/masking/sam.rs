//! Spectral Angle Mapper helpers.
//!
//! The SAM angle between two spectra is `acos(a·b / (|a| |b|))`, in radians.
//! Smaller angles mean more similar spectral shapes, independent of overall
//! brightness.

/// Dot product of two equally long vectors.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Euclidean norm.
pub fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// Angle from a precomputed dot product and norms.
///
/// Returns `None` when the cosine is not finite, i.e. when either vector has
/// zero norm. The cosine is clamped into `[-1, 1]` before `acos`.
pub fn angle_from_parts(dot: f64, norm_a: f64, norm_b: f64) -> Option<f64> {
    let cos_theta = dot / (norm_a * norm_b);
    if !cos_theta.is_finite() {
        return None;
    }
    Some(cos_theta.clamp(-1.0, 1.0).acos())
}

/// SAM angle between two spectra, `None` if either is all zeros.
pub fn spectral_angle(a: &[f64], b: &[f64]) -> Option<f64> {
    angle_from_parts(dot(a, b), norm(a), norm(b))
}
