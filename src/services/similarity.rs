//! Vector similarity.

/// Cosine similarity of two equal-length vectors.
///
/// Returns `None` when either vector has zero magnitude (the ratio is
/// undefined) or the lengths differ.
#[must_use]
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator <= f64::EPSILON || !denominator.is_finite() {
        return None;
    }

    Some((dot / denominator).clamp(-1.0, 1.0))
}
