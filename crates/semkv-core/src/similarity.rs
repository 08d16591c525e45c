use crate::error::{Error, Result};
use crate::types::Embedding;

/// Cosine similarity of two equal-length embeddings.
///
/// Accumulates in f64 regardless of the stored f32 precision. Fails with
/// [`Error::DimensionMismatch`] on unequal lengths and [`Error::DegenerateVector`]
/// when either side has zero magnitude; callers exclude such candidates
/// instead of ranking them.
pub fn cosine_similarity(a: &Embedding, b: &Embedding) -> Result<f64> {
    if a.dim() != b.dim() {
        return Err(Error::DimensionMismatch { expected: a.dim(), actual: b.dim() });
    }
    let (mut dot, mut norm_a, mut norm_b) = (0f64, 0f64, 0f64);
    for (&x, &y) in a.values().iter().zip(b.values()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(Error::DegenerateVector);
    }
    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !score.is_finite() {
        return Err(Error::DegenerateVector);
    }
    // Rounding can overshoot by an ulp or two.
    Ok(score.clamp(-1.0, 1.0))
}
