fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| *x as f64 * *y as f64).sum()
}

/// Cosine similarity of two equal-length vectors.
///
/// A zero-norm vector is similar to nothing: the result is exactly `0.0`. Accumulation happens
/// in f64 and the denominator is `sqrt(|a|² · |b|²)`, so `cosine_similarity(v, v)` is exactly
/// `1.0` for any non-zero `v`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "cosine similarity needs equal-length vectors");

    let aa = dot(a, a);
    let bb = dot(b, b);
    if aa == 0.0 || bb == 0.0 {
        return 0.0;
    }
    let score = dot(a, b) / (aa * bb).sqrt();
    (score as f32).clamp(-1.0, 1.0)
}
