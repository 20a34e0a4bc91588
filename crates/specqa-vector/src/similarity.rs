/// Cosine similarity of two equal-length vectors; 0 when either is all zeros.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut na, mut nb) = (0f32, 0f32, 0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 { return 0.0; }
    dot / (na.sqrt() * nb.sqrt())
}

/// Cosine distance as reported by the store (`1 - cosine`).
pub fn distance(a: &[f32], b: &[f32]) -> f32 { 1.0 - cosine(a, b) }

/// Map a distance to the `[0, 1]` similarity score carried by candidates.
pub fn score_from_distance(distance: f32) -> f32 { (1.0 - distance).clamp(0.0, 1.0) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_zero_distance() {
        let v = [0.3, 0.4, 0.0];
        assert!(distance(&v, &v).abs() < 1e-6);
        assert!((score_from_distance(distance(&v, &v)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn opposite_vectors_clamp_to_zero_score() {
        let a = [1.0, 0.0];
        let b = [-1.0, 0.0];
        assert!((distance(&a, &b) - 2.0).abs() < 1e-6);
        assert_eq!(score_from_distance(distance(&a, &b)), 0.0);
    }

    #[test]
    fn zero_vector_is_orthogonal_to_everything() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
