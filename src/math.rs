//! Distance kernels for vector comparison
//!
//! Shared by both index kinds. HNSW uses L2 exclusively; the Flat index
//! selects a metric at build time.

/// L2 (Euclidean) distance between two vectors.
/// Uses SIMD acceleration when available, with an f64-accumulating scalar
/// fallback for unsupported architectures.
///
/// Returns `None` if the vectors have different lengths or the result is
/// not finite. Callers handle the mismatch rather than panicking.
pub fn l2_distance(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    use simsimd::SpatialSimilarity;
    let squared = f32::sqeuclidean(a, b).unwrap_or_else(|| {
        a.iter()
            .zip(b)
            .map(|(&x, &y)| {
                let d = (x as f64) - (y as f64);
                d * d
            })
            .sum::<f64>()
    });
    let dist = squared.sqrt() as f32;
    dist.is_finite().then_some(dist)
}

/// Euclidean distance. Identical to [`l2_distance`]; retained as a named
/// alternative so the Flat index can accept `euclidean` as a metric.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Option<f32> {
    l2_distance(a, b)
}

/// Cosine distance: `1 - (a·b)/(‖a‖·‖b‖)`.
///
/// Returns `None` on length mismatch or when either vector has zero norm
/// (the quotient is undefined there).
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let dot = dot_product(a, b);
    let norm_a = dot_product(a, a).sqrt();
    let norm_b = dot_product(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    let dist = (1.0 - dot / (norm_a * norm_b)) as f32;
    dist.is_finite().then_some(dist)
}

fn dot_product(a: &[f32], b: &[f32]) -> f64 {
    use simsimd::SpatialSimilarity;
    f32::dot(a, b).unwrap_or_else(|| {
        a.iter()
            .zip(b)
            .map(|(&x, &y)| (x as f64) * (y as f64))
            .sum::<f64>()
    })
}
