//! Pure similarity and hashing primitives shared by the candidate
//! generators and the experiment bucketer. No side effects.

use std::collections::HashMap;

/// Cosine similarity between two dense vectors.
///
/// Returns 0.0 when either vector has zero norm. Callers guarantee equal
/// dimensions; trailing components of the longer vector are ignored.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Cosine similarity between two sparse vectors keyed by entity ID.
///
/// Missing keys contribute 0, so the dot product only needs the
/// intersection while the norms run over each map in full.
pub fn cosine_similarity_sparse(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(key, &va)| b.get(key).map(|&vb| va * vb))
        .sum();
    let norm_a: f64 = a.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b: f64 = b.values().map(|v| v * v).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Component-wise mean of a set of vectors. Empty input yields an empty
/// vector; dimensions follow the first vector.
pub fn average_vector(vectors: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = vectors.first() else {
        return Vec::new();
    };

    let mut avg = vec![0.0f32; first.len()];
    for vector in vectors {
        for (slot, value) in avg.iter_mut().zip(vector.iter()) {
            *slot += value;
        }
    }

    let count = vectors.len() as f32;
    for slot in avg.iter_mut() {
        *slot /= count;
    }
    avg
}

/// Deterministic 32-bit string hash reduced to a bucket index.
///
/// `h = h * 31 + byte` with wrapping arithmetic, so the same input maps to
/// the same bucket on every call and every process.
pub fn hash_bucket(input: &str, buckets: u32) -> u32 {
    let mut hash: i32 = 0;
    for byte in input.bytes() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(byte as i32);
    }
    hash.unsigned_abs() % buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_symmetry() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![0.5, 0.1, 0.9];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_cosine_self_is_one() {
        let a = vec![0.3, 0.7, 0.1];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let a = vec![1.0, 2.0, 3.0];
        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_sparse_cosine_matches_dense() {
        let a: HashMap<String, f64> = [("x".to_string(), 1.0), ("y".to_string(), 2.0)]
            .into_iter()
            .collect();
        let b: HashMap<String, f64> = [("y".to_string(), 2.0), ("z".to_string(), 1.0)]
            .into_iter()
            .collect();

        // dot = 4, |a| = sqrt(5), |b| = sqrt(5)
        let expected = 4.0 / 5.0;
        assert!((cosine_similarity_sparse(&a, &b) - expected).abs() < 1e-9);
        assert!((cosine_similarity_sparse(&b, &a) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_sparse_cosine_disjoint_keys() {
        let a: HashMap<String, f64> = [("x".to_string(), 1.0)].into_iter().collect();
        let b: HashMap<String, f64> = [("y".to_string(), 1.0)].into_iter().collect();
        assert_eq!(cosine_similarity_sparse(&a, &b), 0.0);
    }

    #[test]
    fn test_average_vector() {
        let vectors = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
        assert_eq!(average_vector(&vectors), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_average_vector_empty() {
        assert!(average_vector(&[]).is_empty());
    }

    #[test]
    fn test_hash_bucket_deterministic() {
        let first = hash_bucket("user-1-recommendation_algorithm", 100);
        let second = hash_bucket("user-1-recommendation_algorithm", 100);
        assert_eq!(first, second);
        assert!(first < 100);
    }

    #[test]
    fn test_hash_bucket_spread() {
        // 1000 distinct inputs should touch a healthy share of 100 buckets.
        let mut seen = std::collections::HashSet::new();
        for i in 0..1000 {
            seen.insert(hash_bucket(&format!("user{}", i), 100));
        }
        assert!(seen.len() > 80, "only {} buckets hit", seen.len());
    }
}
