//! Embedding and rerank collaborators behind narrow trait seams.
//!
//! Chunk text and queries are mapped to fixed-width vectors by an
//! [`EmbeddingProvider`]; an optional [`Reranker`] rescores
//! query/candidate pairs for two-stage retrieval. Both are injected
//! as constructor dependencies so callers control lifecycle and can
//! substitute test doubles.

pub mod error;
pub mod http;
pub mod provider;

#[cfg(feature = "mock")]
pub mod mock;

pub use error::{EmbedError, Result};
pub use http::HttpEmbedder;
pub use provider::{EmbeddingProvider, Reranker, ScoreFuture};

/// Normalize a vector to unit L2 length in place.
///
/// Leaves the vector untouched when its norm is (near) zero, so
/// all-zero embeddings stay all-zero instead of becoming NaN.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::l2_normalize;

    #[test]
    fn normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_zero_vector_unchanged() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }
}
