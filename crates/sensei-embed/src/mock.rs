//! Test-only mock embedding and rerank providers.

use std::sync::{Arc, Mutex};

use crate::error::{EmbedError, Result};
use crate::l2_normalize;
use crate::provider::{EmbeddingProvider, Reranker, ScoreFuture};

/// Deterministic embedding provider for tests.
///
/// Vectors are derived from the text bytes and L2-normalized, so
/// identical texts embed identically and inner products behave like
/// cosine scores.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    pub dimension: usize,
    pub fail: bool,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self {
            dimension: 8,
            fail: false,
        }
    }
}

impl MockEmbedder {
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(EmbedError::Other("mock embed failure".into()));
        }
        let mut vector = vec![0.0f32; self.dimension];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % self.dimension] += f32::from(byte) / 255.0;
        }
        l2_normalize(&mut vector);
        Ok(vector)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn model_id(&self) -> &str {
        "mock-embedder"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Mock reranker returning scripted scores, or word-overlap scores
/// when the script runs out.
#[derive(Debug, Clone, Default)]
pub struct MockReranker {
    scores: Arc<Mutex<Vec<f32>>>,
    pub fail: bool,
}

impl MockReranker {
    /// Scripted scores, consumed front to back across calls.
    #[must_use]
    pub fn with_scores(scores: Vec<f32>) -> Self {
        Self {
            scores: Arc::new(Mutex::new(scores)),
            fail: false,
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn overlap(query: &str, candidate: &str) -> f32 {
        let words: Vec<&str> = query.split_whitespace().collect();
        if words.is_empty() {
            return 0.0;
        }
        let hits = words.iter().filter(|w| candidate.contains(**w)).count();
        #[allow(clippy::cast_precision_loss)]
        {
            hits as f32 / words.len() as f32
        }
    }
}

impl Reranker for MockReranker {
    fn score<'a>(&'a self, query: &'a str, candidate: &'a str) -> ScoreFuture<'a> {
        Box::pin(async move {
            if self.fail {
                return Err(EmbedError::Other("mock rerank failure".into()));
            }
            let mut scores = self
                .scores
                .lock()
                .map_err(|_| EmbedError::Other("mock lock poisoned".into()))?;
            if scores.is_empty() {
                Ok(Self::overlap(query, candidate))
            } else {
                Ok(scores.remove(0))
            }
        })
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn model_id(&self) -> &str {
        "mock-reranker"
    }
}
