use std::pin::Pin;

use crate::error::Result;

/// Boxed future returned by [`Reranker::score`], keeping the trait
/// dyn-compatible so retrievers can hold `Arc<dyn Reranker>`.
pub type ScoreFuture<'a> = Pin<Box<dyn Future<Output = Result<f32>> + Send + 'a>>;

/// Maps text to a fixed-width numeric vector.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to produce a vector.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send;

    /// Embed a batch of texts, preserving order.
    ///
    /// The default implementation embeds sequentially; providers with
    /// a native batch endpoint should override it.
    ///
    /// # Errors
    ///
    /// Returns an error if any embedding call fails.
    fn embed_batch(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send {
        async move {
            let mut vectors = Vec::with_capacity(texts.len());
            for text in texts {
                vectors.push(self.embed(text).await?);
            }
            Ok(vectors)
        }
    }

    /// Identifier of the underlying embedding model.
    fn model_id(&self) -> &str;

    /// Width of the vectors this provider produces.
    fn dimension(&self) -> usize;
}

/// Scores a `(query, candidate)` pair with a cross-encoder-style
/// relevance model. Higher means more relevant.
pub trait Reranker: Send + Sync {
    /// Score one candidate against the query.
    fn score<'a>(&'a self, query: &'a str, candidate: &'a str) -> ScoreFuture<'a>;

    /// Identifier of the underlying rerank model.
    fn model_id(&self) -> &str;
}
