//! Query-time retrieval: similarity search, threshold filtering, and
//! optional two-stage reranking.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use sensei_embed::{EmbeddingProvider, Reranker, l2_normalize};

use crate::chunker::Chunk;
use crate::config::{RagConfig, RetrievalConfig};
use crate::error::Result;
use crate::store::{ChunkStore, FlatIpIndex, VectorSearch, check_available};

/// A retrieved chunk with its relevance score: the index similarity,
/// or the rerank score when the second stage ran.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Retrieves ranked chunks for a query over immutable persisted
/// artifacts. Loading happens once in [`Retriever::open`]; a failed
/// open is permanent for the instance.
pub struct Retriever<P: EmbeddingProvider> {
    index: Box<dyn VectorSearch>,
    store: ChunkStore,
    provider: Arc<P>,
    reranker: Option<Arc<dyn Reranker>>,
    config: RetrievalConfig,
    normalize: bool,
}

impl<P: EmbeddingProvider> std::fmt::Debug for Retriever<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("config", &self.config)
            .field("normalize", &self.normalize)
            .finish_non_exhaustive()
    }
}

impl<P: EmbeddingProvider> Retriever<P> {
    /// Open a retriever over the persisted artifacts under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::IndexError::MissingArtifact`] before loading
    /// anything when either artifact file is absent, or an error if
    /// an artifact is unreadable.
    pub fn open(
        root: &Path,
        config: &RagConfig,
        provider: Arc<P>,
        reranker: Option<Arc<dyn Reranker>>,
    ) -> Result<Self> {
        let index_path = root.join(&config.index.path);
        let metadata_path = root.join(&config.index.metadata_path);
        check_available(&index_path, &metadata_path)?;

        let index = FlatIpIndex::load(&index_path)?;
        let store = ChunkStore::load(&metadata_path)?;

        Ok(Self {
            index: Box::new(index),
            store,
            provider,
            reranker,
            config: config.retrieval.clone(),
            normalize: config.embeddings.normalize,
        })
    }

    /// Assemble a retriever from already-loaded parts. Used by tests
    /// and callers that manage artifacts themselves.
    #[must_use]
    pub fn from_parts(
        index: Box<dyn VectorSearch>,
        store: ChunkStore,
        provider: Arc<P>,
        reranker: Option<Arc<dyn Reranker>>,
        config: RetrievalConfig,
        normalize: bool,
    ) -> Self {
        Self {
            index,
            store,
            provider,
            reranker,
            config,
            normalize,
        }
    }

    /// Retrieve the most relevant chunks for a query, best first.
    ///
    /// No candidate clearing `score_threshold` is a normal outcome:
    /// the result is empty, never an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedding or rerank collaborator fails.
    pub async fn retrieve(&self, query: &str, top_k: Option<usize>) -> Result<Vec<ScoredChunk>> {
        let top_k = top_k.unwrap_or(self.config.top_k);
        let rerank = self.config.rerank && self.reranker.is_some();
        let fetch_k = if rerank {
            self.config.initial_k.unwrap_or(top_k * 3)
        } else {
            top_k
        };

        let mut query_vector = self.provider.embed(query).await?;
        if self.normalize {
            l2_normalize(&mut query_vector);
        }

        let mut candidates = Vec::new();
        for hit in self.index.search(&query_vector, fetch_k) {
            if hit.id < 0 || hit.score < self.config.score_threshold {
                continue;
            }
            if let Some(chunk) = self.store.get(hit.id) {
                candidates.push(ScoredChunk {
                    chunk: chunk.clone(),
                    score: hit.score,
                });
            }
        }

        if rerank && let Some(reranker) = &self.reranker {
            for candidate in &mut candidates {
                candidate.score = reranker.score(query, &candidate.chunk.text).await?;
            }
            // Stable sort: equal rerank scores keep similarity order.
            candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        }

        candidates.truncate(top_k);
        Ok(candidates)
    }

    /// Query-time retrieval options.
    #[must_use]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }
}
