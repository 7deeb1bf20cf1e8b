//! RAG pipeline configuration loaded from a TOML file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Top-level configuration for index builds and retrieval.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RagConfig {
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).context("failed to read RAG config file")?;
            toml::from_str(&content).context("failed to parse RAG config file")
        } else {
            Ok(Self::default())
        }
    }
}

/// One documentation corpus to index.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Short identifier, e.g. `book`.
    pub id: String,
    /// Human label, e.g. `The Rust Book`.
    pub name: String,
    /// Corpus root, relative to the project root.
    pub path: String,
    /// URL prefix for deep-link citations; empty disables them.
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub kind: SourceKind,
    /// Disabled sources are skipped by the build.
    #[serde(default)]
    pub enabled: bool,
}

/// Parser variant for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Hierarchical prose documents with `#` heading markers.
    #[default]
    Markdown,
    /// Annotated Rust exercises (doc comments + code body).
    Rust,
}

impl SourceKind {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Rust => "rs",
        }
    }
}

/// Chunk sizing parameters, in approximate tokens.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_min_tokens")]
    pub min_tokens: usize,
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            min_tokens: default_min_tokens(),
            overlap_tokens: default_overlap_tokens(),
        }
    }
}

fn default_max_tokens() -> usize {
    800
}

fn default_min_tokens() -> usize {
    100
}

fn default_overlap_tokens() -> usize {
    50
}

/// Embedding collaborator settings recorded at build time.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    /// L2-normalize vectors so inner product equals cosine similarity.
    #[serde(default = "default_true")]
    pub normalize: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dimension: default_dimension(),
            normalize: true,
            batch_size: default_batch_size(),
        }
    }
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".into()
}

fn default_dimension() -> usize {
    384
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    32
}

/// Persisted artifact locations, relative to the project root.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
    #[serde(default = "default_metadata_path")]
    pub metadata_path: PathBuf,
    #[serde(default = "default_manifest_path")]
    pub manifest_path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            metadata_path: default_metadata_path(),
            manifest_path: default_manifest_path(),
        }
    }
}

fn default_index_path() -> PathBuf {
    PathBuf::from("rag/index/sensei.index.json")
}

fn default_metadata_path() -> PathBuf {
    PathBuf::from("rag/index/metadata.json")
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("rag/index/manifest.json")
}

/// Query-time options.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Default result count.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Candidate pool size when reranking; `top_k * 3` when unset.
    #[serde(default)]
    pub initial_k: Option<usize>,
    /// Minimum similarity score to accept.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
    #[serde(default = "default_max_citations")]
    pub max_citations: usize,
    /// Token budget for the assembled context string.
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
    /// Enable the two-stage rank-then-rerank pipeline.
    #[serde(default)]
    pub rerank: bool,
    #[serde(default)]
    pub rerank_model: Option<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            initial_k: None,
            score_threshold: default_score_threshold(),
            max_citations: default_max_citations(),
            max_context_tokens: default_max_context_tokens(),
            rerank: false,
            rerank_model: None,
        }
    }
}

fn default_top_k() -> usize {
    4
}

fn default_score_threshold() -> f32 {
    0.3
}

fn default_max_citations() -> usize {
    4
}

fn default_max_context_tokens() -> usize {
    1500
}
