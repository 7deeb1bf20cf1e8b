//! Build manifest: the human-readable record of one index build.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ChunkingConfig;
use crate::error::Result;

/// Everything needed to reproduce or audit an index build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildManifest {
    /// RFC 3339 build time.
    pub build_timestamp: String,
    /// Per-source statistics, keyed by source id.
    pub sources: BTreeMap<String, SourceStats>,
    pub total_chunks: usize,
    pub total_tokens: usize,
    pub avg_tokens_per_chunk: usize,
    /// Chunking parameters the build used.
    pub chunking: ChunkingConfig,
    pub embeddings: EmbeddingStats,
    pub index: IndexStats,
    /// Component versions, keyed by component name.
    pub versions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStats {
    pub name: String,
    pub path: String,
    pub chunks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingStats {
    pub model: String,
    pub dimension: usize,
    pub normalize: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub kind: String,
    pub vectors: usize,
}

impl BuildManifest {
    /// Write the manifest as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}
