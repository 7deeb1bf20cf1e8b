//! Persisted artifacts: flat inner-product vector index and the
//! index-aligned chunk metadata store.

use std::cmp::Ordering;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chunker::Chunk;
use crate::error::{IndexError, Result};

/// Sentinel id for a padded "no match" search slot.
pub const NO_MATCH: i64 = -1;

/// One nearest-neighbor hit: vector position and similarity score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexHit {
    /// Position of the matched vector, or [`NO_MATCH`].
    pub id: i64,
    pub score: f32,
}

/// Narrow interface to a vector-similarity index.
pub trait VectorSearch: Send + Sync {
    /// Return up to `k` hits ordered by descending score. Positions
    /// beyond the stored vector count are padded with [`NO_MATCH`].
    fn search(&self, query: &[f32], k: usize) -> Vec<IndexHit>;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index type tag recorded in the build manifest.
    fn kind(&self) -> &str;
}

/// Exact-scan flat index scored by inner product. With normalized
/// vectors the score is cosine similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIpIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIpIndex {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Append vectors to the index.
    ///
    /// # Errors
    ///
    /// Returns an error if any vector's width differs from the
    /// index dimensionality.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<()> {
        for vector in &vectors {
            if vector.len() != self.dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }
        self.vectors.extend(vectors);
        Ok(())
    }

    /// Write the index to disk in its own serialization format.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Read an index back from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl VectorSearch for FlatIpIndex {
    fn search(&self, query: &[f32], k: usize) -> Vec<IndexHit> {
        let mut hits: Vec<IndexHit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, vector)| IndexHit {
                id: i64::try_from(i).unwrap_or(i64::MAX),
                score: inner_product(query, vector),
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(k);

        // Pad to k with no-match sentinels when the index holds
        // fewer than k vectors.
        while hits.len() < k {
            hits.push(IndexHit {
                id: NO_MATCH,
                score: f32::MIN,
            });
        }

        hits
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn kind(&self) -> &str {
        "flat_ip"
    }
}

/// Ordered chunk metadata, index-aligned with the vector index:
/// `chunks()[i]` describes the vector at position `i`.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    chunks: Vec<Chunk>,
}

impl ChunkStore {
    #[must_use]
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    /// Look up the chunk behind a search hit. Sentinel and
    /// out-of-range ids yield `None`.
    #[must_use]
    pub fn get(&self, id: i64) -> Option<&Chunk> {
        usize::try_from(id).ok().and_then(|i| self.chunks.get(i))
    }

    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), &self.chunks)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;
        let chunks: Vec<Chunk> = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self { chunks })
    }
}

/// Probe whether both retrieval artifacts exist, before any heavy
/// initialization. The error message names the build step to run.
///
/// # Errors
///
/// Returns [`IndexError::MissingArtifact`] for the first absent file.
pub fn check_available(index_path: &Path, metadata_path: &Path) -> Result<()> {
    if !index_path.exists() {
        return Err(IndexError::MissingArtifact(format!(
            "vector index not found: {}; run the index build (Indexer::build) first",
            index_path.display()
        )));
    }
    if !metadata_path.exists() {
        return Err(IndexError::MissingArtifact(format!(
            "chunk metadata not found: {}; run the index build (Indexer::build) first",
            metadata_path.display()
        )));
    }
    Ok(())
}
