//! One-shot index build: walk → parse → chunk → merge → embed → persist.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use sensei_embed::{EmbeddingProvider, l2_normalize};

use crate::chunker::{Chunk, SourceRef, chunk_section, merge_small_chunks};
use crate::config::{RagConfig, SourceConfig, SourceKind};
use crate::error::Result;
use crate::manifest::{BuildManifest, EmbeddingStats, IndexStats, SourceStats};
use crate::section::{parse_annotated_rust, parse_markdown};
use crate::store::{ChunkStore, FlatIpIndex, VectorSearch};

/// Files shorter than this are skipped as empty shells.
const MIN_FILE_BYTES: usize = 100;

/// Summary of an index build.
#[derive(Debug, Default)]
pub struct IndexReport {
    pub files_scanned: usize,
    pub chunks_per_source: BTreeMap<String, usize>,
    pub total_chunks: usize,
    pub total_tokens: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

/// Orchestrates a full batch build over all enabled sources.
///
/// There is no incremental path: each build replaces the persisted
/// artifacts wholesale.
pub struct Indexer<P: EmbeddingProvider> {
    provider: Arc<P>,
    config: RagConfig,
}

impl<P: EmbeddingProvider> Indexer<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, config: RagConfig) -> Self {
        Self { provider, config }
    }

    /// Build and persist the index, metadata store, and manifest.
    ///
    /// Unreadable source files are logged and skipped; the build
    /// continues over the remaining files.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding fails or artifacts cannot be
    /// written.
    pub async fn build(&self, root: &Path) -> Result<IndexReport> {
        let start = std::time::Instant::now();
        let mut report = IndexReport::default();
        let mut all_chunks: Vec<Chunk> = Vec::new();

        for source in self.config.sources.iter().filter(|s| s.enabled) {
            let chunks = self.process_source(source, root, &mut report).await;
            tracing::info!(source = %source.id, chunks = chunks.len(), "source chunked");
            report.chunks_per_source.insert(source.id.clone(), chunks.len());
            all_chunks.extend(chunks);
        }

        if all_chunks.is_empty() {
            tracing::warn!("no chunks produced; nothing to index");
            report.duration_ms = elapsed_ms(start);
            return Ok(report);
        }

        report.total_chunks = all_chunks.len();
        report.total_tokens = all_chunks.iter().map(|c| c.token_count).sum();

        let mut index = FlatIpIndex::new(self.provider.dimension());
        let texts: Vec<String> = all_chunks.iter().map(|c| c.text.clone()).collect();
        for batch in texts.chunks(self.config.embeddings.batch_size.max(1)) {
            let mut vectors = self.provider.embed_batch(batch).await?;
            if self.config.embeddings.normalize {
                for vector in &mut vectors {
                    l2_normalize(vector);
                }
            }
            index.add(vectors)?;
        }

        self.persist(root, &index, all_chunks, &report)?;

        report.duration_ms = elapsed_ms(start);
        tracing::info!(
            chunks = report.total_chunks,
            tokens = report.total_tokens,
            duration_ms = report.duration_ms,
            "index build finished"
        );
        Ok(report)
    }

    async fn process_source(
        &self,
        source: &SourceConfig,
        root: &Path,
        report: &mut IndexReport,
    ) -> Vec<Chunk> {
        let source_root = root.join(&source.path);
        if !source_root.exists() {
            tracing::warn!(source = %source.id, path = %source_root.display(), "source not found");
            return Vec::new();
        }

        let extension = source.kind.extension();
        let entries: Vec<_> = ignore::WalkBuilder::new(&source_root)
            .hidden(true)
            .git_ignore(true)
            .build()
            .flatten()
            .filter(|e| {
                e.file_type().is_some_and(|ft| ft.is_file())
                    && e.path().extension().is_some_and(|ext| ext == extension)
            })
            .collect();

        let mut chunks: Vec<Chunk> = Vec::new();

        for entry in entries {
            report.files_scanned += 1;

            let content = match tokio::fs::read_to_string(entry.path()).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(file = %entry.path().display(), error = %e, "skipping unreadable file");
                    report.errors.push(format!("{}: {e}", entry.path().display()));
                    continue;
                }
            };

            if content.len() < MIN_FILE_BYTES {
                continue;
            }

            let rel_path = entry
                .path()
                .strip_prefix(&source_root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .to_string();

            let sections = match source.kind {
                SourceKind::Markdown => parse_markdown(&content, &rel_path),
                SourceKind::Rust => parse_annotated_rust(&content, &rel_path),
            };

            let source_ref = SourceRef {
                id: &source.id,
                name: &source.name,
                path: &rel_path,
                base_url: &source.base_url,
            };

            for section in &sections {
                chunks.extend(chunk_section(section, &self.config.chunking, source_ref));
            }
        }

        merge_small_chunks(chunks, self.config.chunking.min_tokens)
    }

    fn persist(
        &self,
        root: &Path,
        index: &FlatIpIndex,
        chunks: Vec<Chunk>,
        report: &IndexReport,
    ) -> Result<()> {
        let index_path = root.join(&self.config.index.path);
        let metadata_path = root.join(&self.config.index.metadata_path);
        let manifest_path = root.join(&self.config.index.manifest_path);

        if let Some(parent) = index_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        index.save(&index_path)?;
        ChunkStore::new(chunks).save(&metadata_path)?;
        self.manifest(index, report).save(&manifest_path)?;

        tracing::debug!(
            index = %index_path.display(),
            metadata = %metadata_path.display(),
            manifest = %manifest_path.display(),
            "artifacts written"
        );
        Ok(())
    }

    fn manifest(&self, index: &FlatIpIndex, report: &IndexReport) -> BuildManifest {
        let sources = self
            .config
            .sources
            .iter()
            .filter(|s| s.enabled)
            .map(|s| {
                (
                    s.id.clone(),
                    SourceStats {
                        name: s.name.clone(),
                        path: s.path.clone(),
                        chunks: report.chunks_per_source.get(&s.id).copied().unwrap_or(0),
                    },
                )
            })
            .collect();

        let mut versions = BTreeMap::new();
        versions.insert(
            "sensei-index".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );

        BuildManifest {
            build_timestamp: chrono::Utc::now().to_rfc3339(),
            sources,
            total_chunks: report.total_chunks,
            total_tokens: report.total_tokens,
            avg_tokens_per_chunk: if report.total_chunks == 0 {
                0
            } else {
                report.total_tokens / report.total_chunks
            },
            chunking: self.config.chunking,
            embeddings: EmbeddingStats {
                model: self.provider.model_id().to_string(),
                dimension: self.provider.dimension(),
                normalize: self.config.embeddings.normalize,
            },
            index: IndexStats {
                kind: index.kind().to_string(),
                vectors: index.len(),
            },
            versions,
        }
    }
}

fn elapsed_ms(start: std::time::Instant) -> u64 {
    start.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensei_embed::mock::MockEmbedder;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn markdown_config() -> RagConfig {
        let mut config = RagConfig::default();
        config.sources.push(crate::config::SourceConfig {
            id: "book".into(),
            name: "The Rust Book".into(),
            path: "docs/book".into(),
            base_url: "https://example.com/book/".into(),
            kind: SourceKind::Markdown,
            enabled: true,
        });
        config
    }

    fn long_markdown(heading: &str) -> String {
        format!("# {heading}\n\n{}\n", "paragraph text here. ".repeat(40))
    }

    #[tokio::test]
    async fn build_persists_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/book/ch01.md", &long_markdown("Getting Started"));
        write(dir.path(), "docs/book/ch02.md", &long_markdown("Ownership"));

        let config = markdown_config();
        let indexer = Indexer::new(Arc::new(MockEmbedder::default()), config.clone());
        let report = indexer.build(dir.path()).await.unwrap();

        assert_eq!(report.files_scanned, 2);
        assert!(report.total_chunks >= 2);
        assert!(report.errors.is_empty());

        assert!(dir.path().join(&config.index.path).exists());
        assert!(dir.path().join(&config.index.metadata_path).exists());
        assert!(dir.path().join(&config.index.manifest_path).exists());

        let index = FlatIpIndex::load(&dir.path().join(&config.index.path)).unwrap();
        let store = ChunkStore::load(&dir.path().join(&config.index.metadata_path)).unwrap();
        assert_eq!(index.len(), store.len(), "metadata must be index-aligned");
    }

    #[tokio::test]
    async fn manifest_records_build_facts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/book/ch01.md", &long_markdown("Traits"));

        let config = markdown_config();
        let indexer = Indexer::new(Arc::new(MockEmbedder::default()), config.clone());
        indexer.build(dir.path()).await.unwrap();

        let manifest =
            BuildManifest::load(&dir.path().join(&config.index.manifest_path)).unwrap();
        assert_eq!(manifest.index.kind, "flat_ip");
        assert_eq!(manifest.embeddings.model, "mock-embedder");
        assert_eq!(manifest.embeddings.dimension, 8);
        assert!(manifest.embeddings.normalize);
        assert_eq!(manifest.sources["book"].name, "The Rust Book");
        assert_eq!(manifest.total_chunks, manifest.index.vectors);
        assert!(manifest.versions.contains_key("sensei-index"));
    }

    #[tokio::test]
    async fn short_and_foreign_files_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/book/ch01.md", &long_markdown("Enums"));
        write(dir.path(), "docs/book/stub.md", "# Stub\ntiny\n");
        write(dir.path(), "docs/book/notes.txt", &"not markdown ".repeat(20));

        let indexer = Indexer::new(Arc::new(MockEmbedder::default()), markdown_config());
        let report = indexer.build(dir.path()).await.unwrap();

        // stub.md is scanned but under the size floor; notes.txt is
        // filtered out by extension before scanning.
        assert_eq!(report.files_scanned, 2);
        assert_eq!(report.chunks_per_source["book"], report.total_chunks);
    }

    #[tokio::test]
    async fn missing_source_directory_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let indexer = Indexer::new(Arc::new(MockEmbedder::default()), markdown_config());
        let report = indexer.build(dir.path()).await.unwrap();
        assert_eq!(report.total_chunks, 0);
        assert!(!dir.path().join("rag/index/metadata.json").exists());
    }

    #[tokio::test]
    async fn embedding_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/book/ch01.md", &long_markdown("Closures"));

        let indexer = Indexer::new(Arc::new(MockEmbedder::failing()), markdown_config());
        assert!(indexer.build(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn rust_source_chunks_exercises() {
        let dir = tempfile::tempdir().unwrap();
        let exercise = format!(
            "// Practice with vectors: push and iterate.\nfn main() {{\n{}}}\n",
            "    let v: Vec<i32> = Vec::new();\n".repeat(5)
        );
        write(dir.path(), "docs/rustlings/vecs/vecs1.rs", &exercise);

        let mut config = RagConfig::default();
        config.sources.push(crate::config::SourceConfig {
            id: "exercises".into(),
            name: "Rustlings".into(),
            path: "docs/rustlings".into(),
            base_url: String::new(),
            kind: SourceKind::Rust,
            enabled: true,
        });

        let indexer = Indexer::new(Arc::new(MockEmbedder::default()), config.clone());
        let report = indexer.build(dir.path()).await.unwrap();
        assert_eq!(report.total_chunks, 1);

        let store = ChunkStore::load(&dir.path().join(&config.index.metadata_path)).unwrap();
        assert_eq!(store.chunks()[0].heading, "Vecs > Vecs1");
        assert!(store.chunks()[0].text.contains("```rust"));
    }

    #[tokio::test]
    async fn disabled_sources_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/book/ch01.md", &long_markdown("Modules"));

        let mut config = markdown_config();
        config.sources[0].enabled = false;

        let indexer = Indexer::new(Arc::new(MockEmbedder::default()), config);
        let report = indexer.build(dir.path()).await.unwrap();
        assert_eq!(report.files_scanned, 0);
        assert_eq!(report.total_chunks, 0);
    }
}
