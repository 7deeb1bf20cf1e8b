//! Section chunking: paragraph-granular splits with trailing overlap,
//! plus a greedy merge pass for undersized chunks.

use serde::{Deserialize, Serialize};

use crate::config::ChunkingConfig;
use crate::section::Section;

/// A retrieval-sized unit of text with source metadata. Persisted
/// alongside the vector index, index-aligned with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Content, ready to be embedded and shown to a reader.
    pub text: String,
    /// Short corpus identifier, e.g. `book`.
    pub source: String,
    /// Human label of the corpus, e.g. `The Rust Book`.
    pub source_name: String,
    /// Originating file path, relative to the corpus root.
    pub path: String,
    /// Heading path, suffixed with ` (part N)` when split.
    pub heading: String,
    /// Anchor slug, suffixed with `-N` when split.
    pub anchor: String,
    /// Approximate size, used only for budgeting.
    pub token_count: usize,
    /// Corpus-level URL prefix for deep links; empty when absent.
    #[serde(default)]
    pub base_url: String,
}

/// Identity of the corpus a section came from.
#[derive(Debug, Clone, Copy)]
pub struct SourceRef<'a> {
    pub id: &'a str,
    pub name: &'a str,
    /// File path relative to the corpus root.
    pub path: &'a str,
    pub base_url: &'a str,
}

/// Estimate token count using the chars/4 heuristic.
///
/// A deliberate approximation for budgeting, never tokenizer-exact.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Chunk one section.
///
/// Sections within `max_tokens` pass through unchanged. Oversized
/// sections split on blank-line paragraph boundaries with greedy
/// accumulation; each flush seeds the next buffer with the trailing
/// paragraphs that fit in `overlap_tokens`, walked backwards. A
/// single paragraph larger than `max_tokens` is never split further.
#[must_use]
pub fn chunk_section(
    section: &Section,
    params: &ChunkingConfig,
    source: SourceRef<'_>,
) -> Vec<Chunk> {
    let token_count = estimate_tokens(&section.content);
    if token_count <= params.max_tokens {
        return vec![Chunk {
            text: section.content.clone(),
            source: source.id.to_string(),
            source_name: source.name.to_string(),
            path: source.path.to_string(),
            heading: section.heading.clone(),
            anchor: section.anchor.clone(),
            token_count,
            base_url: source.base_url.to_string(),
        }];
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0usize;
    let mut part = 0usize;

    for paragraph in section.content.split("\n\n") {
        let paragraph_tokens = estimate_tokens(paragraph);

        if current_tokens + paragraph_tokens > params.max_tokens && !current.is_empty() {
            let text = current.join("\n\n");
            chunks.push(Chunk {
                token_count: estimate_tokens(&text),
                text,
                source: source.id.to_string(),
                source_name: source.name.to_string(),
                path: source.path.to_string(),
                heading: format!("{} (part {})", section.heading, part + 1),
                anchor: format!("{}-{part}", section.anchor),
                base_url: source.base_url.to_string(),
            });

            // Seed the next buffer with trailing paragraphs within the
            // overlap budget, walking the flushed buffer backwards.
            let mut overlap: Vec<&str> = Vec::new();
            let mut overlap_tokens = 0usize;
            for p in current.iter().rev() {
                let p_tokens = estimate_tokens(p);
                if overlap_tokens + p_tokens > params.overlap_tokens {
                    break;
                }
                overlap.insert(0, p);
                overlap_tokens += p_tokens;
            }

            current = overlap;
            current_tokens = overlap_tokens;
            part += 1;
        }

        current.push(paragraph);
        current_tokens += paragraph_tokens;
    }

    if !current.is_empty() {
        let text = current.join("\n\n");
        let (heading, anchor) = if part > 0 {
            (
                format!("{} (part {})", section.heading, part + 1),
                format!("{}-{part}", section.anchor),
            )
        } else {
            // The section never actually split; no suffix.
            (section.heading.clone(), section.anchor.clone())
        };
        chunks.push(Chunk {
            token_count: estimate_tokens(&text),
            text,
            source: source.id.to_string(),
            source_name: source.name.to_string(),
            path: source.path.to_string(),
            heading,
            anchor,
            base_url: source.base_url.to_string(),
        });
    }

    chunks
}

/// Merge undersized chunks with their following neighbor.
///
/// Single sequential pass holding at most one pending small chunk.
/// A merge keeps the first chunk's heading/anchor/base_url; differing
/// paths are both recorded. A pending buffer left at end-of-sequence
/// is emitted as-is, even under `min_tokens`.
#[must_use]
pub fn merge_small_chunks(chunks: Vec<Chunk>, min_tokens: usize) -> Vec<Chunk> {
    let mut merged = Vec::with_capacity(chunks.len());
    let mut buffer: Option<Chunk> = None;

    for chunk in chunks {
        match buffer.take() {
            None => {
                if chunk.token_count < min_tokens {
                    buffer = Some(chunk);
                } else {
                    merged.push(chunk);
                }
            }
            Some(held) => {
                let text = format!("{}\n\n{}", held.text, chunk.text);
                let combined = Chunk {
                    token_count: estimate_tokens(&text),
                    text,
                    source: chunk.source,
                    source_name: chunk.source_name,
                    path: if held.path == chunk.path {
                        held.path
                    } else {
                        format!("{}, {}", held.path, chunk.path)
                    },
                    heading: held.heading,
                    anchor: held.anchor,
                    base_url: held.base_url,
                };

                if combined.token_count < min_tokens {
                    buffer = Some(combined);
                } else {
                    merged.push(combined);
                }
            }
        }
    }

    if let Some(held) = buffer {
        merged.push(held);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: SourceRef<'static> = SourceRef {
        id: "book",
        name: "The Rust Book",
        path: "ch04/ownership.md",
        base_url: "https://doc.rust-lang.org/book/",
    };

    fn section(content: &str) -> Section {
        Section {
            content: content.to_string(),
            heading: "Ownership > What Is Ownership".to_string(),
            level: 2,
            anchor: "what-is-ownership".to_string(),
        }
    }

    fn params(max: usize, min: usize, overlap: usize) -> ChunkingConfig {
        ChunkingConfig {
            max_tokens: max,
            min_tokens: min,
            overlap_tokens: overlap,
        }
    }

    fn paragraph(chars: usize) -> String {
        "x".repeat(chars)
    }

    #[test]
    fn small_section_passes_through() {
        let chunks = chunk_section(&section("short body"), &params(800, 100, 50), SOURCE);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].heading, "Ownership > What Is Ownership");
        assert_eq!(chunks[0].anchor, "what-is-ownership");
        assert_eq!(chunks[0].source, "book");
        assert_eq!(chunks[0].base_url, "https://doc.rust-lang.org/book/");
    }

    #[test]
    fn oversized_section_splits_with_part_suffixes() {
        // Three 100-token paragraphs against a 150-token budget.
        let content = [paragraph(400), paragraph(400), paragraph(400)].join("\n\n");
        let chunks = chunk_section(&section(&content), &params(150, 10, 0), SOURCE);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].heading, "Ownership > What Is Ownership (part 1)");
        assert_eq!(chunks[0].anchor, "what-is-ownership-0");
        assert_eq!(chunks[2].heading, "Ownership > What Is Ownership (part 3)");
        assert_eq!(chunks[2].anchor, "what-is-ownership-2");
    }

    #[test]
    fn split_chunks_share_overlap_paragraphs() {
        let paragraphs = ["a".repeat(200), "b".repeat(200), "c".repeat(200), "d".repeat(200)];
        let content = paragraphs.join("\n\n");
        // 50-token paragraphs, 100 max, 50 overlap: each flush reseeds
        // with the last flushed paragraph.
        let chunks = chunk_section(&section(&content), &params(100, 10, 50), SOURCE);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let tail = pair[0].text.split("\n\n").last().unwrap();
            assert!(
                pair[1].text.starts_with(tail),
                "expected trailing paragraph carried into next chunk"
            );
        }
    }

    #[test]
    fn atomic_oversized_paragraph_kept_whole() {
        // One paragraph over budget: no split below paragraph granularity.
        let content = paragraph(4000);
        let chunks = chunk_section(&section(&content), &params(100, 10, 0), SOURCE);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].token_count > 100);
        assert_eq!(chunks[0].heading, "Ownership > What Is Ownership");
    }

    #[test]
    fn chunk_sizes_within_bounds_after_split() {
        // 50-token paragraphs, 140-token budget: two fit per chunk.
        let content = (0..20).map(|_| paragraph(200)).collect::<Vec<_>>().join("\n\n");
        let chunks = chunk_section(&section(&content), &params(140, 10, 0), SOURCE);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.token_count <= 140, "chunk over max: {}", chunk.token_count);
        }
    }

    fn chunk(token_chars: usize, path: &str) -> Chunk {
        Chunk {
            text: "y".repeat(token_chars),
            source: "book".into(),
            source_name: "The Rust Book".into(),
            path: path.into(),
            heading: format!("H {path}"),
            anchor: format!("a-{path}"),
            token_count: token_chars / 4,
            base_url: String::new(),
        }
    }

    #[test]
    fn merge_combines_small_with_next() {
        let merged = merge_small_chunks(vec![chunk(40, "a.md"), chunk(800, "a.md")], 100);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].heading, "H a.md", "first chunk's identity kept");
        assert!(merged[0].token_count >= 100);
        assert!(merged[0].text.contains("\n\n"));
    }

    #[test]
    fn merge_records_both_paths_when_different() {
        let merged = merge_small_chunks(vec![chunk(40, "a.md"), chunk(800, "b.md")], 100);
        assert_eq!(merged[0].path, "a.md, b.md");
    }

    #[test]
    fn merge_chains_consecutive_small_chunks() {
        let merged = merge_small_chunks(
            vec![chunk(40, "a.md"), chunk(40, "a.md"), chunk(800, "a.md")],
            100,
        );
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn trailing_small_buffer_emitted_as_is() {
        let merged = merge_small_chunks(vec![chunk(800, "a.md"), chunk(40, "a.md")], 100);
        assert_eq!(merged.len(), 2);
        assert!(merged[1].token_count < 100, "no later neighbor to merge with");
    }

    #[test]
    fn merge_is_idempotent() {
        let input = vec![
            chunk(40, "a.md"),
            chunk(800, "a.md"),
            chunk(600, "b.md"),
            chunk(40, "b.md"),
        ];
        let once = merge_small_chunks(input, 100);
        let twice = merge_small_chunks(once.clone(), 100);
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_large_chunks_untouched() {
        let input = vec![chunk(800, "a.md"), chunk(800, "b.md")];
        let merged = merge_small_chunks(input.clone(), 100);
        assert_eq!(merged, input);
    }

    #[test]
    fn estimate_tokens_chars_over_four() {
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 0);
    }

    mod proptest_chunker {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn chunking_never_panics(
                content in "\\PC{0,2000}",
                max_tokens in 1usize..400,
                overlap_tokens in 0usize..100,
            ) {
                let params = ChunkingConfig {
                    max_tokens,
                    min_tokens: 0,
                    overlap_tokens,
                };
                let _ = chunk_section(&section(&content), &params, SOURCE);
            }

            #[test]
            fn every_paragraph_lands_in_some_chunk(
                paragraph_sizes in proptest::collection::vec(1usize..600, 1..12),
                max_tokens in 20usize..150,
            ) {
                let paragraphs: Vec<String> = paragraph_sizes
                    .iter()
                    .enumerate()
                    .map(|(i, n)| format!("p{i}-{}", "z".repeat(*n)))
                    .collect();
                let content = paragraphs.join("\n\n");
                let params = ChunkingConfig {
                    max_tokens,
                    min_tokens: 0,
                    overlap_tokens: 0,
                };
                let chunks = chunk_section(&section(&content), &params, SOURCE);
                for paragraph in &paragraphs {
                    prop_assert!(
                        chunks.iter().any(|c| c.text.contains(paragraph.as_str())),
                        "paragraph missing from all chunks"
                    );
                }
            }

            #[test]
            fn merge_twice_equals_merge_once(
                sizes in proptest::collection::vec(0usize..400, 0..16),
                min_tokens in 1usize..120,
            ) {
                let input: Vec<Chunk> = sizes
                    .iter()
                    .map(|n| super::chunk(n * 4, "f.md"))
                    .collect();
                let once = merge_small_chunks(input, min_tokens);
                let twice = merge_small_chunks(once.clone(), min_tokens);
                prop_assert_eq!(once, twice);
            }
        }
    }
}
