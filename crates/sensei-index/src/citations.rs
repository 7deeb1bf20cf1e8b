//! Human-readable source citations with optional deep links into the
//! published documentation.

use std::collections::HashSet;

use crate::chunker::Chunk;
use crate::retriever::ScoredChunk;

/// Format a single citation line, `[Source]` or `[Source — Heading]`,
/// with the deep link appended in parentheses when requested and the
/// chunk carries a `base_url`.
#[must_use]
pub fn format_citation(chunk: &Chunk, include_url: bool) -> String {
    let base = if chunk.heading.is_empty() {
        format!("[{}]", chunk.source_name)
    } else {
        format!("[{} — {}]", chunk.source_name, chunk.heading)
    };

    if include_url
        && let Some(url) = source_url(chunk)
    {
        return format!("{base} ({url})");
    }
    base
}

/// Build the published-page URL for a chunk, or `None` when its
/// source has no `base_url` configured.
///
/// Markdown paths map onto their rendered page (`.md` becomes
/// `.html`); navigation-only filenames (index, README, SUMMARY) are
/// dropped so the link lands on the directory page instead.
#[must_use]
pub fn source_url(chunk: &Chunk) -> Option<String> {
    if chunk.base_url.is_empty() {
        return None;
    }

    let base = chunk.base_url.trim_end_matches('/');
    let page = page_path(&chunk.path);
    let mut url = format!("{base}/{page}");
    if !chunk.anchor.is_empty() {
        url.push('#');
        url.push_str(&chunk.anchor);
    }
    Some(url)
}

fn page_path(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let (dir, file) = match normalized.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", normalized.as_str()),
    };
    let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);

    if matches!(stem, "index" | "README" | "SUMMARY") {
        return dir.to_owned();
    }
    match file.rsplit_once('.') {
        Some((_, "md")) if dir.is_empty() => format!("{stem}.html"),
        Some((_, "md")) => format!("{dir}/{stem}.html"),
        _ => normalized,
    }
}

/// Collect unique citations from ranked chunks, first occurrence
/// first, stopping once `max_citations` are gathered.
///
/// The dedup key never contains the URL, so chunks from the same
/// heading that differ only by anchor collapse to one entry; the
/// displayed line keeps the first occurrence's link.
#[must_use]
pub fn get_citations(
    chunks: &[ScoredChunk],
    max_citations: usize,
    include_urls: bool,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut citations = Vec::new();

    for scored in chunks {
        let key = format_citation(&scored.chunk, false);
        if seen.insert(key.clone()) {
            if include_urls {
                citations.push(format_citation(&scored.chunk, true));
            } else {
                citations.push(key);
            }
            if citations.len() >= max_citations {
                break;
            }
        }
    }

    citations
}
