//! Section parsers: heading-scoped spans of one source document.

use std::path::Path;

/// Deepest heading level the prose parser recognizes.
const MAX_HEADING_DEPTH: usize = 3;

/// A heading-scoped span of one source document, the intermediate
/// unit between raw text and chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Body text belonging to this heading scope.
    pub content: String,
    /// Heading path from document root, joined by `" > "`.
    pub heading: String,
    /// Nesting depth of the heading that opened this section.
    pub level: usize,
    /// URL-safe slug of this section's own heading text.
    pub anchor: String,
}

/// Convert text into a URL-safe anchor slug.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        if c.is_alphanumeric() || c == '-' {
            slug.push(c);
        } else if (c.is_whitespace() || c == '_') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Title-case a file-name-ish string: `-`/`_` become spaces, each
/// word capitalized.
fn title_from_stem(stem: &str) -> String {
    stem.replace(['-', '_'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn file_stem(rel_path: &str) -> String {
    Path::new(rel_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

struct Heading<'a> {
    /// Byte offset where the heading line starts.
    start: usize,
    /// Byte offset just past the heading line.
    end: usize,
    level: usize,
    title: &'a str,
}

fn parse_heading_line(line: &str) -> Option<(usize, &str)> {
    let level = line.bytes().take_while(|&b| b == b'#').count();
    if level == 0 || level > MAX_HEADING_DEPTH {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let title = rest.trim();
    if title.is_empty() { None } else { Some((level, title)) }
}

/// Parse a prose document into heading-scoped sections.
///
/// Maintains a stack of `(level, title)` pairs: a heading of level
/// `L` pops every entry at level >= `L`, so the stack is always the
/// live ancestor chain and its titles form the heading path. A
/// document with no headings becomes one section titled after the
/// file name.
#[must_use]
pub fn parse_markdown(content: &str, rel_path: &str) -> Vec<Section> {
    let mut headings: Vec<Heading<'_>> = Vec::new();
    let mut pos = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if let Some((level, title)) = parse_heading_line(trimmed) {
            headings.push(Heading {
                start: pos,
                end: pos + line.len(),
                level,
                title,
            });
        }
        pos += line.len();
    }

    if headings.is_empty() {
        let stem = file_stem(rel_path);
        return vec![Section {
            content: content.trim().to_string(),
            heading: title_from_stem(&stem),
            level: 1,
            anchor: slugify(&stem),
        }];
    }

    let mut sections = Vec::new();
    let mut stack: Vec<(usize, &str)> = Vec::new();

    for (i, heading) in headings.iter().enumerate() {
        let body_end = headings.get(i + 1).map_or(content.len(), |next| next.start);
        let body = content[heading.end..body_end].trim();

        while stack.last().is_some_and(|(level, _)| *level >= heading.level) {
            stack.pop();
        }
        stack.push((heading.level, heading.title));

        if body.is_empty() {
            continue;
        }

        let full_heading = stack
            .iter()
            .map(|(_, title)| *title)
            .collect::<Vec<_>>()
            .join(" > ");

        sections.push(Section {
            content: body.to_string(),
            heading: full_heading,
            level: heading.level,
            anchor: slugify(heading.title),
        });
    }

    sections
}

/// Parse an annotated Rust exercise into at most one section.
///
/// Comment lines become prose, code lines become a fenced block, and
/// `TODO`/`FIXME` marker comments are discarded. A file with no code
/// body yields no section.
#[must_use]
pub fn parse_annotated_rust(content: &str, rel_path: &str) -> Vec<Section> {
    let path = Path::new(rel_path);
    let stem = file_stem(rel_path);
    let category = path
        .parent()
        .and_then(Path::file_name)
        .map_or_else(|| "general".to_string(), |s| s.to_string_lossy().into_owned());

    let heading = format!(
        "{} > {}",
        title_from_stem(&category),
        title_from_stem(&stem)
    );

    let mut doc_lines: Vec<String> = Vec::new();
    let mut code_lines: Vec<&str> = Vec::new();
    let mut in_block_comment = false;

    for line in content.lines() {
        let stripped = line.trim();

        if stripped.contains("/*") {
            in_block_comment = true;
        }
        if stripped.contains("*/") {
            in_block_comment = false;
            continue;
        }

        if in_block_comment {
            doc_lines.push(stripped.trim_start_matches(['*', ' ']).to_string());
        } else if let Some(rest) = stripped
            .strip_prefix("///")
            .or_else(|| stripped.strip_prefix("//!"))
        {
            doc_lines.push(rest.trim().to_string());
        } else if let Some(rest) = stripped.strip_prefix("//") {
            let comment = rest.trim();
            if !comment.is_empty() && !comment.starts_with("TODO") && !comment.starts_with("FIXME")
            {
                doc_lines.push(comment.to_string());
            }
        } else {
            code_lines.push(line);
        }
    }

    let doc_text = doc_lines.join("\n").trim().to_string();
    let code_text = code_lines.join("\n").trim().to_string();

    if code_text.is_empty() {
        return Vec::new();
    }

    let mut body = String::new();
    if !doc_text.is_empty() {
        body.push_str(&doc_text);
        body.push_str("\n\n");
    }
    body.push_str("```rust\n");
    body.push_str(&code_text);
    body.push_str("\n```");

    vec![Section {
        content: body,
        heading,
        level: 2,
        anchor: slugify(&stem),
    }]
}
