//! Chunk Markdown serialization (spec §6): YAML front matter, a heading,
//! an optional enrichment block, the chunk body, and a navigation footer.

use crate::model::DocumentChunk;
use std::fmt::Write as _;

/// Renders one chunk as a standalone Markdown document.
///
/// `total` is the sibling count; `enriched` controls whether the
/// `EnrichedSummary`/`EnrichedKeywords` props (if present) are rendered as
/// an enrichment block between the front matter and the body.
#[must_use]
pub fn chunk_to_markdown(chunk: &DocumentChunk, total: usize, enriched: bool) -> String {
    let chunk_number = chunk.index + 1;
    let mut out = String::new();

    out.push_str("---\n");
    let _ = writeln!(out, "chunk: {chunk_number}");
    let _ = writeln!(out, "total: {total}");
    if chunk_number > 1 {
        let _ = writeln!(out, "prev: {}", chunk_number - 1);
    }
    if chunk_number < total {
        let _ = writeln!(out, "next: {}", chunk_number + 1);
    }
    let _ = writeln!(out, "tokens: {}", chunk.tokens);
    let _ = writeln!(out, "quality: {:.2}", chunk.quality.overall);
    if let Some(section) = &chunk.location.section {
        let _ = writeln!(out, "section: {section}");
    }
    if let Some(page) = chunk.location.start_page {
        let _ = writeln!(out, "page: {page}");
    }
    out.push_str("---\n\n");

    let _ = writeln!(out, "# Chunk {chunk_number} of {total}");
    out.push('\n');

    if enriched {
        if let Some(block) = enrichment_block(chunk) {
            out.push_str(&block);
            out.push('\n');
        }
    }

    out.push_str(&chunk.content);
    if !chunk.content.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');

    out.push_str(&navigation_footer(chunk_number, total));
    out.push('\n');

    out
}

fn enrichment_block(chunk: &DocumentChunk) -> Option<String> {
    let summary = chunk.prop_str("EnrichedSummary");
    let keywords = chunk
        .props
        .get("EnrichedKeywords")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        });

    if summary.is_none() && keywords.as_deref().map(str::is_empty).unwrap_or(true) {
        return None;
    }

    let mut block = String::new();
    block.push_str("> **Summary**\n");
    if let Some(summary) = summary {
        let _ = writeln!(block, "> {summary}");
    }
    if let Some(keywords) = keywords.filter(|k| !k.is_empty()) {
        let _ = writeln!(block, ">\n> **Keywords**: {keywords}");
    }
    Some(block)
}

fn navigation_footer(chunk_number: usize, total: usize) -> String {
    let prev = if chunk_number > 1 {
        format!("[\u{2190} Previous](chunk_{}.md)", chunk_number - 1)
    } else {
        "Previous".to_string()
    };
    let next = if chunk_number < total {
        format!("[Next \u{2192}](chunk_{}.md)", chunk_number + 1)
    } else {
        "Next".to_string()
    };
    format!("{prev} | [Info](info.json) | {next}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(index: usize) -> DocumentChunk {
        let mut chunk = DocumentChunk::new("Body text for this chunk.", "Paragraph");
        chunk.index = index;
        chunk.quality.overall = 0.8567;
        chunk
    }

    #[test]
    fn front_matter_rounds_quality_to_two_decimals() {
        let md = chunk_to_markdown(&sample(0), 3, false);
        assert!(md.contains("quality: 0.86"));
    }

    #[test]
    fn first_chunk_front_matter_omits_prev() {
        let md = chunk_to_markdown(&sample(0), 3, false);
        assert!(!md.contains("prev:"));
        assert!(md.contains("next: 2"));
    }

    #[test]
    fn last_chunk_front_matter_omits_next() {
        let md = chunk_to_markdown(&sample(2), 3, false);
        assert!(md.contains("prev: 2"));
        assert!(!md.contains("next:"));
    }

    #[test]
    fn navigation_footer_links_to_adjacent_chunk_files() {
        let md = chunk_to_markdown(&sample(1), 3, false);
        assert!(md.contains("[\u{2190} Previous](chunk_1.md)"));
        assert!(md.contains("[Next \u{2192}](chunk_3.md)"));
        assert!(md.contains("[Info](info.json)"));
    }

    #[test]
    fn enrichment_block_renders_summary_and_keywords_when_present() {
        let mut chunk = sample(0);
        chunk.set_prop("EnrichedSummary", "a short summary");
        chunk.set_prop("EnrichedKeywords", vec!["alpha", "beta"]);
        let md = chunk_to_markdown(&chunk, 1, true);
        assert!(md.contains("a short summary"));
        assert!(md.contains("alpha, beta"));
    }

    #[test]
    fn enrichment_block_is_absent_when_disabled() {
        let mut chunk = sample(0);
        chunk.set_prop("EnrichedSummary", "a short summary");
        let md = chunk_to_markdown(&chunk, 1, false);
        assert!(!md.contains("a short summary"));
    }
}
