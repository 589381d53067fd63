//! Intelligent strategy (spec §4.5.6): a structure-aware single pass that
//! treats Markdown tables and fenced code blocks as atomic units and keeps
//! headings glued to their following body text.

use super::support::fixed_size_windows;
use super::{ChunkingOptions, ChunkingStrategy};
use crate::capability::{CancellationToken, EmbeddingProvider, TextCompletionProvider};
use crate::error::Result;
use crate::model::{DocumentChunk, ParsedContent};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

static HEADING_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{1,6}\s").unwrap());
static FENCE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(```|~~~)").unwrap());
static TABLE_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\|.*\|\s*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Heading,
    CodeBlock,
    Table,
    Text,
}

struct Block<'a> {
    kind: BlockKind,
    start: usize,
    end: usize,
    text: &'a str,
}

pub struct IntelligentStrategy;

#[async_trait]
impl ChunkingStrategy for IntelligentStrategy {
    async fn chunk(
        &self,
        content: &ParsedContent,
        options: &ChunkingOptions,
        _embedder: Option<&dyn EmbeddingProvider>,
        _completion: Option<&dyn TextCompletionProvider>,
        cancellation: &CancellationToken,
    ) -> Result<Vec<DocumentChunk>> {
        let text = &content.structured_text;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let blocks = segment_blocks(text);
        let mut chunks = Vec::new();
        let mut current_start: Option<usize> = None;
        let mut current_end = 0usize;
        let mut current_has_table = false;

        let mut i = 0;
        while i < blocks.len() {
            cancellation.check()?;
            let block = &blocks[i];

            // Atomic blocks (tables, code) never split; headings glue to the
            // immediately following text block. A table that would otherwise
            // exceed max_chunk_size gets a doubled budget and is still kept
            // atomic here rather than HTML-wrapped — the Normalizer (phase 5)
            // already wraps any complex table upstream of this strategy, so
            // by the time a table block reaches here it's either valid
            // `|`-row Markdown or already an HTML `<table>` block.
            let atomic_len = block.end - block.start;
            let effective_max = if block.kind == BlockKind::Table {
                options.max_chunk_size * 2
            } else {
                options.max_chunk_size
            };

            let pending_len = current_start.map(|s| current_end - s).unwrap_or(0);
            let would_exceed = pending_len > 0 && pending_len + atomic_len > effective_max;

            if (block.kind == BlockKind::Table || block.kind == BlockKind::CodeBlock) && would_exceed {
                flush(text, current_start, current_end, current_has_table, self.name(), &mut chunks);
                current_start = None;
                current_has_table = false;
            }

            match current_start {
                None => {
                    current_start = Some(block.start);
                    current_end = block.end;
                    current_has_table = block.kind == BlockKind::Table;
                }
                Some(start) => {
                    if block.kind == BlockKind::Heading {
                        // Always start a new chunk at a heading boundary
                        // unless nothing has accumulated yet beyond the
                        // heading itself.
                        if current_end > start {
                            flush(text, current_start, current_end, current_has_table, self.name(), &mut chunks);
                        }
                        current_start = Some(block.start);
                        current_end = block.end;
                        current_has_table = false;
                    } else if pending_len + atomic_len <= effective_max || block.kind != BlockKind::Text {
                        current_end = block.end;
                        current_has_table = current_has_table || block.kind == BlockKind::Table;
                    } else {
                        // Oversized plain text: flush what we have, then
                        // window the remainder with FixedSize semantics.
                        flush(text, current_start, current_end, current_has_table, self.name(), &mut chunks);
                        for (s, e) in fixed_size_windows(block.text, options.max_chunk_size, true) {
                            let mut chunk =
                                DocumentChunk::new(&block.text[s..e], self.name());
                            chunk.location.start_char = block.start + s;
                            chunk.location.end_char = block.start + e;
                            chunks.push(chunk);
                        }
                        current_start = None;
                        current_has_table = false;
                    }
                }
            }
            i += 1;
        }
        flush(text, current_start, current_end, current_has_table, self.name(), &mut chunks);

        super::support::finalize(&mut chunks, content);
        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "Intelligent"
    }
}

fn flush(
    text: &str,
    start: Option<usize>,
    end: usize,
    has_table: bool,
    strategy_name: &str,
    out: &mut Vec<DocumentChunk>,
) {
    let Some(start) = start else { return };
    if start >= end {
        return;
    }
    let body = &text[start..end];
    if body.trim().is_empty() {
        return;
    }
    let mut chunk = DocumentChunk::new(body, strategy_name);
    chunk.location.start_char = start;
    chunk.location.end_char = end;
    if has_table {
        chunk.set_prop("ContainsTable", true);
    }
    out.push(chunk);
}

/// Splits `text` into heading / fenced-code-block / table / plain-text
/// blocks, each kept atomic for code/table and line-granular otherwise.
fn segment_blocks(text: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let bytes_len = text.len();
    let mut in_fence = false;
    let mut fence_marker = "";
    let mut block_start = 0usize;
    let mut block_kind = BlockKind::Text;

    let lines: Vec<(usize, &str)> = {
        let mut v = Vec::new();
        let mut idx = 0usize;
        for line in text.split_inclusive('\n') {
            v.push((idx, line));
            idx += line.len();
        }
        v
    };

    for (offset, line_with_nl) in lines {
        let trimmed = line_with_nl.trim_end_matches('\n');
        let trimmed_start = trimmed.trim_start();

        if in_fence {
            if trimmed_start.starts_with(fence_marker) {
                in_fence = false;
                let end = offset + line_with_nl.len();
                blocks.push(Block { kind: BlockKind::CodeBlock, start: block_start, end, text: &text[block_start..end] });
                block_start = end;
                block_kind = BlockKind::Text;
            }
            continue;
        }

        if FENCE_LINE.is_match(trimmed_start) {
            if block_kind != BlockKind::Text || offset > block_start {
                close_pending(&mut blocks, block_kind, block_start, offset, text);
            }
            block_start = offset;
            fence_marker = if trimmed_start.starts_with("```") { "```" } else { "~~~" };
            in_fence = true;
            continue;
        }

        if HEADING_LINE.is_match(trimmed) {
            close_pending(&mut blocks, block_kind, block_start, offset, text);
            let end = offset + line_with_nl.len();
            blocks.push(Block { kind: BlockKind::Heading, start: offset, end, text: &text[offset..end] });
            block_start = end;
            block_kind = BlockKind::Text;
            continue;
        }

        if TABLE_ROW.is_match(trimmed) {
            if block_kind != BlockKind::Table {
                close_pending(&mut blocks, block_kind, block_start, offset, text);
                block_start = offset;
                block_kind = BlockKind::Table;
            }
            continue;
        }

        if block_kind == BlockKind::Table {
            close_pending(&mut blocks, block_kind, block_start, offset, text);
            block_start = offset;
            block_kind = BlockKind::Text;
        }
    }

    if in_fence {
        blocks.push(Block { kind: BlockKind::CodeBlock, start: block_start, end: bytes_len, text: &text[block_start..bytes_len] });
    } else {
        close_pending(&mut blocks, block_kind, block_start, bytes_len, text);
    }

    blocks.retain(|b| b.start < b.end);
    blocks
}

fn close_pending<'a>(blocks: &mut Vec<Block<'a>>, kind: BlockKind, start: usize, end: usize, text: &'a str) {
    if end > start {
        blocks.push(Block { kind, start, end, text: &text[start..end] });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SourceFormat;
    use crate::model::{DocumentMetadata, ParsedQuality, ParsingInfo};
    use chrono::Utc;
    use std::time::Duration;

    fn parsed(text: &str) -> ParsedContent {
        ParsedContent {
            structured_text: text.to_string(),
            original_text: text.to_string(),
            metadata: DocumentMetadata {
                file_name: "doc.md".to_string(),
                file_type: SourceFormat::Markdown,
                title: None,
                author: None,
                language: None,
                language_confidence: None,
                page_count: None,
                word_count: text.split_whitespace().count(),
                created: None,
                modified: None,
                processed: Utc::now(),
            },
            structure: Vec::new(),
            quality: ParsedQuality::default(),
            parsing_info: ParsingInfo {
                used_llm: false,
                parser_id: "stub".to_string(),
                elapsed: Duration::from_millis(1),
                warnings: Vec::new(),
            },
            page_ranges: None,
        }
    }

    fn options(max_chunk_size: usize) -> ChunkingOptions {
        ChunkingOptions {
            strategy: super::super::StrategyKind::Intelligent,
            max_chunk_size,
            overlap_size: 0,
            preserve_structure: true,
            strategy_options: Default::default(),
        }
    }

    #[tokio::test]
    async fn table_stays_in_a_single_chunk() {
        let text = "# A\n\n| x | y |\n|---|---|\n| 1 | 2 |\n\n## B\nbody";
        let content = parsed(text);
        let chunks = IntelligentStrategy
            .chunk(&content, &options(1024), None, None, &CancellationToken::new())
            .await
            .unwrap();
        let table_chunks: Vec<_> = chunks.iter().filter(|c| c.content.contains("| 1 | 2 |")).collect();
        assert_eq!(table_chunks.len(), 1);
        assert_eq!(table_chunks[0].content.matches("| 1 | 2 |").count(), 1);
    }

    #[tokio::test]
    async fn fenced_code_block_is_never_split() {
        let code = "x\n".repeat(100);
        let text = format!("intro\n\n```rust\n{code}```\n\noutro");
        let content = parsed(&text);
        let chunks = IntelligentStrategy
            .chunk(&content, &options(50), None, None, &CancellationToken::new())
            .await
            .unwrap();
        for chunk in &chunks {
            assert!(!super::super::support::has_unbalanced_fence(&chunk.content));
        }
    }

    #[tokio::test]
    async fn empty_input_produces_no_chunks() {
        let content = parsed("   ");
        let chunks = IntelligentStrategy
            .chunk(&content, &options(100), None, None, &CancellationToken::new())
            .await
            .unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn indices_ascend_from_zero() {
        let text = "# A\n\nbody one\n\n## B\n\nbody two";
        let content = parsed(text);
        let chunks = IntelligentStrategy
            .chunk(&content, &options(20), None, None, &CancellationToken::new())
            .await
            .unwrap();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }
}
