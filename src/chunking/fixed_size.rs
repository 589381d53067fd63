//! FixedSize strategy (spec §4.5.1): length-bounded windows with
//! word-boundary snapping and structure-preserving cut points.

use super::support::{build_windowed_chunks, fixed_size_windows};
use super::{ChunkingOptions, ChunkingStrategy};
use crate::capability::{CancellationToken, EmbeddingProvider, TextCompletionProvider};
use crate::error::Result;
use crate::model::{DocumentChunk, ParsedContent};
use async_trait::async_trait;

/// Splits text into `<= max_chunk_size` windows, snapping to a word boundary
/// and never cutting inside a fenced code block or mid-table-row when
/// `preserve_structure` is set.
pub struct FixedSizeStrategy;

#[async_trait]
impl ChunkingStrategy for FixedSizeStrategy {
    async fn chunk(
        &self,
        content: &ParsedContent,
        options: &ChunkingOptions,
        _embedder: Option<&dyn EmbeddingProvider>,
        _completion: Option<&dyn TextCompletionProvider>,
        cancellation: &CancellationToken,
    ) -> Result<Vec<DocumentChunk>> {
        cancellation.check()?;
        let text = &content.structured_text;
        let windows = fixed_size_windows(text, options.max_chunk_size, options.preserve_structure);
        let mut chunks = build_windowed_chunks(text, &windows, self.name(), options.overlap_size);
        super::support::finalize(&mut chunks, content);
        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "FixedSize"
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

    fn options(max_chunk_size: usize, overlap_size: usize) -> ChunkingOptions {
        ChunkingOptions {
            strategy: super::super::StrategyKind::FixedSize,
            max_chunk_size,
            overlap_size,
            preserve_structure: true,
            strategy_options: Default::default(),
        }
    }

    #[tokio::test]
    async fn splits_long_text_into_bounded_windows() {
        let text = "word ".repeat(500);
        let content = parsed(&text);
        let chunks = FixedSizeStrategy
            .chunk(&content, &options(200, 0), None, None, &CancellationToken::new())
            .await
            .unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.content.len() <= 220));
    }

    #[tokio::test]
    async fn indices_are_assigned_in_ascending_order() {
        let text = "word ".repeat(500);
        let content = parsed(&text);
        let chunks = FixedSizeStrategy
            .chunk(&content, &options(200, 0), None, None, &CancellationToken::new())
            .await
            .unwrap();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[tokio::test]
    async fn overlap_produces_shared_prefix_with_previous_chunk() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa ".repeat(20);
        let content = parsed(&text);
        let chunks = FixedSizeStrategy
            .chunk(&content, &options(100, 20), None, None, &CancellationToken::new())
            .await
            .unwrap();
        assert!(chunks.len() >= 2);
        assert!(chunks[1].prop_bool("HasOverlap").unwrap_or(false));
    }

    #[tokio::test]
    async fn empty_input_produces_no_chunks() {
        let content = parsed("   ");
        let chunks = FixedSizeStrategy
            .chunk(&content, &options(100, 0), None, None, &CancellationToken::new())
            .await
            .unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn fenced_code_block_is_not_split_when_preserving_structure() {
        let text = format!("intro text here.\n\n```rust\n{}\n```\n\noutro.", "x".repeat(150));
        let content = parsed(&text);
        let chunks = FixedSizeStrategy
            .chunk(&content, &options(100, 0), None, None, &CancellationToken::new())
            .await
            .unwrap();
        for chunk in &chunks {
            assert!(!super::super::support::has_unbalanced_fence(&chunk.content));
        }
    }
}
