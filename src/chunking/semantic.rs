//! Semantic strategy (spec §4.5.3): closes a chunk when the Boundary
//! Detector fires on a sentence-segmented stream, or when the size budget
//! is reached.

use super::support::{build_chunks_from_sentence_groups, segment_sentences, Sentence};
use super::{ChunkingOptions, ChunkingStrategy};
use crate::boundary::BoundaryDetector;
use crate::capability::{CancellationToken, EmbeddingProvider, TextCompletionProvider};
use crate::error::Result;
use crate::model::{DocumentChunk, ParsedContent};
use async_trait::async_trait;

/// Groups sentences using the Boundary Detector: a chunk closes when either
/// a boundary fires and the current group is already at least half the
/// size budget, or the group reaches the full budget.
pub struct SemanticStrategy;

#[async_trait]
impl ChunkingStrategy for SemanticStrategy {
    async fn chunk(
        &self,
        content: &ParsedContent,
        options: &ChunkingOptions,
        embedder: Option<&dyn EmbeddingProvider>,
        _completion: Option<&dyn TextCompletionProvider>,
        cancellation: &CancellationToken,
    ) -> Result<Vec<DocumentChunk>> {
        let text = &content.structured_text;
        let sentences = segment_sentences(text);
        if sentences.is_empty() {
            return Ok(Vec::new());
        }

        let detector = BoundaryDetector::new(embedder);
        let half_budget = options.max_chunk_size / 2;

        let mut groups: Vec<Vec<Sentence<'_>>> = Vec::new();
        let mut current: Vec<Sentence<'_>> = Vec::new();
        let mut current_len = 0usize;

        for sentence in sentences {
            cancellation.check()?;

            if current.is_empty() {
                current.push(sentence);
                current_len = sentence.text.len();
                continue;
            }

            let would_exceed = current_len + sentence.text.len() > options.max_chunk_size;
            let boundary_ready = current_len >= half_budget
                && detector
                    .detect_boundary(current.last().unwrap().text, sentence.text)
                    .await
                    .is_boundary;

            if would_exceed || boundary_ready {
                groups.push(std::mem::take(&mut current));
                current_len = 0;
            }

            current_len += sentence.text.len();
            current.push(sentence);
        }
        if !current.is_empty() {
            groups.push(current);
        }

        let mut chunks =
            build_chunks_from_sentence_groups(text, &groups, self.name(), options.overlap_size);
        super::support::finalize(&mut chunks, content);
        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "Semantic"
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
            strategy: super::super::StrategyKind::Semantic,
            max_chunk_size,
            overlap_size,
            preserve_structure: true,
            strategy_options: Default::default(),
        }
    }

    #[tokio::test]
    async fn closes_chunk_once_size_budget_reached_without_embedder() {
        let text = "One sentence here. Two sentence here. Three sentence here. Four sentence here.";
        let content = parsed(text);
        let chunks = SemanticStrategy
            .chunk(&content, &options(40, 0), None, None, &CancellationToken::new())
            .await
            .unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| !c.content.is_empty()));
    }

    #[tokio::test]
    async fn indices_ascend_from_zero() {
        let text = "One. Two. Three. Four. Five. Six.";
        let content = parsed(text);
        let chunks = SemanticStrategy
            .chunk(&content, &options(10, 0), None, None, &CancellationToken::new())
            .await
            .unwrap();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[tokio::test]
    async fn empty_input_produces_no_chunks() {
        let content = parsed("");
        let chunks = SemanticStrategy
            .chunk(&content, &options(100, 0), None, None, &CancellationToken::new())
            .await
            .unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn single_short_sentence_stays_in_one_chunk() {
        let content = parsed("Just one short sentence.");
        let chunks = SemanticStrategy
            .chunk(&content, &options(1024, 0), None, None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(chunks.len(), 1);
    }
}
