//! Smart strategy (spec §4.5.4): quality-first sentence packing that targets
//! semantic completeness >= 0.7 per chunk.

use super::support::{
    build_chunks_from_sentence_groups, segment_sentences, sentence_aligned_overlap,
    split_on_clauses, Sentence,
};
use super::{ChunkingOptions, ChunkingStrategy};
use crate::capability::{CancellationToken, EmbeddingProvider, TextCompletionProvider};
use crate::error::Result;
use crate::model::{DocumentChunk, ParsedContent};
use crate::quality;
use async_trait::async_trait;

/// Completeness floor a chunk must clear before another sentence is
/// appended (spec §4.5.4: "Targets >=70% semantic completeness per chunk").
const COMPLETENESS_TARGET: f64 = 0.7;

/// Greedily appends sentences to the current group while its completeness
/// stays above [`COMPLETENESS_TARGET`]; closes the group at the last
/// sentence boundary otherwise. Oversized single sentences are split on
/// clause markers and flagged with a `SentenceIntegrity < 1.0` prop.
pub struct SmartStrategy;

#[async_trait]
impl ChunkingStrategy for SmartStrategy {
    async fn chunk(
        &self,
        content: &ParsedContent,
        options: &ChunkingOptions,
        _embedder: Option<&dyn EmbeddingProvider>,
        _completion: Option<&dyn TextCompletionProvider>,
        cancellation: &CancellationToken,
    ) -> Result<Vec<DocumentChunk>> {
        let text = &content.structured_text;
        let sentences = segment_sentences(text);
        if sentences.is_empty() {
            return Ok(Vec::new());
        }

        let mut groups: Vec<Vec<Sentence<'_>>> = Vec::new();
        let mut split_chunks: Vec<(String, usize, usize, f64)> = Vec::new();
        let mut current: Vec<Sentence<'_>> = Vec::new();

        for sentence in sentences {
            cancellation.check()?;

            if sentence.text.len() > options.max_chunk_size {
                if !current.is_empty() {
                    groups.push(std::mem::take(&mut current));
                }
                let mut offset = sentence.start;
                for piece in split_on_clauses(sentence.text, options.max_chunk_size) {
                    let piece_len = piece.len();
                    split_chunks.push((piece, offset, offset + piece_len, 0.5));
                    offset += piece_len;
                }
                continue;
            }

            let mut candidate = current.clone();
            candidate.push(sentence);
            let candidate_text = group_text(text, &candidate);

            if candidate_text.len() > options.max_chunk_size && !current.is_empty() {
                groups.push(std::mem::take(&mut current));
                current.push(sentence);
                continue;
            }

            let candidate_completeness = quality::score_chunk(&candidate_text, 1.0).completeness;
            if candidate_completeness < COMPLETENESS_TARGET && !current.is_empty() {
                groups.push(std::mem::take(&mut current));
                current.push(sentence);
            } else {
                current = candidate;
            }
        }
        if !current.is_empty() {
            groups.push(current);
        }

        let mut chunks = build_chunks_from_sentence_groups(text, &groups, self.name(), 0);
        for chunk in &mut chunks {
            let completeness = quality::score_chunk(&chunk.content, 1.0).completeness;
            chunk.set_prop("Completeness", completeness);
            chunk.set_prop("SemanticCoherence", completeness);
            chunk.set_prop("SentenceIntegrity", 1.0_f64);
        }

        for (body, start, end, integrity) in split_chunks {
            let mut chunk = DocumentChunk::new(body, self.name());
            chunk.location.start_char = start;
            chunk.location.end_char = end;
            let completeness = quality::score_chunk(&chunk.content, integrity).completeness;
            chunk.set_prop("Completeness", completeness);
            chunk.set_prop("SemanticCoherence", completeness);
            chunk.set_prop("SentenceIntegrity", integrity);
            chunks.push(chunk);
        }
        chunks.sort_by_key(|c| c.location.start_char);

        if options.overlap_size > 0 {
            apply_sentence_overlap(&mut chunks, options.overlap_size);
        }

        super::support::finalize(&mut chunks, content);
        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "Smart"
    }
}

fn group_text(text: &str, group: &[Sentence<'_>]) -> String {
    match (group.first(), group.last()) {
        (Some(first), Some(last)) => text[first.start..last.end].to_string(),
        _ => String::new(),
    }
}

/// Prepends sentence-aligned overlap drawn from each chunk's own previous
/// (already-finalized) content, since Smart's groups are built independent
/// of the shared `build_chunks_from_sentence_groups` overlap path once
/// split-sentence chunks are merged back in.
fn apply_sentence_overlap(chunks: &mut [DocumentChunk], overlap_size: usize) {
    for i in (1..chunks.len()).rev() {
        let previous_sentences = segment_sentences(&chunks[i - 1].content);
        let prefix = sentence_aligned_overlap(&previous_sentences, overlap_size);
        if prefix.is_empty() {
            continue;
        }
        chunks[i].content = format!("{prefix}{}", chunks[i].content);
        chunks[i].set_prop("HasOverlap", true);
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
            strategy: super::super::StrategyKind::Smart,
            max_chunk_size,
            overlap_size,
            preserve_structure: true,
            strategy_options: Default::default(),
        }
    }

    #[tokio::test]
    async fn well_formed_paragraphs_meet_completeness_target() {
        let text = "This is a complete sentence about Rust. \
                     It describes a system in clear terms. \
                     Another full sentence follows here. \
                     Chunking text requires careful boundary handling.";
        let content = parsed(text);
        let chunks = SmartStrategy
            .chunk(&content, &options(200, 20), None, None, &CancellationToken::new())
            .await
            .unwrap();
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            let completeness = chunk.prop_f64("Completeness").unwrap_or(0.0);
            let integrity = chunk.prop_f64("SentenceIntegrity").unwrap_or(1.0);
            assert!(completeness >= 0.7 || integrity < 1.0, "chunk: {:?}", chunk.content);
        }
    }

    #[tokio::test]
    async fn oversized_sentence_is_split_on_clauses_and_flagged() {
        let long_sentence = format!(
            "{}.",
            (0..40)
                .map(|i| format!("clause number {i}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let content = parsed(&long_sentence);
        let chunks = SmartStrategy
            .chunk(&content, &options(80, 0), None, None, &CancellationToken::new())
            .await
            .unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks
            .iter()
            .any(|c| c.prop_f64("SentenceIntegrity").unwrap_or(1.0) < 1.0));
    }

    #[tokio::test]
    async fn empty_input_produces_no_chunks() {
        let content = parsed("");
        let chunks = SmartStrategy
            .chunk(&content, &options(100, 0), None, None, &CancellationToken::new())
            .await
            .unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn indices_ascend_from_zero() {
        let text = "Alpha sentence one. Beta sentence two. Gamma sentence three.";
        let content = parsed(text);
        let chunks = SmartStrategy
            .chunk(&content, &options(30, 5), None, None, &CancellationToken::new())
            .await
            .unwrap();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }
}
