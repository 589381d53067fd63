//! Paragraph strategy (spec §4.5.2): greedy paragraph packing with a
//! FixedSize fallback for any paragraph that alone exceeds the budget.

use super::support::{build_windowed_chunks, fixed_size_windows, segment_paragraphs};
use super::{ChunkingOptions, ChunkingStrategy};
use crate::capability::{CancellationToken, EmbeddingProvider, TextCompletionProvider};
use crate::error::Result;
use crate::model::{DocumentChunk, ParsedContent};
use async_trait::async_trait;

/// Packs paragraphs greedily until the next one would exceed
/// `max_chunk_size`; paragraphs longer than the budget are split with the
/// same windowing FixedSize uses.
pub struct ParagraphStrategy;

#[async_trait]
impl ChunkingStrategy for ParagraphStrategy {
    async fn chunk(
        &self,
        content: &ParsedContent,
        options: &ChunkingOptions,
        _embedder: Option<&dyn EmbeddingProvider>,
        _completion: Option<&dyn TextCompletionProvider>,
        cancellation: &CancellationToken,
    ) -> Result<Vec<DocumentChunk>> {
        let text = &content.structured_text;
        let paragraphs = segment_paragraphs(text);

        let mut windows: Vec<(usize, usize)> = Vec::new();
        let mut current: Option<(usize, usize)> = None;

        for paragraph in paragraphs {
            cancellation.check()?;

            if paragraph.end - paragraph.start > options.max_chunk_size {
                if let Some(span) = current.take() {
                    windows.push(span);
                }
                let sub_windows = fixed_size_windows(
                    paragraph.text,
                    options.max_chunk_size,
                    options.preserve_structure,
                );
                windows.extend(sub_windows.into_iter().map(|(s, e)| (paragraph.start + s, paragraph.start + e)));
                continue;
            }

            match current {
                None => current = Some((paragraph.start, paragraph.end)),
                Some((start, _)) => {
                    if paragraph.end - start > options.max_chunk_size {
                        windows.push(current.take().unwrap());
                        current = Some((paragraph.start, paragraph.end));
                    } else {
                        current = Some((start, paragraph.end));
                    }
                }
            }
        }
        if let Some(span) = current {
            windows.push(span);
        }

        let mut chunks = build_windowed_chunks(text, &windows, self.name(), options.overlap_size);
        super::support::finalize(&mut chunks, content);
        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "Paragraph"
    }
}
