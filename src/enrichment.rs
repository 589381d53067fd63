//! Enrichment hook (C10 / spec §4.9): optional post-chunking summary and
//! keyword attachment via a [`TextCompletionProvider`].
//!
//! Enrichment never fails the pipeline: a provider error or timeout sets
//! `props.EnrichmentSkipped = true` on the chunk and processing continues
//! (spec §7, "optional-provider errors... never fatal"). Idempotent calls
//! retry with capped exponential backoff, per the recovery discipline in
//! spec §7.

use crate::capability::{CancellationToken, TextCompletionProvider};
use crate::model::DocumentChunk;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum number of attempts for an enrichment call, per spec §7's "up to
/// 3 attempts" recovery discipline.
const MAX_ATTEMPTS: u32 = 3;
/// Base delay for exponential backoff between retries.
const BASE_BACKOFF: Duration = Duration::from_millis(50);

/// Options controlling what the enrichment hook attaches to a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentOptions {
    /// Attach an LLM-generated summary as `props.EnrichedSummary`.
    pub enable_summarization: bool,
    /// Attach extracted keywords as `props.EnrichedKeywords`.
    pub enable_keyword_extraction: bool,
    /// Upper bound on the number of keywords attached.
    pub max_keywords: usize,
}

impl Default for EnrichmentOptions {
    fn default() -> Self {
        Self {
            enable_summarization: true,
            enable_keyword_extraction: true,
            max_keywords: 8,
        }
    }
}

/// Enriches a single chunk in place, attaching `props.EnrichedSummary`,
/// `props.EnrichedKeywords`, and `props.EnrichedTopics` when the
/// corresponding option is enabled and the provider call succeeds.
///
/// On any provider failure (after retries) or cancellation, sets
/// `props.EnrichmentSkipped = true` and returns without propagating an
/// error — enrichment is always best-effort (spec §4.9).
pub async fn enrich_chunk(
    chunk: &mut DocumentChunk,
    options: &EnrichmentOptions,
    completion: &dyn TextCompletionProvider,
    cancellation: &CancellationToken,
) {
    let mut skipped = false;

    if options.enable_summarization {
        match call_with_retry(|| completion.summarize(&chunk.content, cancellation)).await {
            Ok(result) => chunk.set_prop("EnrichedSummary", result.value),
            Err(_) => skipped = true,
        }
    }

    if options.enable_keyword_extraction {
        match call_with_retry(|| completion.extract_metadata(&chunk.content, cancellation)).await {
            Ok(result) => {
                let keywords: Vec<String> = result
                    .value
                    .keywords
                    .into_iter()
                    .take(options.max_keywords)
                    .collect();
                chunk.set_prop("EnrichedKeywords", keywords);
            }
            Err(_) => skipped = true,
        }
    }

    if options.enable_summarization || options.enable_keyword_extraction {
        match call_with_retry(|| completion.analyze_structure(&chunk.content, cancellation)).await {
            Ok(result) => chunk.set_prop("EnrichedTopics", result.value.headings),
            Err(_) => skipped = true,
        }
    }

    if skipped {
        log::warn!("enrichment skipped for chunk {} after provider failure", chunk.id);
        chunk.set_prop("EnrichmentSkipped", true);
    }
}

/// Enriches every chunk in `chunks`, in order. Each chunk's own success or
/// failure is independent (spec §4.9's best-effort guarantee applies per
/// chunk, not to the batch as a whole).
pub async fn enrich_all(
    chunks: &mut [DocumentChunk],
    options: &EnrichmentOptions,
    completion: &dyn TextCompletionProvider,
    cancellation: &CancellationToken,
) {
    for chunk in chunks.iter_mut() {
        if cancellation.is_cancelled() {
            chunk.set_prop("EnrichmentSkipped", true);
            continue;
        }
        enrich_chunk(chunk, options, completion, cancellation).await;
    }
}

async fn call_with_retry<T, F, Fut>(mut call: F) -> crate::error::Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = crate::error::Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < MAX_ATTEMPTS && err.is_retryable() => {
                tokio::time::sleep(BASE_BACKOFF * 2u32.pow(attempt - 1)).await;
            }
            Err(err) => return Err(err),
        }
    }
}
