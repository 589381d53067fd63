//! [`TextCompletionProvider`]: the optional LLM collaborator.
//!
//! Absence of a provider is not an error (spec §4.1): every call site in
//! this crate branches on `Option<Arc<dyn TextCompletionProvider>>` and
//! degrades to a heuristic path, setting `parsing_info.used_llm = false` or
//! `props.EnrichmentSkipped = true` as appropriate.

use crate::capability::CancellationToken;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Wraps a typed completion result with the number of tokens the call
/// consumed, so callers can track spend without a separate API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResult<T> {
    /// The typed payload.
    pub value: T,
    /// Tokens consumed producing `value`.
    pub tokens_used: usize,
}

/// Structure the provider inferred from a document, used by the Adaptive
/// Strategy Selector (C7) to refine its heuristic choice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureAnalysis {
    /// Strategy name the provider suggests, if it has an opinion.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suggested_strategy: Option<String>,
    /// Section/heading titles the provider detected.
    #[serde(default)]
    pub headings: Vec<String>,
    /// Provider's confidence in this analysis, in `[0, 1]`.
    pub confidence: f64,
}

/// Metadata fields a provider extracted from free text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    /// Inferred document title.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    /// Inferred document author.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub author: Option<String>,
    /// Inferred keywords, in descending relevance order.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Inferred BCP-47 language tag.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub language: Option<String>,
}

/// A quality judgment the provider rendered about a chunk or document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Overall quality score in `[0, 1]`.
    pub score: f64,
    /// Human-readable findings, most important first.
    #[serde(default)]
    pub findings: Vec<String>,
}

/// Optional LLM collaborator used by parsing (structure hints), the
/// Adaptive Selector (refinement), and the Enrichment hook (summaries and
/// keywords).
#[async_trait]
pub trait TextCompletionProvider: Send + Sync {
    /// Free-form generation from `prompt`.
    ///
    /// # Errors
    /// Returns [`crate::error::FileFluxError::ProviderError`] or
    /// `Cancelled`.
    async fn generate(
        &self,
        prompt: &str,
        cancellation: &CancellationToken,
    ) -> Result<CompletionResult<String>>;

    /// Infers document structure from `text`.
    ///
    /// # Errors
    /// Same error set as [`TextCompletionProvider::generate`].
    async fn analyze_structure(
        &self,
        text: &str,
        cancellation: &CancellationToken,
    ) -> Result<CompletionResult<StructureAnalysis>>;

    /// Produces a short summary of `text`.
    ///
    /// # Errors
    /// Same error set as [`TextCompletionProvider::generate`].
    async fn summarize(
        &self,
        text: &str,
        cancellation: &CancellationToken,
    ) -> Result<CompletionResult<String>>;

    /// Extracts title/author/keywords/language from `text`.
    ///
    /// # Errors
    /// Same error set as [`TextCompletionProvider::generate`].
    async fn extract_metadata(
        &self,
        text: &str,
        cancellation: &CancellationToken,
    ) -> Result<CompletionResult<ExtractedMetadata>>;

    /// Renders a quality judgment about `text`.
    ///
    /// # Errors
    /// Same error set as [`TextCompletionProvider::generate`].
    async fn assess_quality(
        &self,
        text: &str,
        cancellation: &CancellationToken,
    ) -> Result<CompletionResult<QualityAssessment>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_result_carries_token_usage_alongside_value() {
        let result = CompletionResult {
            value: "summary text".to_string(),
            tokens_used: 42,
        };
        assert_eq!(result.value, "summary text");
        assert_eq!(result.tokens_used, 42);
    }

    #[test]
    fn structure_analysis_defaults_to_no_suggestion() {
        let analysis = StructureAnalysis::default();
        assert!(analysis.suggested_strategy.is_none());
        assert!(analysis.headings.is_empty());
    }
}
