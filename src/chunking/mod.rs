//! Chunking Strategy Core (C6 / spec §4.5): turns [`ParsedContent`] into an
//! ordered sequence of [`DocumentChunk`]s. Strategies share behavior via the
//! free functions in [`support`], not inheritance (spec §9).

pub mod auto;
pub mod fixed_size;
pub mod hierarchical;
pub mod intelligent;
pub mod paragraph;
pub mod semantic;
pub mod smart;
pub mod support;

use crate::capability::{CancellationToken, EmbeddingProvider, TextCompletionProvider};
use crate::error::{FileFluxError, Result};
use crate::model::{DocumentChunk, ParsedContent};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which chunking algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum StrategyKind {
    /// Fixed-size windows with word-boundary snapping.
    FixedSize,
    /// Greedy paragraph packing.
    Paragraph,
    /// Boundary-detector-driven sentence stream.
    Semantic,
    /// Quality-first, completeness-targeting sentence packing.
    Smart,
    /// Section-structured parent/child chunks.
    Hierarchical,
    /// Structure-aware single pass treating tables/code as atomic.
    Intelligent,
    /// Delegates to another strategy chosen heuristically or forced.
    Auto,
}

impl StrategyKind {
    /// Parses a strategy name case-sensitively against the canonical
    /// `PascalCase` spelling, returning `None` for unknown names.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "FixedSize" => Some(Self::FixedSize),
            "Paragraph" => Some(Self::Paragraph),
            "Semantic" => Some(Self::Semantic),
            "Smart" => Some(Self::Smart),
            "Hierarchical" => Some(Self::Hierarchical),
            "Intelligent" => Some(Self::Intelligent),
            "Auto" => Some(Self::Auto),
            _ => None,
        }
    }

    /// The canonical name, matching `strategy` field values elsewhere.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FixedSize => "FixedSize",
            Self::Paragraph => "Paragraph",
            Self::Semantic => "Semantic",
            Self::Smart => "Smart",
            Self::Hierarchical => "Hierarchical",
            Self::Intelligent => "Intelligent",
            Self::Auto => "Auto",
        }
    }
}

/// Recognized `strategy_options` keys (spec §4.5). All optional; strategies
/// that don't use a given key ignore it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyOptions {
    /// Auto: minimum selector confidence to accept its choice.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub confidence_threshold: Option<f64>,
    /// Auto: skip selection and delegate to this strategy name.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub force_strategy: Option<String>,
    /// Auto: bias selection toward {FixedSize, Paragraph}.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prefer_speed: Option<bool>,
    /// Auto: bias selection toward {Smart, Semantic, Intelligent}.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prefer_quality: Option<bool>,
    /// Auto: time budget, in seconds, for LLM-assisted selection refinement.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_analysis_time: Option<u64>,
    /// Hierarchical: upper bound on a parent summary chunk's length.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_parent_chunk_size: Option<usize>,
    /// Hierarchical: upper bound on a child body chunk's length.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_child_chunk_size: Option<usize>,
    /// Hierarchical: sections shorter than this are folded into their parent.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min_section_length: Option<usize>,
    /// Hierarchical: deepest section nesting level to descend into.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_hierarchy_depth: Option<usize>,
}

/// Options read by a chunking strategy. Strategies never mutate this (spec
/// §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingOptions {
    /// Which strategy to run.
    pub strategy: StrategyKind,
    /// Target upper bound on a chunk's length, in characters.
    pub max_chunk_size: usize,
    /// Desired overlap, in characters, between consecutive chunks.
    pub overlap_size: usize,
    /// If true, tables and fenced code blocks must not be split.
    pub preserve_structure: bool,
    /// Strategy-specific tuning.
    pub strategy_options: StrategyOptions,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Paragraph,
            max_chunk_size: 1024,
            overlap_size: 0,
            preserve_structure: true,
            strategy_options: StrategyOptions::default(),
        }
    }
}

/// An algorithm that turns [`ParsedContent`] into an ordered chunk sequence
/// (spec glossary: "Strategy").
#[async_trait]
pub trait ChunkingStrategy: Send + Sync {
    /// Produces chunks for `content` under `options`. `embedder` backs
    /// boundary detection (Semantic); `completion` backs LLM-assisted
    /// selection refinement (Auto). Both are optional; every strategy has a
    /// heuristic fallback.
    async fn chunk(
        &self,
        content: &ParsedContent,
        options: &ChunkingOptions,
        embedder: Option<&dyn EmbeddingProvider>,
        completion: Option<&dyn TextCompletionProvider>,
        cancellation: &CancellationToken,
    ) -> Result<Vec<DocumentChunk>>;

    /// The canonical strategy name, matching [`StrategyKind::name`].
    fn name(&self) -> &'static str;
}

/// Builds the concrete strategy for `kind`. Mirrors the pack's
/// factory-over-inheritance pattern for pluggable algorithms.
#[must_use]
pub fn create_strategy(kind: StrategyKind) -> Arc<dyn ChunkingStrategy> {
    match kind {
        StrategyKind::FixedSize => Arc::new(fixed_size::FixedSizeStrategy),
        StrategyKind::Paragraph => Arc::new(paragraph::ParagraphStrategy),
        StrategyKind::Semantic => Arc::new(semantic::SemanticStrategy),
        StrategyKind::Smart => Arc::new(smart::SmartStrategy),
        StrategyKind::Hierarchical => Arc::new(hierarchical::HierarchicalStrategy),
        StrategyKind::Intelligent => Arc::new(intelligent::IntelligentStrategy),
        StrategyKind::Auto => Arc::new(auto::AutoStrategy),
    }
}

/// Every strategy name this crate implements, in spec-declaration order.
#[must_use]
pub const fn available_strategies() -> &'static [&'static str] {
    &[
        "FixedSize",
        "Paragraph",
        "Semantic",
        "Smart",
        "Hierarchical",
        "Intelligent",
        "Auto",
    ]
}

/// Resolves a strategy by name, returning `InvalidOptions` for unknown names
/// (spec §7: "an unknown strategy name is InvalidOptions").
pub fn strategy_by_name(name: &str) -> Result<Arc<dyn ChunkingStrategy>> {
    StrategyKind::parse(name)
        .map(create_strategy)
        .ok_or_else(|| FileFluxError::InvalidOptions(format!("unknown chunking strategy: {name}")))
}

/// A strategy that produced zero chunks for non-empty input is an internal
/// error (spec §7), not a silent empty result. Call after every strategy
/// run.
pub fn ensure_non_empty_output(content_text: &str, chunks: &[DocumentChunk]) -> Result<()> {
    if !content_text.trim().is_empty() && chunks.is_empty() {
        return Err(FileFluxError::InternalError(
            "strategy produced zero chunks for non-empty input".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_kind_round_trips_through_name() {
        for name in available_strategies() {
            let kind = StrategyKind::parse(name).expect("known strategy name");
            assert_eq!(kind.name(), *name);
        }
    }

    #[test]
    fn unknown_strategy_name_is_invalid_options() {
        let err = strategy_by_name("NotAStrategy").unwrap_err();
        assert!(matches!(err, FileFluxError::InvalidOptions(_)));
    }

    #[test]
    fn default_options_use_paragraph_with_1024_char_budget() {
        let options = ChunkingOptions::default();
        assert_eq!(options.strategy, StrategyKind::Paragraph);
        assert_eq!(options.max_chunk_size, 1024);
        assert!(options.preserve_structure);
    }

    #[test]
    fn empty_chunk_list_for_non_empty_input_is_internal_error() {
        let err = ensure_non_empty_output("some text", &[]).unwrap_err();
        assert!(matches!(err, FileFluxError::InternalError(_)));
    }

    #[test]
    fn empty_chunk_list_for_empty_input_is_allowed() {
        assert!(ensure_non_empty_output("   ", &[]).is_ok());
    }
}
