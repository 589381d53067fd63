//! [`DocumentChunk`]: a single retrieval-ready unit of text plus provenance.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Where a chunk sits within the parsed document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkLocation {
    /// Byte offset of the chunk's first character in `structured_text`.
    pub start_char: usize,
    /// Byte offset one past the chunk's last character.
    pub end_char: usize,
    /// First page the chunk's text appears on, for paginated sources.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub start_page: Option<usize>,
    /// Last page the chunk's text appears on, for paginated sources.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end_page: Option<usize>,
    /// The innermost section title containing this chunk, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub section: Option<String>,
    /// Ordered section titles from document root to the containing section.
    #[serde(default)]
    pub heading_path: Vec<String>,
}

/// Per-chunk quality scores computed by the Quality Engine (C8), each in
/// `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkQuality {
    /// Semantic completeness: does the chunk read as a finished thought.
    pub completeness: f64,
    /// Context independence: can the chunk be understood without its
    /// neighbors.
    pub context_independence: f64,
    /// Information density: proportion of unique, meaningful content.
    pub information_density: f64,
    /// Boundary sharpness: how clean the chunk's start/end are.
    pub boundary_sharpness: f64,
    /// Weighted overall score (spec §4.7).
    pub overall: f64,
}

/// A contiguous, semantically meaningful unit of a parsed document, produced
/// by a chunking strategy (C6) and scored by the Quality Engine (C8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Stable unique identifier.
    pub id: Uuid,
    /// 0-based position within the produced sequence.
    pub index: usize,
    /// Chunk text. Always non-empty.
    pub content: String,
    /// Estimated token count, always `>= 1`.
    pub tokens: usize,
    /// Location within the parsed document.
    pub location: ChunkLocation,
    /// Quality scores.
    pub quality: ChunkQuality,
    /// How important this chunk appears relative to its document, in `[0, 1]`.
    pub importance: f64,
    /// Information density shortcut, mirrors `quality.information_density`.
    pub density: f64,
    /// How dependent this chunk is on surrounding context, in `[0, 1]`
    /// (`1 - context_independence`).
    pub context_dependency: f64,
    /// Identifier of the strategy that produced this chunk, e.g. `"Smart"`
    /// or `"Auto(Smart)"`.
    pub strategy: String,
    /// Extensible strategy-specific attributes (`HierarchyLevel`,
    /// `HasOverlap`, `SentenceIntegrity`, `EnrichedKeywords`, ...).
    #[serde(default)]
    pub props: HashMap<String, serde_json::Value>,
    /// Parent structural chunk, or `Uuid::nil()` if this chunk has none.
    #[serde(default = "Uuid::nil")]
    pub parent_id: Uuid,
    /// Upstream `RawContent` identity, or `Uuid::nil()` if untracked.
    #[serde(default = "Uuid::nil")]
    pub raw_id: Uuid,
    /// Upstream `ParsedContent` identity, or `Uuid::nil()` if untracked.
    #[serde(default = "Uuid::nil")]
    pub parsed_id: Uuid,
}

impl DocumentChunk {
    /// Builds a chunk from its text and owning strategy name, with a fresh
    /// id, estimated token count, and all other fields at their defaults.
    /// Strategies fill in `location`/`props` afterward; `quality` is scored
    /// later by [`crate::chunking::support::finalize`].
    #[must_use]
    pub fn new(content: impl Into<String>, strategy: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: Uuid::new_v4(),
            index: 0,
            tokens: Self::estimate_tokens(&content),
            content,
            location: ChunkLocation::default(),
            quality: ChunkQuality::default(),
            importance: 0.0,
            density: 0.0,
            context_dependency: 0.0,
            strategy: strategy.into(),
            props: HashMap::new(),
            parent_id: Uuid::nil(),
            raw_id: Uuid::nil(),
            parsed_id: Uuid::nil(),
        }
    }

    /// Estimates a token count for `content` using the common ~4-characters-
    /// per-token heuristic, floored at 1 (spec §3: "estimated token count
    /// (integer >= 1)").
    #[must_use]
    pub fn estimate_tokens(content: &str) -> usize {
        (content.chars().count() / 4).max(1)
    }

    /// Sets a strategy-specific prop, overwriting any existing value.
    pub fn set_prop(&mut self, key: &str, value: impl Serialize) {
        if let Ok(value) = serde_json::to_value(value) {
            self.props.insert(key.to_string(), value);
        }
    }

    /// Reads a strategy-specific prop as `bool`, if present and boolean.
    #[must_use]
    pub fn prop_bool(&self, key: &str) -> Option<bool> {
        self.props.get(key).and_then(serde_json::Value::as_bool)
    }

    /// Reads a strategy-specific prop as `f64`, if present and numeric.
    #[must_use]
    pub fn prop_f64(&self, key: &str) -> Option<f64> {
        self.props.get(key).and_then(serde_json::Value::as_f64)
    }

    /// Reads a strategy-specific prop as a string slice, if present.
    #[must_use]
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(serde_json::Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_chunk(content: &str) -> DocumentChunk {
        DocumentChunk {
            id: Uuid::new_v4(),
            index: 0,
            content: content.to_string(),
            tokens: DocumentChunk::estimate_tokens(content),
            location: ChunkLocation::default(),
            quality: ChunkQuality::default(),
            importance: 0.5,
            density: 0.5,
            context_dependency: 0.5,
            strategy: "FixedSize".to_string(),
            props: HashMap::new(),
            parent_id: Uuid::nil(),
            raw_id: Uuid::nil(),
            parsed_id: Uuid::nil(),
        }
    }

    #[test]
    fn new_chunk_has_nil_provenance_and_estimated_tokens() {
        let chunk = DocumentChunk::new("hello world", "FixedSize");
        assert_eq!(chunk.parent_id, Uuid::nil());
        assert_eq!(chunk.tokens, DocumentChunk::estimate_tokens("hello world"));
        assert_eq!(chunk.strategy, "FixedSize");
    }

    #[test]
    fn token_estimate_is_never_zero() {
        assert_eq!(DocumentChunk::estimate_tokens(""), 1);
        assert_eq!(DocumentChunk::estimate_tokens("abc"), 1);
        assert_eq!(DocumentChunk::estimate_tokens(&"a".repeat(40)), 10);
    }

    #[test]
    fn props_round_trip_through_typed_helpers() {
        let mut chunk = blank_chunk("hello world");
        chunk.set_prop("HasOverlap", true);
        chunk.set_prop("SentenceIntegrity", 0.75_f64);
        chunk.set_prop("AutoSelectedStrategy", "Smart");

        assert_eq!(chunk.prop_bool("HasOverlap"), Some(true));
        assert_eq!(chunk.prop_f64("SentenceIntegrity"), Some(0.75));
        assert_eq!(chunk.prop_str("AutoSelectedStrategy"), Some("Smart"));
        assert_eq!(chunk.prop_bool("MissingKey"), None);
    }

    #[test]
    fn missing_provenance_links_default_to_nil_uuid() {
        let chunk = blank_chunk("x");
        assert_eq!(chunk.parent_id, Uuid::nil());
        assert_eq!(chunk.raw_id, Uuid::nil());
        assert_eq!(chunk.parsed_id, Uuid::nil());

        let json = serde_json::to_string(&chunk).unwrap();
        let restored: DocumentChunk = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.parent_id, Uuid::nil());
    }
}
