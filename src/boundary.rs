//! Boundary Detector (C5 / spec §4.4): decides whether a semantic or
//! structural boundary separates two adjacent text segments.

use crate::capability::{cosine_similarity, EmbeddingProvider, EmbeddingPurpose};
use serde::{Deserialize, Serialize};

/// Why a boundary fired, or why it didn't.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryType {
    /// `b` opens a new section, table, list, or code block.
    Section,
    /// `b` opens a fenced code block.
    CodeBlock,
    /// `b` opens a Markdown table.
    Table,
    /// `b` opens a list item.
    List,
    /// Embedding similarity fell below the threshold.
    TopicChange,
}

/// Result of comparing two adjacent segments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryDecision {
    /// Whether a boundary was detected between the segments.
    pub is_boundary: bool,
    /// The kind of boundary, meaningful only when `is_boundary` is true for
    /// structural cases, or always for the embedding path.
    pub boundary_type: BoundaryType,
    /// Cosine similarity between the segments' embeddings, in `[-1, 1]`.
    pub similarity: f32,
    /// Confidence in this decision, in `[0, 1]`.
    pub confidence: f64,
}

/// One entry in a [`BoundaryDetector::detect_boundaries`] batch result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentBoundary {
    /// Index of the segment that `b` was (the later of the compared pair).
    pub segment_index: usize,
    /// The kind of boundary.
    pub boundary_type: BoundaryType,
    /// Cosine similarity between the compared segments.
    pub similarity: f32,
    /// Confidence in this decision.
    pub confidence: f64,
}

/// Detects semantic and structural boundaries between adjacent segments.
///
/// Absent an embedding provider, structural boundaries are still emitted
/// (spec §4.4): non-structural pairs fall back to `sim=0.5, confidence=0.5`
/// rather than failing.
pub struct BoundaryDetector<'a> {
    embedder: Option<&'a dyn EmbeddingProvider>,
    threshold: f64,
}

impl<'a> BoundaryDetector<'a> {
    /// Creates a detector with the default threshold (0.5), clamped into
    /// `[0, 1]` if given out of range.
    #[must_use]
    pub fn new(embedder: Option<&'a dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            threshold: 0.5,
        }
    }

    /// Creates a detector with an explicit similarity threshold, clamped
    /// into `[0, 1]`.
    #[must_use]
    pub fn with_threshold(embedder: Option<&'a dyn EmbeddingProvider>, threshold: f64) -> Self {
        Self {
            embedder,
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    /// Decides whether a boundary separates `a` from `b`.
    pub async fn detect_boundary(&self, a: &str, b: &str) -> BoundaryDecision {
        if a.is_empty() || b.is_empty() {
            return BoundaryDecision {
                is_boundary: true,
                boundary_type: BoundaryType::Section,
                similarity: 0.0,
                confidence: 1.0,
            };
        }

        if let Some(structural) = structural_type(b) {
            return BoundaryDecision {
                is_boundary: true,
                boundary_type: structural,
                similarity: 0.0,
                confidence: 1.0,
            };
        }

        let (similarity, confidence) = match self.embedder {
            Some(provider) => {
                let ea = provider.embed(a, EmbeddingPurpose::Analysis).await;
                let eb = provider.embed(b, EmbeddingPurpose::Analysis).await;
                match (ea, eb) {
                    (Ok(va), Ok(vb)) => {
                        let sim = cosine_similarity(&va, &vb);
                        let confidence = ((self.threshold - sim as f64).abs() * 2.0).clamp(0.0, 1.0);
                        (sim, confidence)
                    }
                    _ => (0.5, 0.5),
                }
            }
            None => (0.5, 0.5),
        };

        BoundaryDecision {
            is_boundary: (similarity as f64) < self.threshold,
            boundary_type: BoundaryType::TopicChange,
            similarity,
            confidence,
        }
    }

    /// Runs [`BoundaryDetector::detect_boundary`] over every adjacent pair in
    /// `segments`, then merges boundaries within distance 1 of each other,
    /// keeping the higher-confidence decision.
    pub async fn detect_boundaries(&self, segments: &[String]) -> Vec<SegmentBoundary> {
        let mut raw = Vec::new();
        for (i, pair) in segments.windows(2).enumerate() {
            let decision = self.detect_boundary(&pair[0], &pair[1]).await;
            if decision.is_boundary {
                raw.push(SegmentBoundary {
                    segment_index: i + 1,
                    boundary_type: decision.boundary_type,
                    similarity: decision.similarity,
                    confidence: decision.confidence,
                });
            }
        }
        merge_adjacent(raw)
    }
}

fn structural_type(segment: &str) -> Option<BoundaryType> {
    let trimmed = segment.trim_start();
    if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
        return Some(BoundaryType::CodeBlock);
    }
    if trimmed.starts_with('#') {
        return Some(BoundaryType::Section);
    }
    if is_table_start(trimmed) {
        return Some(BoundaryType::Table);
    }
    if is_list_start(trimmed) {
        return Some(BoundaryType::List);
    }
    None
}

fn is_table_start(trimmed: &str) -> bool {
    let first_line = trimmed.lines().next().unwrap_or("");
    if !(first_line.starts_with('|') && first_line.trim_end().ends_with('|')) {
        return false;
    }
    trimmed.contains("---")
}

fn is_list_start(trimmed: &str) -> bool {
    if trimmed.starts_with("- ") || trimmed.starts_with("* ") || trimmed.starts_with("+ ") {
        return true;
    }
    let digits: String = trimmed.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return false;
    }
    trimmed[digits.len()..].starts_with(". ")
}

fn merge_adjacent(boundaries: Vec<SegmentBoundary>) -> Vec<SegmentBoundary> {
    let mut merged: Vec<SegmentBoundary> = Vec::with_capacity(boundaries.len());
    for boundary in boundaries {
        if let Some(last) = merged.last_mut() {
            if boundary.segment_index.abs_diff(last.segment_index) <= 1 {
                if boundary.confidence > last.confidence {
                    *last = boundary;
                }
                continue;
            }
        }
        merged.push(boundary);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;

    struct StubEmbedder {
        vectors: std::collections::HashMap<String, Vec<f32>>,
    }

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed(&self, text: &str, _purpose: EmbeddingPurpose) -> Result<Vec<f32>> {
            Ok(self
                .vectors
                .get(text)
                .cloned()
                .unwrap_or_else(|| vec![0.1, 0.1]))
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn empty_segment_forces_section_boundary_with_full_confidence() {
        let detector = BoundaryDetector::new(None);
        let decision = detector.detect_boundary("", "something").await;
        assert!(decision.is_boundary);
        assert_eq!(decision.boundary_type, BoundaryType::Section);
        assert_eq!(decision.similarity, 0.0);
        assert_eq!(decision.confidence, 1.0);
    }

    #[tokio::test]
    async fn structural_prefixes_always_force_a_boundary() {
        let detector = BoundaryDetector::new(None);
        for (b, expected) in [
            ("```rust\ncode", BoundaryType::CodeBlock),
            ("# Heading", BoundaryType::Section),
            ("| x | y |\n|---|---|", BoundaryType::Table),
            ("- item one", BoundaryType::List),
            ("1. item one", BoundaryType::List),
        ] {
            let decision = detector.detect_boundary("preceding text", b).await;
            assert!(decision.is_boundary, "expected boundary before {b:?}");
            assert_eq!(decision.boundary_type, expected, "wrong type for {b:?}");
        }
    }

    #[tokio::test]
    async fn without_embedder_non_structural_pairs_use_midpoint_fallback() {
        let detector = BoundaryDetector::new(None);
        let decision = detector.detect_boundary("plain text a", "plain text b").await;
        assert_eq!(decision.similarity, 0.5);
        assert_eq!(decision.confidence, 0.5);
        assert!(!decision.is_boundary);
    }

    #[tokio::test]
    async fn embedder_below_threshold_triggers_topic_change() {
        let mut vectors = std::collections::HashMap::new();
        vectors.insert("a".to_string(), vec![1.0, 0.0]);
        vectors.insert("b".to_string(), vec![0.0, 1.0]);
        let embedder = StubEmbedder { vectors };
        let detector = BoundaryDetector::new(Some(&embedder));

        let decision = detector.detect_boundary("a", "b").await;
        assert!(decision.is_boundary);
        assert_eq!(decision.boundary_type, BoundaryType::TopicChange);
        assert!((decision.similarity - 0.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn threshold_is_clamped_into_unit_interval() {
        let detector = BoundaryDetector::with_threshold(None, 5.0);
        assert_eq!(detector.threshold, 1.0);
        let detector = BoundaryDetector::with_threshold(None, -3.0);
        assert_eq!(detector.threshold, 0.0);
    }

    #[tokio::test]
    async fn batch_merges_adjacent_boundaries_keeping_higher_confidence() {
        let mut vectors = std::collections::HashMap::new();
        vectors.insert("a".to_string(), vec![1.0, 0.0]);
        vectors.insert("b".to_string(), vec![0.0, 1.0]);
        vectors.insert("c".to_string(), vec![0.0, 1.0]);
        let embedder = StubEmbedder { vectors };
        let detector = BoundaryDetector::new(Some(&embedder));

        let segments = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let boundaries = detector.detect_boundaries(&segments).await;
        assert_eq!(boundaries.len(), 1);
    }
}
