//! [`EmbeddingProvider`]: turns text into vectors for similarity comparison.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Why a piece of text is being embedded. Providers may route different
/// purposes to different models or index namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingPurpose {
    /// One-off analysis, e.g. boundary detection.
    Analysis,
    /// Embeddings destined for a semantic search index.
    SemanticSearch,
    /// Embeddings being persisted for later reuse.
    Storage,
}

/// Produces embeddings and compares them.
///
/// Embeddings must be deterministic for a given `(text, purpose)` pair
/// (spec §4.1) so that callers like the Boundary Detector (C5) get
/// reproducible results.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds `text` for the given `purpose`, returning a fixed-length
    /// vector of floats.
    ///
    /// # Errors
    /// Returns [`crate::error::FileFluxError::ProviderError`] on failure or
    /// timeout; callers treat this as non-fatal and fall back to heuristics.
    async fn embed(&self, text: &str, purpose: EmbeddingPurpose) -> Result<Vec<f32>>;

    /// Dimensionality of vectors this provider returns.
    fn dimensions(&self) -> usize;
}

/// Cosine similarity between two equal-length vectors, in `[-1, 1]`.
///
/// Returns `0.0` for a zero-length or zero-magnitude vector rather than
/// panicking, since boundary detection (C5) must always produce a similarity
/// even for degenerate embeddings.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn mismatched_or_empty_vectors_return_zero_instead_of_panicking() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
