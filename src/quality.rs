//! Quality Engine (C8 / spec §4.7): per-chunk and per-document quality
//! scoring, plus threshold-triggered recommendations.

use crate::model::{ChunkQuality, DocumentChunk, DocumentMetadata};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static COORDINATING_CONJUNCTIONS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["and", "but", "or", "nor", "so", "yet", "for"].into_iter().collect());

static PRONOUNS_AND_DEMONSTRATIVES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "it", "this", "that", "these", "those", "he", "she", "they", "them", "its", "their",
        "his", "her",
    ]
    .into_iter()
    .collect()
});

static REFERENTIAL_PHRASES: Lazy<[&'static str; 4]> =
    Lazy::new(|| ["as mentioned", "see above", "as discussed", "as noted"]);

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "to", "of", "in",
        "on", "at", "for", "with", "by", "as", "that", "this", "it", "and", "or", "but", "not",
        "from", "have", "has", "had", "do", "does", "did", "will", "would", "can", "could",
        "should", "may", "might", "i", "you", "he", "she", "we", "they",
    ]
    .into_iter()
    .collect()
});

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z][A-Za-z'-]*|\d+([.,]\d+)?").unwrap());
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+([.,]\d+)?$").unwrap());
static PROPER_NOUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][a-z]+").unwrap());

/// Weight applied to `completeness` in [`ChunkQuality::overall`].
pub const W_COMPLETENESS: f64 = 0.3;
/// Weight applied to `context_independence` in [`ChunkQuality::overall`].
pub const W_INDEPENDENCE: f64 = 0.2;
/// Weight applied to `information_density` in [`ChunkQuality::overall`].
pub const W_DENSITY: f64 = 0.2;
/// Weight applied to `boundary_sharpness` in [`ChunkQuality::overall`].
pub const W_BOUNDARY: f64 = 0.2;
/// Weight applied to `sentence_integrity` (a strategy-supplied prop, not a
/// `ChunkQuality` field) in [`ChunkQuality::overall`].
pub const W_SENTENCE_INTEGRITY: f64 = 0.1;

/// Scores a single chunk's text, producing every [`ChunkQuality`] field per
/// the exact weighting in spec §4.7. `sentence_integrity` comes from the
/// chunk's own `props.SentenceIntegrity` (default 1.0 when the strategy
/// never flagged a clause-split sentence).
#[must_use]
pub fn score_chunk(text: &str, sentence_integrity: f64) -> ChunkQuality {
    let completeness = semantic_completeness(text);
    let context_independence = context_independence(text);
    let information_density = information_density(text);
    let boundary_sharpness = boundary_sharpness(text);

    let overall = (W_COMPLETENESS * completeness
        + W_INDEPENDENCE * context_independence
        + W_DENSITY * information_density
        + W_BOUNDARY * boundary_sharpness
        + W_SENTENCE_INTEGRITY * sentence_integrity.clamp(0.0, 1.0))
    .clamp(0.0, 1.0);

    ChunkQuality {
        completeness,
        context_independence,
        information_density,
        boundary_sharpness,
        overall,
    }
}

fn semantic_completeness(text: &str) -> f64 {
    let trimmed = text.trim();
    let mut score = 1.0;

    let starts_lowercase = trimmed
        .chars()
        .next()
        .map(|c| c.is_lowercase())
        .unwrap_or(false);
    if starts_lowercase {
        score -= 0.15;
    }

    let first_word = trimmed.split_whitespace().next().unwrap_or("");
    if COORDINATING_CONJUNCTIONS.contains(first_word.to_lowercase().as_str()) {
        score -= 0.15;
    }

    if trimmed.ends_with("...") || trimmed.ends_with('\u{2026}') {
        score -= 0.15;
    }

    if !balanced_brackets_and_quotes(trimmed) {
        score -= 0.15;
    }

    if !ends_with_terminal_punctuation(trimmed) {
        score -= 0.15;
    }

    score.clamp(0.0, 1.0)
}

fn context_independence(text: &str) -> f64 {
    let trimmed = text.trim();
    let mut score = 1.0;

    let first_word = trimmed
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    if PRONOUNS_AND_DEMONSTRATIVES.contains(first_word.as_str()) {
        score -= 0.15;
    }

    let lower = trimmed.to_lowercase();
    if REFERENTIAL_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        score -= 0.1;
    }

    let words: Vec<String> = WORD
        .find_iter(trimmed)
        .map(|m| m.as_str().to_lowercase())
        .collect();
    let pronoun_count = words
        .iter()
        .filter(|w| PRONOUNS_AND_DEMONSTRATIVES.contains(w.as_str()))
        .count();
    let noun_like_count = words
        .iter()
        .filter(|w| !STOPWORDS.contains(w.as_str()) && !NUMBER.is_match(w))
        .count()
        .max(1);
    let pronoun_ratio = (pronoun_count as f64) / (noun_like_count as f64);
    score -= (pronoun_ratio * 0.2).min(0.2);

    score.clamp(0.0, 1.0)
}

fn information_density(text: &str) -> f64 {
    let words: Vec<&str> = WORD.find_iter(text).map(|m| m.as_str()).collect();
    if words.is_empty() {
        return 0.0;
    }

    let total = words.len();
    let content_words: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| !STOPWORDS.contains(w.to_lowercase().as_str()))
        .collect();
    let unique_content: HashSet<String> = content_words.iter().map(|w| w.to_lowercase()).collect();

    let mut score = unique_content.len() as f64 / total as f64;

    let proper_noun_count = words.iter().filter(|w| PROPER_NOUN.is_match(w)).count();
    let number_count = words.iter().filter(|w| NUMBER.is_match(w)).count();
    score += (proper_noun_count as f64 / total as f64) * 0.15;
    score += (number_count as f64 / total as f64) * 0.1;

    if content_words.is_empty() {
        score -= 0.3;
    }

    score.clamp(0.0, 1.0)
}

fn boundary_sharpness(text: &str) -> f64 {
    let trimmed = text.trim();
    let mut score = 0.0;

    let starts_clean = trimmed
        .chars()
        .next()
        .map(|c| c.is_uppercase() || c.is_numeric())
        .unwrap_or(false)
        || trimmed.starts_with('#')
        || trimmed.starts_with("```")
        || trimmed.starts_with("~~~");
    if starts_clean {
        score += 0.2;
    }

    let ends_clean =
        ends_with_terminal_punctuation(trimmed) || trimmed.ends_with("```") || trimmed.ends_with("~~~");
    if ends_clean {
        score += 0.2;
    }

    let first_word = trimmed.split_whitespace().next().unwrap_or("");
    if !first_word.is_empty() && first_word.chars().next().unwrap().is_uppercase() {
        score += 0.1;
    }

    let starts_mid_sentence = trimmed
        .chars()
        .next()
        .map(|c| c.is_lowercase())
        .unwrap_or(false);
    if starts_mid_sentence {
        score -= 0.3;
    }

    score.clamp(0.0, 1.0)
}

fn ends_with_terminal_punctuation(text: &str) -> bool {
    matches!(text.chars().last(), Some('.') | Some('!') | Some('?') | Some('\u{3002}'))
}

fn balanced_brackets_and_quotes(text: &str) -> bool {
    let mut stack = Vec::new();
    for c in text.chars() {
        match c {
            '(' | '[' | '{' => stack.push(c),
            ')' => {
                if stack.pop() != Some('(') {
                    return false;
                }
            }
            ']' => {
                if stack.pop() != Some('[') {
                    return false;
                }
            }
            '}' => {
                if stack.pop() != Some('{') {
                    return false;
                }
            }
            _ => {}
        }
    }
    if !stack.is_empty() {
        return false;
    }
    text.matches('"').count() % 2 == 0
}

/// Per-document aggregate metrics (spec §4.7), computed from a strategy's
/// finalized chunk sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentQualityMetrics {
    /// Mean `quality.completeness` across chunks.
    pub average_completeness: f64,
    /// `1 - stddev(completeness)`, clamped to `[0, 1]`.
    pub content_consistency: f64,
    /// Mean `quality.boundary_sharpness` across chunks.
    pub boundary_quality: f64,
    /// `1 - coefficient_of_variation(chunk sizes)`, clamped to `[0, 1]`.
    pub size_distribution: f64,
    /// Fraction of consecutive chunk pairs with 10-40% textual overlap.
    pub overlap_effectiveness: f64,
}

/// Aggregates per-chunk quality into document-level metrics.
#[must_use]
pub fn aggregate(chunks: &[DocumentChunk]) -> DocumentQualityMetrics {
    if chunks.is_empty() {
        return DocumentQualityMetrics::default();
    }

    let n = chunks.len() as f64;
    let average_completeness = chunks.iter().map(|c| c.quality.completeness).sum::<f64>() / n;
    let variance = chunks
        .iter()
        .map(|c| (c.quality.completeness - average_completeness).powi(2))
        .sum::<f64>()
        / n;
    let content_consistency = (1.0 - variance.sqrt()).clamp(0.0, 1.0);

    let boundary_quality = chunks.iter().map(|c| c.quality.boundary_sharpness).sum::<f64>() / n;

    let sizes: Vec<f64> = chunks.iter().map(|c| c.content.chars().count() as f64).collect();
    let mean_size = sizes.iter().sum::<f64>() / n;
    let size_variance = sizes.iter().map(|s| (s - mean_size).powi(2)).sum::<f64>() / n;
    let coefficient_of_variation = if mean_size > 0.0 {
        size_variance.sqrt() / mean_size
    } else {
        0.0
    };
    let size_distribution = (1.0 - coefficient_of_variation).clamp(0.0, 1.0);

    let mut pairs_with_overlap = 0usize;
    let mut total_pairs = 0usize;
    for pair in chunks.windows(2) {
        total_pairs += 1;
        let overlap_ratio = textual_overlap_ratio(&pair[0].content, &pair[1].content);
        if (0.10..=0.40).contains(&overlap_ratio) {
            pairs_with_overlap += 1;
        }
    }
    let overlap_effectiveness = if total_pairs > 0 {
        pairs_with_overlap as f64 / total_pairs as f64
    } else {
        0.0
    };

    DocumentQualityMetrics {
        average_completeness,
        content_consistency,
        boundary_quality,
        size_distribution,
        overlap_effectiveness,
    }
}

fn textual_overlap_ratio(previous: &str, next: &str) -> f64 {
    let max_check = previous.len().min(next.len());
    let mut overlap_len = 0;
    for len in (1..=max_check).rev() {
        if previous.ends_with(&previous[previous.len() - len..]) && next.starts_with(&previous[previous.len() - len..]) {
            overlap_len = len;
            break;
        }
    }
    if next.is_empty() {
        0.0
    } else {
        overlap_len as f64 / next.len() as f64
    }
}

/// The kind of improvement a [`Recommendation`] suggests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// Chunks are too small/large or inconsistently sized.
    ChunkSizeOptimization,
    /// The document's structural markup could be improved before chunking.
    StructureImprovement,
    /// Document metadata fields are sparse.
    MetadataEnhancement,
    /// The document has no usable title.
    TitleImprovement,
    /// The document has no usable description/summary.
    DescriptionEnhancement,
    /// Chunks read as context-dependent; consider more overlap.
    ContextAddition,
}

/// A human-readable, prioritized suggestion for improving chunk quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// The kind of improvement.
    pub kind: RecommendationKind,
    /// 1 (low) to 10 (high).
    pub priority: u8,
    /// Human-readable explanation.
    pub message: String,
}

/// Generates recommendations by comparing `metrics` and `metadata` against
/// calibrated thresholds (spec §4.7). Order is highest priority first.
#[must_use]
pub fn recommendations(
    metrics: &DocumentQualityMetrics,
    metadata: &DocumentMetadata,
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    if metrics.average_completeness < 0.6 {
        out.push(Recommendation {
            kind: RecommendationKind::ChunkSizeOptimization,
            priority: 8,
            message: format!(
                "Average chunk completeness is {:.2}; consider a larger max_chunk_size or a quality-first strategy.",
                metrics.average_completeness
            ),
        });
    }

    if metrics.boundary_quality < 0.5 {
        out.push(Recommendation {
            kind: RecommendationKind::StructureImprovement,
            priority: 7,
            message: "Chunk boundaries are frequently unclean; enable preserve_structure or switch to Intelligent.".to_string(),
        });
    }

    if metrics.content_consistency < 0.5 {
        out.push(Recommendation {
            kind: RecommendationKind::ContextAddition,
            priority: 5,
            message: "Chunk quality varies widely across the document; consider increasing overlap_size.".to_string(),
        });
    }

    if metadata.title.is_none() {
        out.push(Recommendation {
            kind: RecommendationKind::TitleImprovement,
            priority: 4,
            message: "No document title was detected; supply one via metadata or enrichment.".to_string(),
        });
    }

    if metadata.author.is_none() && metadata.language.is_none() {
        out.push(Recommendation {
            kind: RecommendationKind::MetadataEnhancement,
            priority: 3,
            message: "Author and language metadata are both missing.".to_string(),
        });
    }

    if metrics.size_distribution < 0.5 {
        out.push(Recommendation {
            kind: RecommendationKind::DescriptionEnhancement,
            priority: 2,
            message: "Chunk sizes are unevenly distributed; a document summary may help retrieval ranking.".to_string(),
        });
    }

    out.sort_by(|a, b| b.priority.cmp(&a.priority));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::format::SourceFormat;

    fn metadata(title: Option<&str>) -> DocumentMetadata {
        DocumentMetadata {
            file_name: "doc.md".to_string(),
            file_type: SourceFormat::Markdown,
            title: title.map(str::to_string),
            author: None,
            language: None,
            language_confidence: None,
            page_count: None,
            word_count: 10,
            created: None,
            modified: None,
            processed: Utc::now(),
        }
    }

    #[test]
    fn well_formed_sentence_scores_high_completeness() {
        let quality = score_chunk("This is a complete and well-formed sentence.", 1.0);
        assert!(quality.completeness > 0.9);
    }

    #[test]
    fn lowercase_start_and_no_terminal_punctuation_penalize_completeness() {
        let quality = score_chunk("continuing from before with no ending", 1.0);
        assert!(quality.completeness < 0.85);
    }

    #[test]
    fn leading_pronoun_without_antecedent_penalizes_independence() {
        let quality = score_chunk("It describes the process in detail.", 1.0);
        assert!(quality.context_independence < 1.0);
    }

    #[test]
    fn overall_uses_exact_spec_weights() {
        let text = "This is a clear, complete sentence about Rust programming.";
        let quality = score_chunk(text, 0.8);
        let expected = 0.3 * quality.completeness
            + 0.2 * quality.context_independence
            + 0.2 * quality.information_density
            + 0.2 * quality.boundary_sharpness
            + 0.1 * 0.8;
        assert!((quality.overall - expected.clamp(0.0, 1.0)).abs() < 1e-9);
    }

    #[test]
    fn aggregate_on_empty_slice_returns_defaults() {
        let metrics = aggregate(&[]);
        assert_eq!(metrics, DocumentQualityMetrics::default());
    }

    #[test]
    fn aggregate_computes_mean_completeness() {
        let mut a = DocumentChunk::new("Alpha sentence one.", "FixedSize");
        a.quality.completeness = 0.8;
        let mut b = DocumentChunk::new("Beta sentence two.", "FixedSize");
        b.quality.completeness = 0.6;
        let metrics = aggregate(&[a, b]);
        assert!((metrics.average_completeness - 0.7).abs() < 1e-9);
    }

    #[test]
    fn low_completeness_triggers_chunk_size_recommendation() {
        let metrics = DocumentQualityMetrics {
            average_completeness: 0.4,
            content_consistency: 0.9,
            boundary_quality: 0.9,
            size_distribution: 0.9,
            overlap_effectiveness: 0.5,
        };
        let recs = recommendations(&metrics, &metadata(Some("Title")));
        assert!(recs.iter().any(|r| r.kind == RecommendationKind::ChunkSizeOptimization));
    }

    #[test]
    fn missing_title_triggers_title_recommendation() {
        let metrics = DocumentQualityMetrics {
            average_completeness: 0.9,
            content_consistency: 0.9,
            boundary_quality: 0.9,
            size_distribution: 0.9,
            overlap_effectiveness: 0.5,
        };
        let recs = recommendations(&metrics, &metadata(None));
        assert!(recs.iter().any(|r| r.kind == RecommendationKind::TitleImprovement));
    }

    #[test]
    fn recommendations_are_sorted_by_descending_priority() {
        let metrics = DocumentQualityMetrics {
            average_completeness: 0.3,
            content_consistency: 0.3,
            boundary_quality: 0.3,
            size_distribution: 0.3,
            overlap_effectiveness: 0.0,
        };
        let recs = recommendations(&metrics, &metadata(None));
        let priorities: Vec<u8> = recs.iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(priorities, sorted);
    }
}
