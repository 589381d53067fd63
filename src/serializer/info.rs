//! `info.json` (spec §6): the manifest written beside a chunked output,
//! summarizing the run's input, output, processing options, and resulting
//! chunk statistics.

use crate::model::DocumentChunk;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `input: { path, fullPath, size }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputInfo {
    pub path: String,
    pub full_path: String,
    pub size: u64,
}

/// `output: { directory|path, format, chunks?: manifest[] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputInfo {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub path: Option<String>,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub chunks: Option<Vec<String>>,
}

/// `processing: { command, strategy, maxChunkSize, overlapSize, aiProvider?, enrichmentEnabled }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingInfo {
    pub command: String,
    pub strategy: String,
    pub max_chunk_size: usize,
    pub overlap_size: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ai_provider: Option<String>,
    pub enrichment_enabled: bool,
}

/// `statistics: { totalChunks, totalCharacters, totalTokens,
/// averageChunkSize, minChunkSize, maxChunkSize, varianceRatio, isBalanced,
/// enrichedChunks, skippedEnrichments }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_chunks: usize,
    pub total_characters: usize,
    pub total_tokens: usize,
    pub average_chunk_size: f64,
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    pub variance_ratio: f64,
    pub is_balanced: bool,
    pub enriched_chunks: usize,
    pub skipped_enrichments: usize,
}

impl Statistics {
    /// Computes statistics over `chunks`, evaluating `Balanced` (spec §6)
    /// against `target_max_chunk_size` (the `ChunkingOptions::max_chunk_size`
    /// the run used, not the observed maximum).
    #[must_use]
    pub fn compute(chunks: &[DocumentChunk], target_max_chunk_size: usize) -> Self {
        if chunks.is_empty() {
            return Self::default();
        }

        let sizes: Vec<usize> = chunks.iter().map(|c| c.content.chars().count()).collect();
        let total_characters: usize = sizes.iter().sum();
        let total_tokens: usize = chunks.iter().map(|c| c.tokens).sum();
        let min_chunk_size = *sizes.iter().min().unwrap();
        let max_chunk_size = *sizes.iter().max().unwrap();
        let average_chunk_size = total_characters as f64 / sizes.len() as f64;

        let variance = sizes
            .iter()
            .map(|&s| (s as f64 - average_chunk_size).powi(2))
            .sum::<f64>()
            / sizes.len() as f64;
        let variance_ratio = if average_chunk_size > 0.0 {
            variance.sqrt() / average_chunk_size
        } else {
            0.0
        };

        let is_balanced = is_balanced(
            variance_ratio,
            min_chunk_size,
            max_chunk_size,
            target_max_chunk_size,
        );

        let enriched_chunks = chunks
            .iter()
            .filter(|c| {
                c.props.contains_key("EnrichedSummary") || c.props.contains_key("EnrichedKeywords")
            })
            .count();
        let skipped_enrichments = chunks
            .iter()
            .filter(|c| c.prop_bool("EnrichmentSkipped") == Some(true))
            .count();

        Self {
            total_chunks: chunks.len(),
            total_characters,
            total_tokens,
            average_chunk_size,
            min_chunk_size,
            max_chunk_size,
            variance_ratio,
            is_balanced,
            enriched_chunks,
            skipped_enrichments,
        }
    }
}

/// `Balanced` (spec §6): `varianceRatio <= 5.0` AND `min >=
/// max_chunk_size/10` AND `max <= max_chunk_size * 1.5`.
#[must_use]
pub fn is_balanced(
    variance_ratio: f64,
    min_chunk_size: usize,
    max_chunk_size: usize,
    target_max_chunk_size: usize,
) -> bool {
    variance_ratio <= 5.0
        && (min_chunk_size as f64) >= (target_max_chunk_size as f64 / 10.0)
        && (max_chunk_size as f64) <= (target_max_chunk_size as f64 * 1.5)
}

/// The full `info.json` manifest (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoJson {
    pub timestamp: DateTime<Utc>,
    pub input: InputInfo,
    pub output: OutputInfo,
    pub processing: ProcessingInfo,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub document: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source: Option<serde_json::Value>,
    pub statistics: Statistics,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub quality: Option<serde_json::Value>,
    pub version: String,
}

impl InfoJson {
    /// Serializes this manifest as indented JSON.
    ///
    /// # Errors
    /// Returns [`crate::error::FileFluxError::JsonError`] on a
    /// serialization failure.
    pub fn to_json_string(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
