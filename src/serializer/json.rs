//! Chunk JSON serialization (spec §6): a camelCase object per chunk, UTF-8
//! with no escaping of Unicode letters, indented for `format=json` and
//! single-line for `format=jsonl`.

use crate::model::DocumentChunk;
use serde::{Deserialize, Serialize};

/// Output format selection for [`to_string`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Indented, human-readable JSON.
    Json,
    /// One compact JSON object per line (JSON Lines).
    Jsonl,
}

/// `navigation: { prev, next }` (spec §6).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkNavigation {
    /// 1-based chunk number of the previous chunk, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prev: Option<usize>,
    /// 1-based chunk number of the next chunk, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next: Option<usize>,
}

/// `metadata: { fileName, fileType, language, customProperties? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadataJson {
    pub file_name: String,
    pub file_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub custom_properties: Option<serde_json::Value>,
}

/// `location: { startPage?, endPage?, section?, headingPath? }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkLocationJson {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub start_page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end_page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub heading_path: Vec<String>,
}

/// `sourceInfo?: { sourceId, sourceType, title }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub source_id: String,
    pub source_type: String,
    pub title: String,
}

/// `quality` as a camelCase object, mirroring [`crate::model::ChunkQuality`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkQualityJson {
    pub completeness: f64,
    pub context_independence: f64,
    pub information_density: f64,
    pub boundary_sharpness: f64,
    pub overall: f64,
}

/// The full Chunk JSON wire object (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkJson {
    pub id: uuid::Uuid,
    pub index: usize,
    /// 1-based chunk number (`index + 1`).
    pub chunk: usize,
    pub total: usize,
    pub navigation: ChunkNavigation,
    pub content: String,
    pub tokens: usize,
    pub quality: ChunkQualityJson,
    pub importance: f64,
    pub density: f64,
    pub context_dependency: f64,
    pub metadata: ChunkMetadataJson,
    pub location: ChunkLocationJson,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source_info: Option<SourceInfo>,
}

impl ChunkJson {
    /// Builds the wire view for `chunk`, given its 0-based position among
    /// `total` siblings and the owning document's file name/type/language.
    #[must_use]
    pub fn from_chunk(
        chunk: &DocumentChunk,
        total: usize,
        file_name: &str,
        file_type: &str,
        language: Option<&str>,
        source_info: Option<SourceInfo>,
    ) -> Self {
        let chunk_number = chunk.index + 1;
        Self {
            id: chunk.id,
            index: chunk.index,
            chunk: chunk_number,
            total,
            navigation: ChunkNavigation {
                prev: chunk_number.checked_sub(1).filter(|&n| n >= 1),
                next: (chunk_number < total).then_some(chunk_number + 1),
            },
            content: chunk.content.clone(),
            tokens: chunk.tokens,
            quality: ChunkQualityJson {
                completeness: chunk.quality.completeness,
                context_independence: chunk.quality.context_independence,
                information_density: chunk.quality.information_density,
                boundary_sharpness: chunk.quality.boundary_sharpness,
                overall: chunk.quality.overall,
            },
            importance: chunk.importance,
            density: chunk.density,
            context_dependency: chunk.context_dependency,
            metadata: ChunkMetadataJson {
                file_name: file_name.to_string(),
                file_type: file_type.to_string(),
                language: language.map(str::to_string),
                custom_properties: (!chunk.props.is_empty())
                    .then(|| serde_json::to_value(&chunk.props).unwrap_or_default()),
            },
            location: ChunkLocationJson {
                start_page: chunk.location.start_page,
                end_page: chunk.location.end_page,
                section: chunk.location.section.clone(),
                heading_path: chunk.location.heading_path.clone(),
            },
            source_info,
        }
    }
}

/// Serializes a chunk sequence as a single Chunk JSON array (`format=json`,
/// indented) or JSON Lines (`format=jsonl`, one compact object per line).
///
/// # Errors
/// Returns [`crate::error::FileFluxError::JsonError`] on a serialization
/// failure, which should not occur for well-formed [`ChunkJson`] values.
pub fn render(views: &[ChunkJson], format: Format) -> crate::error::Result<String> {
    match format {
        Format::Json => Ok(serde_json::to_string_pretty(views)?),
        Format::Jsonl => {
            let mut out = String::new();
            for view in views {
                out.push_str(&serde_json::to_string(view)?);
                out.push('\n');
            }
            Ok(out)
        }
    }
}
