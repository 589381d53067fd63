//! [`ParsedContent`]: the typed document structure chunking operates on.

use crate::format::SourceFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A section of the document's heading hierarchy.
///
/// `start`/`end` are byte offsets into `ParsedContent::structured_text`.
/// Invariant (spec §3): `start < end`, `end <= len(structured_text)`, and a
/// child's range is strictly nested within its parent's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Heading text, without the leading `#` markers.
    pub title: String,
    /// Heading level, 1-6.
    pub level: u8,
    /// Byte offset of the section's first character (inclusive).
    pub start: usize,
    /// Byte offset one past the section's last character (exclusive).
    pub end: usize,
    /// Nested subsections, in document order.
    #[serde(default)]
    pub children: Vec<Section>,
}

impl Section {
    /// Creates a leaf section with no children.
    #[must_use]
    pub fn new(title: impl Into<String>, level: u8, start: usize, end: usize) -> Self {
        Self {
            title: title.into(),
            level: level.clamp(1, 6),
            start,
            end,
            children: Vec::new(),
        }
    }

    /// Returns true if the byte range `[start, end)` falls within this
    /// section's range.
    #[must_use]
    pub const fn contains_range(&self, start: usize, end: usize) -> bool {
        self.start <= start && end <= self.end
    }

    /// Collects the titles of this section and every descendant whose range
    /// contains `[start, end)`, in root-to-leaf order — the "heading path"
    /// from spec's glossary.
    #[must_use]
    pub fn heading_path_for(&self, start: usize, end: usize) -> Vec<String> {
        if !self.contains_range(start, end) {
            return Vec::new();
        }
        let mut path = vec![self.title.clone()];
        for child in &self.children {
            let child_path = child.heading_path_for(start, end);
            if !child_path.is_empty() {
                path.extend(child_path);
                break;
            }
        }
        path
    }
}

/// Computes the heading path for a character range across a top-level
/// section list (spec glossary: "heading path").
#[must_use]
pub fn heading_path(structure: &[Section], start: usize, end: usize) -> Vec<String> {
    for section in structure {
        let path = section.heading_path_for(start, end);
        if !path.is_empty() {
            return path;
        }
    }
    Vec::new()
}

/// Document-level metadata extracted or inferred during parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Source file name.
    pub file_name: String,
    /// Detected source format.
    pub file_type: SourceFormat,
    /// Document title, if known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    /// Document author, if known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub author: Option<String>,
    /// BCP-47 language tag, if detected.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub language: Option<String>,
    /// Confidence in the language detection, in `[0, 1]`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub language_confidence: Option<f64>,
    /// Page count, for paginated formats.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub page_count: Option<usize>,
    /// Word count of `structured_text`.
    #[serde(default)]
    pub word_count: usize,
    /// Source document creation timestamp, if known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created: Option<DateTime<Utc>>,
    /// Source document last-modified timestamp, if known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub modified: Option<DateTime<Utc>>,
    /// When this document finished parsing.
    pub processed: DateTime<Utc>,
}

/// Per-document quality scores computed during parsing, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuality {
    /// Parser's confidence in the extraction as a whole.
    pub confidence: f64,
    /// How complete the extraction appears to be (no obvious truncation).
    pub completeness: f64,
    /// Internal consistency of structure and metadata.
    pub consistency: f64,
    /// Confidence specifically in the detected heading/section structure.
    pub structure_confidence: f64,
    /// Weighted mean of the four scores above (spec §4.8 weighting).
    pub overall_score: f64,
}

impl ParsedQuality {
    /// Weight applied to `confidence` in `overall_score`.
    pub const W_CONFIDENCE: f64 = 0.3;
    /// Weight applied to `completeness` in `overall_score`.
    pub const W_COMPLETENESS: f64 = 0.3;
    /// Weight applied to `consistency` in `overall_score`.
    pub const W_CONSISTENCY: f64 = 0.2;
    /// Weight applied to `structure_confidence` in `overall_score`.
    pub const W_STRUCTURE: f64 = 0.2;

    /// Computes `overall_score` as the weighted mean of the other three
    /// scores, clamped to `[0, 1]`.
    #[must_use]
    pub fn new(confidence: f64, completeness: f64, consistency: f64, structure_confidence: f64) -> Self {
        let overall = (confidence * Self::W_CONFIDENCE
            + completeness * Self::W_COMPLETENESS
            + consistency * Self::W_CONSISTENCY
            + structure_confidence * Self::W_STRUCTURE)
            .clamp(0.0, 1.0);
        Self {
            confidence: confidence.clamp(0.0, 1.0),
            completeness: completeness.clamp(0.0, 1.0),
            consistency: consistency.clamp(0.0, 1.0),
            structure_confidence: structure_confidence.clamp(0.0, 1.0),
            overall_score: overall,
        }
    }
}

impl Default for ParsedQuality {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0, 1.0)
    }
}

/// Diagnostic information about how a [`ParsedContent`] was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsingInfo {
    /// Whether an LLM completion provider contributed to parsing.
    pub used_llm: bool,
    /// Identity of the parser that ran (e.g. `"html"`, `"markdown"`).
    pub parser_id: String,
    /// Wall-clock time spent parsing.
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    /// Non-fatal warnings raised while parsing.
    #[serde(default)]
    pub warnings: Vec<String>,
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

/// The typed result of parsing [`RawContent`](crate::model::RawContent): a
/// canonical structured text plus metadata, section hierarchy, and quality
/// scores. Chunking strategies (C6) consume this, not `RawContent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedContent {
    /// Canonical Markdown (or other canonicalized text) used for chunking.
    pub structured_text: String,
    /// Pre-canonicalization text. May equal `structured_text`.
    pub original_text: String,
    /// Document-level metadata.
    pub metadata: DocumentMetadata,
    /// Heading hierarchy over `structured_text`.
    #[serde(default)]
    pub structure: Vec<Section>,
    /// Document-level quality scores.
    pub quality: ParsedQuality,
    /// Parsing diagnostics.
    pub parsing_info: ParsingInfo,
    /// Byte ranges for each page, if the source format is paginated. Used by
    /// chunk finalization to populate `location.start_page`/`end_page`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_ranges: Option<Vec<(usize, usize)>>,
}

impl ParsedContent {
    /// Returns the heading path for a character range, per spec's glossary.
    #[must_use]
    pub fn heading_path(&self, start: usize, end: usize) -> Vec<String> {
        heading_path(&self.structure, start, end)
    }

    /// Returns the 1-based page range `(start_page, end_page)` containing the
    /// given character range, if `page_ranges` is populated.
    #[must_use]
    pub fn page_range_for(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        let ranges = self.page_ranges.as_ref()?;
        let mut start_page = None;
        let mut end_page = None;
        for (i, (page_start, page_end)) in ranges.iter().enumerate() {
            if start_page.is_none() && start < *page_end {
                start_page = Some(i + 1);
            }
            if start_page.is_some() && end <= *page_end {
                end_page = Some(i + 1);
                break;
            }
            let _ = page_start;
        }
        Some((start_page?, end_page.or(start_page)?))
    }
}
