//! [`RawContent`]: the reader's best-effort extraction, before parsing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Identifying information about the source file a [`RawContent`] was
/// extracted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// File name (not a full path).
    pub name: String,
    /// Extension without a leading dot, lowercase.
    pub extension: String,
    /// Size of the source file in bytes.
    pub byte_size: u64,
    /// Identity of the reader that produced this content (e.g. `"pdf"`).
    pub reader_id: String,
    /// When extraction completed.
    pub extracted_at: DateTime<Utc>,
}

impl FileInfo {
    /// Creates file info for a just-completed extraction.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        extension: impl Into<String>,
        byte_size: u64,
        reader_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
            byte_size,
            reader_id: reader_id.into(),
            extracted_at: Utc::now(),
        }
    }
}

/// Structural hints a reader can attach to its extraction.
///
/// Spec §3 requires that the hint mapping be extensible and that unknown
/// keys survive round-tripping. The well-known keys are typed fields here;
/// anything else lands in `extra` via `#[serde(flatten)]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentHints {
    /// The source appeared to use heading markup or conventions.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub has_headers: Option<bool>,
    /// The source contained one or more tables.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub has_tables: Option<bool>,
    /// Named semantic elements the reader recognized (e.g. `"nav"`, `"aside"`).
    #[serde(skip_serializing_if = "HashSet::is_empty", default)]
    pub semantic_elements: HashSet<String>,
    /// Number of tables detected.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub table_count: Option<i64>,
    /// Languages found in fenced code blocks.
    #[serde(skip_serializing_if = "HashSet::is_empty", default)]
    pub code_languages: HashSet<String>,
    /// Number of embedded images detected.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_count: Option<i64>,
    /// Document title, if the reader could extract one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    /// Document description / abstract.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    /// Comma- or reader-separated keyword list.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub keywords: Option<String>,
    /// Document author.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub author: Option<String>,
    /// Open Graph title, when extracted from HTML meta tags.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub og_title: Option<String>,
    /// Any hint keys not recognized above. Always preserved round-trip.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// The output of a [`Reader`](crate::capability::Reader): a lossless-as-possible
/// text extraction plus structural hints and non-fatal warnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawContent {
    /// Extracted text. Never contains undecoded binary payloads except
    /// base64 image data the pipeline is explicitly allowed to strip later.
    pub text: String,
    /// Source file identity.
    pub file: FileInfo,
    /// Structural hints the reader could infer.
    #[serde(default)]
    pub hints: ContentHints,
    /// Non-fatal warnings accumulated during extraction, in emission order.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl RawContent {
    /// Creates a new `RawContent` with empty hints and warnings.
    #[must_use]
    pub fn new(text: impl Into<String>, file: FileInfo) -> Self {
        Self {
            text: text.into(),
            file,
            hints: ContentHints::default(),
            warnings: Vec::new(),
        }
    }

    /// Appends a warning, preserving emission order.
    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}
