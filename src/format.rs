//! Source document format types.
//!
//! This module defines [`SourceFormat`], the small, closed set of formats the
//! pipeline engine (C9) dispatches on when selecting a [`Reader`](crate::capability::Reader)
//! by extension. Concrete readers for these formats are out of scope for this
//! crate (see spec §1) — `SourceFormat` exists purely so the registry and the
//! data model can refer to "what kind of file this came from" without caring
//! how it was decoded.

use serde::{Deserialize, Serialize};

/// Source document format, detected from a file extension.
///
/// Matches the heterogeneous source types named in spec §1: PDF, Word,
/// PowerPoint, Excel, HTML, Markdown, and plain text. `Unknown` carries the
/// original extension so callers can still report a useful error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceFormat {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Microsoft `PowerPoint` presentation (.pptx)
    Pptx,
    /// Microsoft Excel workbook (.xlsx)
    Xlsx,
    /// HTML document
    Html,
    /// Markdown document
    Markdown,
    /// Plain text
    Text,
    /// Unrecognized extension, original text preserved for diagnostics
    Unknown(String),
}

impl SourceFormat {
    /// Detects a format from a file extension.
    ///
    /// Matching is ASCII-case-insensitive and tolerant of a leading dot, per
    /// the locale-invariant extension-matching rule in spec §9.
    #[must_use = "detects source format from a file extension"]
    pub fn from_extension(ext: &str) -> Self {
        let normalized = ext.trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "pptx" => Self::Pptx,
            "xlsx" | "xlsm" => Self::Xlsx,
            "html" | "htm" => Self::Html,
            "md" | "markdown" => Self::Markdown,
            "txt" | "text" => Self::Text,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Returns the canonical (lowercase, no dot) extension for this format,
    /// or `None` for `Unknown`.
    #[must_use]
    pub const fn canonical_extension(&self) -> Option<&'static str> {
        match self {
            Self::Pdf => Some("pdf"),
            Self::Docx => Some("docx"),
            Self::Pptx => Some("pptx"),
            Self::Xlsx => Some("xlsx"),
            Self::Html => Some("html"),
            Self::Markdown => Some("md"),
            Self::Text => Some("txt"),
            Self::Unknown(_) => None,
        }
    }
}

impl std::fmt::Display for SourceFormat {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pdf => write!(f, "PDF"),
            Self::Docx => write!(f, "DOCX"),
            Self::Pptx => write!(f, "PPTX"),
            Self::Xlsx => write!(f, "XLSX"),
            Self::Html => write!(f, "HTML"),
            Self::Markdown => write!(f, "Markdown"),
            Self::Text => write!(f, "Text"),
            Self::Unknown(ext) => write!(f, "Unknown(.{ext})"),
        }
    }
}

/// Normalizes a file extension for registry lookup: strips a leading dot and
/// lowercases ASCII letters only (locale-invariant per spec §9).
#[must_use]
pub fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_formats_case_insensitively() {
        assert_eq!(SourceFormat::from_extension("PDF"), SourceFormat::Pdf);
        assert_eq!(SourceFormat::from_extension(".Docx"), SourceFormat::Docx);
        assert_eq!(SourceFormat::from_extension("htm"), SourceFormat::Html);
        assert_eq!(SourceFormat::from_extension("MARKDOWN"), SourceFormat::Markdown);
    }

    #[test]
    fn unknown_extension_round_trips_original_text() {
        match SourceFormat::from_extension("xyz") {
            SourceFormat::Unknown(ext) => assert_eq!(ext, "xyz"),
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn canonical_extension_matches_detection() {
        for (ext, expected) in [
            ("pdf", SourceFormat::Pdf),
            ("docx", SourceFormat::Docx),
            ("pptx", SourceFormat::Pptx),
            ("xlsx", SourceFormat::Xlsx),
            ("html", SourceFormat::Html),
            ("md", SourceFormat::Markdown),
            ("txt", SourceFormat::Text),
        ] {
            let fmt = SourceFormat::from_extension(ext);
            assert_eq!(fmt, expected);
            assert_eq!(fmt.canonical_extension(), Some(ext));
        }
    }

    #[test]
    fn normalize_extension_strips_dot_and_lowercases() {
        assert_eq!(normalize_extension(".PDF"), "pdf");
        assert_eq!(normalize_extension("Docx"), "docx");
    }
}
