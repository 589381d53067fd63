//! [`Parser`]: turns [`RawContent`] into typed [`ParsedContent`].

use crate::capability::CancellationToken;
use crate::error::Result;
use crate::format::normalize_extension;
use crate::model::{ParsedContent, RawContent};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// How aggressively a parser should attempt to recover document structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuringLevel {
    /// Minimal structure recovery; fastest.
    Low,
    /// Balance speed and structural fidelity.
    Medium,
    /// Maximum structure recovery, possibly slower.
    High,
}

impl Default for StructuringLevel {
    fn default() -> Self {
        Self::Medium
    }
}

/// Options controlling how a [`Parser`] turns `RawContent` into `ParsedContent`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParsingOptions {
    /// Whether the parser may consult a [`crate::capability::TextCompletionProvider`].
    pub use_llm: bool,
    /// Desired structure-recovery effort.
    pub structuring_level: StructuringLevel,
}

impl Default for ParsingOptions {
    fn default() -> Self {
        Self {
            use_llm: false,
            structuring_level: StructuringLevel::default(),
        }
    }
}

/// Turns [`RawContent`] into [`ParsedContent`].
///
/// Per spec §4.1: when `use_llm=false` or no completion provider is wired,
/// implementations must still produce a valid `ParsedContent` with
/// `parsing_info.used_llm=false` via a best-effort heuristic path.
#[async_trait]
pub trait Parser: Send + Sync {
    /// Parses `raw` into structured content.
    ///
    /// # Errors
    /// Returns an error if parsing fails outright; degraded/heuristic output
    /// is preferred over failure whenever an optional provider is simply
    /// unavailable (spec §7).
    async fn parse(
        &self,
        raw: RawContent,
        options: ParsingOptions,
        cancellation: &CancellationToken,
    ) -> Result<ParsedContent>;

    /// Lowercase, dot-free extensions this parser claims to handle.
    fn supported_extensions(&self) -> &[&str];

    /// Stable identity used in `ParsingInfo::parser_id`.
    fn parser_id(&self) -> &str;
}

/// Discovers a [`Parser`] by file extension, mirroring [`crate::capability::ReaderRegistry`].
#[derive(Default, Clone)]
pub struct ParserRegistry {
    by_extension: HashMap<String, Arc<dyn Parser>>,
}

impl ParserRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `parser` for each of its supported extensions, overwriting
    /// any prior registration for the same extension.
    pub fn register(&mut self, parser: Arc<dyn Parser>) {
        for ext in parser.supported_extensions() {
            self.by_extension
                .insert(normalize_extension(ext), Arc::clone(&parser));
        }
    }

    /// Finds the parser registered for `filename`'s extension, if any.
    #[must_use]
    pub fn find(&self, filename: &str) -> Option<Arc<dyn Parser>> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)?;
        let parser = self.by_extension.get(&ext).cloned();
        match &parser {
            Some(p) => log::debug!("parser '{}' selected for extension '{ext}'", p.parser_id()),
            None => log::debug!("no parser registered for extension '{ext}'"),
        }
        parser
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parsing_options_disable_llm_and_use_medium_structuring() {
        let options = ParsingOptions::default();
        assert!(!options.use_llm);
        assert_eq!(options.structuring_level, StructuringLevel::Medium);
    }

    #[test]
    fn structuring_level_serializes_lowercase() {
        let json = serde_json::to_string(&StructuringLevel::High).unwrap();
        assert_eq!(json, "\"high\"");
    }
}
