//! [`Reader`]: extracts [`RawContent`](crate::model::RawContent) from a source file.

use crate::capability::CancellationToken;
use crate::error::Result;
use crate::format::normalize_extension;
use crate::model::RawContent;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Extracts [`RawContent`] from a byte stream or file path.
///
/// Implementations are external collaborators (spec §1): this crate never
/// implements a concrete reader, only the contract and the registry that
/// dispatches to one by extension.
#[async_trait]
pub trait Reader: Send + Sync {
    /// Reads and extracts content from the file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::error::FileFluxError::NotFound`],
    /// `UnsupportedFormat`, `IoError`, `DecodeError`, or `Cancelled`.
    async fn read(&self, path: &Path, cancellation: &CancellationToken) -> Result<RawContent>;

    /// Reads and extracts content from an in-memory byte buffer, given the
    /// original filename (used for extension/format hints).
    ///
    /// # Errors
    /// Same error set as [`Reader::read`].
    async fn read_bytes(
        &self,
        bytes: &[u8],
        filename: &str,
        cancellation: &CancellationToken,
    ) -> Result<RawContent>;

    /// Lowercase, dot-free extensions this reader claims to handle.
    fn supported_extensions(&self) -> &[&str];

    /// True if `filename`'s extension is among `supported_extensions`,
    /// case-insensitively.
    fn can_read(&self, filename: &str) -> bool {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)
            .unwrap_or_default();
        self.supported_extensions().iter().any(|e| *e == ext)
    }
}

/// Discovers a [`Reader`] by file extension.
///
/// Registration is additive and case-insensitive; per spec §6, "the last-
/// registered reader wins on conflict".
#[derive(Default, Clone)]
pub struct ReaderRegistry {
    by_extension: HashMap<String, Arc<dyn Reader>>,
}

impl ReaderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `reader` for each of its supported extensions, overwriting
    /// any prior registration for the same extension.
    pub fn register(&mut self, reader: Arc<dyn Reader>) {
        for ext in reader.supported_extensions() {
            self.by_extension
                .insert(normalize_extension(ext), Arc::clone(&reader));
        }
    }

    /// Finds the reader registered for `filename`'s extension, if any.
    #[must_use]
    pub fn find(&self, filename: &str) -> Option<Arc<dyn Reader>> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)?;
        let reader = self.by_extension.get(&ext).cloned();
        match &reader {
            Some(_) => log::debug!("reader selected for extension '{ext}'"),
            None => log::debug!("no reader registered for extension '{ext}'"),
        }
        reader
    }

    /// Number of distinct extensions with a registered reader.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_extension.len()
    }

    /// True if no reader is registered for any extension.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_extension.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileInfo;

    struct StubReader {
        extensions: Vec<&'static str>,
        tag: &'static str,
    }

    #[async_trait]
    impl Reader for StubReader {
        async fn read(&self, path: &Path, _cancellation: &CancellationToken) -> Result<RawContent> {
            Ok(RawContent::new(
                self.tag,
                FileInfo::new(
                    path.to_string_lossy(),
                    "txt",
                    0,
                    self.tag,
                ),
            ))
        }

        async fn read_bytes(
            &self,
            _bytes: &[u8],
            filename: &str,
            _cancellation: &CancellationToken,
        ) -> Result<RawContent> {
            Ok(RawContent::new(
                self.tag,
                FileInfo::new(filename, "txt", 0, self.tag),
            ))
        }

        fn supported_extensions(&self) -> &[&str] {
            &self.extensions
        }
    }

    #[test]
    fn can_read_is_case_insensitive() {
        let reader = StubReader {
            extensions: vec!["md", "markdown"],
            tag: "md",
        };
        assert!(reader.can_read("README.MD"));
        assert!(reader.can_read("notes.markdown"));
        assert!(!reader.can_read("report.pdf"));
    }

    #[test]
    fn last_registered_reader_wins_on_conflict() {
        let mut registry = ReaderRegistry::new();
        registry.register(Arc::new(StubReader {
            extensions: vec!["md"],
            tag: "first",
        }));
        registry.register(Arc::new(StubReader {
            extensions: vec!["md"],
            tag: "second",
        }));

        let found = registry.find("a.md").unwrap();
        assert!(found.can_read("a.md"));
        assert_eq!(found.supported_extensions(), &["md"]);
    }

    #[tokio::test]
    async fn find_dispatches_by_extension() {
        let mut registry = ReaderRegistry::new();
        registry.register(Arc::new(StubReader {
            extensions: vec!["txt"],
            tag: "text",
        }));

        let reader = registry.find("notes.TXT").expect("reader registered");
        let token = CancellationToken::new();
        let content = reader
            .read_bytes(b"hello", "notes.TXT", &token)
            .await
            .unwrap();
        assert_eq!(content.text, "text");
        assert!(registry.find("missing.xyz").is_none());
    }
}
