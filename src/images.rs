//! Base64 image extraction from Markdown (spec §6).
//!
//! The Markdown Converter's `IncludeImagePlaceholders` option (C3) produces
//! `![alt](embedded:img_n)` references from a reader's placeholder markup.
//! This module resolves the other half of spec §6's image-extraction rule:
//! base64-encoded images embedded directly in Markdown are either stripped
//! to a short placeholder or decoded to disk, depending on size.

use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Matches `![alt](data:image/EXT;base64,DATA)`, with or without the
/// leading `!` (spec §6: `!?\[alt\]\(data:image/(ext);base64,DATA\)`).
static BASE64_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!?\[([^\]]*)\]\(data:image/([a-zA-Z0-9.+-]+);base64,([A-Za-z0-9+/=]+)\)").unwrap()
});

/// Default size threshold, in encoded bytes, above which an image is
/// written to disk rather than stripped (spec §6 default: 5000).
pub const DEFAULT_MIN_IMAGE_SIZE: usize = 5000;

/// One image found (and handled) while processing a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedImage {
    /// 1-based index among images found in this document, in document order.
    pub index: usize,
    /// Alt text from the original Markdown image reference.
    pub alt: String,
    /// File extension, taken from the `data:image/EXT` MIME fragment.
    pub extension: String,
    /// Path the image was written to, or `None` if it was stripped instead.
    pub written_path: Option<PathBuf>,
    /// Decoded size in bytes.
    pub byte_size: usize,
}

/// Strips or extracts every base64 image reference in `markdown`.
///
/// Images whose decoded size is `> min_image_size` are decoded and written
/// to `<images_dir>/image_<N>.<ext>`, with the reference rewritten to
/// `![alt](./<images_dir_name>/image_<N>.<ext>)`. Smaller images (and any
/// image that fails to decode) are stripped, leaving `[Image N]` or, when
/// `alt` is non-empty, `[Image: alt]`.
///
/// Returns the rewritten Markdown and the list of images that were
/// successfully written to disk (decode failures and below-threshold
/// strips are not included).
///
/// # Errors
/// Returns [`crate::error::FileFluxError::IoError`] if `images_dir` cannot
/// be created or a decoded image cannot be written.
pub fn extract_images(
    markdown: &str,
    images_dir: &Path,
    min_image_size: usize,
) -> crate::error::Result<(String, Vec<ExtractedImage>)> {
    let mut extracted = Vec::new();
    let mut index = 0usize;
    let mut created_dir = false;

    let rewritten = BASE64_IMAGE.replace_all(markdown, |caps: &regex::Captures| {
        index += 1;
        let alt = caps[1].to_string();
        let extension = caps[2].to_string();
        let data = &caps[3];

        let decoded = base64::engine::general_purpose::STANDARD.decode(data).ok();

        match decoded {
            Some(bytes) if bytes.len() > min_image_size => {
                if !created_dir {
                    created_dir = true;
                }
                let file_name = format!("image_{index}.{extension}");
                let path = images_dir.join(&file_name);
                if std::fs::create_dir_all(images_dir).is_ok() && std::fs::write(&path, &bytes).is_ok()
                {
                    let dir_name = images_dir
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("images");
                    extracted.push(ExtractedImage {
                        index,
                        alt: alt.clone(),
                        extension: extension.clone(),
                        written_path: Some(path.clone()),
                        byte_size: bytes.len(),
                    });
                    return format!("![{alt}](./{dir_name}/{file_name})");
                }
                placeholder(&alt, index)
            }
            _ => placeholder(&alt, index),
        }
    });

    Ok((rewritten.into_owned(), extracted))
}

fn placeholder(alt: &str, index: usize) -> String {
    if alt.trim().is_empty() {
        format!("[Image {index}]")
    } else {
        format!("[Image: {alt}]")
    }
}

/// Counts base64 image references in `markdown` without decoding them,
/// useful for populating `RawContent::hints.image_count` cheaply.
#[must_use]
pub fn count_embedded_images(markdown: &str) -> usize {
    BASE64_IMAGE.find_iter(markdown).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn data_url(bytes: &[u8], ext: &str) -> String {
        format!(
            "data:image/{ext};base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    #[test]
    fn small_image_is_stripped_to_placeholder() {
        let url = data_url(b"tiny", "png");
        let markdown = format!("before ![a photo]({url}) after");
        let dir = tempfile::tempdir().unwrap();

        let (out, extracted) = extract_images(&markdown, dir.path(), DEFAULT_MIN_IMAGE_SIZE).unwrap();

        assert!(out.contains("[Image: a photo]"));
        assert!(extracted.is_empty());
    }

    #[test]
    fn large_image_is_written_to_disk_and_referenced() {
        let bytes = vec![0u8; DEFAULT_MIN_IMAGE_SIZE + 1000];
        let url = data_url(&bytes, "jpeg");
        let markdown = format!("![diagram]({url})");
        let dir = tempfile::tempdir().unwrap();
        let images_dir = dir.path().join("images");

        let (out, extracted) = extract_images(&markdown, &images_dir, DEFAULT_MIN_IMAGE_SIZE).unwrap();

        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].extension, "jpeg");
        assert!(extracted[0].written_path.as_ref().unwrap().exists());
        assert!(out.contains("image_1.jpeg"));
    }

    #[test]
    fn empty_alt_text_uses_numbered_placeholder() {
        let url = data_url(b"tiny", "png");
        let markdown = format!("![]({url})");
        let dir = tempfile::tempdir().unwrap();

        let (out, _) = extract_images(&markdown, dir.path(), DEFAULT_MIN_IMAGE_SIZE).unwrap();
        assert!(out.contains("[Image 1]"));
    }

    #[test]
    fn count_embedded_images_matches_reference_count() {
        let url = data_url(b"tiny", "png");
        let markdown = format!("![a]({url}) and ![b]({url})");
        assert_eq!(count_embedded_images(&markdown), 2);
    }
}
