//! Markdown Normalization Layer (C3/C4): heuristic conversion to Markdown,
//! followed by structural normalization of already-Markdown input.

pub mod converter;
pub mod normalizer;

pub use converter::{ConversionMethod, ConversionOptions, ConversionResult, ConversionStatistics, MarkdownConverter};
pub use normalizer::{NormalizationAction, NormalizationOptions, NormalizationResult, MarkdownNormalizer};
