//! Core data model: [`RawContent`], [`ParsedContent`], and [`DocumentChunk`].
//!
//! These three entities form the artifact chain described in spec §3: a
//! reader produces `RawContent`, a parser turns it into `ParsedContent`, and
//! a chunking strategy turns that into a sequence of `DocumentChunk`s. Once
//! an entity is handed to a downstream stage it is never mutated — the
//! pipeline (C9) only ever appends new artifacts to the chain.

pub mod chunk;
pub mod parsed_content;
pub mod raw_content;

pub use chunk::{ChunkLocation, ChunkQuality, DocumentChunk};
pub use parsed_content::{
    DocumentMetadata, ParsedContent, ParsedQuality, ParsingInfo, Section,
};
pub use raw_content::{ContentHints, FileInfo, RawContent};
