//! Output serialization formats for chunked results (spec §6): Chunk JSON,
//! Chunk Markdown (with YAML front matter), and `info.json`. These are the
//! bit-exact external wire formats a CLI or result store would write; the
//! CLI itself is out of scope (spec §1), the formats are not.

pub mod info;
pub mod json;
pub mod markdown;

pub use info::{InfoJson, InputInfo, OutputInfo, ProcessingInfo, Statistics};
pub use json::{ChunkJson, ChunkMetadataJson, ChunkNavigation, Format, SourceInfo};
pub use markdown::chunk_to_markdown;
