//! # `FileFlux` - document-to-chunks pipeline for Retrieval-Augmented Generation
//!
//! `FileFlux` turns an arbitrary source document into a sequence of quality-
//! scored text chunks sized and shaped for embedding and retrieval. It
//! defines the contracts a RAG system's ingestion stage runs on — readers,
//! parsers, chunking strategies, an adaptive strategy selector, a quality
//! engine, and an enrichment hook — and ships the staged Pipeline Engine
//! that wires them together. Concrete format readers, parsers, and
//! LLM/embedding backends are supplied by the caller; this crate owns the
//! contracts, the chunking algorithms, and the quality/selection logic that
//! sits between them.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use fileflux_core::capability::{ParserRegistry, ReaderRegistry};
//! use fileflux_core::pipeline::{DocumentPipeline, PipelineConfig, Stage};
//! use fileflux_core::CancellationToken;
//! use futures::StreamExt;
//!
//! # async fn run(readers: ReaderRegistry, parsers: ParserRegistry) {
//! let pipeline = DocumentPipeline::new(readers, parsers, PipelineConfig::default());
//! let mut run = pipeline.process("report.pdf", CancellationToken::new());
//!
//! while let Some(result) = run.next().await {
//!     if result.progress.stage == Stage::Completed {
//!         println!("{} chunks", result.result.unwrap_or_default().len());
//!     }
//! }
//! # }
//! ```
//!
//! ## Module organization
//!
//! - [`model`] - the artifact chain: `RawContent` → `ParsedContent` → `DocumentChunk`
//! - [`capability`] - the external contracts: `Reader`, `Parser`,
//!   `TextCompletionProvider`, `EmbeddingProvider`, and their registries
//! - [`markdown`] - heuristic raw-to-Markdown conversion and structural normalization
//! - [`boundary`] - embedding-similarity boundary detection between text segments
//! - [`chunking`] - the seven chunking strategies and their shared support functions
//! - [`selector`] - the Adaptive Strategy Selector backing the `Auto` strategy
//! - [`quality`] - the Quality Engine: per-chunk scoring, document aggregates, recommendations
//! - [`enrichment`] - the optional post-chunking summary/keyword hook
//! - [`images`] - embedded base64 image extraction to sidecar files
//! - [`serializer`] - the Chunk JSON, Chunk Markdown, and `info.json` wire formats
//! - [`pipeline`] - the staged, cancellable engine wiring every module above together
//! - [`error`] - the crate's single error type and its exit-code classification
//! - [`format`] - source format detection from file extensions

pub mod boundary;
pub mod capability;
pub mod chunking;
pub mod enrichment;
pub mod error;
pub mod format;
pub mod images;
pub mod markdown;
pub mod model;
pub mod pipeline;
pub mod quality;
pub mod selector;
pub mod serializer;

pub use capability::CancellationToken;
pub use error::{ErrorKind, FileFluxError, Result};
pub use format::SourceFormat;
pub use model::{ChunkLocation, ChunkQuality, DocumentChunk, ParsedContent, RawContent};
pub use pipeline::{DocumentPipeline, PipelineConfig, ProcessingResult, Stage};
