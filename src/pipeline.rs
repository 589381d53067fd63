//! Pipeline Engine (C9 / spec §4.8): wires Reader → Converter/Normalizer →
//! Parser → Chunking Strategy → Quality Engine → Enrichment into a single
//! staged, cancellable run, reported as a lazy stream of [`ProcessingResult`]s.
//!
//! A large input (over [`PipelineConfig::stream_threshold_bytes`]) bypasses
//! the Reader/Parser chain entirely and is windowed straight into chunks —
//! spec §4.8's "chunked-reader path" for inputs too large to hold in memory
//! as a single `RawContent`.

use crate::capability::{
    CancellationToken, EmbeddingProvider, ParserRegistry, ParsingOptions, ReaderRegistry,
    TextCompletionProvider,
};
use crate::chunking::{self, support, ChunkingOptions};
use crate::enrichment::{self, EnrichmentOptions};
use crate::error::{ErrorKind, FileFluxError};
use crate::markdown::{ConversionOptions, MarkdownConverter, MarkdownNormalizer, NormalizationOptions};
use crate::model::DocumentChunk;
use crate::quality::{self, DocumentQualityMetrics, Recommendation};

use async_stream::stream;
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, StreamExt};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;

/// Default threshold above which [`DocumentPipeline::process`] switches to
/// the windowed chunked-reader path, per spec §4.8.
const DEFAULT_STREAM_THRESHOLD_BYTES: u64 = 50 * 1024 * 1024;
/// Default window size read at a time on the chunked-reader path.
const DEFAULT_STREAM_WINDOW_BYTES: u64 = 10 * 1024 * 1024;

/// Stage a [`ProcessingResult`] was produced at (spec §4.8's state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Opening the input and selecting a reader.
    Reading,
    /// Reader has produced [`crate::model::RawContent`].
    Extracting,
    /// Parser has produced [`crate::model::ParsedContent`].
    Parsing,
    /// Chunking strategy has produced a chunk sequence.
    Chunking,
    /// Quality Engine has scored the run and Enrichment (if configured) ran.
    Validating,
    /// The run finished successfully.
    Completed,
    /// The run stopped on an error; always the last item in the stream.
    Error,
}

impl Stage {
    /// Nominal `overall_progress` for this stage (spec §4.8's progress table).
    #[must_use]
    pub const fn nominal_progress(self) -> f64 {
        match self {
            Self::Reading => 0.0,
            Self::Extracting => 0.25,
            Self::Parsing => 0.50,
            Self::Chunking => 0.75,
            Self::Validating => 0.90,
            Self::Completed | Self::Error => 1.00,
        }
    }
}

/// One progress report within a [`ProcessingResult`].
#[derive(Debug, Clone)]
pub struct Progress {
    /// Stage this report was emitted from.
    pub stage: Stage,
    /// Monotonically non-decreasing progress in `[0, 1]` across the stream.
    pub overall_progress: f64,
    /// Human-readable status message.
    pub message: String,
    /// When this report was produced.
    pub timestamp: DateTime<Utc>,
}

impl Progress {
    fn at(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            overall_progress: stage.nominal_progress(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The error carried by a `Stage::Error` [`ProcessingResult`].
#[derive(Debug, Clone)]
pub struct ProcessingError {
    /// Exit-code classification, per [`crate::error::FileFluxError::kind`].
    pub kind: ErrorKind,
    /// Human-readable message, from the underlying error's `Display`.
    pub message: String,
}

impl ProcessingError {
    fn from_err(err: &FileFluxError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// One item of the lazy sequence [`DocumentPipeline::process`] yields.
///
/// Partial artifacts from earlier stages are carried forward (spec §4.8:
/// "on error, every artifact produced so far remains attached to the final
/// result"); exactly one `Stage::Error` item terminates the stream early.
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// This item's stage and progress.
    pub progress: Progress,
    /// The reader's output, once `Stage::Extracting` has been reached.
    pub raw_content: Option<crate::model::RawContent>,
    /// The parser's output, once `Stage::Parsing` has been reached.
    pub parsed_content: Option<crate::model::ParsedContent>,
    /// The chunk sequence, once `Stage::Chunking` has been reached.
    pub result: Option<Vec<DocumentChunk>>,
    /// Document-level quality metrics, once `Stage::Validating` has run.
    pub quality_metrics: Option<DocumentQualityMetrics>,
    /// Quality recommendations, once `Stage::Validating` has run.
    pub recommendations: Option<Vec<Recommendation>>,
    /// Set only on a `Stage::Error` item.
    pub error: Option<ProcessingError>,
}

impl ProcessingResult {
    fn at(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            progress: Progress::at(stage, message),
            raw_content: None,
            parsed_content: None,
            result: None,
            quality_metrics: None,
            recommendations: None,
            error: None,
        }
    }

    #[must_use]
    fn with_raw(mut self, raw: crate::model::RawContent) -> Self {
        self.raw_content = Some(raw);
        self
    }

    #[must_use]
    fn with_parsed(mut self, parsed: crate::model::ParsedContent) -> Self {
        self.parsed_content = Some(parsed);
        self
    }

    #[must_use]
    fn with_chunks(mut self, chunks: Vec<DocumentChunk>) -> Self {
        self.result = Some(chunks);
        self
    }

    #[must_use]
    fn with_metrics(mut self, metrics: DocumentQualityMetrics, recs: Vec<Recommendation>) -> Self {
        self.quality_metrics = Some(metrics);
        self.recommendations = Some(recs);
        self
    }

    #[must_use]
    fn with_overall(mut self, overall: f64) -> Self {
        self.progress.overall_progress = overall.clamp(0.0, 1.0);
        self
    }

    fn error(
        message: impl Into<String>,
        err: &FileFluxError,
        raw: Option<crate::model::RawContent>,
        parsed: Option<crate::model::ParsedContent>,
    ) -> Self {
        Self {
            progress: Progress::at(Stage::Error, message),
            raw_content: raw,
            parsed_content: parsed,
            result: None,
            quality_metrics: None,
            recommendations: None,
            error: Some(ProcessingError::from_err(err)),
        }
    }
}

/// Tuning for a [`DocumentPipeline`] run (spec §4.8).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Options passed to the [`crate::capability::Parser`].
    pub parsing_options: ParsingOptions,
    /// Options passed to the chosen chunking strategy.
    pub chunking_options: ChunkingOptions,
    /// Options passed to the Markdown Converter.
    pub conversion_options: ConversionOptions,
    /// Options passed to the Markdown Normalizer.
    pub normalization_options: NormalizationOptions,
    /// When set, Enrichment runs after Validating (requires a completion
    /// provider to be wired; silently skipped otherwise).
    pub enrichment_options: Option<EnrichmentOptions>,
    /// File size, in bytes, above which `process` switches to the windowed
    /// chunked-reader path instead of the Reader/Parser chain.
    pub stream_threshold_bytes: u64,
    /// Window size, in bytes, read at a time on the chunked-reader path.
    pub stream_window_bytes: u64,
    /// Number of paths from `process_batch` grouped into one concurrency wave.
    pub batch_size: usize,
    /// Maximum number of `process` runs active at once within a batch wave.
    pub max_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parsing_options: ParsingOptions::default(),
            chunking_options: ChunkingOptions::default(),
            conversion_options: ConversionOptions::default(),
            normalization_options: NormalizationOptions::default(),
            enrichment_options: None,
            stream_threshold_bytes: DEFAULT_STREAM_THRESHOLD_BYTES,
            stream_window_bytes: DEFAULT_STREAM_WINDOW_BYTES,
            batch_size: 8,
            max_concurrency: std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(4),
        }
    }
}

/// The result of processing one path within [`DocumentPipeline::process_batch`].
#[derive(Debug, Clone)]
pub struct BatchItemResult {
    /// The input path this result is for.
    pub path: PathBuf,
    /// True if the run reached `Stage::Completed` without an error.
    pub success: bool,
    /// The error message, if `success` is false.
    pub error: Option<String>,
    /// The final chunk sequence, empty on failure.
    pub chunks: Vec<DocumentChunk>,
    /// Wall-clock time spent on this path.
    pub processing_time: Duration,
}

/// Wires a [`ReaderRegistry`], a [`ParserRegistry`], and optional
/// embedding/completion providers into a staged, cancellable pipeline run.
///
/// This crate registers no concrete readers or parsers of its own (spec
/// §1) — callers populate both registries before constructing a pipeline.
pub struct DocumentPipeline {
    readers: ReaderRegistry,
    parsers: ParserRegistry,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    completion: Option<Arc<dyn TextCompletionProvider>>,
    config: PipelineConfig,
}

impl DocumentPipeline {
    /// Creates a pipeline over the given registries and config.
    #[must_use]
    pub fn new(readers: ReaderRegistry, parsers: ParserRegistry, config: PipelineConfig) -> Self {
        Self {
            readers,
            parsers,
            embedder: None,
            completion: None,
            config,
        }
    }

    /// Wires an embedding provider, used by boundary-detector-driven
    /// strategies (Semantic) and the Auto selector's feature analysis.
    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Wires a text completion provider, used for LLM-assisted parsing,
    /// conversion, strategy selection, and Enrichment.
    #[must_use]
    pub fn with_completion(mut self, completion: Arc<dyn TextCompletionProvider>) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Runs the staged pipeline over `path`, yielding a [`ProcessingResult`]
    /// at every stage transition. The stream ends after exactly one
    /// `Stage::Error` item, or after `Stage::Completed`.
    pub fn process(
        &self,
        path: impl AsRef<Path>,
        cancellation: CancellationToken,
    ) -> Pin<Box<dyn Stream<Item = ProcessingResult> + Send + '_>> {
        let path = path.as_ref().to_path_buf();
        Box::pin(stream! {
            log::debug!("pipeline stage Reading: opening {}", path.display());
            yield ProcessingResult::at(Stage::Reading, format!("opening {}", path.display()));

            if let Err(err) = cancellation.check() {
                yield ProcessingResult::error("cancelled before reading", &err, None, None);
                return;
            }

            let metadata = match tokio::fs::metadata(&path).await {
                Ok(m) => m,
                Err(io_err) => {
                    let err = if io_err.kind() == std::io::ErrorKind::NotFound {
                        FileFluxError::NotFound(path.display().to_string())
                    } else {
                        FileFluxError::IoError(io_err)
                    };
                    yield ProcessingResult::error("failed to stat input", &err, None, None);
                    return;
                }
            };

            if metadata.len() > self.config.stream_threshold_bytes {
                let mut stream = std::pin::pin!(self.process_streamed(path, metadata.len(), cancellation));
                while let Some(item) = stream.next().await {
                    yield item;
                }
                return;
            }

            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let Some(reader) = self.readers.find(&filename) else {
                let err = FileFluxError::UnsupportedFormat(filename.clone());
                yield ProcessingResult::error("no reader registered for extension", &err, None, None);
                return;
            };

            let raw = match reader.read(&path, &cancellation).await {
                Ok(raw) => raw,
                Err(err) => {
                    yield ProcessingResult::error("reader failed", &err, None, None);
                    return;
                }
            };
            log::debug!("pipeline stage Extracting: extracted raw content ({} bytes)", raw.text.len());
            yield ProcessingResult::at(Stage::Extracting, "extracted raw content")
                .with_raw(raw.clone());

            if let Err(err) = cancellation.check() {
                yield ProcessingResult::error("cancelled after extracting", &err, Some(raw), None);
                return;
            }

            let Some(parser) = self.parsers.find(&filename) else {
                let err = FileFluxError::UnsupportedFormat(filename);
                yield ProcessingResult::error("no parser registered for extension", &err, Some(raw), None);
                return;
            };

            let converted_text = self.convert_and_normalize(&raw, &cancellation).await;
            let mut raw_for_parsing = raw.clone();
            raw_for_parsing.text = converted_text;

            let parsed = match parser
                .parse(raw_for_parsing, self.config.parsing_options, &cancellation)
                .await
            {
                Ok(parsed) => parsed,
                Err(err) => {
                    yield ProcessingResult::error("parser failed", &err, Some(raw), None);
                    return;
                }
            };
            log::debug!("pipeline stage Parsing: parsed structured content via '{}'", parsed.parsing_info.parser_id);
            yield ProcessingResult::at(Stage::Parsing, "parsed structured content")
                .with_raw(raw.clone())
                .with_parsed(parsed.clone());

            if let Err(err) = cancellation.check() {
                yield ProcessingResult::error("cancelled after parsing", &err, Some(raw), Some(parsed));
                return;
            }

            let strategy = chunking::create_strategy(self.config.chunking_options.strategy);
            let mut chunks = match strategy
                .chunk(
                    &parsed,
                    &self.config.chunking_options,
                    self.embedder.as_deref(),
                    self.completion.as_deref(),
                    &cancellation,
                )
                .await
            {
                Ok(chunks) => chunks,
                Err(err) => {
                    yield ProcessingResult::error("chunking strategy failed", &err, Some(raw), Some(parsed));
                    return;
                }
            };
            if let Err(err) = chunking::ensure_non_empty_output(&parsed.structured_text, &chunks) {
                yield ProcessingResult::error("strategy produced no chunks", &err, Some(raw), Some(parsed));
                return;
            }
            support::finalize(&mut chunks, &parsed);

            log::debug!("pipeline stage Chunking: produced {} chunks via '{}'", chunks.len(), self.config.chunking_options.strategy.name());
            yield ProcessingResult::at(Stage::Chunking, format!("produced {} chunks", chunks.len()))
                .with_raw(raw.clone())
                .with_parsed(parsed.clone())
                .with_chunks(chunks.clone());

            if let Err(err) = cancellation.check() {
                yield ProcessingResult::error("cancelled after chunking", &err, Some(raw), Some(parsed));
                return;
            }

            let metrics = quality::aggregate(&chunks);
            let recs = quality::recommendations(&metrics, &parsed.metadata);

            if let (Some(options), Some(completion)) =
                (&self.config.enrichment_options, &self.completion)
            {
                enrichment::enrich_all(&mut chunks, options, completion.as_ref(), &cancellation).await;
            }

            log::debug!("pipeline stage Validating: average completeness {:.2}", metrics.average_completeness);
            yield ProcessingResult::at(Stage::Validating, "scored quality and ran enrichment")
                .with_raw(raw.clone())
                .with_parsed(parsed.clone())
                .with_chunks(chunks.clone())
                .with_metrics(metrics.clone(), recs.clone());

            log::debug!("pipeline stage Completed: {}", path.display());
            yield ProcessingResult::at(Stage::Completed, "done")
                .with_raw(raw)
                .with_parsed(parsed)
                .with_chunks(chunks)
                .with_metrics(metrics, recs);
        })
    }

    /// The windowed chunked-reader path for inputs over
    /// `stream_threshold_bytes` (spec §4.8): decodes each window as UTF-8
    /// with replacement, packs it with a sentence-aware greedy packer, and
    /// yields partial `result` snapshots after every window.
    fn process_streamed(
        &self,
        path: PathBuf,
        total_bytes: u64,
        cancellation: CancellationToken,
    ) -> impl Stream<Item = ProcessingResult> + Send + '_ {
        let window_bytes = self.config.stream_window_bytes.max(1) as usize;
        let max_chunk_size = self.config.chunking_options.max_chunk_size;
        stream! {
            let file = match tokio::fs::File::open(&path).await {
                Ok(file) => file,
                Err(io_err) => {
                    let err = FileFluxError::IoError(io_err);
                    yield ProcessingResult::error("failed to open input for streaming", &err, None, None);
                    return;
                }
            };
            let mut reader = tokio::io::BufReader::new(file);
            let mut all_chunks: Vec<DocumentChunk> = Vec::new();
            let mut bytes_read: u64 = 0;
            let mut window_index: usize = 0;

            loop {
                if let Err(err) = cancellation.check() {
                    yield ProcessingResult::error("cancelled during streamed read", &err, None, None);
                    return;
                }

                let mut buf = vec![0u8; window_bytes];
                let n = match reader.read(&mut buf).await {
                    Ok(n) => n,
                    Err(io_err) => {
                        let err = FileFluxError::IoError(io_err);
                        yield ProcessingResult::error("streamed read failed", &err, None, None);
                        return;
                    }
                };
                if n == 0 {
                    break;
                }
                buf.truncate(n);
                bytes_read += n as u64;

                let text = String::from_utf8_lossy(&buf).into_owned();
                let mut window_chunks = stream_window_chunks(&text, window_index, max_chunk_size);
                for chunk in &mut window_chunks {
                    chunk.index = all_chunks.len() + (chunk.index);
                }
                all_chunks.append(&mut window_chunks);
                window_index += 1;

                let fraction = (bytes_read as f64 / total_bytes as f64).clamp(0.0, 1.0);
                let band_start = Stage::Chunking.nominal_progress();
                let band_end = Stage::Validating.nominal_progress();
                let overall = band_start + fraction * (band_end - band_start);

                yield ProcessingResult::at(
                    Stage::Chunking,
                    format!("streamed window {window_index} ({bytes_read}/{total_bytes} bytes)"),
                )
                .with_chunks(all_chunks.clone())
                .with_overall(overall);
            }

            for (i, chunk) in all_chunks.iter_mut().enumerate() {
                chunk.index = i;
            }

            let metrics = quality::aggregate(&all_chunks);

            yield ProcessingResult::at(Stage::Validating, "scored streamed quality")
                .with_chunks(all_chunks.clone())
                .with_metrics(metrics.clone(), Vec::new());

            yield ProcessingResult::at(Stage::Completed, "done")
                .with_chunks(all_chunks)
                .with_metrics(metrics, Vec::new());
        }
    }

    async fn convert_and_normalize(
        &self,
        raw: &crate::model::RawContent,
        cancellation: &CancellationToken,
    ) -> String {
        let converter = MarkdownConverter::new();
        let conversion = converter
            .convert(
                raw,
                &self.config.conversion_options,
                self.completion.as_deref(),
                cancellation,
            )
            .await;

        let normalizer = MarkdownNormalizer::new();
        let normalization =
            normalizer.normalize(&conversion.markdown, &self.config.normalization_options);
        normalization.markdown
    }

    /// Processes every path in `paths` in waves of `batch_size`, running up
    /// to `max_concurrency` runs within a wave concurrently (spec §4.8).
    pub async fn process_batch(
        &self,
        paths: &[PathBuf],
        cancellation: CancellationToken,
    ) -> Vec<BatchItemResult> {
        let batch_size = self.config.batch_size.max(1);
        let max_concurrency = self.config.max_concurrency.max(1);
        let mut results = Vec::with_capacity(paths.len());

        for wave in paths.chunks(batch_size) {
            let wave_results: Vec<BatchItemResult> = stream::iter(wave.iter().cloned())
                .map(|path| self.process_one(path, cancellation.clone()))
                .buffer_unordered(max_concurrency)
                .collect()
                .await;
            results.extend(wave_results);
        }

        results
    }

    async fn process_one(&self, path: PathBuf, cancellation: CancellationToken) -> BatchItemResult {
        let start = Instant::now();
        let mut chunks = Vec::new();
        let mut error = None;

        let mut run = self.process(&path, cancellation);
        while let Some(item) = run.next().await {
            if let Some(err) = &item.error {
                error = Some(err.message.clone());
            }
            if item.progress.stage == Stage::Completed {
                chunks = item.result.unwrap_or_default();
            }
        }

        if let Some(message) = &error {
            log::warn!("batch item failed for {}: {message}", path.display());
        }

        BatchItemResult {
            path,
            success: error.is_none(),
            error,
            chunks,
            processing_time: start.elapsed(),
        }
    }
}

/// A lightweight sentence-aware greedy packer for one streamed window (spec
/// §4.8). Tags every resulting chunk with `props.BatchIndex` and
/// `props.IsStreamProcessed=true` for provenance; does not consult
/// `content.structure` since no [`crate::model::ParsedContent`] exists on
/// this path.
fn stream_window_chunks(text: &str, window_index: usize, max_chunk_size: usize) -> Vec<DocumentChunk> {
    let sentences = support::segment_sentences(text);
    let mut groups: Vec<Vec<support::Sentence<'_>>> = Vec::new();
    let mut current: Vec<support::Sentence<'_>> = Vec::new();
    let mut current_len = 0usize;

    for sentence in sentences {
        if current_len + sentence.text.len() > max_chunk_size && !current.is_empty() {
            groups.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current_len += sentence.text.len();
        current.push(sentence);
    }
    if !current.is_empty() {
        groups.push(current);
    }
    if groups.is_empty() && !text.trim().is_empty() {
        let mut chunk = DocumentChunk::new(text.to_string(), "Streaming");
        chunk.location.end_char = text.len();
        tag_streamed(&mut chunk, window_index);
        return vec![chunk];
    }

    let mut chunks = support::build_chunks_from_sentence_groups(text, &groups, "Streaming", 0);
    for chunk in &mut chunks {
        tag_streamed(chunk, window_index);
    }
    chunks
}

fn tag_streamed(chunk: &mut DocumentChunk, window_index: usize) {
    chunk.set_prop("BatchIndex", window_index as i64);
    chunk.set_prop("IsStreamProcessed", true);
    chunk.quality = quality::score_chunk(&chunk.content, 1.0);
    chunk.importance = chunk.quality.overall;
    chunk.density = chunk.quality.information_density;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CompletionResult, ExtractedMetadata, QualityAssessment, StructureAnalysis};
    use crate::error::Result;
    use crate::model::{DocumentMetadata, FileInfo, ParsedContent, ParsingInfo, RawContent};
    use async_trait::async_trait;
    use std::time::Duration as StdDuration;

    struct StubReader;

    #[async_trait]
    impl crate::capability::Reader for StubReader {
        async fn read(&self, path: &Path, _cancellation: &CancellationToken) -> Result<RawContent> {
            Ok(RawContent::new(
                "Stub extracted text. It has two sentences.",
                FileInfo::new(path.to_string_lossy(), "txt", 42, "stub"),
            ))
        }

        async fn read_bytes(
            &self,
            _bytes: &[u8],
            filename: &str,
            _cancellation: &CancellationToken,
        ) -> Result<RawContent> {
            Ok(RawContent::new("stub", FileInfo::new(filename, "txt", 0, "stub")))
        }

        fn supported_extensions(&self) -> &[&str] {
            &["txt"]
        }
    }

    struct StubParser;

    #[async_trait]
    impl crate::capability::Parser for StubParser {
        async fn parse(
            &self,
            raw: RawContent,
            _options: ParsingOptions,
            _cancellation: &CancellationToken,
        ) -> Result<ParsedContent> {
            let word_count = raw.text.split_whitespace().count();
            Ok(ParsedContent {
                structured_text: raw.text.clone(),
                original_text: raw.text,
                metadata: DocumentMetadata {
                    file_name: raw.file.name,
                    file_type: crate::format::SourceFormat::Text,
                    title: None,
                    author: None,
                    language: None,
                    language_confidence: None,
                    page_count: None,
                    word_count,
                    created: None,
                    modified: None,
                    processed: chrono::Utc::now(),
                },
                structure: Vec::new(),
                quality: crate::model::ParsedQuality::default(),
                parsing_info: ParsingInfo {
                    used_llm: false,
                    parser_id: "stub".to_string(),
                    elapsed: StdDuration::from_millis(1),
                    warnings: Vec::new(),
                },
                page_ranges: None,
            })
        }

        fn supported_extensions(&self) -> &[&str] {
            &["txt"]
        }

        fn parser_id(&self) -> &str {
            "stub"
        }
    }

    struct FailingParser;

    #[async_trait]
    impl crate::capability::Parser for FailingParser {
        async fn parse(
            &self,
            _raw: RawContent,
            _options: ParsingOptions,
            _cancellation: &CancellationToken,
        ) -> Result<ParsedContent> {
            Err(FileFluxError::DecodeError("broken".to_string()))
        }

        fn supported_extensions(&self) -> &[&str] {
            &["txt"]
        }

        fn parser_id(&self) -> &str {
            "failing"
        }
    }

    struct StubCompletion;

    #[async_trait]
    impl TextCompletionProvider for StubCompletion {
        async fn generate(
            &self,
            _prompt: &str,
            _cancellation: &CancellationToken,
        ) -> Result<CompletionResult<String>> {
            Ok(CompletionResult { value: "ok".to_string(), tokens_used: 1 })
        }

        async fn analyze_structure(
            &self,
            _text: &str,
            _cancellation: &CancellationToken,
        ) -> Result<CompletionResult<StructureAnalysis>> {
            Ok(CompletionResult {
                value: StructureAnalysis { suggested_strategy: None, headings: Vec::new(), confidence: 0.5 },
                tokens_used: 1,
            })
        }

        async fn summarize(
            &self,
            _text: &str,
            _cancellation: &CancellationToken,
        ) -> Result<CompletionResult<String>> {
            Ok(CompletionResult { value: "summary".to_string(), tokens_used: 1 })
        }

        async fn extract_metadata(
            &self,
            _text: &str,
            _cancellation: &CancellationToken,
        ) -> Result<CompletionResult<ExtractedMetadata>> {
            Ok(CompletionResult {
                value: ExtractedMetadata {
                    title: None,
                    author: None,
                    keywords: vec!["alpha".to_string()],
                    language: None,
                },
                tokens_used: 1,
            })
        }

        async fn assess_quality(
            &self,
            _text: &str,
            _cancellation: &CancellationToken,
        ) -> Result<CompletionResult<QualityAssessment>> {
            Ok(CompletionResult {
                value: QualityAssessment { score: 0.9, findings: Vec::new() },
                tokens_used: 1,
            })
        }
    }

    fn pipeline() -> DocumentPipeline {
        let mut readers = ReaderRegistry::new();
        readers.register(Arc::new(StubReader));
        let mut parsers = ParserRegistry::new();
        parsers.register(Arc::new(StubParser));
        DocumentPipeline::new(readers, parsers, PipelineConfig::default())
    }

    #[tokio::test]
    async fn successful_run_ends_with_completed_and_monotonic_progress() {
        let _ = env_logger::try_init();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        tokio::fs::write(&path, b"hello world").await.unwrap();

        let pipeline = pipeline();
        let mut run = pipeline.process(&path, CancellationToken::new());
        let mut last_progress = -1.0;
        let mut stages = Vec::new();
        while let Some(item) = run.next().await {
            assert!(item.progress.overall_progress >= last_progress);
            last_progress = item.progress.overall_progress;
            stages.push(item.progress.stage);
        }

        assert_eq!(stages.last(), Some(&Stage::Completed));
        assert!(!stages.contains(&Stage::Error));
    }

    #[tokio::test]
    async fn unregistered_extension_yields_single_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        tokio::fs::write(&path, b"not really a pdf").await.unwrap();

        let pipeline = pipeline();
        let mut run = pipeline.process(&path, CancellationToken::new());
        let mut results = Vec::new();
        while let Some(item) = run.next().await {
            results.push(item);
        }

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].progress.stage, Stage::Error);
        assert_eq!(results[0].error.as_ref().unwrap().kind, ErrorKind::UnsupportedFormat);
    }

    #[tokio::test]
    async fn parser_failure_preserves_raw_content_on_the_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        tokio::fs::write(&path, b"hello world").await.unwrap();

        let mut readers = ReaderRegistry::new();
        readers.register(Arc::new(StubReader));
        let mut parsers = ParserRegistry::new();
        parsers.register(Arc::new(FailingParser));
        let pipeline = DocumentPipeline::new(readers, parsers, PipelineConfig::default());

        let mut run = pipeline.process(&path, CancellationToken::new());
        let mut last = None;
        while let Some(item) = run.next().await {
            last = Some(item);
        }

        let last = last.unwrap();
        assert_eq!(last.progress.stage, Stage::Error);
        assert!(last.raw_content.is_some());
        assert!(last.parsed_content.is_none());
    }

    #[tokio::test]
    async fn cancelling_before_the_run_yields_a_cancelled_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        tokio::fs::write(&path, b"hello world").await.unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let pipeline = pipeline();
        let mut run = pipeline.process(&path, token);
        let item = run.next().await.unwrap();

        assert_eq!(item.progress.stage, Stage::Error);
        assert_eq!(item.error.unwrap().kind, ErrorKind::Cancelled);
        assert!(run.next().await.is_none());
    }

    #[tokio::test]
    async fn enrichment_runs_when_configured_and_a_completion_provider_is_wired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        tokio::fs::write(&path, b"Sentence one. Sentence two.").await.unwrap();

        let mut readers = ReaderRegistry::new();
        readers.register(Arc::new(StubReader));
        let mut parsers = ParserRegistry::new();
        parsers.register(Arc::new(StubParser));
        let mut config = PipelineConfig::default();
        config.enrichment_options = Some(EnrichmentOptions::default());
        let pipeline = DocumentPipeline::new(readers, parsers, config)
            .with_completion(Arc::new(StubCompletion));

        let mut run = pipeline.process(&path, CancellationToken::new());
        let mut completed = None;
        while let Some(item) = run.next().await {
            if item.progress.stage == Stage::Completed {
                completed = Some(item);
            }
        }

        let chunks = completed.unwrap().result.unwrap();
        assert!(chunks.iter().any(|c| c.prop_str("EnrichedSummary").is_some()));
    }

    #[tokio::test]
    async fn large_input_switches_to_the_streamed_path_and_tags_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.txt");
        let body = "Sentence one. Sentence two. ".repeat(2000);
        tokio::fs::write(&path, body.as_bytes()).await.unwrap();

        let mut config = PipelineConfig::default();
        config.stream_threshold_bytes = 1024;
        config.stream_window_bytes = 4096;
        let mut readers = ReaderRegistry::new();
        readers.register(Arc::new(StubReader));
        let mut parsers = ParserRegistry::new();
        parsers.register(Arc::new(StubParser));
        let pipeline = DocumentPipeline::new(readers, parsers, config);

        let mut run = pipeline.process(&path, CancellationToken::new());
        let mut last = None;
        while let Some(item) = run.next().await {
            last = Some(item);
        }

        let last = last.unwrap();
        assert_eq!(last.progress.stage, Stage::Completed);
        let chunks = last.result.unwrap();
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.prop_bool("IsStreamProcessed") == Some(true)));
    }

    #[tokio::test]
    async fn process_batch_reports_success_and_failure_independently() {
        let dir = tempfile::tempdir().unwrap();
        let ok_path = dir.path().join("ok.txt");
        let bad_path = dir.path().join("bad.pdf");
        tokio::fs::write(&ok_path, b"hello world").await.unwrap();
        tokio::fs::write(&bad_path, b"nope").await.unwrap();

        let pipeline = pipeline();
        let results = pipeline
            .process_batch(&[ok_path.clone(), bad_path.clone()], CancellationToken::new())
            .await;

        assert_eq!(results.len(), 2);
        let ok = results.iter().find(|r| r.path == ok_path).unwrap();
        let bad = results.iter().find(|r| r.path == bad_path).unwrap();
        assert!(ok.success);
        assert!(!ok.chunks.is_empty());
        assert!(!bad.success);
        assert!(bad.error.is_some());
    }
}
