//! Auto strategy (spec §4.5.7): delegates to another strategy, either
//! forced by the caller or chosen by the Adaptive Strategy Selector.

use super::{ChunkingOptions, ChunkingStrategy, StrategyKind};
use crate::capability::{CancellationToken, EmbeddingProvider, TextCompletionProvider};
use crate::error::Result;
use crate::model::{DocumentChunk, ParsedContent};
use crate::selector;
use async_trait::async_trait;

/// Confidence floor below which a selector recommendation is discarded in
/// favor of the Paragraph fallback (spec §4.5.7 step 3), unless the caller
/// overrides it via `strategy_options.confidence_threshold`.
const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

pub struct AutoStrategy;

#[async_trait]
impl ChunkingStrategy for AutoStrategy {
    async fn chunk(
        &self,
        content: &ParsedContent,
        options: &ChunkingOptions,
        embedder: Option<&dyn EmbeddingProvider>,
        completion: Option<&dyn TextCompletionProvider>,
        cancellation: &CancellationToken,
    ) -> Result<Vec<DocumentChunk>> {
        let so = &options.strategy_options;

        let (chosen, reasoning) = if let Some(forced) = so
            .force_strategy
            .as_deref()
            .and_then(StrategyKind::parse)
        {
            (forced, format!("Forced strategy: {}", forced.name()))
        } else {
            let threshold = so.confidence_threshold.unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD);
            let selection = selector::select_strategy_with_refinement(
                content,
                completion,
                so.max_analysis_time,
                cancellation,
            )
            .await;

            if selection.confidence < threshold {
                (
                    StrategyKind::Paragraph,
                    format!(
                        "Low confidence, default strategy: selector confidence {:.2} below threshold {:.2}",
                        selection.confidence, threshold
                    ),
                )
            } else {
                let mut kind = StrategyKind::parse(&selection.strategy_name)
                    .unwrap_or(StrategyKind::Paragraph);
                let mut reasoning = selection.reasoning.clone();

                if so.prefer_speed == Some(true)
                    && !matches!(kind, StrategyKind::FixedSize | StrategyKind::Paragraph)
                {
                    kind = StrategyKind::Paragraph;
                    reasoning = format!("{reasoning} [Speed optimized]");
                } else if so.prefer_quality == Some(true)
                    && !matches!(
                        kind,
                        StrategyKind::Smart | StrategyKind::Semantic | StrategyKind::Intelligent
                    )
                {
                    kind = StrategyKind::Smart;
                    reasoning = format!("{reasoning} [Quality optimized]");
                }

                (kind, reasoning)
            }
        };
        log::info!("Auto strategy delegated to '{}': {reasoning}", chosen.name());

        let underlying = super::create_strategy(chosen);
        let mut chunks = underlying
            .chunk(content, options, embedder, completion, cancellation)
            .await?;

        let label = format!("Auto({})", chosen.name());
        for chunk in &mut chunks {
            chunk.strategy = label.clone();
            chunk.set_prop("AutoSelectedStrategy", chosen.name());
            chunk.set_prop("SelectionReasoning", reasoning.clone());
        }
        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "Auto"
    }
}
