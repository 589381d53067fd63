//! Adaptive Strategy Selector (C7 / spec §4.6): scores a document's
//! structural features and picks a chunking strategy, with an optional
//! LLM-assisted confidence bump.

use crate::capability::{CancellationToken, TextCompletionProvider};
use crate::chunking::StrategyKind;
use crate::model::ParsedContent;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^(```|~~~)").unwrap());
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{1,6}\s").unwrap());
static TABLE_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*\|?[\s:|-]*-[\s:|-]*\|?\s*$").unwrap());
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]").unwrap());

/// The five heuristic document features the selection rule table (spec
/// §4.6) scores on, each normalized into `[0, 1]` (`average_sentence_length`
/// is a raw character count, not normalized, matching spec's rule
/// threshold of "> 40").
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentFeatures {
    /// Fenced code blocks per kilobyte of text, relative to an expected
    /// baseline.
    pub code_density: f64,
    /// Tables per character of document length.
    pub table_density: f64,
    /// Headings per character of document length.
    pub heading_density: f64,
    /// Mean characters per sentence.
    pub average_sentence_length: f64,
    /// Weighted sum over structural hints (headings, tables, code, lists).
    pub structural_complexity: f64,
}

/// A code fence opening roughly this often per kilobyte is treated as
/// "code-dense" (`code_density` reaches 1.0 at this rate).
const CODE_BASELINE_PER_KB: f64 = 2.0;

impl DocumentFeatures {
    /// Computes features from a document's structured text.
    #[must_use]
    pub fn analyze(text: &str) -> Self {
        let len = text.len().max(1) as f64;
        let kb = (text.len() as f64 / 1024.0).max(0.001);

        let code_blocks = FENCE_OPEN.find_iter(text).count() as f64 / 2.0;
        let code_density = (code_blocks / kb / CODE_BASELINE_PER_KB).min(1.0);

        let table_rows = TABLE_SEPARATOR.find_iter(text).count() as f64;
        let table_density = (table_rows / len * 200.0).min(1.0);

        let headings = HEADING.find_iter(text).count() as f64;
        let heading_density = (headings / len * 200.0).min(1.0);

        let sentences = SENTENCE_END.find_iter(text).count().max(1) as f64;
        let words = text.split_whitespace().count() as f64;
        let average_sentence_length = if sentences > 0.0 {
            (words / sentences) * 5.5 // approx average word length in chars
        } else {
            0.0
        };

        let list_items = text
            .lines()
            .filter(|l| {
                let t = l.trim_start();
                t.starts_with("- ") || t.starts_with("* ") || t.starts_with("+ ")
            })
            .count() as f64;
        let structural_complexity = (heading_density * 2.0
            + table_density * 2.0
            + code_density
            + (list_items / len * 100.0).min(1.0))
        .min(1.0);

        Self {
            code_density,
            table_density,
            heading_density,
            average_sentence_length,
            structural_complexity,
        }
    }
}

/// The selector's recommendation for a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    /// Canonical name of the recommended strategy.
    pub strategy_name: String,
    /// Confidence in the recommendation, in `[0, 1]`.
    pub confidence: f64,
    /// Human-readable justification.
    pub reasoning: String,
    /// Whether a completion provider contributed to this decision.
    pub used_llm: bool,
}

/// Picks a chunking strategy for `content` by applying spec §4.6's ordered
/// rule table to [`DocumentFeatures::analyze`]'s output; ties within a rule
/// are broken by `heading_density`, which only matters for rule 3 (both
/// sides of its `and` already include heading_density).
#[must_use]
pub fn select_strategy(content: &ParsedContent) -> SelectionResult {
    let features = DocumentFeatures::analyze(&content.structured_text);
    let result = rule_based(&features);
    log::info!(
        "adaptive selector chose '{}' (confidence {:.2}): {}",
        result.strategy_name,
        result.confidence,
        result.reasoning
    );
    result
}

fn rule_based(features: &DocumentFeatures) -> SelectionResult {
    if features.code_density > 0.3 {
        return SelectionResult {
            strategy_name: StrategyKind::Intelligent.name().to_string(),
            confidence: 0.9,
            reasoning: format!("code_density {:.2} > 0.3", features.code_density),
            used_llm: false,
        };
    }
    if features.table_density > 0.1 {
        return SelectionResult {
            strategy_name: StrategyKind::Intelligent.name().to_string(),
            confidence: 0.85,
            reasoning: format!("table_density {:.2} > 0.1", features.table_density),
            used_llm: false,
        };
    }
    if features.heading_density > 0.05 && features.structural_complexity > 0.5 {
        return SelectionResult {
            strategy_name: StrategyKind::Hierarchical.name().to_string(),
            confidence: 0.8,
            reasoning: format!(
                "heading_density {:.2} > 0.05 and structural_complexity {:.2} > 0.5",
                features.heading_density, features.structural_complexity
            ),
            used_llm: false,
        };
    }
    if features.average_sentence_length > 40.0 {
        return SelectionResult {
            strategy_name: StrategyKind::Smart.name().to_string(),
            confidence: 0.75,
            reasoning: format!(
                "average_sentence_length {:.1} > 40",
                features.average_sentence_length
            ),
            used_llm: false,
        };
    }
    if features.structural_complexity > 0.3 {
        return SelectionResult {
            strategy_name: StrategyKind::Semantic.name().to_string(),
            confidence: 0.7,
            reasoning: format!("structural_complexity {:.2} > 0.3", features.structural_complexity),
            used_llm: false,
        };
    }
    SelectionResult {
        strategy_name: StrategyKind::Paragraph.name().to_string(),
        confidence: 0.6,
        reasoning: "no structural signal cleared a rule threshold".to_string(),
        used_llm: false,
    }
}

/// Maximum confidence bump a completion provider's structure analysis may
/// contribute (spec §4.6: "raise confidence by up to 0.1").
const LLM_CONFIDENCE_BUMP: f64 = 0.1;

/// Refines [`select_strategy`]'s heuristic choice with a completion
/// provider's `analyze_structure` call, when one is available and the
/// caller's analysis-time budget allows it. Any provider failure or
/// timeout leaves the heuristic result untouched (spec §7: optional-
/// provider failure degrades, never fails the selection).
pub async fn select_strategy_with_refinement(
    content: &ParsedContent,
    completion: Option<&dyn TextCompletionProvider>,
    max_analysis_time: Option<u64>,
    cancellation: &CancellationToken,
) -> SelectionResult {
    let mut result = select_strategy(content);

    let Some(provider) = completion else {
        return result;
    };
    if max_analysis_time == Some(0) {
        return result;
    }
    if cancellation.check().is_err() {
        return result;
    }

    if let Ok(analysis) = provider
        .analyze_structure(&content.structured_text, cancellation)
        .await
    {
        if let Some(suggested) = &analysis.value.suggested_strategy {
            if StrategyKind::parse(suggested).is_some() {
                result.strategy_name = suggested.clone();
            }
        }
        result.confidence = (result.confidence + LLM_CONFIDENCE_BUMP * analysis.value.confidence)
            .min(1.0);
        result.used_llm = true;
        result.reasoning = format!("{}; refined by completion provider", result.reasoning);
    }

    result
}
