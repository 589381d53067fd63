//! Markdown Normalizer (C4 / spec §4.3): a six-phase, idempotent rewrite of
//! malformed Markdown structure — headings, lists, tables, whitespace.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Options controlling which normalization phases run, and their thresholds.
/// All phases default ON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationOptions {
    /// Phase 1: demote purely-annotative headings to plain paragraphs.
    pub demote_annotation_headings: bool,
    /// Phase 2: drop headings with empty or whitespace-only text.
    pub remove_empty_headings: bool,
    /// Phase 3: enforce first-heading ceiling and level-jump ceiling.
    pub normalize_heading_hierarchy: bool,
    /// Phase 4: collapse list indent jumps of more than one nesting level.
    pub normalize_list_structure: bool,
    /// Phase 5: wrap malformed table regions in a raw HTML `<table>` block.
    pub normalize_tables: bool,
    /// Phase 6: trim trailing whitespace and cap blank-line runs.
    pub normalize_whitespace: bool,
    /// Highest level the first heading in the document may have before it is
    /// promoted (phase 3a). Default 2.
    pub max_first_heading_level: u8,
    /// Largest level increase allowed between consecutive headings before
    /// the deeper one is cascaded down (phase 3b). Default 1.
    pub max_heading_level_jump: u8,
    /// Largest difference in column count between table rows before the
    /// table is classified complex (phase 5). Default 1.
    pub max_column_variance: usize,
}

impl Default for NormalizationOptions {
    fn default() -> Self {
        Self {
            demote_annotation_headings: true,
            remove_empty_headings: true,
            normalize_heading_hierarchy: true,
            normalize_list_structure: true,
            normalize_tables: true,
            normalize_whitespace: true,
            max_first_heading_level: 2,
            max_heading_level_jump: 1,
            max_column_variance: 1,
        }
    }
}

/// One normalization edit applied to the document, in the order it fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationAction {
    /// The kind of edit.
    #[serde(rename = "type")]
    pub kind: NormalizationActionKind,
    /// Human-readable detail (e.g. the affected heading text, or old/new level).
    pub details: String,
}

/// Discriminates [`NormalizationAction`]s; tags match spec §4.3's phase log names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizationActionKind {
    /// Phase 1: a heading was demoted because its text was purely annotative.
    AnnotationHeadingDemoted,
    /// Phase 2: a heading with empty or whitespace-only text was dropped.
    EmptyHeadingRemoved,
    /// Phase 3a: the first heading exceeded `max_first_heading_level`.
    FirstHeadingPromoted,
    /// Phase 3b: a heading's level was cascaded down to respect the jump ceiling.
    HeadingHierarchyAdjusted,
    /// Phase 4: a list item's indent jumped by more than one nesting level.
    ListIndentNormalized,
    /// Phase 5: a malformed table region was wrapped in raw HTML.
    ComplexTableConverted,
}

/// Aggregate counts across all phases, matching spec §4.3's `stats` record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    /// Total heading lines encountered before any phase ran.
    pub headings_found: usize,
    /// Headings demoted to plain paragraphs (phase 1).
    pub headings_demoted: usize,
    /// Headings dropped entirely (phase 2).
    pub headings_removed: usize,
    /// Headings whose level was adjusted (phase 3).
    pub headings_adjusted: usize,
    /// List items whose indent was collapsed (phase 4).
    pub lists_normalized: usize,
    /// Table regions detected (phase 5).
    pub tables_found: usize,
    /// Table regions left unmodified because they were already valid.
    pub tables_preserved: usize,
    /// Table regions wrapped in raw HTML because they were malformed.
    pub tables_converted: usize,
    /// Blank lines dropped while capping runs (phase 6).
    pub blank_lines_removed: usize,
}

/// Result of running all enabled phases over a Markdown document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationResult {
    /// The normalized document.
    pub markdown: String,
    /// The document exactly as it was passed in.
    pub original_markdown: String,
    /// Every edit applied, in firing order.
    pub actions: Vec<NormalizationAction>,
    /// Aggregate counts.
    pub stats: NormalizationStats,
}

impl NormalizationResult {
    /// True if any phase made an edit.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.actions.is_empty()
    }
}

static MD_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s*(.*)$").unwrap());
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)([-*+]|\d+\.)\s+").unwrap());
static TABLE_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\|.*\|\s*$").unwrap());
static TABLE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\|?(\s*:?-+:?\s*\|)+\s*:?-*:?\s*\|?\s*$").unwrap());
static FULLWIDTH_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^（.*）$").unwrap());

/// Applies the six ordered normalization phases to `markdown`.
///
/// Idempotent by construction: every phase's edit removes the condition that
/// triggered it, so `normalize(normalize(md)) == normalize(md)`.
#[derive(Debug, Default)]
pub struct MarkdownNormalizer;

impl MarkdownNormalizer {
    /// Creates a normalizer. Stateless — all configuration lives in
    /// [`NormalizationOptions`], passed per call.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Runs every enabled phase over `markdown`, in spec order.
    #[must_use]
    pub fn normalize(&self, markdown: &str, options: &NormalizationOptions) -> NormalizationResult {
        let original_markdown = markdown.to_string();
        let mut lines: Vec<String> = markdown.lines().map(str::to_string).collect();
        let mut actions = Vec::new();
        let mut stats = NormalizationStats::default();

        stats.headings_found = lines.iter().filter(|l| MD_HEADING.is_match(l)).count();

        if options.demote_annotation_headings {
            demote_annotation_headings(&mut lines, &mut actions, &mut stats);
        }
        if options.remove_empty_headings {
            remove_empty_headings(&mut lines, &mut actions, &mut stats);
        }
        if options.normalize_heading_hierarchy {
            normalize_heading_hierarchy(&mut lines, options, &mut actions, &mut stats);
        }
        if options.normalize_list_structure {
            normalize_list_structure(&mut lines, &mut actions, &mut stats);
        }
        if options.normalize_tables {
            normalize_tables(&mut lines, options, &mut actions, &mut stats);
        }
        if options.normalize_whitespace {
            normalize_whitespace(&mut lines, &mut stats);
        }

        NormalizationResult {
            markdown: lines.join("\n"),
            original_markdown,
            actions,
            stats,
        }
    }
}

fn is_annotative(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false; // handled by RemoveEmptyHeadings
    }
    if (trimmed.starts_with('(') && trimmed.ends_with(')')) || FULLWIDTH_PAREN.is_match(trimmed) {
        return true;
    }
    if trimmed.starts_with('※') {
        return true;
    }
    if trimmed.starts_with(['•', '●', '○', '■', '-', '*']) {
        return true;
    }
    trimmed.chars().all(|c| !c.is_alphanumeric())
}

fn demote_annotation_headings(
    lines: &mut [String],
    actions: &mut Vec<NormalizationAction>,
    stats: &mut NormalizationStats,
) {
    for line in lines.iter_mut() {
        if let Some(caps) = MD_HEADING.captures(line) {
            let text = caps[2].to_string();
            if is_annotative(&text) {
                actions.push(NormalizationAction {
                    kind: NormalizationActionKind::AnnotationHeadingDemoted,
                    details: text.clone(),
                });
                stats.headings_demoted += 1;
                *line = text;
            }
        }
    }
}

fn remove_empty_headings(
    lines: &mut Vec<String>,
    actions: &mut Vec<NormalizationAction>,
    stats: &mut NormalizationStats,
) {
    let mut kept = Vec::with_capacity(lines.len());
    for line in lines.drain(..) {
        if let Some(caps) = MD_HEADING.captures(&line) {
            if caps[2].trim().is_empty() {
                actions.push(NormalizationAction {
                    kind: NormalizationActionKind::EmptyHeadingRemoved,
                    details: line.clone(),
                });
                stats.headings_removed += 1;
                continue;
            }
        }
        kept.push(line);
    }
    *lines = kept;
}

fn normalize_heading_hierarchy(
    lines: &mut [String],
    options: &NormalizationOptions,
    actions: &mut Vec<NormalizationAction>,
    stats: &mut NormalizationStats,
) {
    let heading_indices: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| MD_HEADING.is_match(l))
        .map(|(i, _)| i)
        .collect();

    let mut previous_level: Option<u8> = None;
    for (pos, &idx) in heading_indices.iter().enumerate() {
        let caps = MD_HEADING.captures(&lines[idx]).unwrap();
        let mut level = caps[1].len() as u8;
        let text = caps[2].to_string();

        if pos == 0 && level > options.max_first_heading_level {
            actions.push(NormalizationAction {
                kind: NormalizationActionKind::FirstHeadingPromoted,
                details: format!("level {level} -> {}", options.max_first_heading_level),
            });
            stats.headings_adjusted += 1;
            level = options.max_first_heading_level;
        } else if let Some(prev) = previous_level {
            let max_allowed = prev.saturating_add(options.max_heading_level_jump);
            if level > max_allowed {
                actions.push(NormalizationAction {
                    kind: NormalizationActionKind::HeadingHierarchyAdjusted,
                    details: format!("level {level} -> {max_allowed}"),
                });
                stats.headings_adjusted += 1;
                level = max_allowed;
            }
        }

        lines[idx] = format!("{} {}", "#".repeat(level as usize), text);
        previous_level = Some(level);
    }
}

fn normalize_list_structure(
    lines: &mut [String],
    actions: &mut Vec<NormalizationAction>,
    stats: &mut NormalizationStats,
) {
    let mut baseline: Option<usize> = None;
    for line in lines.iter_mut() {
        match LIST_ITEM.captures(line.as_str()) {
            Some(caps) => {
                let indent = caps[1].len();
                let level = indent / 2;
                let prev = baseline.unwrap_or(0);
                if level > prev + 1 {
                    let collapsed_indent = (prev + 1) * 2;
                    let marker_start = caps[0].len();
                    let rest = &line[marker_start..];
                    let marker = caps[2].to_string();
                    *line = format!("{}{} {}", " ".repeat(collapsed_indent), marker, rest);
                    actions.push(NormalizationAction {
                        kind: NormalizationActionKind::ListIndentNormalized,
                        details: format!("indent level {level} -> {}", prev + 1),
                    });
                    stats.lists_normalized += 1;
                    baseline = Some(prev + 1);
                } else {
                    baseline = Some(level);
                }
            }
            None => {
                if !line.trim().is_empty() {
                    baseline = None;
                }
            }
        }
    }
}

fn normalize_tables(
    lines: &mut Vec<String>,
    options: &NormalizationOptions,
    actions: &mut Vec<NormalizationAction>,
    stats: &mut NormalizationStats,
) {
    let mut result = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        if TABLE_ROW.is_match(&lines[i]) {
            let start = i;
            let mut end = i;
            while end < lines.len() && TABLE_ROW.is_match(&lines[end]) {
                end += 1;
            }
            let block = &lines[start..end];
            stats.tables_found += 1;

            let has_separator = block.len() >= 2 && TABLE_SEPARATOR.is_match(&block[1]);
            let column_counts: Vec<usize> = block
                .iter()
                .map(|l| l.matches('|').count().saturating_sub(1))
                .collect();
            let variance = column_counts
                .iter()
                .max()
                .zip(column_counts.iter().min())
                .map(|(max, min)| max - min)
                .unwrap_or(0);
            let valid = has_separator && block.len() >= 2 && variance <= options.max_column_variance;

            if valid {
                stats.tables_preserved += 1;
                result.extend(block.iter().cloned());
            } else {
                actions.push(NormalizationAction {
                    kind: NormalizationActionKind::ComplexTableConverted,
                    details: format!("{} row(s), separator_present={has_separator}", block.len()),
                });
                stats.tables_converted += 1;
                result.push("<table>".to_string());
                for row in block {
                    let cells: Vec<&str> = row
                        .trim()
                        .trim_start_matches('|')
                        .trim_end_matches('|')
                        .split('|')
                        .map(str::trim)
                        .collect();
                    let tag = if row == &block[0] { "th" } else { "td" };
                    let cells_html: String = cells
                        .iter()
                        .map(|c| format!("<{tag}>{c}</{tag}>"))
                        .collect();
                    result.push(format!("<tr>{cells_html}</tr>"));
                }
                result.push("</table>".to_string());
            }

            i = end;
        } else {
            result.push(lines[i].clone());
            i += 1;
        }
    }
    *lines = result;
}

fn normalize_whitespace(lines: &mut Vec<String>, stats: &mut NormalizationStats) {
    for line in lines.iter_mut() {
        let trimmed = line.trim_end();
        if trimmed.len() != line.len() {
            *line = trimmed.to_string();
        }
    }

    let mut result = Vec::with_capacity(lines.len());
    let mut blank_run = 0;
    for line in lines.drain(..) {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 2 {
                stats.blank_lines_removed += 1;
                continue;
            }
        } else {
            blank_run = 0;
        }
        result.push(line);
    }
    *lines = result;
}
