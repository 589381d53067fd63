//! Shared helpers used by every chunking strategy (spec §9: "composition,
//! not inheritance"). No strategy subclasses another; each calls into these
//! free functions for the behavior they have in common.

use crate::model::{parsed_content::heading_path, DocumentChunk, ParsedContent};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+[\)\]\""']*\s+").unwrap());
static CLAUSE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;:]\s+").unwrap());
static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(```|~~~)").unwrap());

/// A sentence and its byte range within the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentence<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

/// Splits `text` into sentences on terminal punctuation followed by
/// whitespace. The final sentence (no trailing terminator) is still
/// returned. Never panics on empty input.
#[must_use]
pub fn segment_sentences(text: &str) -> Vec<Sentence<'_>> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        let end = m.end();
        if end > start {
            sentences.push(Sentence {
                start,
                end,
                text: &text[start..end],
            });
        }
        start = end;
    }
    if start < text.len() {
        sentences.push(Sentence {
            start,
            end: text.len(),
            text: &text[start..],
        });
    }
    sentences
}

/// Splits `text` on blank-line boundaries (one or more fully-blank lines),
/// returning each paragraph with its byte range.
#[must_use]
pub fn segment_paragraphs(text: &str) -> Vec<Sentence<'_>> {
    let mut paragraphs = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\n' {
            let mut j = i + 1;
            let mut blank_lines = 0;
            while j < bytes.len() && bytes[j] == b'\n' {
                blank_lines += 1;
                j += 1;
            }
            if blank_lines >= 1 {
                let end = i;
                if end > start && text[start..end].trim().len() > 0 {
                    paragraphs.push(Sentence {
                        start,
                        end,
                        text: &text[start..end],
                    });
                }
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    if start < text.len() && text[start..].trim().len() > 0 {
        paragraphs.push(Sentence {
            start,
            end: text.len(),
            text: &text[start..],
        });
    }
    paragraphs
}

/// Splits an over-long sentence on clause markers (`,`, `;`, `:`) so it fits
/// within `max_len`. Used by Smart when a single sentence exceeds
/// `max_chunk_size` (spec §4.5.4).
#[must_use]
pub fn split_on_clauses(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut last_marker_end = 0;
    for m in CLAUSE_MARKER.find_iter(text) {
        if m.end() - start > max_len && last_marker_end > start {
            pieces.push(text[start..last_marker_end].to_string());
            start = last_marker_end;
        }
        last_marker_end = m.end();
    }
    if start < text.len() {
        pieces.push(text[start..].to_string());
    }
    if pieces.is_empty() {
        pieces.push(text.to_string());
    }
    pieces
}

/// True if `text` contains an odd number of fenced code block markers,
/// meaning a fence opened inside it is never closed.
#[must_use]
pub fn has_unbalanced_fence(text: &str) -> bool {
    text.lines().filter(|l| FENCE.is_match(l.trim_start())).count() % 2 == 1
}

/// Finds the nearest preceding whitespace boundary to `ideal_pos`, searching
/// back at most `search_window` bytes. Falls back to `ideal_pos` if no
/// boundary is found (e.g. one extremely long word).
#[must_use]
pub fn word_boundary_before(text: &str, ideal_pos: usize, search_window: usize) -> usize {
    let floor = ideal_pos.saturating_sub(search_window);
    let mut pos = ideal_pos.min(text.len());
    while pos > floor {
        if text.as_bytes().get(pos - 1).map(|b| b.is_ascii_whitespace()).unwrap_or(false) {
            return pos;
        }
        pos -= 1;
    }
    ideal_pos.min(text.len())
}

/// Builds the overlap prefix for the next chunk: the last `overlap_size`
/// characters of `previous`, extended backward to the nearest word boundary
/// so the overlap never starts mid-word.
#[must_use]
pub fn overlap_prefix(previous: &str, overlap_size: usize) -> String {
    if overlap_size == 0 || previous.is_empty() {
        return String::new();
    }
    let char_count = previous.chars().count();
    let take = overlap_size.min(char_count);
    let byte_start = previous
        .char_indices()
        .rev()
        .nth(take.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let aligned = word_boundary_before(previous, byte_start, byte_start.min(32));
    previous[aligned..].to_string()
}

/// Keeps whole trailing sentences from `sentences` whose combined length is
/// `<= overlap_size`, used by Semantic/Smart's sentence-aligned overlap.
#[must_use]
pub fn sentence_aligned_overlap(sentences: &[Sentence<'_>], overlap_size: usize) -> String {
    if overlap_size == 0 {
        return String::new();
    }
    let mut kept = Vec::new();
    let mut total = 0;
    for sentence in sentences.iter().rev() {
        let len = sentence.text.len();
        if total + len > overlap_size && !kept.is_empty() {
            break;
        }
        total += len;
        kept.push(sentence.text);
        if total >= overlap_size {
            break;
        }
    }
    kept.reverse();
    kept.concat()
}

/// Splits `text` into `<= max_chunk_size` byte ranges, snapping to a word
/// boundary near the end of each window and, when `preserve_structure` is
/// set, never cutting inside a fenced code block or mid-table-row. Shared by
/// FixedSize directly and by Paragraph/Intelligent as an internal fallback
/// for oversized spans (spec §4.5.1, §4.5.2).
#[must_use]
pub fn fixed_size_windows(text: &str, max_chunk_size: usize, preserve_structure: bool) -> Vec<(usize, usize)> {
    let mut windows = Vec::new();
    let len = text.len();
    if text.trim().is_empty() || max_chunk_size == 0 {
        return windows;
    }
    let mut pos = 0;
    while pos < len {
        let naive_end = (pos + max_chunk_size).min(len);
        let end = if naive_end >= len {
            len
        } else if preserve_structure {
            structure_safe_end(text, pos, naive_end)
        } else {
            word_boundary_end(text, pos, naive_end)
        };
        let end = end.max(pos + 1).min(len);
        windows.push((pos, end));
        pos = end;
    }
    windows
}

fn word_boundary_end(text: &str, pos: usize, naive_end: usize) -> usize {
    let search_window = (naive_end - pos) / 10;
    let snapped = word_boundary_before(text, naive_end, search_window);
    if snapped > pos {
        snapped
    } else {
        naive_end
    }
}

fn structure_safe_end(text: &str, pos: usize, naive_end: usize) -> usize {
    let mut candidate = word_boundary_end(text, pos, naive_end);
    loop {
        let slice = &text[pos..candidate];
        let fence_ok = !has_unbalanced_fence(slice);
        let table_ok = !ends_mid_table_row(text, pos, candidate);
        if fence_ok && table_ok {
            return candidate;
        }
        match text[pos..candidate].rfind('\n') {
            Some(rel) if pos + rel > pos => candidate = pos + rel,
            _ => return naive_end,
        }
    }
}

fn ends_mid_table_row(text: &str, pos: usize, end: usize) -> bool {
    if end >= text.len() {
        return false;
    }
    let slice = &text[pos..end];
    let Some(last_line) = slice.rsplit('\n').next() else {
        return false;
    };
    let trimmed = last_line.trim_start();
    if !trimmed.starts_with('|') {
        return false;
    }
    text[end..].chars().next().map(|c| c != '\n').unwrap_or(false)
}

/// Builds one [`DocumentChunk`] per `(start, end)` byte range into `text`,
/// under `strategy_name`, prepending a sequential overlap prefix (spec
/// §4.5's overlap behavior) of `overlap_size` characters drawn from each
/// window's own un-overlapped text. Shared by FixedSize and Paragraph.
#[must_use]
pub fn build_windowed_chunks(
    text: &str,
    windows: &[(usize, usize)],
    strategy_name: &str,
    overlap_size: usize,
) -> Vec<DocumentChunk> {
    let mut chunks = Vec::with_capacity(windows.len());
    let mut previous_original: Option<&str> = None;

    for &(start, end) in windows {
        let original = &text[start..end];
        let mut body = original.to_string();
        let mut has_overlap = false;
        if overlap_size > 0 {
            if let Some(prev) = previous_original {
                let prefix = overlap_prefix(prev, overlap_size);
                if !prefix.is_empty() {
                    has_overlap = true;
                    body = format!("{prefix}{body}");
                }
            }
        }

        let mut chunk = DocumentChunk::new(body, strategy_name);
        chunk.location.start_char = start;
        chunk.location.end_char = end;
        if has_overlap {
            chunk.set_prop("HasOverlap", true);
        }
        previous_original = Some(original);
        chunks.push(chunk);
    }

    chunks
}

/// Assigns `index` (0, 1, ..., N-1), computes `location.heading_path` from
/// `content.structure`, links `PreviousChunkId`/`NextChunkId` props, and
/// scores `quality.*` via the Quality Engine. Run once after a strategy
/// produces its raw chunk sequence (spec §4.5 "Common finalization").
pub fn finalize(chunks: &mut [DocumentChunk], content: &ParsedContent) {
    for (i, chunk) in chunks.iter_mut().enumerate() {
        chunk.index = i;
        chunk.location.heading_path =
            heading_path(&content.structure, chunk.location.start_char, chunk.location.end_char);
        if let Some((start_page, end_page)) =
            content.page_range_for(chunk.location.start_char, chunk.location.end_char)
        {
            chunk.location.start_page = Some(start_page);
            chunk.location.end_page = Some(end_page);
        }
    }

    let ids: Vec<Uuid> = chunks.iter().map(|c| c.id).collect();
    for (i, chunk) in chunks.iter_mut().enumerate() {
        if i > 0 {
            chunk.set_prop("PreviousChunkId", serde_json::json!(ids[i - 1]));
        }
        if i + 1 < ids.len() {
            chunk.set_prop("NextChunkId", serde_json::json!(ids[i + 1]));
        }
        let sentence_integrity = chunk.prop_f64("SentenceIntegrity").unwrap_or(1.0);
        chunk.quality = crate::quality::score_chunk(&chunk.content, sentence_integrity);
        chunk.importance = chunk.quality.overall;
        chunk.density = chunk.quality.information_density;
    }
}

/// Builds one [`DocumentChunk`] per group of consecutive [`Sentence`]s,
/// prepending sentence-aligned overlap (spec §4.5.3, §4.5.4: "Applies
/// sentence-aligned overlap") drawn from the previous group's own sentences.
/// Shared by Semantic and Smart.
#[must_use]
pub fn build_chunks_from_sentence_groups(
    text: &str,
    groups: &[Vec<Sentence<'_>>],
    strategy_name: &str,
    overlap_size: usize,
) -> Vec<DocumentChunk> {
    let mut chunks = Vec::with_capacity(groups.len());
    let mut previous_group: Option<&Vec<Sentence<'_>>> = None;

    for group in groups {
        let Some(first) = group.first() else { continue };
        let last = group.last().unwrap();
        let start = first.start;
        let end = last.end;

        let mut body = text[start..end].to_string();
        let mut has_overlap = false;
        if overlap_size > 0 {
            if let Some(prev) = previous_group {
                let prefix = sentence_aligned_overlap(prev, overlap_size);
                if !prefix.is_empty() {
                    has_overlap = true;
                    body = format!("{prefix}{body}");
                }
            }
        }

        let mut chunk = DocumentChunk::new(body, strategy_name);
        chunk.location.start_char = start;
        chunk.location.end_char = end;
        if has_overlap {
            chunk.set_prop("HasOverlap", true);
        }
        previous_group = Some(group);
        chunks.push(chunk);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_size_windows_never_exceed_max_chunk_size() {
        let text = "word ".repeat(500);
        let windows = fixed_size_windows(&text, 200, true);
        assert!(windows.len() > 1);
        assert!(windows.iter().all(|(s, e)| e - s <= 200));
    }

    #[test]
    fn fixed_size_windows_cover_the_whole_text_contiguously() {
        let text = "word ".repeat(200);
        let windows = fixed_size_windows(&text, 150, false);
        assert_eq!(windows.first().unwrap().0, 0);
        assert_eq!(windows.last().unwrap().1, text.len());
        for pair in windows.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
    }

    #[test]
    fn fixed_size_windows_avoid_unbalanced_fences_when_preserving_structure() {
        let text = format!("intro.\n\n```rust\n{}\n```\n\noutro.", "x".repeat(150));
        let windows = fixed_size_windows(&text, 100, true);
        for (s, e) in &windows {
            assert!(!has_unbalanced_fence(&text[*s..*e]));
        }
    }

    #[test]
    fn empty_text_produces_no_windows() {
        assert!(fixed_size_windows("   ", 100, true).is_empty());
    }

    #[test]
    fn segment_sentences_splits_on_terminal_punctuation() {
        let sentences = segment_sentences("One. Two! Three?");
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0].text.trim(), "One.");
    }

    #[test]
    fn segment_sentences_keeps_trailing_fragment_without_terminator() {
        let sentences = segment_sentences("One. incomplete fragment");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[1].text, "incomplete fragment");
    }

    #[test]
    fn segment_paragraphs_splits_on_blank_lines() {
        let paragraphs = segment_paragraphs("first para\nsecond line.\n\nsecond para.");
        assert_eq!(paragraphs.len(), 2);
    }

    #[test]
    fn split_on_clauses_respects_max_len_when_possible() {
        let pieces = split_on_clauses("alpha, beta, gamma, delta, epsilon", 12);
        assert!(pieces.len() > 1);
        assert!(pieces.iter().all(|p| !p.is_empty()));
    }

    #[test]
    fn unbalanced_fence_detects_odd_marker_count() {
        assert!(has_unbalanced_fence("```rust\nfn x() {}"));
        assert!(!has_unbalanced_fence("```rust\nfn x() {}\n```"));
    }

    #[test]
    fn overlap_prefix_never_exceeds_source_length() {
        let prefix = overlap_prefix("a short chunk of text", 1000);
        assert_eq!(prefix, "a short chunk of text");
    }

    #[test]
    fn overlap_prefix_is_empty_when_requested_size_is_zero() {
        assert_eq!(overlap_prefix("some text", 0), "");
    }

    #[test]
    fn sentence_aligned_overlap_keeps_whole_trailing_sentences() {
        let text = "Alpha sentence. Beta sentence. Gamma sentence.";
        let sentences = segment_sentences(text);
        let overlap = sentence_aligned_overlap(&sentences, 20);
        assert!(overlap.trim_start().starts_with("Gamma") || overlap.trim_start().starts_with("Beta"));
    }
}
