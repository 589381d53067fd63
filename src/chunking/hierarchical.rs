//! Hierarchical strategy (spec §4.5.5): walks `content.structure`, emitting
//! a parent summary chunk per section plus child body chunks, linked by id.

use super::support::fixed_size_windows;
use super::{ChunkingOptions, ChunkingStrategy};
use crate::capability::{CancellationToken, EmbeddingProvider, TextCompletionProvider};
use crate::error::Result;
use crate::model::{DocumentChunk, ParsedContent, Section};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Discriminates a [`DocumentChunk`]'s role within the section tree
/// (recorded in `props.HierarchyChunkType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum HierarchyChunkType {
    /// The top-level synthetic root, when the document has top-level text
    /// before any section heading.
    Root,
    /// A section summary chunk (heading + a prefix of the body).
    Parent,
    /// A body chunk belonging to a parent section.
    Child,
    /// A section with no further nested subsections of its own.
    Leaf,
}

const DEFAULT_MAX_PARENT: usize = 512;
const DEFAULT_MAX_CHILD: usize = 1024;
const DEFAULT_MIN_SECTION: usize = 32;
const DEFAULT_MAX_DEPTH: usize = 6;

pub struct HierarchicalStrategy;

#[async_trait]
impl ChunkingStrategy for HierarchicalStrategy {
    async fn chunk(
        &self,
        content: &ParsedContent,
        options: &ChunkingOptions,
        _embedder: Option<&dyn EmbeddingProvider>,
        _completion: Option<&dyn TextCompletionProvider>,
        cancellation: &CancellationToken,
    ) -> Result<Vec<DocumentChunk>> {
        let text = &content.structured_text;
        let so = &options.strategy_options;
        let max_parent = so.max_parent_chunk_size.unwrap_or(DEFAULT_MAX_PARENT);
        let max_child = so
            .max_child_chunk_size
            .unwrap_or(options.max_chunk_size.min(DEFAULT_MAX_CHILD));
        let min_section = so.min_section_length.unwrap_or(DEFAULT_MIN_SECTION);
        let max_depth = so.max_hierarchy_depth.unwrap_or(DEFAULT_MAX_DEPTH);

        if content.structure.is_empty() {
            // No detected structure: the whole document is one leaf chunk.
            if text.trim().is_empty() {
                return Ok(Vec::new());
            }
            let mut chunk = DocumentChunk::new(text.clone(), self.name());
            chunk.location.start_char = 0;
            chunk.location.end_char = text.len();
            chunk.set_prop("HierarchyLevel", 0_i64);
            chunk.set_prop("HierarchyChunkType", HierarchyChunkType::Leaf);
            let mut chunks = vec![chunk];
            super::support::finalize(&mut chunks, content);
            return Ok(chunks);
        }

        let mut chunks = Vec::new();
        for section in &content.structure {
            cancellation.check()?;
            walk_section(
                section,
                text,
                0,
                max_depth,
                max_parent,
                max_child,
                min_section,
                options.overlap_size,
                None,
                &mut chunks,
                cancellation,
            )?;
        }

        super::support::finalize(&mut chunks, content);
        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "Hierarchical"
    }
}

#[allow(clippy::too_many_arguments)]
fn walk_section(
    section: &Section,
    text: &str,
    depth: usize,
    max_depth: usize,
    max_parent: usize,
    max_child: usize,
    min_section: usize,
    overlap_size: usize,
    parent_id: Option<uuid::Uuid>,
    out: &mut Vec<DocumentChunk>,
    cancellation: &CancellationToken,
) -> Result<()> {
    cancellation.check()?;

    let body_start = section.start;
    let body_end = section.end;
    let body = &text[body_start.min(text.len())..body_end.min(text.len())];

    if body.trim().len() < min_section && section.children.is_empty() {
        // Too small to bother splitting into parent/child; emit as one leaf.
        let mut chunk = DocumentChunk::new(
            format!("{} {}", "#".repeat(section.level as usize), body.trim()),
            "Hierarchical",
        );
        chunk.location.start_char = body_start;
        chunk.location.end_char = body_end;
        chunk.location.section = Some(section.title.clone());
        chunk.set_prop("HierarchyLevel", depth as i64);
        chunk.set_prop("HierarchyChunkType", HierarchyChunkType::Leaf);
        if let Some(pid) = parent_id {
            chunk.parent_id = pid;
        }
        out.push(chunk);
        return Ok(());
    }

    let summary_len = body.len().min(max_parent);
    let summary_body = &body[..summary_len];
    let mut parent_chunk = DocumentChunk::new(
        format!("{} {}\n\n{}", "#".repeat(section.level as usize), section.title, summary_body),
        "Hierarchical",
    );
    // The parent's location spans the whole section, not just the summary
    // prefix used for its `content` — every remainder/nested-section child
    // below is linked via `parent_id`, and spec §8 invariant 6 requires the
    // parent's location to spatially contain each such child's location.
    parent_chunk.location.start_char = body_start;
    parent_chunk.location.end_char = body_end;
    parent_chunk.location.section = Some(section.title.clone());
    parent_chunk.set_prop("HierarchyLevel", depth as i64);
    parent_chunk.set_prop(
        "HierarchyChunkType",
        if depth == 0 {
            HierarchyChunkType::Root
        } else {
            HierarchyChunkType::Parent
        },
    );
    if let Some(pid) = parent_id {
        parent_chunk.parent_id = pid;
    }
    let parent_id_value = parent_chunk.id;
    let parent_index = out.len();
    out.push(parent_chunk);

    let mut child_ids = Vec::new();

    if depth < max_depth {
        for child in &section.children {
            let before_len = out.len();
            walk_section(
                child,
                text,
                depth + 1,
                max_depth,
                max_parent,
                max_child,
                min_section,
                overlap_size,
                Some(parent_id_value),
                out,
                cancellation,
            )?;
            for c in &out[before_len..] {
                if c.parent_id == parent_id_value {
                    child_ids.push(c.id);
                }
            }
        }
    }

    // Remaining body after the synthetic parent summary, chunked as children
    // of this section (bounded by max_child, reusing FixedSize windowing).
    let remaining_start = body_start + summary_len;
    if remaining_start < body_end {
        let remainder = &text[remaining_start..body_end];
        for (rel_start, rel_end) in fixed_size_windows(remainder, max_child, true) {
            let mut child = DocumentChunk::new(&remainder[rel_start..rel_end], "Hierarchical");
            child.location.start_char = remaining_start + rel_start;
            child.location.end_char = remaining_start + rel_end;
            child.location.section = Some(section.title.clone());
            child.parent_id = parent_id_value;
            child.set_prop("HierarchyLevel", (depth + 1) as i64);
            child.set_prop("HierarchyChunkType", HierarchyChunkType::Child);
            child_ids.push(child.id);
            out.push(child);
        }
    }

    out[parent_index].set_prop("ChildIds", child_ids.iter().map(ToString::to_string).collect::<Vec<_>>());
    out[parent_index].set_prop("HasChildren", !child_ids.is_empty());

    Ok(())
}
