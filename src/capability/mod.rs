//! Capability interfaces (C1): the traits external collaborators implement.
//!
//! Concrete readers, parsers, and LLM/embedding backends are out of scope
//! for this crate (spec §1) — it defines the contracts and a small amount
//! of discovery plumbing (the registries), and treats every implementation
//! as an opaque `dyn Trait` behind these interfaces.

pub mod completion;
pub mod embedding;
pub mod parser;
pub mod reader;

pub use completion::{
    CompletionResult, QualityAssessment, StructureAnalysis, TextCompletionProvider,
};
pub use embedding::{EmbeddingProvider, EmbeddingPurpose};
pub use parser::{Parser, ParserRegistry, ParsingOptions, StructuringLevel};
pub use reader::{Reader, ReaderRegistry};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation signal, checked at suspension points (spec §5).
///
/// Cloning a token shares the same underlying flag; cancelling any clone
/// cancels all of them. This is deliberately a plain atomic flag rather than
/// a dependency on an external cancellation crate — the pack's async
/// framework crates (`adk-agent`, `rlm-rs`) use the same shape for this.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that starts out not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation to this token and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true if `cancel` has been called on this token or a clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(FileFluxError::Cancelled)` if this token is cancelled,
    /// `Ok(())` otherwise. Call at every suspension point.
    pub fn check(&self) -> crate::error::Result<()> {
        if self.is_cancelled() {
            Err(crate::error::FileFluxError::Cancelled)
        } else {
            Ok(())
        }
    }
}
