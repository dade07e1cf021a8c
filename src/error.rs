//! Typed errors for the chunking, templating, and generation contracts.
//!
//! Application-level paths (config loading, I/O, store access) use
//! [`anyhow::Result`]; these enums exist where callers need to tell one
//! failure apart from another.

use thiserror::Error;

/// Invalid chunker parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkConfigError {
    /// `chunk_size` was zero.
    #[error("chunk size must be > 0")]
    ZeroSize,

    /// The overlap would make the window stride zero or negative.
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// A prompt template that cannot be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A required placeholder does not appear in the template.
    #[error("prompt template is missing the {{{0}}} placeholder")]
    MissingPlaceholder(&'static str),

    /// The template names a placeholder other than `context` or `question`.
    #[error("prompt template uses unknown placeholder {{{0}}}")]
    UnknownPlaceholder(String),

    /// A `{` without a closing `}`, or a lone `}`.
    #[error("prompt template has an unbalanced brace at byte {offset}")]
    UnbalancedBrace { offset: usize },
}

/// A failed completion call.
///
/// Carries the model id that was attempted so the failure can be rendered
/// as a user-visible answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error generating answer (model={model}): {detail}")]
pub struct GenerationError {
    pub model: String,
    pub detail: String,
}
