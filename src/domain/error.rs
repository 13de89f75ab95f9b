// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Every failure in the encoder is a precondition violation:
//
//   Configuration — bad model name, bad dimension allocation,
//                   two character models or two word models
//   Shape         — tensor axis mismatch, ragged input batch,
//                   allocation sum mismatch
//   Index         — vocabulary index outside [0, vocab_size)
//
// Configuration errors surface at construction, shape and index
// errors at the start of a forward call. Nothing is retried.

use thiserror::Error;

/// Errors raised while building or running the embedding encoders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbedError {
    /// The encoder configuration is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A tensor or batch does not have the expected shape.
    #[error("shape error: {0}")]
    Shape(String),

    /// A token index falls outside the vocabulary.
    #[error("index error: index {index} is outside the vocabulary of size {vocab_size}")]
    Index { index: i64, vocab_size: usize },
}

impl EmbedError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }
}
