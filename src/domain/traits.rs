// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to input and output through
// these two traits, so a JSON file, a socket, or an in-memory
// fixture can all feed the encoder the same way.

use anyhow::Result;

use crate::domain::index_batch::IndexBatch;

// ─── BatchSource ──────────────────────────────────────────────────────────────
/// Anything that can hand over a padded batch of token indices.
///
/// Implementations:
///   - JsonBatchLoader → reads an IndexBatch from a JSON file
pub trait BatchSource {
    fn load_batch(&self) -> Result<IndexBatch>;
}

// ─── FeatureSink ──────────────────────────────────────────────────────────────
/// Anything that can receive an encoded feature tensor in plain form:
/// its shape and its values in row-major order.
///
/// Implementations:
///   - FeatureWriter → writes { "shape": [...], "values": [...] } JSON
pub trait FeatureSink {
    fn write_features(&self, shape: &[usize], values: &[f32]) -> Result<()>;
}
