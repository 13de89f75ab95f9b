// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File persistence used by the application layer:
//
//   config_store.rs   — saves/loads the EmbedderConfig as JSON
//                       so an encoder can be rebuilt exactly
//
//   feature_writer.rs — writes encoded features as JSON
//                       (shape + row-major values)
//
// Learned parameters are not persisted here; that belongs to
// whatever training setup owns the weights.

/// Embedder configuration persistence
pub mod config_store;

/// Encoded feature output
pub mod feature_writer;

