// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From an index file on disk to tensors on the device:
//
//   batch.json
//       │
//       ▼
//   JsonBatchLoader   → reads an IndexBatch (BatchSource)
//       │
//       ▼
//   IndexBatcher      → validates it and builds Int tensors
//       │
//       ▼
//   Embedder::encode
//
// Tokenisation and padding happen upstream; this layer only
// checks that the batch is rectangular.

/// Loads an IndexBatch from a JSON file
pub mod loader;

/// Builds Burn Int tensors from an IndexBatch
pub mod batcher;
