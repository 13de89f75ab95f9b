// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe the encoder's world:
// which models exist, how the output width is split between
// them, what an input batch looks like, and what can go wrong.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

/// Model names, modalities and the validated width allocation
pub mod allocation;

/// The EmbedError taxonomy (configuration / shape / index)
pub mod error;

/// A padded batch of character and word indices
pub mod index_batch;

/// Core abstractions (traits) that other layers implement
pub mod traits;
