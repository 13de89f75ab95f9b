// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn framework code lives here. Every component is a
// `#[derive(Module)]` struct built from a `#[derive(Config)]`
// config through `config.init(device)`.
//
//   lookup.rs         — embedding table with a zero padding row
//   conv_char.rs      — character CNN: conv → ReLU → max-pool → FC
//   recurrent.rs      — stacked bidirectional GRU / LSTM encoder
//   positional.rs     — fixed sinusoidal position table
//   attention.rs      — multi-head scaled dot-product attention
//   feed_forward.rs   — position-wise feed-forward sublayer
//   self_attentive.rs — SAE: positional encoding + attention layers
//   embedder.rs       — the composer that ties them together
//   runner.rs         — concrete-backend wrapper used by the CLI
//
// Reference: Burn Book §3 (Building Blocks)
//            Vaswani et al. (2017) Attention Is All You Need

pub mod attention;
pub mod conv_char;
pub mod embedder;
pub mod feed_forward;
pub mod lookup;
pub mod positional;
pub mod recurrent;
pub mod runner;
pub mod self_attentive;

/// Backend the CLI runs on; library users pick their own `B`.
#[cfg(not(feature = "wgpu"))]
pub type EncodeBackend = burn::backend::NdArray;
#[cfg(feature = "wgpu")]
pub type EncodeBackend = burn::backend::Wgpu;

pub type EncodeDevice = <EncodeBackend as burn::tensor::backend::Backend>::Device;
