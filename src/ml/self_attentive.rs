// ============================================================
// Layer 5 — Self-Attentive Encoder (SAE)
// ============================================================
// Word-level transformer encoder:
//
//   words [Ls, G] ──transpose──► [G, Ls]
//        │                         │ padding mask [G, Ls]
//        ▼                         ▼
//   embed + positional signal   [G, Ls, D]
//        │
//        ▼  × num_layers
//   ┌────────────────────────────────┐
//   │ MultiHeadAttention (q = k = v) │
//   │ FeedForward                    │
//   └────────────────────────────────┘
//        │
//        ▼ transpose back
//   [Ls, G, D]
//
// Attention runs over the word positions of each group; padding
// words are masked as keys in every layer.

use burn::prelude::*;

use crate::domain::{error::EmbedError, index_batch::PAD_IDX};
use crate::ml::{
    attention::{MultiHeadAttention, MultiHeadAttentionConfig},
    feed_forward::{FeedForward, FeedForwardConfig},
    lookup::{LookupEncoder, LookupEncoderConfig},
    positional::{PositionalEncoding, PositionalEncodingConfig},
};

#[derive(Config, Debug)]
pub struct SelfAttentiveEncoderConfig {
    pub vocab_size: usize,
    /// Model dimension D
    pub embed_dim:  usize,
    #[config(default = 8)]
    pub n_heads: usize,
    /// Zero layers leaves embedding + positional signal
    #[config(default = 1)]
    pub num_layers: usize,
    #[config(default = 2048)]
    pub d_ff: usize,
    /// Rows in the positional table
    #[config(default = 1000)]
    pub max_len: usize,
    #[config(default = 0.5)]
    pub dropout: f64,
    #[config(default = 1e-5)]
    pub layer_norm_eps: f64,
}

impl SelfAttentiveEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<SelfAttentiveEncoder<B>, EmbedError> {
        let embedding  = LookupEncoderConfig::new(self.vocab_size, self.embed_dim).init(device)?;
        let positional = PositionalEncodingConfig::new(self.embed_dim)
            .with_max_len(self.max_len)
            .init(device)?;
        let layers = (0..self.num_layers)
            .map(|_| self.build_layer(device))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            "Self-attentive encoder: D={}, {} heads, {} layer(s), d_ff={}",
            self.embed_dim, self.n_heads, self.num_layers, self.d_ff
        );

        Ok(SelfAttentiveEncoder { embedding, positional, layers })
    }

    fn build_layer<B: Backend>(&self, device: &B::Device) -> Result<SelfAttentiveLayer<B>, EmbedError> {
        let attention = MultiHeadAttentionConfig::new(self.embed_dim)
            .with_n_heads(self.n_heads)
            .with_dropout(self.dropout)
            .with_layer_norm_eps(self.layer_norm_eps)
            .init(device)?;
        let feed_forward = FeedForwardConfig::new(self.embed_dim)
            .with_d_ff(self.d_ff)
            .with_dropout(self.dropout)
            .with_layer_norm_eps(self.layer_norm_eps)
            .init(device)?;
        Ok(SelfAttentiveLayer { attention, feed_forward })
    }
}

#[derive(Module, Debug)]
pub struct SelfAttentiveLayer<B: Backend> {
    pub attention:    MultiHeadAttention<B>,
    pub feed_forward: FeedForward<B>,
}

impl<B: Backend> SelfAttentiveLayer<B> {
    /// x: [G, L, D], mask: [G, L] (true = padding) → [G, L, D]
    pub fn forward(&self, x: Tensor<B, 3>, mask: Tensor<B, 2, Bool>) -> Result<Tensor<B, 3>, EmbedError> {
        let z = self.attention.forward_self(x, Some(mask))?.context;
        self.feed_forward.forward(z)
    }
}

#[derive(Module, Debug)]
pub struct SelfAttentiveEncoder<B: Backend> {
    pub embedding:  LookupEncoder<B>,
    pub positional: PositionalEncoding<B>,
    pub layers:     Vec<SelfAttentiveLayer<B>>,
}

impl<B: Backend> SelfAttentiveEncoder<B> {
    /// words: [Ls, G] → [Ls, G, D]
    pub fn forward(&self, words: Tensor<B, 2, Int>) -> Result<Tensor<B, 3>, EmbedError> {
        let words = words.swap_dims(0, 1);                 // [G, Ls]
        let mask  = words.clone().equal_elem(PAD_IDX as i32); // padding keys

        let h: Tensor<B, 3> = self.embedding.forward(words)?;
        let mut h = self.positional.forward(h)?;
        for layer in &self.layers {
            h = layer.forward(h, mask.clone())?;
        }

        Ok(h.swap_dims(0, 1))
    }
}
