// ============================================================
// Layer 5 — Lookup Encoder
// ============================================================
// A plain embedding table with a reserved padding row.
//
//   input:  Int tensor of any rank D,     e.g. [Ls, G]
//   output: Float tensor of rank D + 1,   e.g. [Ls, G, H]
//
// Index 0 (PAD_IDX) always produces the zero vector. The output
// is masked at padding positions, so the contract holds no matter
// what the table's row 0 contains, and row 0 gets no gradient.
//
// The other encoders (CNN, RNN, SAE) reuse this table for their
// own character / word embeddings.

use burn::{
    nn::{Embedding, EmbeddingConfig},
    prelude::*,
};

use crate::domain::{error::EmbedError, index_batch::PAD_IDX};

#[derive(Config, Debug)]
pub struct LookupEncoderConfig {
    /// Number of rows in the table, including the padding row
    pub vocab_size: usize,
    /// Width of every embedding vector
    pub embed_dim: usize,
}

impl LookupEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<LookupEncoder<B>, EmbedError> {
        if self.vocab_size == 0 {
            return Err(EmbedError::configuration("vocabulary size must be positive"));
        }
        if self.embed_dim == 0 {
            return Err(EmbedError::configuration("embedding dimension must be positive"));
        }

        Ok(LookupEncoder {
            embedding:  EmbeddingConfig::new(self.vocab_size, self.embed_dim).init(device),
            vocab_size: self.vocab_size,
            embed_dim:  self.embed_dim,
        })
    }
}

#[derive(Module, Debug)]
pub struct LookupEncoder<B: Backend> {
    pub embedding:  Embedding<B>,
    pub vocab_size: usize,
    pub embed_dim:  usize,
}

impl<B: Backend> LookupEncoder<B> {
    /// Embed an index tensor of rank `D` into a float tensor of rank `D2 = D + 1`.
    pub fn forward<const D: usize, const D2: usize>(
        &self,
        indices: Tensor<B, D, Int>,
    ) -> Result<Tensor<B, D2>, EmbedError> {
        if D2 != D + 1 {
            return Err(EmbedError::shape(format!(
                "lookup of a rank-{D} index tensor yields rank {}, not {D2}", D + 1
            )));
        }

        let dims = indices.dims();
        let n: usize = dims.iter().product();
        if n == 0 {
            return Err(EmbedError::shape(format!("index tensor {dims:?} is empty")));
        }
        self.check_indices(&indices)?;

        // Embedding::forward wants [batch, seq]; run everything as one row
        let flat    = indices.reshape([1, n]);
        let padding = flat.clone().equal_elem(PAD_IDX as i32);
        let h       = self.embedding.forward(flat); // [1, n, H]
        let h       = h.mask_fill(
            padding.unsqueeze_dim::<3>(2).expand([1, n, self.embed_dim]),
            0.0,
        );

        let mut shape = [0usize; D2];
        shape[..D].copy_from_slice(&dims);
        shape[D] = self.embed_dim;
        Ok(h.reshape(shape))
    }

    /// Reject indices outside `[0, vocab_size)`.
    pub fn check_indices<const D: usize>(&self, indices: &Tensor<B, D, Int>) -> Result<(), EmbedError> {
        let min = indices.clone().min().into_scalar().elem::<i64>();
        if min < 0 {
            return Err(EmbedError::Index { index: min, vocab_size: self.vocab_size });
        }
        let max = indices.clone().max().into_scalar().elem::<i64>();
        if max >= self.vocab_size as i64 {
            return Err(EmbedError::Index { index: max, vocab_size: self.vocab_size });
        }
        Ok(())
    }
}
