// ============================================================
// Layer 4 — Index Batcher
// ============================================================
// Turns a validated IndexBatch into the Int tensors the
// Embedder consumes:
//
//   chars: Vec [Ls][G][Lw]  →  Tensor<B, 3, Int> [Ls, G, Lw]
//   words: Vec [Ls][G]      →  Tensor<B, 2, Int> [Ls, G]
//
// Everything is flattened in row-major order into one Vec<i32>
// and reshaped, so no axis is ever silently reordered.
// A stream the batch omits stays None; the Embedder decides
// whether it can do without it.

use burn::prelude::*;

use crate::domain::{error::EmbedError, index_batch::IndexBatch};

/// Tensors for one Embedder::encode call.
#[derive(Debug, Clone)]
pub struct EncodeInput<B: Backend> {
    pub batch_size: usize,
    /// [Ls, G, Lw], None when the batch has no character stream
    pub chars: Option<Tensor<B, 3, Int>>,
    /// [Ls, G], None when the batch has no word stream
    pub words: Option<Tensor<B, 2, Int>>,
}

#[derive(Clone, Debug)]
pub struct IndexBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> IndexBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    pub fn batch(&self, batch: &IndexBatch) -> Result<EncodeInput<B>, EmbedError> {
        let ([ls, g, lw], _) = batch.validate()?;
        if ls == 0 || g == 0 {
            return Err(EmbedError::shape(format!("empty batch: Ls = {ls}, G = {g}")));
        }

        let chars = if batch.chars.is_empty() {
            None
        } else {
            let flat = to_i32(batch.chars.iter().flatten().flatten())?;
            Some(Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).reshape([ls, g, lw]))
        };

        let words = if batch.words.is_empty() {
            None
        } else {
            let flat = to_i32(batch.words.iter().flatten())?;
            Some(Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).reshape([ls, g]))
        };

        Ok(EncodeInput { batch_size: batch.batch_size, chars, words })
    }
}

fn to_i32<'a>(ids: impl Iterator<Item = &'a u32>) -> Result<Vec<i32>, EmbedError> {
    ids.map(|&id| {
        i32::try_from(id).map_err(|_| EmbedError::Index {
            index:      i64::from(id),
            vocab_size: i32::MAX as usize,
        })
    })
    .collect()
}
