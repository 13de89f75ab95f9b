// ============================================================
// Layer 5 — Sinusoidal Positional Encoding
// ============================================================
// Self-attention has no notion of order, so each position p gets
// a fixed signal added to its embedding:
//
//   k_i        = exp(−ln(10000) · 2⌊i/2⌋ / D)
//   PE[p, i]   = sin(p · k_i)        for even i
//   PE[p, i]   = cos(p · k_{i−1})    for odd i
//
// The table is built once for `max_len` positions and never
// changes; forward slices the first L rows.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need §3.5

use burn::prelude::*;

use crate::domain::error::EmbedError;

#[derive(Config, Debug)]
pub struct PositionalEncodingConfig {
    pub d_model: usize,
    #[config(default = 1000)]
    pub max_len: usize,
}

impl PositionalEncodingConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<PositionalEncoding<B>, EmbedError> {
        if self.d_model == 0 || self.max_len == 0 {
            return Err(EmbedError::configuration(
                "positional table needs positive width and length",
            ));
        }

        let values = sinusoid_table(self.max_len, self.d_model);
        let table  = Tensor::<B, 1>::from_floats(values.as_slice(), device)
            .reshape([self.max_len, self.d_model]);

        Ok(PositionalEncoding { table, max_len: self.max_len, d_model: self.d_model })
    }
}

/// Row-major `[max_len, dim]` sinusoid table.
pub fn sinusoid_table(max_len: usize, dim: usize) -> Vec<f32> {
    let mut values = Vec::with_capacity(max_len * dim);
    for p in 0..max_len {
        for i in 0..dim {
            let k     = (-(10000f64.ln()) * (2 * (i / 2)) as f64 / dim as f64).exp();
            let angle = p as f64 * k;
            let v     = if i % 2 == 0 { angle.sin() } else { angle.cos() };
            values.push(v as f32);
        }
    }
    values
}

#[derive(Module, Debug)]
pub struct PositionalEncoding<B: Backend> {
    /// [max_len, d_model], read-only
    pub table:   Tensor<B, 2>,
    pub max_len: usize,
    pub d_model: usize,
}

impl<B: Backend> PositionalEncoding<B> {
    /// x: [G, L, D] → x + PE[0..L]
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>, EmbedError> {
        let [g, l, d] = x.dims();
        if d != self.d_model {
            return Err(EmbedError::shape(format!(
                "positional encoding has width {}, input has {d}", self.d_model
            )));
        }
        if l > self.max_len {
            return Err(EmbedError::shape(format!(
                "sequence length {l} exceeds the positional table ({} rows)", self.max_len
            )));
        }

        let pe = self
            .table
            .clone()
            .slice([0..l, 0..d])
            .unsqueeze::<3>()
            .expand([g, l, d]);

        Ok(x + pe)
    }
}
