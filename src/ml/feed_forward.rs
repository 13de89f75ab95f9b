// ============================================================
// Layer 5 — Position-wise Feed-Forward Sublayer
// ============================================================
//   FFN(x) = W2 · dropout(ReLU(W1 · x))
//   out    = LayerNorm(x + FFN(x))
//
// Applied independently at every position; shape is preserved.

use burn::{
    nn::{
        Dropout, DropoutConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::domain::error::EmbedError;

#[derive(Config, Debug)]
pub struct FeedForwardConfig {
    pub d_model: usize,
    /// Inner width
    #[config(default = 2048)]
    pub d_ff: usize,
    #[config(default = 0.5)]
    pub dropout: f64,
    #[config(default = 1e-5)]
    pub layer_norm_eps: f64,
}

impl FeedForwardConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<FeedForward<B>, EmbedError> {
        if self.d_model == 0 || self.d_ff == 0 {
            return Err(EmbedError::configuration(
                "feed-forward widths must be positive",
            ));
        }

        Ok(FeedForward {
            inner:   LinearConfig::new(self.d_model, self.d_ff).init(device),
            outer:   LinearConfig::new(self.d_ff, self.d_model).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            norm:    LayerNormConfig::new(self.d_model)
                .with_epsilon(self.layer_norm_eps)
                .init(device),
            d_model: self.d_model,
        })
    }
}

#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    pub inner:   Linear<B>,
    pub outer:   Linear<B>,
    pub dropout: Dropout,
    pub norm:    LayerNorm<B>,
    pub d_model: usize,
}

impl<B: Backend> FeedForward<B> {
    /// x: [G, L, D] → [G, L, D]
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>, EmbedError> {
        let [_, _, d] = x.dims();
        if d != self.d_model {
            return Err(EmbedError::shape(format!(
                "feed-forward sublayer of width {} got input width {d}", self.d_model
            )));
        }

        let z = relu(self.inner.forward(x.clone()));
        let z = self.outer.forward(self.dropout.forward(z));

        Ok(self.norm.forward(x + z))
    }
}
