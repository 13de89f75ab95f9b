// ============================================================
// Layer 5 — Convolutional Character Encoder
// ============================================================
// Builds one vector per word from its characters:
//
//   [Ls, G, Lw]          character indices
//     │ flatten Ls into G
//   [N = Ls·G, Lw]
//     │ embed (char_dim)
//   [N, Lw, C]  →  [N, C, Lw]
//     │ Conv1d per kernel width k, ReLU
//   [N, F, Lw - k + 1]
//     │ max over the character axis
//   [N, F]   ×  K kernels  → concat  [N, K·F]
//     │ dropout, fully connected
//   [N, H]  →  [Ls, G, H]
//
// Words shorter than the widest kernel are rejected: the input
// must already be padded, the encoder never pads by itself.

use burn::{
    nn::{
        conv::{Conv1d, Conv1dConfig},
        Dropout, DropoutConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::domain::error::EmbedError;
use crate::ml::lookup::{LookupEncoder, LookupEncoderConfig};

#[derive(Config, Debug)]
pub struct ConvCharEncoderConfig {
    pub vocab_size: usize,
    /// Output width H
    pub embed_dim:  usize,
    /// Character embedding width (input channels)
    #[config(default = 50)]
    pub char_dim: usize,
    /// Feature maps per kernel (output channels)
    #[config(default = 50)]
    pub num_featmaps: usize,
    /// Convolution window widths over the character axis
    #[config(default = "vec![3]")]
    pub kernel_sizes: Vec<usize>,
    /// Off by default so an all-padding word pools to zeros
    #[config(default = false)]
    pub conv_bias: bool,
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl ConvCharEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ConvCharEncoder<B>, EmbedError> {
        if self.kernel_sizes.is_empty() || self.kernel_sizes.contains(&0) {
            return Err(EmbedError::configuration(format!(
                "kernel sizes must be non-empty and positive, got {:?}", self.kernel_sizes
            )));
        }
        if self.num_featmaps == 0 || self.embed_dim == 0 {
            return Err(EmbedError::configuration(
                "feature map count and embedding dimension must be positive",
            ));
        }

        let embedding = LookupEncoderConfig::new(self.vocab_size, self.char_dim).init(device)?;
        let convs = self
            .kernel_sizes
            .iter()
            .map(|&k| {
                Conv1dConfig::new(self.char_dim, self.num_featmaps, k)
                    .with_bias(self.conv_bias)
                    .init(device)
            })
            .collect();
        let fc = LinearConfig::new(self.kernel_sizes.len() * self.num_featmaps, self.embed_dim)
            .init(device);

        Ok(ConvCharEncoder {
            embedding,
            convs,
            dropout:      DropoutConfig::new(self.dropout).init(),
            fc,
            min_word_len: self.kernel_sizes.iter().copied().max().unwrap_or(1),
            embed_dim:    self.embed_dim,
        })
    }
}

#[derive(Module, Debug)]
pub struct ConvCharEncoder<B: Backend> {
    pub embedding:    LookupEncoder<B>,
    pub convs:        Vec<Conv1d<B>>,
    pub dropout:      Dropout,
    pub fc:           Linear<B>,
    pub min_word_len: usize,
    pub embed_dim:    usize,
}

impl<B: Backend> ConvCharEncoder<B> {
    /// chars: [Ls, G, Lw] → [Ls, G, H]
    pub fn forward(&self, chars: Tensor<B, 3, Int>) -> Result<Tensor<B, 3>, EmbedError> {
        let [ls, g, lw] = chars.dims();

        let h = self.pooled_features(chars.reshape([ls * g, lw]))?;
        let h = self.dropout.forward(h);
        let h = self.fc.forward(h); // [N, H]

        Ok(h.reshape([ls, g, self.embed_dim]))
    }

    /// Max-pooled convolution features, before dropout and projection.
    ///
    /// words: [N, Lw] → [N, kernels · featmaps]
    pub fn pooled_features(&self, words: Tensor<B, 2, Int>) -> Result<Tensor<B, 2>, EmbedError> {
        let [n, lw] = words.dims();
        if lw < self.min_word_len {
            return Err(EmbedError::shape(format!(
                "words have {lw} character positions but the widest kernel needs {}",
                self.min_word_len
            )));
        }

        // Conv1d expects channels before length
        let x: Tensor<B, 3> = self.embedding.forward(words)?;
        let x = x.swap_dims(1, 2); // [N, C, Lw]

        let pooled: Vec<Tensor<B, 2>> = self
            .convs
            .iter()
            .map(|conv| {
                let h = relu(conv.forward(x.clone())); // [N, F, Lw - k + 1]
                let [_, f, _] = h.dims();
                h.max_dim(2).reshape([n, f])
            })
            .collect();

        Ok(Tensor::cat(pooled, 1))
    }
}
