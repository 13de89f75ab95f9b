// ============================================================
// Layer 5 — Embedder (top-level composer)
// ============================================================
// Picks the sub-encoders named in the dimension allocation,
// runs them, and concatenates their outputs on the feature axis:
//
//   chars [Ls, G, Lw] ──► cnn | rnn    ──► [Ls, G, Hc] ┐
//                                                       ├─ concat ─► [Ls, G, Hc + Hw]
//   words [Ls, G]     ──► lookup | sae ──► [Ls, G, Hw] ┘
//
// With hierarchical aggregation a sentence-level recurrent
// encoder collapses the Ls axis, one vector per group:
//
//   [Ls, G, D] ──► rnn (hierarchical) ──► [G, D]
//              ──► [G / b, b, D]   (or [b, G / b, D] when batch_first)
//
// The group axis is G = depth × b, ordered depth-major.

use std::collections::BTreeMap;

use burn::prelude::*;

use crate::domain::{
    allocation::{DimensionAllocation, ModelKind, Slot},
    error::EmbedError,
};
use crate::ml::{
    conv_char::{ConvCharEncoder, ConvCharEncoderConfig},
    lookup::{LookupEncoder, LookupEncoderConfig},
    recurrent::{RecurrentCellKind, RecurrentEncoder, RecurrentEncoderConfig},
    self_attentive::{SelfAttentiveEncoder, SelfAttentiveEncoderConfig},
};

#[derive(Config, Debug)]
pub struct EmbedderConfig {
    /// Model name → output width; names: lookup, cnn, rnn, sae
    pub allocation:      BTreeMap<String, usize>,
    pub char_vocab_size: usize,
    pub word_vocab_size: usize,
    /// Put the batch axis first in hierarchical output
    #[config(default = false)]
    pub batch_first: bool,
    /// Append the sentence-level recurrent aggregator
    #[config(default = false)]
    pub hierarchical: bool,
    #[config(default = 0.5)]
    pub dropout: f64,
    /// When set, must equal the allocation sum
    #[config(default = "None")]
    pub expected_dim: Option<usize>,

    #[config(default = 50)]
    pub cnn_char_dim: usize,
    #[config(default = 50)]
    pub cnn_featmaps: usize,
    #[config(default = "vec![3]")]
    pub cnn_kernel_sizes: Vec<usize>,
    #[config(default = false)]
    pub cnn_bias: bool,

    #[config(default = "RecurrentCellKind::Gru")]
    pub rnn_cell: RecurrentCellKind,
    #[config(default = 2)]
    pub rnn_layers: usize,
    #[config(default = true)]
    pub rnn_bidirectional: bool,

    #[config(default = 8)]
    pub sae_heads: usize,
    #[config(default = 1)]
    pub sae_layers: usize,
    #[config(default = 2048)]
    pub sae_ff_dim: usize,
    #[config(default = 1000)]
    pub sae_max_len: usize,

    #[config(default = 1e-5)]
    pub layer_norm_eps: f64,
}

impl EmbedderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Embedder<B>, EmbedError> {
        let allocation = DimensionAllocation::from_map(&self.allocation)?;
        let dim        = allocation.total_dim();
        if let Some(expected) = self.expected_dim {
            if expected != dim {
                return Err(EmbedError::shape(format!(
                    "allocated widths sum to {dim}, expected {expected}"
                )));
            }
        }

        let char_encoder = allocation
            .character()
            .map(|slot| self.build_char_encoder(slot, device))
            .transpose()?;
        let word_encoder = allocation
            .word()
            .map(|slot| self.build_word_encoder(slot, device))
            .transpose()?;
        let sentence_encoder = if self.hierarchical {
            Some(self.recurrent_config(dim, dim).with_hierarchical(true).init(device)?)
        } else {
            None
        };

        tracing::debug!(
            "Embedder: [{}] → {dim} features, hierarchical={}",
            allocation
                .slots()
                .map(|s| format!("{}:{}", s.kind, s.dim))
                .collect::<Vec<_>>()
                .join(", "),
            self.hierarchical,
        );

        Ok(Embedder {
            char_encoder,
            word_encoder,
            sentence_encoder,
            batch_first: self.batch_first,
            dim,
        })
    }

    fn recurrent_config(&self, input_size: usize, dim: usize) -> RecurrentEncoderConfig {
        RecurrentEncoderConfig::new(input_size, dim)
            .with_cell(self.rnn_cell)
            .with_num_layers(self.rnn_layers)
            .with_bidirectional(self.rnn_bidirectional)
            .with_dropout(self.dropout)
    }

    fn build_char_encoder<B: Backend>(&self, slot: Slot, device: &B::Device) -> Result<CharEncoder<B>, EmbedError> {
        match slot.kind {
            ModelKind::Cnn => ConvCharEncoderConfig::new(self.char_vocab_size, slot.dim)
                .with_char_dim(self.cnn_char_dim)
                .with_num_featmaps(self.cnn_featmaps)
                .with_kernel_sizes(self.cnn_kernel_sizes.clone())
                .with_conv_bias(self.cnn_bias)
                .with_dropout(self.dropout)
                .init(device)
                .map(CharEncoder::Conv),
            ModelKind::Rnn => self
                .recurrent_config(self.char_vocab_size, slot.dim)
                .init(device)
                .map(CharEncoder::Recurrent),
            other => Err(EmbedError::configuration(format!(
                "'{other}' is not a character-level model"
            ))),
        }
    }

    fn build_word_encoder<B: Backend>(&self, slot: Slot, device: &B::Device) -> Result<WordEncoder<B>, EmbedError> {
        match slot.kind {
            ModelKind::Lookup => LookupEncoderConfig::new(self.word_vocab_size, slot.dim)
                .init(device)
                .map(WordEncoder::Lookup),
            ModelKind::Sae => SelfAttentiveEncoderConfig::new(self.word_vocab_size, slot.dim)
                .with_n_heads(self.sae_heads)
                .with_num_layers(self.sae_layers)
                .with_d_ff(self.sae_ff_dim)
                .with_max_len(self.sae_max_len)
                .with_dropout(self.dropout)
                .with_layer_norm_eps(self.layer_norm_eps)
                .init(device)
                .map(WordEncoder::SelfAttentive),
            other => Err(EmbedError::configuration(format!(
                "'{other}' is not a word-level model"
            ))),
        }
    }
}

// ─── Sub-encoder variants ─────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub enum CharEncoder<B: Backend> {
    Conv(ConvCharEncoder<B>),
    Recurrent(RecurrentEncoder<B>),
}

impl<B: Backend> CharEncoder<B> {
    pub fn kind(&self) -> ModelKind {
        match self {
            Self::Conv(_)      => ModelKind::Cnn,
            Self::Recurrent(_) => ModelKind::Rnn,
        }
    }

    /// [Ls, G, Lw] → [Ls, G, Hc]
    pub fn forward(&self, chars: Tensor<B, 3, Int>) -> Result<Tensor<B, 3>, EmbedError> {
        match self {
            Self::Conv(enc)      => enc.forward(chars),
            Self::Recurrent(enc) => enc.forward_indices(chars),
        }
    }
}

#[derive(Module, Debug)]
pub enum WordEncoder<B: Backend> {
    Lookup(LookupEncoder<B>),
    SelfAttentive(SelfAttentiveEncoder<B>),
}

impl<B: Backend> WordEncoder<B> {
    pub fn kind(&self) -> ModelKind {
        match self {
            Self::Lookup(_)        => ModelKind::Lookup,
            Self::SelfAttentive(_) => ModelKind::Sae,
        }
    }

    /// [Ls, G] → [Ls, G, Hw]
    pub fn forward(&self, words: Tensor<B, 2, Int>) -> Result<Tensor<B, 3>, EmbedError> {
        match self {
            Self::Lookup(enc)        => enc.forward(words),
            Self::SelfAttentive(enc) => enc.forward(words),
        }
    }
}

// ─── Embedder ─────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Embedder<B: Backend> {
    pub char_encoder:     Option<CharEncoder<B>>,
    pub word_encoder:     Option<WordEncoder<B>>,
    pub sentence_encoder: Option<RecurrentEncoder<B>>,
    pub batch_first:      bool,
    pub dim:              usize,
}

impl<B: Backend> Embedder<B> {
    /// Total output feature width.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn is_hierarchical(&self) -> bool {
        self.sentence_encoder.is_some()
    }

    /// Active sub-encoders in concatenation order.
    pub fn active_models(&self) -> Vec<ModelKind> {
        let chars = self.char_encoder.as_ref().map(CharEncoder::kind);
        let words = self.word_encoder.as_ref().map(WordEncoder::kind);
        chars.into_iter().chain(words).collect()
    }

    /// Encode one padded batch.
    ///
    ///   chars: [Ls, G, Lw], words: [Ls, G], G = depth × batch_size
    ///
    /// Returns [Ls, G, D], or with hierarchical aggregation
    /// [depth, batch_size, D] ([batch_size, depth, D] when batch_first).
    /// Streams whose encoder is not configured are ignored.
    pub fn encode(
        &self,
        batch_size: usize,
        chars:      Tensor<B, 3, Int>,
        words:      Tensor<B, 2, Int>,
    ) -> Result<Tensor<B, 3>, EmbedError> {
        let groups = self.check_inputs(batch_size, &chars, &words)?;

        let mut parts = Vec::with_capacity(2);
        if let Some(enc) = &self.char_encoder {
            parts.push(enc.forward(chars)?);
        }
        if let Some(enc) = &self.word_encoder {
            parts.push(enc.forward(words)?);
        }
        let h = Tensor::cat(parts, 2); // [Ls, G, D]

        let Some(sentence) = &self.sentence_encoder else {
            return Ok(h);
        };

        let h = sentence.forward_embedded(h)?; // [G, D]
        let h = h.reshape([groups / batch_size, batch_size, self.dim]);
        Ok(if self.batch_first { h.swap_dims(0, 1) } else { h })
    }

    /// Encode a batch whose streams may be absent.
    ///
    /// A missing stream is accepted only when no configured encoder reads
    /// it; it is then stood in for by padding of the other stream's (Ls, G)
    /// and ignored by `encode`.
    pub fn encode_streams(
        &self,
        batch_size: usize,
        chars:      Option<Tensor<B, 3, Int>>,
        words:      Option<Tensor<B, 2, Int>>,
    ) -> Result<Tensor<B, 3>, EmbedError> {
        let (chars, words) = match (chars, words) {
            (Some(chars), Some(words)) => (chars, words),
            (None, Some(words)) => {
                if let Some(enc) = &self.char_encoder {
                    return Err(EmbedError::shape(format!(
                        "the {} encoder reads characters, but the batch has no character stream",
                        enc.kind()
                    )));
                }
                let [ls, g] = words.dims();
                (Tensor::<B, 3, Int>::zeros([ls, g, 1], &words.device()), words)
            }
            (Some(chars), None) => {
                if let Some(enc) = &self.word_encoder {
                    return Err(EmbedError::shape(format!(
                        "the {} encoder reads words, but the batch has no word stream",
                        enc.kind()
                    )));
                }
                let [ls, g, _] = chars.dims();
                let words = Tensor::<B, 2, Int>::zeros([ls, g], &chars.device());
                (chars, words)
            }
            (None, None) => return Err(EmbedError::shape("batch has neither chars nor words")),
        };

        self.encode(batch_size, chars, words)
    }

    /// Validate what can be checked before any encoder runs; returns G.
    fn check_inputs(
        &self,
        batch_size: usize,
        chars:      &Tensor<B, 3, Int>,
        words:      &Tensor<B, 2, Int>,
    ) -> Result<usize, EmbedError> {
        if batch_size == 0 {
            return Err(EmbedError::shape("batch size must be positive"));
        }

        let [cls, cg, _] = chars.dims();
        let [wls, wg]    = words.dims();
        let (ls, groups) = match (&self.char_encoder, &self.word_encoder) {
            (Some(_), Some(_)) if (cls, cg) != (wls, wg) => {
                return Err(EmbedError::shape(format!(
                    "chars are [{cls}, {cg}, _] but words are [{wls}, {wg}]"
                )));
            }
            (Some(_), _) => (cls, cg),
            _            => (wls, wg),
        };

        if ls == 0 || groups == 0 {
            return Err(EmbedError::shape(format!("empty batch: Ls = {ls}, G = {groups}")));
        }
        if self.is_hierarchical() && groups % batch_size != 0 {
            return Err(EmbedError::shape(format!(
                "{groups} groups cannot be split into batches of {batch_size}"
            )));
        }

        Ok(groups)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    fn config(entries: &[(&str, usize)]) -> EmbedderConfig {
        let allocation = entries.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        EmbedderConfig::new(allocation, 30, 40)
            .with_cnn_char_dim(4)
            .with_cnn_featmaps(5)
            .with_sae_heads(2)
            .with_sae_ff_dim(16)
            .with_sae_max_len(32)
    }

    fn inputs(ls: usize, g: usize, lw: usize) -> (Tensor<B, 3, Int>, Tensor<B, 2, Int>) {
        let device = Default::default();
        let chars: Vec<i32> = (0..ls * g * lw).map(|i| (i % 29) as i32 + 1).collect();
        let words: Vec<i32> = (0..ls * g).map(|i| (i % 39) as i32 + 1).collect();
        (
            Tensor::<B, 1, Int>::from_ints(chars.as_slice(), &device).reshape([ls, g, lw]),
            Tensor::<B, 1, Int>::from_ints(words.as_slice(), &device).reshape([ls, g]),
        )
    }

    #[test]
    fn test_feature_axis_is_allocation_sum() {
        let device = Default::default();
        for entries in [
            vec![("cnn", 6), ("sae", 8)],
            vec![("rnn", 4), ("lookup", 3)],
            vec![("lookup", 5)],
            vec![("cnn", 7)],
        ] {
            let model = config(&entries).init::<B>(&device).unwrap();
            let (chars, words) = inputs(3, 2, 4);
            let y = model.encode(1, chars, words).unwrap();
            let expected: usize = entries.iter().map(|(_, d)| d).sum();
            assert_eq!(y.dims(), [3, 2, expected], "{entries:?}");
        }
    }

    #[test]
    fn test_character_slice_comes_first() {
        let device = Default::default();
        let model  = config(&[("lookup", 3), ("cnn", 6)]).init::<B>(&device).unwrap();
        assert_eq!(model.active_models(), vec![ModelKind::Cnn, ModelKind::Lookup]);

        // every word is padding, so the trailing lookup slice must be zero
        let (chars, _) = inputs(2, 2, 3);
        let words      = Tensor::<B, 2, Int>::zeros([2, 2], &device);
        let values     = model.encode(1, chars, words).unwrap().into_data().to_vec::<f32>().unwrap();
        for row in values.chunks(9) {
            assert!(row[6..].iter().all(|&v| v == 0.0), "{row:?}");
        }
    }

    #[test]
    fn test_hierarchical_output_per_group() {
        let device = Default::default();
        let model  = config(&[("cnn", 4), ("lookup", 4)])
            .with_hierarchical(true)
            .init::<B>(&device)
            .unwrap();
        let (chars, words) = inputs(5, 6, 3);
        assert_eq!(model.encode(2, chars, words).unwrap().dims(), [3, 2, 8]);
    }

    #[test]
    fn test_hierarchical_batch_first_swaps_axes() {
        let device = Default::default();
        let model  = config(&[("lookup", 6)])
            .with_hierarchical(true)
            .with_batch_first(true)
            .init::<B>(&device)
            .unwrap();
        let (chars, words) = inputs(4, 6, 3);
        assert_eq!(model.encode(2, chars, words).unwrap().dims(), [2, 3, 6]);
    }

    #[test]
    fn test_hierarchical_groups_are_depth_major() {
        let device = Default::default();
        let model  = config(&[("lookup", 6)]).with_hierarchical(true).init::<B>(&device).unwrap();
        // G = 6 groups = depth 3 × batch 2, every word index distinct
        let (chars, words) = inputs(2, 6, 3);

        // one aggregated vector per group, in group order: [G, D]
        let word_encoder = model.word_encoder.as_ref().unwrap();
        let sentence     = model.sentence_encoder.as_ref().unwrap();
        let per_group    = sentence
            .forward_embedded(word_encoder.forward(words.clone()).unwrap())
            .unwrap()
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        let group = |g: usize| &per_group[g * 6..(g + 1) * 6];
        assert_ne!(group(1), group(2));

        let mut batch_first = model.clone();
        batch_first.batch_first = true;

        let out = model.encode(2, chars.clone(), words.clone()).unwrap();
        assert_eq!(out.dims(), [3, 2, 6]);
        let out = out.into_data().to_vec::<f32>().unwrap();

        let out_bf = batch_first.encode(2, chars, words).unwrap();
        assert_eq!(out_bf.dims(), [2, 3, 6]);
        let out_bf = out_bf.into_data().to_vec::<f32>().unwrap();

        for d in 0..3 {
            for i in 0..2 {
                let expected = group(d * 2 + i);
                let at       = (d * 2 + i) * 6; // [d, i]
                let at_bf    = (i * 3 + d) * 6; // [i, d]
                for k in 0..6 {
                    assert!((out[at + k] - expected[k]).abs() < 1e-6, "d={d} i={i}");
                    assert!((out_bf[at_bf + k] - expected[k]).abs() < 1e-6, "batch first d={d} i={i}");
                }
            }
        }
    }

    #[test]
    fn test_missing_stream_read_by_an_encoder_is_shape_error() {
        let device = Default::default();
        let model  = config(&[("rnn", 4), ("lookup", 3)]).init::<B>(&device).unwrap();
        let (chars, words) = inputs(1, 2, 3);

        assert!(matches!(model.encode_streams(1, None, Some(words)), Err(EmbedError::Shape(_))));
        assert!(matches!(model.encode_streams(1, Some(chars), None), Err(EmbedError::Shape(_))));
    }

    #[test]
    fn test_missing_stream_without_encoder_is_padded() {
        let device = Default::default();
        let (chars, words) = inputs(2, 2, 3);

        let words_only = config(&[("lookup", 3)]).init::<B>(&device).unwrap();
        assert_eq!(words_only.encode_streams(1, None, Some(words)).unwrap().dims(), [2, 2, 3]);

        let chars_only = config(&[("cnn", 5)]).init::<B>(&device).unwrap();
        assert_eq!(chars_only.encode_streams(1, Some(chars), None).unwrap().dims(), [2, 2, 5]);
    }

    #[test]
    fn test_groups_not_divisible_by_batch_is_shape_error() {
        let device = Default::default();
        let model  = config(&[("lookup", 6)]).with_hierarchical(true).init::<B>(&device).unwrap();
        let (chars, words) = inputs(2, 5, 3);
        assert!(matches!(model.encode(2, chars, words), Err(EmbedError::Shape(_))));
    }

    #[test]
    fn test_stream_mismatch_is_shape_error() {
        let device = Default::default();
        let model  = config(&[("cnn", 4), ("lookup", 4)]).init::<B>(&device).unwrap();
        let (chars, _) = inputs(2, 3, 3);
        let (_, words) = inputs(3, 3, 3);
        assert!(matches!(model.encode(1, chars, words), Err(EmbedError::Shape(_))));
    }

    #[test]
    fn test_unused_stream_is_ignored() {
        let device = Default::default();
        let model  = config(&[("sae", 8)]).init::<B>(&device).unwrap();
        let chars  = Tensor::<B, 3, Int>::zeros([1, 1, 1], &device);
        let (_, words) = inputs(3, 2, 1);
        assert_eq!(model.encode(1, chars, words).unwrap().dims(), [3, 2, 8]);
    }

    #[test]
    fn test_word_index_out_of_range_is_index_error() {
        let device = Default::default();
        let model  = config(&[("lookup", 4)]).init::<B>(&device).unwrap();
        let (chars, _) = inputs(1, 2, 3);
        let words  = Tensor::<B, 1, Int>::from_ints([1, 40], &device).reshape([1, 2]);
        assert_eq!(
            model.encode(1, chars, words).unwrap_err(),
            EmbedError::Index { index: 40, vocab_size: 40 }
        );
    }

    #[test]
    fn test_configuration_errors() {
        let device = Default::default();
        let unknown = config(&[("elmo", 4)]).init::<B>(&device);
        assert!(matches!(unknown, Err(EmbedError::Configuration(_))));

        let both_char = config(&[("cnn", 4), ("rnn", 4)]).init::<B>(&device);
        assert!(matches!(both_char, Err(EmbedError::Configuration(_))));

        let mismatch = config(&[("lookup", 4)]).with_expected_dim(Some(5)).init::<B>(&device);
        assert!(matches!(mismatch, Err(EmbedError::Shape(_))));
    }
}
