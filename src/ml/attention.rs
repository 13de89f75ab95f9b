// ============================================================
// Layer 5 — Multi-Head Attention
// ============================================================
// Scaled dot-product attention split over H heads, followed by
// an output projection, dropout, residual and layer norm:
//
//   Q, K, V  = W_q·q, W_k·k, W_v·v           [G, L, H·Dk]
//   split    → [G, H, L, Dk]
//   scores   = Q·Kᵀ / √Dk                     [G, H, Lq, Lk]
//   scores[masked keys] = −10000
//   weights  = softmax over the KEY axis (last axis)
//   context  = weights·V → [G, Lq, H·Dv] → W_o
//   output   = LayerNorm(q + dropout(context))
//
// The mask is [G, Lk] and marks padding keys. Padding queries
// still produce a row; downstream consumers ignore it.
//
// Tensors here are group-major: [G, L, D].
//
// Reference: Vaswani et al. (2017) Attention Is All You Need §3.2

use burn::{
    nn::{
        Dropout, DropoutConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::softmax,
};

use crate::domain::error::EmbedError;

/// Score given to masked keys before the softmax.
pub const MASK_FILL: f32 = -10000.0;

#[derive(Config, Debug)]
pub struct MultiHeadAttentionConfig {
    /// Model dimension D
    pub d_model: usize,
    /// Number of heads H; must divide D
    #[config(default = 8)]
    pub n_heads: usize,
    #[config(default = 0.5)]
    pub dropout: f64,
    #[config(default = 1e-5)]
    pub layer_norm_eps: f64,
}

impl MultiHeadAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<MultiHeadAttention<B>, EmbedError> {
        if self.n_heads == 0 || self.d_model == 0 || self.d_model % self.n_heads != 0 {
            return Err(EmbedError::configuration(format!(
                "model dimension {} must be a positive multiple of the head count {}",
                self.d_model, self.n_heads
            )));
        }
        let d_k = self.d_model / self.n_heads;
        let inner = self.n_heads * d_k;

        Ok(MultiHeadAttention {
            query:   LinearConfig::new(self.d_model, inner).init(device),
            key:     LinearConfig::new(self.d_model, inner).init(device),
            value:   LinearConfig::new(self.d_model, inner).init(device),
            output:  LinearConfig::new(inner, self.d_model).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            norm:    LayerNormConfig::new(self.d_model)
                .with_epsilon(self.layer_norm_eps)
                .init(device),
            d_model: self.d_model,
            n_heads: self.n_heads,
            d_k,
        })
    }
}

#[derive(Module, Debug)]
pub struct MultiHeadAttention<B: Backend> {
    pub query:   Linear<B>,
    pub key:     Linear<B>,
    pub value:   Linear<B>,
    pub output:  Linear<B>,
    pub dropout: Dropout,
    pub norm:    LayerNorm<B>,
    pub d_model: usize,
    pub n_heads: usize,
    pub d_k:     usize,
}

/// Result of one attention pass.
#[derive(Debug, Clone)]
pub struct AttentionOutput<B: Backend> {
    /// [G, Lq, D], same shape as the query input
    pub context: Tensor<B, 3>,
    /// [G, H, Lq, Lk], each row sums to 1 over the key axis
    pub weights: Tensor<B, 4>,
}

impl<B: Backend> MultiHeadAttention<B> {
    /// Self-attention: query = key = value = `x`.
    pub fn forward_self(
        &self,
        x:    Tensor<B, 3>,
        mask: Option<Tensor<B, 2, Bool>>,
    ) -> Result<AttentionOutput<B>, EmbedError> {
        self.forward(x.clone(), x.clone(), x, mask)
    }

    pub fn forward(
        &self,
        query: Tensor<B, 3>,
        key:   Tensor<B, 3>,
        value: Tensor<B, 3>,
        mask:  Option<Tensor<B, 2, Bool>>,
    ) -> Result<AttentionOutput<B>, EmbedError> {
        let [g, lq, d] = query.dims();
        let [kg, lk, kd] = key.dims();
        if d != self.d_model || kd != self.d_model || kg != g || value.dims() != key.dims() {
            return Err(EmbedError::shape(format!(
                "attention of width {} got query {:?}, key {:?}, value {:?}",
                self.d_model, query.dims(), key.dims(), value.dims()
            )));
        }
        if let Some(mask) = &mask {
            if mask.dims() != [g, lk] {
                return Err(EmbedError::shape(format!(
                    "mask {:?} does not cover keys [{g}, {lk}]", mask.dims()
                )));
            }
        }

        let residual = query.clone();
        let q = self.split_heads(self.query.forward(query));
        let k = self.split_heads(self.key.forward(key));
        let v = self.split_heads(self.value.forward(value));

        let (context, weights) = self.scaled_dot_product(q, k, v, mask);

        // [G, H, Lq, Dv] → [G, Lq, H·Dv]
        let context = context.swap_dims(1, 2).reshape([g, lq, self.n_heads * self.d_k]);
        let context = self.output.forward(context);
        let context = self.norm.forward(residual + self.dropout.forward(context));

        Ok(AttentionOutput { context, weights })
    }

    /// [G, L, H·Dk] → [G, H, L, Dk]
    fn split_heads(&self, x: Tensor<B, 3>) -> Tensor<B, 4> {
        let [g, l, _] = x.dims();
        x.reshape([g, l, self.n_heads, self.d_k]).swap_dims(1, 2)
    }

    fn scaled_dot_product(
        &self,
        q:    Tensor<B, 4>,
        k:    Tensor<B, 4>,
        v:    Tensor<B, 4>,
        mask: Option<Tensor<B, 2, Bool>>,
    ) -> (Tensor<B, 4>, Tensor<B, 4>) {
        let scores = q.matmul(k.swap_dims(2, 3)).div_scalar((self.d_k as f64).sqrt());

        let scores = match mask {
            Some(mask) => {
                let [g, h, lq, lk] = scores.dims();
                let mask = mask.reshape([g, 1, 1, lk]).expand([g, h, lq, lk]);
                scores.mask_fill(mask, MASK_FILL)
            }
            None => scores,
        };

        let weights = softmax(scores, 3);
        (weights.clone().matmul(v), weights)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type B = NdArray;

    fn attention() -> MultiHeadAttention<B> {
        MultiHeadAttentionConfig::new(16)
            .with_n_heads(4)
            .init::<B>(&Default::default())
            .unwrap()
    }

    /// 1 = padding key
    fn mask(flags: &[i32], shape: [usize; 2]) -> Tensor<B, 2, Bool> {
        Tensor::<B, 1, Int>::from_ints(flags, &Default::default())
            .reshape(shape)
            .equal_elem(1)
    }

    #[test]
    fn test_output_shape_equals_input_shape() {
        let device = Default::default();
        let x      = Tensor::<B, 3>::random([3, 7, 16], Distribution::Normal(0.0, 1.0), &device);

        let out = attention().forward_self(x, None).unwrap();
        assert_eq!(out.context.dims(), [3, 7, 16]);
        assert_eq!(out.weights.dims(), [3, 4, 7, 7]);
    }

    #[test]
    fn test_weights_normalise_over_key_axis() {
        let device = Default::default();
        let x      = Tensor::<B, 3>::random([2, 5, 16], Distribution::Normal(0.0, 1.0), &device);

        let weights = attention().forward_self(x, None).unwrap().weights;
        let sums    = weights.sum_dim(3).into_data().to_vec::<f32>().unwrap();
        assert!(sums.iter().all(|s| (s - 1.0).abs() < 1e-5), "{sums:?}");
    }

    #[test]
    fn test_masked_keys_get_negligible_weight() {
        let device = Default::default();
        let x      = Tensor::<B, 3>::random([2, 5, 16], Distribution::Normal(0.0, 3.0), &device);
        // group 0: keys 3 and 4 are padding, group 1: key 0 is padding
        let m = mask(&[0, 0, 0, 1, 1, 1, 0, 0, 0, 0], [2, 5]);

        let weights = attention().forward_self(x, Some(m)).unwrap().weights;
        let values  = weights.into_data().to_vec::<f32>().unwrap();

        // layout [G=2, H=4, Lq=5, Lk=5]
        for g in 0..2 {
            for h in 0..4 {
                for q in 0..5 {
                    let row = &values[((g * 4 + h) * 5 + q) * 5..][..5];
                    let masked: &[usize] = if g == 0 { &[3, 4] } else { &[0] };
                    for &key in masked {
                        assert!(row[key] < 1e-3, "g={g} h={h} q={q} key={key}: {}", row[key]);
                    }
                }
            }
        }
    }

    #[test]
    fn test_consistent_permutation_permutes_output() {
        let device = Default::default();
        let attn   = attention();
        let x      = Tensor::<B, 3>::random([1, 5, 16], Distribution::Normal(0.0, 1.0), &device);
        let flags  = [0, 0, 1, 0, 1];
        let perm   = [2usize, 0, 4, 1, 3];

        let permuted_flags: Vec<i32> = perm.iter().map(|&p| flags[p]).collect();
        let index = Tensor::<B, 1, Int>::from_ints(
            perm.iter().map(|&p| p as i32).collect::<Vec<_>>().as_slice(),
            &device,
        );

        let out = attn.forward_self(x.clone(), Some(mask(&flags, [1, 5]))).unwrap().context;
        let out_permuted = attn
            .forward_self(x.select(1, index.clone()), Some(mask(&permuted_flags, [1, 5])))
            .unwrap()
            .context;

        let expected = out.select(1, index).into_data().to_vec::<f32>().unwrap();
        let actual   = out_permuted.into_data().to_vec::<f32>().unwrap();
        for (a, e) in actual.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-4, "{a} vs {e}");
        }
    }

    #[test]
    fn test_constant_input_stays_finite() {
        let device = Default::default();
        let x      = Tensor::<B, 3>::ones([1, 4, 16], &device);

        let values = attention().forward_self(x, None).unwrap().context.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_heads_must_divide_model_dim() {
        let result = MultiHeadAttentionConfig::new(10).with_n_heads(4).init::<B>(&Default::default());
        assert!(matches!(result, Err(EmbedError::Configuration(_))));
    }

    #[test]
    fn test_mask_shape_mismatch_is_shape_error() {
        let device = Default::default();
        let x      = Tensor::<B, 3>::zeros([2, 3, 16], &device);
        let result = attention().forward_self(x, Some(mask(&[0, 0, 0], [1, 3])));
        assert!(matches!(result, Err(EmbedError::Shape(_))));
    }
}
