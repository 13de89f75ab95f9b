// ============================================================
// Layer 5 — Encode Runner
// ============================================================
// Owns a concrete-backend Embedder and turns IndexBatches into
// plain feature arrays. This is the only place the CLI's backend
// type is named; everything else stays generic over B.

use anyhow::{Context, Result};
use burn::prelude::*;

use crate::data::batcher::IndexBatcher;
use crate::domain::{allocation::ModelKind, index_batch::IndexBatch};
use crate::ml::embedder::{Embedder, EmbedderConfig};
use crate::ml::{EncodeBackend, EncodeDevice};

/// An encoded batch in plain Rust form.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatures {
    pub shape:  Vec<usize>,
    /// Row-major values
    pub values: Vec<f32>,
}

pub struct EncodeRunner {
    model:  Embedder<EncodeBackend>,
    device: EncodeDevice,
}

impl EncodeRunner {
    pub fn from_config(config: &EmbedderConfig) -> Result<Self> {
        let device = EncodeDevice::default();
        tracing::info!("Using device: {:?}", device);

        let model: Embedder<EncodeBackend> = config
            .init(&device)
            .context("Cannot build the embedder from this configuration")?;
        tracing::info!(
            "Embedder ready: models={:?}, dim={}, hierarchical={}",
            model.active_models(),
            model.dim(),
            model.is_hierarchical(),
        );

        Ok(Self { model, device })
    }

    pub fn encode(&self, batch: &IndexBatch) -> Result<EncodedFeatures> {
        let input = IndexBatcher::<EncodeBackend>::new(self.device.clone())
            .batch(batch)
            .context("Invalid index batch")?;

        let output = self
            .model
            .encode_streams(input.batch_size, input.chars, input.words)
            .context("Encoding failed")?;

        let shape  = output.dims().to_vec();
        let values = output
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read encoded features: {e:?}"))?;

        tracing::debug!("Encoded batch of {} into {:?}", batch.batch_size, shape);
        Ok(EncodedFeatures { shape, values })
    }

    pub fn active_models(&self) -> Vec<ModelKind> {
        self.model.active_models()
    }

    pub fn dim(&self) -> usize {
        self.model.dim()
    }

    pub fn is_hierarchical(&self) -> bool {
        self.model.is_hierarchical()
    }

    pub fn num_params(&self) -> usize {
        self.model.num_params()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::EmbedError;

    #[test]
    fn test_encode_returns_flat_values_matching_shape() {
        let allocation = [("cnn".to_string(), 4), ("lookup".to_string(), 3)].into_iter().collect();
        let config = EmbedderConfig::new(allocation, 20, 20).with_cnn_char_dim(4).with_cnn_featmaps(3);
        let runner = EncodeRunner::from_config(&config).unwrap();

        let batch = IndexBatch::new(
            1,
            vec![vec![vec![1, 2, 3], vec![4, 0, 0]]],
            vec![vec![5, 6]],
        );
        let out = runner.encode(&batch).unwrap();
        assert_eq!(out.shape, vec![1, 2, 7]);
        assert_eq!(out.values.len(), 14);
        assert!(runner.num_params() > 0);
    }

    #[test]
    fn test_character_encoder_without_character_stream_fails() {
        let allocation = [("rnn".to_string(), 4), ("lookup".to_string(), 3)].into_iter().collect();
        let runner = EncodeRunner::from_config(&EmbedderConfig::new(allocation, 20, 20)).unwrap();

        let no_chars = IndexBatch::new(1, vec![], vec![vec![5, 6]]);
        let err = runner.encode(&no_chars).unwrap_err();
        assert!(matches!(err.downcast_ref::<EmbedError>(), Some(EmbedError::Shape(_))), "{err:?}");

        let empty_words = IndexBatch::new(1, vec![vec![vec![], vec![]]], vec![vec![5, 6]]);
        let err = runner.encode(&empty_words).unwrap_err();
        assert!(matches!(err.downcast_ref::<EmbedError>(), Some(EmbedError::Shape(_))), "{err:?}");
    }

    #[test]
    fn test_bad_config_is_reported() {
        let allocation = [("transformer".to_string(), 4)].into_iter().collect();
        let config = EmbedderConfig::new(allocation, 20, 20);
        assert!(EncodeRunner::from_config(&config).is_err());
    }
}
