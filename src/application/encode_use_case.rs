// ============================================================
// Layer 2 — EncodeUseCase
// ============================================================
// Turns a saved embedder configuration and a padded index batch
// into feature vectors:
//
//   Step 1: Load embedder config     (Layer 6 - infra)
//   Step 2: Build the embedder       (Layer 5 - ml)
//   Step 3: Load the index batch     (Layer 4 - data)
//   Step 4: Encode                   (Layer 5 - ml)
//   Step 5: Write features, if asked (Layer 6 - infra)

use anyhow::Result;

use crate::data::loader::JsonBatchLoader;
use crate::domain::traits::{BatchSource, FeatureSink};
use crate::infra::{config_store::ConfigStore, feature_writer::FeatureWriter};
use crate::ml::runner::{EncodeRunner, EncodedFeatures};

#[derive(Debug, Clone)]
pub struct EncodeRequest {
    pub config_path: String,
    pub batch_path:  String,
    /// Where to write the features; None keeps them in memory only
    pub output_path: Option<String>,
}

pub struct EncodeUseCase {
    request: EncodeRequest,
}

impl EncodeUseCase {
    pub fn new(request: EncodeRequest) -> Self {
        Self { request }
    }

    pub fn execute(&self) -> Result<EncodedFeatures> {
        let req = &self.request;

        // ── Step 1: Load the embedder configuration ──────────────────────────
        tracing::info!("Loading embedder config from '{}'", req.config_path);
        let config = ConfigStore::new(&req.config_path).load()?;

        // ── Step 2: Build the embedder ───────────────────────────────────────
        let runner = EncodeRunner::from_config(&config)?;

        // ── Steps 3-5: Load, encode, write ───────────────────────────────────
        let source = JsonBatchLoader::new(&req.batch_path);
        let writer = req.output_path.as_ref().map(FeatureWriter::new);

        encode_batch(&runner, &source, writer.as_ref().map(|w| w as &dyn FeatureSink))
    }
}

/// Encode one batch from `source`, forwarding the result to `sink` when given.
pub fn encode_batch(
    runner: &EncodeRunner,
    source: &dyn BatchSource,
    sink:   Option<&dyn FeatureSink>,
) -> Result<EncodedFeatures> {
    let batch = source.load_batch()?;
    tracing::info!("Encoding batch of {} document(s)", batch.batch_size);

    let features = runner.encode(&batch)?;
    tracing::info!("Encoded features: shape {:?}", features.shape);

    if let Some(sink) = sink {
        sink.write_features(&features.shape, &features.values)?;
    }
    Ok(features)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::index_batch::IndexBatch;
    use crate::infra::feature_writer::FeatureFile;
    use crate::ml::embedder::EmbedderConfig;
    use std::cell::RefCell;
    use std::fs;

    struct FixedBatch(IndexBatch);

    impl BatchSource for FixedBatch {
        fn load_batch(&self) -> Result<IndexBatch> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct Collect(RefCell<Vec<usize>>);

    impl FeatureSink for Collect {
        fn write_features(&self, shape: &[usize], _values: &[f32]) -> Result<()> {
            *self.0.borrow_mut() = shape.to_vec();
            Ok(())
        }
    }

    fn hierarchical_config() -> EmbedderConfig {
        let allocation = [("lookup".to_string(), 6)].into_iter().collect();
        EmbedderConfig::new(allocation, 10, 10)
            .with_hierarchical(true)
            .with_rnn_layers(1)
    }

    #[test]
    fn test_encode_batch_forwards_features_to_sink() {
        let runner = EncodeRunner::from_config(&hierarchical_config()).unwrap();
        // 2 documents × 2 sentences, 3 words per sentence
        let batch = IndexBatch::new(2, vec![], vec![vec![1, 2, 3, 4]; 3]);
        let sink  = Collect::default();

        let out = encode_batch(&runner, &FixedBatch(batch), Some(&sink)).unwrap();
        assert_eq!(out.shape, vec![2, 2, 6]);
        assert_eq!(*sink.0.borrow(), vec![2, 2, 6]);
    }

    #[test]
    fn test_execute_reads_config_and_batch_from_disk() {
        let dir = std::env::temp_dir().join("seq_embed_encode_use_case");
        fs::create_dir_all(&dir).unwrap();
        let config_path = dir.join("embedder.json");
        let batch_path  = dir.join("batch.json");
        let output_path = dir.join("features.json");

        ConfigStore::new(&config_path).save(&hierarchical_config()).unwrap();
        fs::write(&batch_path, r#"{ "batch_size": 1, "words": [[3, 5], [2, 0]] }"#).unwrap();

        let use_case = EncodeUseCase::new(EncodeRequest {
            config_path: config_path.display().to_string(),
            batch_path:  batch_path.display().to_string(),
            output_path: Some(output_path.display().to_string()),
        });
        let out = use_case.execute().unwrap();
        assert_eq!(out.shape, vec![2, 1, 6]);

        let file: FeatureFile = serde_json::from_str(&fs::read_to_string(&output_path).unwrap()).unwrap();
        assert_eq!(file.shape, out.shape);
        assert_eq!(file.values.len(), 12);

        fs::remove_dir_all(&dir).ok();
    }
}
