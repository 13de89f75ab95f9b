// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Builds the embedder described by a saved config and reports
// what it is made of, without encoding anything.

use anyhow::Result;

use crate::domain::allocation::ModelKind;
use crate::infra::config_store::ConfigStore;
use crate::ml::runner::EncodeRunner;

#[derive(Debug, Clone, PartialEq)]
pub struct InspectReport {
    /// Sub-encoders in concatenation order
    pub active_models: Vec<ModelKind>,
    pub dim:           usize,
    pub hierarchical:  bool,
    pub batch_first:   bool,
    pub num_params:    usize,
}

pub struct InspectUseCase {
    config_path: String,
}

impl InspectUseCase {
    pub fn new(config_path: String) -> Self {
        Self { config_path }
    }

    pub fn execute(&self) -> Result<InspectReport> {
        let config = ConfigStore::new(&self.config_path).load()?;
        let runner = EncodeRunner::from_config(&config)?;

        Ok(InspectReport {
            active_models: runner.active_models(),
            dim:           runner.dim(),
            hierarchical:  runner.is_hierarchical(),
            batch_first:   config.batch_first,
            num_params:    runner.num_params(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::embedder::EmbedderConfig;

    #[test]
    fn test_report_lists_models_in_concatenation_order() {
        let path = std::env::temp_dir().join("seq_embed_inspect.json");
        let allocation = [("lookup".to_string(), 5), ("cnn".to_string(), 7)].into_iter().collect();
        let config = EmbedderConfig::new(allocation, 20, 20)
            .with_cnn_char_dim(4)
            .with_cnn_featmaps(3)
            .with_batch_first(true);
        ConfigStore::new(&path).save(&config).unwrap();

        let report = InspectUseCase::new(path.display().to_string()).execute().unwrap();
        assert_eq!(report.active_models, vec![ModelKind::Cnn, ModelKind::Lookup]);
        assert_eq!(report.dim, 12);
        assert!(!report.hierarchical);
        assert!(report.batch_first);
        assert!(report.num_params > 0);

        std::fs::remove_file(&path).ok();
    }
}
