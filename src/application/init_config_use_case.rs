// ============================================================
// Layer 2 — InitConfigUseCase
// ============================================================
// Builds an EmbedderConfig from a dimension allocation and a few
// top-level switches, checks that it actually produces a working
// embedder, then saves it for `encode` and `inspect`.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

use crate::infra::config_store::ConfigStore;
use crate::ml::{embedder::EmbedderConfig, recurrent::RecurrentCellKind, runner::EncodeRunner};

#[derive(Debug, Clone)]
pub struct InitConfigRequest {
    pub output_path:     String,
    /// Model name → width
    pub allocation:      BTreeMap<String, usize>,
    pub char_vocab_size: usize,
    pub word_vocab_size: usize,
    pub hierarchical:    bool,
    pub batch_first:     bool,
    pub dropout:         f64,
    pub rnn_cell:        RecurrentCellKind,
    pub sae_heads:       usize,
}

pub struct InitConfigUseCase {
    request: InitConfigRequest,
}

impl InitConfigUseCase {
    pub fn new(request: InitConfigRequest) -> Self {
        Self { request }
    }

    /// Returns the saved config and its total feature width.
    pub fn execute(&self) -> Result<(EmbedderConfig, usize)> {
        let req = &self.request;

        let config = EmbedderConfig::new(req.allocation.clone(), req.char_vocab_size, req.word_vocab_size)
            .with_hierarchical(req.hierarchical)
            .with_batch_first(req.batch_first)
            .with_dropout(req.dropout)
            .with_rnn_cell(req.rnn_cell)
            .with_sae_heads(req.sae_heads);

        // Refuse to save a configuration that cannot be built
        let runner = EncodeRunner::from_config(&config)
            .context("Refusing to save an unusable configuration")?;

        ConfigStore::new(&req.output_path).save(&config)?;
        tracing::info!("Saved embedder config to '{}'", req.output_path);

        Ok((config, runner.dim()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn request(output_path: &str, allocation: &[(&str, usize)]) -> InitConfigRequest {
        InitConfigRequest {
            output_path:     output_path.to_string(),
            allocation:      allocation.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            char_vocab_size: 30,
            word_vocab_size: 40,
            hierarchical:    false,
            batch_first:     false,
            dropout:         0.5,
            rnn_cell:        RecurrentCellKind::Gru,
            sae_heads:       2,
        }
    }

    #[test]
    fn test_valid_config_is_saved() {
        let path = std::env::temp_dir().join("seq_embed_init_config.json");
        let path = path.display().to_string();

        let (config, dim) = InitConfigUseCase::new(request(&path, &[("rnn", 8), ("sae", 4)]))
            .execute()
            .unwrap();
        assert_eq!(dim, 12);
        assert_eq!(config.sae_heads, 2);

        let loaded = ConfigStore::new(&path).load().unwrap();
        assert_eq!(loaded.allocation, config.allocation);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_unusable_config_is_not_saved() {
        let path = std::env::temp_dir().join("seq_embed_init_config_bad.json");
        std::fs::remove_file(&path).ok();
        let path = path.display().to_string();

        // two character-level models
        let result = InitConfigUseCase::new(request(&path, &[("cnn", 8), ("rnn", 8)])).execute();
        assert!(result.is_err());
        assert!(!std::path::Path::new(&path).exists());
    }
}
