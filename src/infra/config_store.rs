// ============================================================
// Layer 6 — Config Store
// ============================================================
// Saves and loads an EmbedderConfig as pretty-printed JSON so
// the same encoder architecture can be rebuilt later.
//
// Example file:
//   {
//     "allocation": { "cnn": 50, "sae": 256 },
//     "char_vocab_size": 120,
//     "word_vocab_size": 30000,
//     "hierarchical": true,
//     ...
//   }

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::ml::embedder::EmbedderConfig;

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn save(&self, cfg: &EmbedderConfig) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Cannot write config to '{}'", self.path.display()))?;

        tracing::debug!("Saved embedder config to '{}'", self.path.display());
        Ok(())
    }

    pub fn load(&self) -> Result<EmbedderConfig> {
        let json = fs::read_to_string(&self.path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Create one with 'init-config' first.",
                self.path.display()
            )
        })?;

        serde_json::from_str(&json)
            .with_context(|| format!("'{}' is not a valid embedder config", self.path.display()))
    }
}
