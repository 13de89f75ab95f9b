// ============================================================
// Layer 6 — Feature Writer
// ============================================================
// Writes an encoded feature tensor to disk for the downstream
// sequence model:
//
//   { "shape": [3, 2, 300], "values": [0.12, -0.53, ...] }
//
// Values are row-major over `shape`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::domain::traits::FeatureSink;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFile {
    pub shape:  Vec<usize>,
    pub values: Vec<f32>,
}

pub struct FeatureWriter {
    path: PathBuf,
}

impl FeatureWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeatureSink for FeatureWriter {
    fn write_features(&self, shape: &[usize], values: &[f32]) -> Result<()> {
        let expected: usize = shape.iter().product();
        anyhow::ensure!(
            expected == values.len(),
            "shape {shape:?} needs {expected} values, got {}",
            values.len()
        );

        let file = FeatureFile { shape: shape.to_vec(), values: values.to_vec() };
        fs::write(&self.path, serde_json::to_string(&file)?)
            .with_context(|| format!("Cannot write features to '{}'", self.path.display()))?;

        tracing::debug!("Wrote {} features to '{}'", values.len(), self.path.display());
        Ok(())
    }
}
