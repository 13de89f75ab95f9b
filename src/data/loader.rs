// ============================================================
// Layer 4 — JSON Batch Loader
// ============================================================
// Reads a padded IndexBatch from a JSON file:
//
//   {
//     "batch_size": 1,
//     "chars": [[[3, 4, 0], [5, 0, 0]]],
//     "words": [[12, 7]]
//   }
//
// "chars" or "words" may be an empty list when only one stream
// is needed. Shape checks happen later, in the batcher.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::index_batch::IndexBatch;
use crate::domain::traits::BatchSource;

pub struct JsonBatchLoader {
    path: PathBuf,
}

impl JsonBatchLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BatchSource for JsonBatchLoader {
    fn load_batch(&self) -> Result<IndexBatch> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read batch file '{}'", self.path.display()))?;

        let batch: IndexBatch = serde_json::from_str(&json)
            .with_context(|| format!("'{}' is not a valid index batch", self.path.display()))?;

        tracing::debug!(
            "Loaded batch from '{}': batch_size={}, {} word positions",
            self.path.display(),
            batch.batch_size,
            batch.words.len().max(batch.chars.len()),
        );
        Ok(batch)
    }
}
