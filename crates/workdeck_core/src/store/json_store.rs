//! Single-document JSON backend.
//!
//! # Responsibility
//! - Persist the entire dataset as one pretty-printed JSON file.
//! - Guarantee atomic replacement via write-to-temp-then-rename.
//!
//! # Invariants
//! - A reader of the target path sees either the prior document or the new
//!   one, never a partial write.
//! - Concurrent saves from other processes resolve last-writer-wins.

use crate::model::dataset::Dataset;
use crate::store::{DatasetStore, StoreResult};
use log::{debug, info};
use std::fs;
use std::path::PathBuf;

/// JSON file store for the dataset document.
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl DatasetStore for JsonStore {
    fn load(&self) -> StoreResult<Dataset> {
        if !self.path.exists() {
            info!(
                "event=store_load module=store backend=json status=empty path={}",
                self.path.display()
            );
            return Ok(Dataset::default());
        }
        let payload = fs::read_to_string(&self.path)?;
        let dataset: Dataset = serde_json::from_str(&payload)?;
        debug!(
            "event=store_load module=store backend=json status=ok contexts={}",
            dataset.contexts.len()
        );
        Ok(dataset)
    }

    fn save(&mut self, dataset: &Dataset) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let payload = serde_json::to_string_pretty(dataset)?;

        // Temp file lives next to the target so the rename stays on one
        // filesystem and remains atomic.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &self.path)?;

        debug!(
            "event=store_save module=store backend=json status=ok contexts={}",
            dataset.contexts.len()
        );
        Ok(())
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }
}
