//! Persistence port for the dataset.
//!
//! # Responsibility
//! - Define the load/save/exists contract the manager persists through.
//! - Isolate file and SQLite encoding details from orchestration code.
//!
//! # Invariants
//! - `load` returns a default dataset when no prior state exists; a missing
//!   backing file is never an error.
//! - `save` is atomic from the caller's point of view: either the full new
//!   dataset becomes durable or the prior one remains.
//! - Both backends expose equivalent dataset semantics; the manager cannot
//!   tell them apart.

use crate::model::dataset::Dataset;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod json_store;
pub mod sqlite_store;

pub use json_store::JsonStore;
pub use sqlite_store::SqliteStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence failure. Not part of the semantic core taxonomy; the manager
/// treats any of these as fatal to the operation in flight.
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Encode(serde_json::Error),
    Sqlite(rusqlite::Error),
    /// Persisted payload exists but does not decode as a dataset.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "{err}"),
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted dataset: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Sqlite(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Storage backend contract for the whole dataset.
pub trait DatasetStore {
    /// Loads the persisted dataset, or a default one when none exists.
    fn load(&self) -> StoreResult<Dataset>;

    /// Durably replaces the persisted dataset with `dataset`.
    fn save(&mut self, dataset: &Dataset) -> StoreResult<()>;

    /// Whether backing storage is already present.
    fn exists(&self) -> bool;
}
