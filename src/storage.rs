use std::path::PathBuf;

use thiserror::Error;

use crate::models::task::Task;

pub mod json;
pub mod normalize;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to load tasks from '{path}': {source}")]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON from '{path}': {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to save tasks to '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize tasks to JSON: {source}")]
    SerializeFailed {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to create backup at '{path}': {source}")]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to cleanup old backups in '{dir}': {source}")]
    CleanupFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Persisted data is not an array of task records")]
    InvalidCollection,
}

pub trait Storage {
    fn load(&self) -> Result<Vec<Task>, StorageError>;
    fn save(&self, tasks: &[Task]) -> Result<(), StorageError>;
}
