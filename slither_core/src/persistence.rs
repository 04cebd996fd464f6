//! Saving and loading trained Q-tables.
//!
//! A model is a single pretty-printed JSON document holding the table (packed
//! state key to the four action values) and the metadata needed to use it.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{config::TrainConfig, qtable::QTable, trainer::TrainingSummary};

/// Bumped whenever the state encoding or the file layout changes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed model file {path:?}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("model file {path:?} has format version {found}, expected {expected}")]
    Version {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
}

/// Training context stored next to the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Format version for compatibility checking
    pub version: u32,
    pub grid_size: usize,
    pub alpha: f64,
    pub gamma: f64,
    /// Exploration rate when training stopped
    pub epsilon: f64,
    pub episodes_trained: usize,
    pub best_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedModel {
    pub metadata: ModelMetadata,
    pub table: QTable,
}

impl SavedModel {
    pub fn from_training(config: &TrainConfig, summary: &TrainingSummary, table: QTable) -> Self {
        Self {
            metadata: ModelMetadata {
                version: FORMAT_VERSION,
                grid_size: config.grid_size,
                alpha: config.alpha,
                gamma: config.gamma,
                epsilon: summary.final_epsilon,
                episodes_trained: summary.episodes,
                best_length: summary.best_length,
            },
            table,
        }
    }
}

/// Writes `model` to `path` as JSON, creating parent directories if needed.
pub fn save_model(model: &SavedModel, path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StorageError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let json = serde_json::to_string_pretty(model).map_err(|source| StorageError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a model written by [`save_model`], rejecting other format versions.
pub fn load_model(path: &Path) -> Result<SavedModel, StorageError> {
    let json = fs::read_to_string(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let model: SavedModel = serde_json::from_str(&json).map_err(|source| StorageError::Format {
        path: path.to_path_buf(),
        source,
    })?;

    if model.metadata.version != FORMAT_VERSION {
        return Err(StorageError::Version {
            path: path.to_path_buf(),
            found: model.metadata.version,
            expected: FORMAT_VERSION,
        });
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateKey;

    fn sample_model() -> SavedModel {
        let mut table = QTable::new();
        table
            .values_mut(StateKey(0x1234_5678_9abc))
            .copy_from_slice(&[1.5, -100.0, 0.0, 42.25]);
        table.values_mut(StateKey(0)).copy_from_slice(&[0.0, 0.0, 0.0, -0.1]);
        SavedModel {
            metadata: ModelMetadata {
                version: FORMAT_VERSION,
                grid_size: 10,
                alpha: 0.6,
                gamma: 0.85,
                epsilon: 0.001,
                episodes_trained: 20_000,
                best_length: 17,
            },
            table,
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/models/snake.json");
        let model = sample_model();

        save_model(&model, &path).unwrap();
        assert!(path.exists());

        let loaded = load_model(&path).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_model(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(StorageError::Io { .. })));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ \"metadata\": 3 }").unwrap();
        assert!(matches!(load_model(&path), Err(StorageError::Format { .. })));
    }

    #[test]
    fn test_load_rejects_other_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.json");
        let mut model = sample_model();
        model.metadata.version = FORMAT_VERSION + 1;
        save_model(&model, &path).unwrap();

        match load_model(&path) {
            Err(StorageError::Version { found, expected, .. }) => {
                assert_eq!(found, FORMAT_VERSION + 1);
                assert_eq!(expected, FORMAT_VERSION);
            }
            other => panic!("expected a version error, got {other:?}"),
        }
    }
}
