//! Disk persistence for fixed origins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{FixedOrigin, WorkingSet};

use super::error::StoreError;

/// One saved origin.
#[derive(Debug, Serialize, Deserialize)]
struct SavedOrigin {
    working_set: WorkingSet,
    origin: FixedOrigin,
}

/// File contents.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SavedOrigins {
    origins: Vec<SavedOrigin>,
}

/// JSON file holding the fixed origin of each working set.
///
/// Working sets in live mode have no entry.
#[derive(Debug, Clone)]
pub struct OriginFile {
    path: PathBuf,
}

impl OriginFile {
    /// Create a handle for the file at `path`. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load saved origins.
    ///
    /// A missing file is treated as "nothing saved". A file that exists but
    /// cannot be parsed is an error.
    pub fn load(&self) -> Result<HashMap<WorkingSet, FixedOrigin>, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(StoreError::Io {
                    message: format!("failed to read {}: {}", self.path.display(), e),
                });
            }
        };

        let saved: SavedOrigins = serde_json::from_str(&contents).map_err(|e| StoreError::Io {
            message: format!("failed to parse {}: {}", self.path.display(), e),
        })?;

        Ok(saved
            .origins
            .into_iter()
            .map(|s| (s.working_set, s.origin))
            .collect())
    }

    /// Save origins, replacing the file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, origins: &HashMap<WorkingSet, FixedOrigin>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                message: format!("failed to create origin directory: {}", e),
            })?;
        }

        // Stable file contents regardless of map iteration order.
        let mut entries: Vec<SavedOrigin> = origins
            .iter()
            .map(|(ws, origin)| SavedOrigin {
                working_set: *ws,
                origin: origin.clone(),
            })
            .collect();
        entries.sort_by_key(|s| s.working_set.as_str());

        let json = serde_json::to_string_pretty(&SavedOrigins { origins: entries }).map_err(
            |e| StoreError::Io {
                message: format!("failed to serialize origins: {}", e),
            },
        )?;

        std::fs::write(&self.path, json).map_err(|e| StoreError::Io {
            message: format!("failed to write {}: {}", self.path.display(), e),
        })
    }

    /// Get the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
