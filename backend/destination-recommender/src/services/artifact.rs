//! Load-once handles for the offline-built scoring artifacts.
//!
//! Artifacts are read from disk the first time a scorer needs them (or at
//! startup when preloading is enabled) and shared read-only afterwards. A
//! failed load leaves the cell empty so the next request surfaces the same
//! fatal error instead of a partial result.

use crate::error::{AppError, ArtifactKind, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

pub struct ArtifactCell<T> {
    kind: ArtifactKind,
    path: PathBuf,
    cell: OnceCell<Arc<T>>,
}

impl<T> ArtifactCell<T> {
    pub fn new(kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            cell: OnceCell::new(),
        }
    }

    /// Wrap an artifact that is already in memory
    pub fn ready(kind: ArtifactKind, value: T) -> Self {
        Self {
            kind,
            path: PathBuf::new(),
            cell: OnceCell::new_with(Some(Arc::new(value))),
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn get_or_load<F>(&self, load: F) -> Result<Arc<T>>
    where
        F: FnOnce(ArtifactKind, &Path) -> Result<T>,
    {
        let value = self
            .cell
            .get_or_try_init(|| async move {
                let loaded = load(self.kind, &self.path)?;
                info!(kind = %self.kind, path = %self.path.display(), "Artifact loaded");
                Ok::<_, AppError>(Arc::new(loaded))
            })
            .await?;

        Ok(Arc::clone(value))
    }
}

/// Deserialize an artifact file, choosing the codec by extension.
///
/// `.bin`/`.bincode` use bincode, anything else is parsed as JSON.
pub fn read_artifact<A: DeserializeOwned>(kind: ArtifactKind, path: &Path) -> Result<A> {
    if path.as_os_str().is_empty() || !path.exists() {
        return Err(AppError::ArtifactMissing {
            kind,
            path: path.display().to_string(),
        });
    }

    let data = std::fs::read(path)?;
    if data.is_empty() {
        return Err(AppError::ArtifactCorrupt {
            kind,
            reason: format!("{} is empty", path.display()),
        });
    }

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match extension {
        "bin" | "bincode" => bincode::deserialize(&data).map_err(|e| AppError::ArtifactCorrupt {
            kind,
            reason: format!("bincode: {}", e),
        }),
        _ => serde_json::from_slice(&data).map_err(|e| AppError::ArtifactCorrupt {
            kind,
            reason: format!("json: {}", e),
        }),
    }
}
