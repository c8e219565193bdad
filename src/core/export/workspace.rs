//! Per-dataset scratch workspace

use crate::domain::{DatasetIdentifier, Result};
use std::io;
use std::path::{Path, PathBuf};

/// Scratch directory `<temp_root>/<identifier>` owned by one dataset run
///
/// An existing directory is removed on acquire. The directory is removed
/// again by [`release`](Self::release) or, on early exit, when the guard is
/// dropped.
#[derive(Debug)]
pub struct DatasetWorkspace {
    path: PathBuf,
    released: bool,
}

impl DatasetWorkspace {
    pub async fn acquire(temp_root: &Path, identifier: &DatasetIdentifier) -> Result<Self> {
        let path = temp_root.join(identifier.as_str());
        recreate_dir(&path).await?;

        tracing::debug!(path = %path.display(), "Acquired dataset workspace");
        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the workspace directory
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        remove_dir_if_exists(&self.path).await?;
        tracing::debug!(path = %self.path.display(), "Released dataset workspace");
        Ok(())
    }
}

impl Drop for DatasetWorkspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove dataset workspace"
            ),
        }
    }
}

async fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Removes `path` if present and creates it empty
pub async fn recreate_dir(path: &Path) -> io::Result<()> {
    remove_dir_if_exists(path).await?;
    tokio::fs::create_dir_all(path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn identifier() -> DatasetIdentifier {
        DatasetIdentifier::new("parcels").unwrap()
    }

    #[tokio::test]
    async fn test_acquire_clears_stale_workspace() {
        let root = TempDir::new().unwrap();
        let stale = root.path().join("parcels");
        std::fs::create_dir_all(stale.join("shape")).unwrap();
        std::fs::write(stale.join("shape/old.shp"), "old").unwrap();

        let workspace = DatasetWorkspace::acquire(root.path(), &identifier())
            .await
            .unwrap();
        assert!(workspace.path().exists());
        assert!(!stale.join("shape").exists());

        workspace.release().await.unwrap();
        assert!(!stale.exists());
    }

    #[tokio::test]
    async fn test_drop_removes_workspace() {
        let root = TempDir::new().unwrap();
        let path = {
            let workspace = DatasetWorkspace::acquire(root.path(), &identifier())
                .await
                .unwrap();
            std::fs::write(workspace.path().join("scratch"), "x").unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
