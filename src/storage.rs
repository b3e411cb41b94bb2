//! Path-addressed binary storage for uploaded workbooks.
//!
//! Paths are produced at upload time and stored on the file entity;
//! reads always pull the whole file since calamine needs a seekable
//! buffer anyway.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(Path::new(path))
    }

    pub async fn save(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        tokio::fs::write(&full, bytes)
            .await
            .with_context(|| format!("Failed to write {:?}", full))?;
        debug!("BlobStore: wrote {} bytes to {:?}", bytes.len(), full);
        Ok(())
    }

    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path);
        tokio::fs::read(&full)
            .await
            .with_context(|| format!("Failed to read {:?}", full))
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path);
        tokio::fs::remove_file(&full)
            .await
            .with_context(|| format!("Failed to delete {:?}", full))?;
        debug!("BlobStore: deleted {:?}", full);
        Ok(())
    }
}
