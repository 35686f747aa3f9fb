//! Asset Store
//!
//! Flat directory of video files addressed by validated asset names.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::catalog::AssetName;

#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the asset if it currently exists as a regular file.
    pub async fn locate(&self, asset: &AssetName) -> Option<PathBuf> {
        let path = self.root.join(asset.as_str());
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            Ok(_) => {
                debug!("Asset path {} is not a regular file", path.display());
                None
            }
            Err(e) => {
                debug!("Asset {} unavailable: {}", path.display(), e);
                None
            }
        }
    }
}
