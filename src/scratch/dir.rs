//! Local scratch directory.
//!
//! Lives at `{cache_data_path}/tmp`. Anything left there by a previous run
//! is stale and removed at startup. Without a cache path there is no
//! scratch directory and nothing is persisted.

use std::io;
use std::path::{Path, PathBuf};

use crate::scratch::ScratchError;

const TMP_SUBDIR: &str = "tmp";

#[derive(Debug, Clone)]
pub struct ScratchDir {
    path: Option<PathBuf>,
}

impl ScratchDir {
    /// Create (or clean) the scratch directory under `cache_data_path`.
    pub async fn init(cache_data_path: Option<&Path>) -> Result<Self, ScratchError> {
        let Some(root) = cache_data_path else {
            tracing::info!("No cache data path configured; scratch state will not persist");
            return Ok(Self { path: None });
        };

        let path = scratch_path(root);
        let removed = remove_dir_contents(&path)
            .await
            .map_err(|e| ScratchError::Clear(path.clone(), e))?;
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| ScratchError::Create(path.clone(), e))?;

        tracing::info!(path = %path.display(), removed, "Scratch directory ready");
        Ok(Self { path: Some(path) })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Scratch location for a given cache data path.
pub fn scratch_path(cache_data_path: &Path) -> PathBuf {
    cache_data_path.join(TMP_SUBDIR)
}

/// Remove every entry under `dir`, keeping `dir` itself. A missing
/// directory counts as empty. Returns the number of entries removed.
pub async fn remove_dir_contents(dir: &Path) -> io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_dir() {
            tokio::fs::remove_dir_all(&path).await?;
        } else {
            tokio::fs::remove_file(&path).await?;
        }
        removed += 1;
    }
    Ok(removed)
}
