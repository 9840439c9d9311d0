//! Background sweep of old scratch files.
//!
//! Requests that abort mid-way can leave temporary files behind; the
//! cleaner removes anything older than the configured age on a fixed tick.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::ScratchConfig;

pub struct ScratchCleaner {
    dir: Option<PathBuf>,
    interval: Duration,
    max_age: Duration,
}

impl ScratchCleaner {
    pub fn new(dir: Option<PathBuf>, config: &ScratchConfig) -> Self {
        Self {
            dir,
            interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
            max_age: Duration::from_secs(config.max_file_age_secs),
        }
    }

    /// Run until `shutdown` fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let Some(dir) = self.dir else {
            tracing::debug!("Scratch cleaner idle: no scratch directory");
            let _ = shutdown.recv().await;
            return;
        };

        tracing::info!(
            path = %dir.display(),
            interval_secs = self.interval.as_secs(),
            "Scratch cleaner starting"
        );

        let mut ticker = time::interval(self.interval);
        // The first tick fires immediately; startup already cleared the directory.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match sweep(&dir, self.max_age, SystemTime::now()).await {
                        Ok(0) => {}
                        Ok(removed) => tracing::debug!(removed, "Swept stale scratch files"),
                        Err(e) => tracing::warn!(error = %e, "Scratch sweep failed"),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Scratch cleaner received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

/// Remove regular files in `dir` last modified more than `max_age` before `now`.
pub async fn sweep(dir: &Path, max_age: Duration, now: SystemTime) -> std::io::Result<usize> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let meta = entry.metadata().await?;
        if !meta.is_file() {
            continue;
        }
        let age = meta
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age > max_age {
            tokio::fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }
    Ok(removed)
}
