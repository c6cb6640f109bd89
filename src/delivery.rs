//! Reliable artifact delivery to the remote collector.
//!
//! Every structured artifact found in an upload directory is POSTed to the
//! collector and retried on a fixed interval until it succeeds: no backoff
//! growth, no retry limit. The deployment is an unattended kiosk: guaranteed
//! eventual delivery is worth more than operator visibility, so failures
//! surface only as log lines. A delivered file is relocated (never copied)
//! into the sent directory, which is the exactly-once bookkeeping: a file
//! is never deleted before its delivery is confirmed.

use crate::artifact::ArtifactPaths;
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

/// Production retry interval between upload attempts for one file.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(15);

/// Remote endpoint accepting result artifacts.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Upload one artifact's raw bytes. `Ok` means confirmed receipt.
    async fn upload(&self, payload: &[u8]) -> Result<()>;
}

#[async_trait]
impl<C: Collector + ?Sized> Collector for std::sync::Arc<C> {
    async fn upload(&self, payload: &[u8]) -> Result<()> {
        (**self).upload(payload).await
    }
}

/// HTTP collector: `POST {endpoint}` with a JSON content type.
///
/// Only HTTP 200 counts as confirmed receipt; every other status and any
/// transport failure is a retryable upload error.
pub struct HttpCollector {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCollector {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.into() }
    }
}

#[async_trait]
impl Collector for HttpCollector {
    async fn upload(&self, payload: &[u8]) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.to_vec())
            .send()
            .await
            .map_err(|e| Error::upload_failed(format!("POST {}", self.endpoint), Box::new(e)))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::upload_rejected(status.as_u16()));
        }
        Ok(())
    }
}

/// Moves produced artifacts to the collector with infinite retry.
pub struct DeliveryQueue<C: Collector> {
    collector: C,
    sent_dir: PathBuf,
    retry_interval: Duration,
    disabled: bool,
}

impl<C: Collector> DeliveryQueue<C> {
    pub fn new(collector: C, sent_dir: PathBuf, retry_interval: Duration, disabled: bool) -> Self {
        Self { collector, sent_dir, retry_interval, disabled }
    }

    /// Drain every upload directory of the layout, in flush order.
    pub async fn flush_all(&self, paths: &ArtifactPaths) -> Result<()> {
        if self.disabled {
            info!("Upload disabled, skipping delivery");
            return Ok(());
        }
        for dir in paths.upload_dirs() {
            self.flush_dir(dir).await?;
        }
        Ok(())
    }

    /// Deliver every structured artifact currently in `dir`.
    ///
    /// Files are discovered by listing the directory once per invocation and
    /// uploaded one at a time in name order, so timestamped artifacts go out
    /// oldest-first and files added mid-run are picked up on the next flush.
    /// Each file is retried until the collector confirms it, then relocated
    /// into the sent directory; a failed relocation is logged and ignored
    /// (the artifact is already delivered).
    pub async fn flush_dir(&self, dir: &Path) -> Result<()> {
        if self.disabled {
            info!("Upload disabled, skipping delivery from {}", dir.display());
            return Ok(());
        }

        std::fs::create_dir_all(&self.sent_dir)
            .map_err(|e| Error::file_error(self.sent_dir.clone(), e))?;
        std::fs::create_dir_all(dir).map_err(|e| Error::file_error(dir.to_path_buf(), e))?;

        let mut artifacts: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| Error::file_error(dir.to_path_buf(), e))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        artifacts.sort();

        for path in artifacts {
            self.deliver_file(&path).await;
        }
        Ok(())
    }

    /// Upload one file until confirmed, then relocate it.
    async fn deliver_file(&self, path: &Path) {
        loop {
            match self.try_send(path).await {
                Ok(()) => break,
                Err(e) => {
                    error!("Failed to send {}: {}", path.display(), e);
                    info!(
                        "Retrying {} in {} seconds",
                        path.display(),
                        self.retry_interval.as_secs()
                    );
                    tokio::time::sleep(self.retry_interval).await;
                }
            }
        }

        let file_name = match path.file_name() {
            Some(name) => name.to_owned(),
            None => return,
        };
        let destination = self.sent_dir.join(file_name);
        match std::fs::rename(path, &destination) {
            Ok(()) => info!("Moved {} to {}", path.display(), destination.display()),
            Err(e) => {
                // Already delivered; losing the local copy is not a
                // correctness issue.
                error!("Failed to move {} to {}: {}", path.display(), destination.display(), e);
            }
        }
    }

    async fn try_send(&self, path: &Path) -> Result<()> {
        let payload =
            std::fs::read(path).map_err(|e| Error::file_error(path.to_path_buf(), e))?;
        debug!("Uploading {} ({} bytes)", path.display(), payload.len());
        self.collector.upload(&payload).await?;
        info!("Successfully sent {} to server", path.display());
        Ok(())
    }
}
