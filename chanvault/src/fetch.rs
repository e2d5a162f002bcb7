//! Deduplicated attachment download.
//!
//! Attachment bodies are stored once per (attachment id, filename) pair
//! across the whole archive directory, regardless of how many snapshots
//! reference them. The existence check is an idempotency guard, not a
//! lock: two processes racing on the same path may both download, which
//! is harmless.
//!
//! Downloads are best-effort. A failed or truncated fetch is logged, any
//! partial file is deleted, and the enclosing backup carries on — the
//! message entry keeps the attachment's metadata either way.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use snafu::ResultExt;
use tokio::io::AsyncWriteExt;

use crate::{
    entry::AttachmentEntry,
    error::{DownloadSnafu, IoSnafu, VaultError},
    snapshot::attachment_file_name,
};

/// What [`AttachmentFetcher::ensure_local`] did for one attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The body was fetched and written.
    Downloaded,
    /// A file already existed at the deterministic path; nothing fetched.
    AlreadyPresent,
    /// The fetch failed; metadata is archived without a local body.
    Failed,
}

pub struct AttachmentFetcher {
    http: reqwest::Client,
    dir: PathBuf,
}

impl AttachmentFetcher {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_client(reqwest::Client::new(), dir)
    }

    #[must_use]
    pub fn with_client(http: reqwest::Client, dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            dir: dir.into(),
        }
    }

    /// Deterministic on-disk path for an attachment's body.
    #[must_use]
    pub fn local_path(&self, attachment: &AttachmentEntry) -> PathBuf {
        self.dir
            .join(attachment_file_name(attachment.id, &attachment.filename))
    }

    /// Make sure the attachment's body exists locally, downloading only
    /// if absent. Never returns an error: failure is an outcome, fatal
    /// only at the attachment granularity.
    pub async fn ensure_local(&self, attachment: &AttachmentEntry) -> FetchOutcome {
        let path = self.local_path(attachment);
        if path.is_file() {
            tracing::debug!(path = %path.display(), "attachment already present, skipping download");
            return FetchOutcome::AlreadyPresent;
        }
        match self.download(&attachment.url, &path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "saved attachment");
                FetchOutcome::Downloaded
            }
            Err(err) => {
                tracing::warn!(
                    url = attachment.url,
                    path = %path.display(),
                    error = %err,
                    "attachment download failed"
                );
                if path.exists()
                    && let Err(remove_err) = tokio::fs::remove_file(&path).await
                {
                    tracing::warn!(
                        path = %path.display(),
                        error = %remove_err,
                        "failed to remove partial attachment"
                    );
                }
                FetchOutcome::Failed
            }
        }
    }

    /// Streaming fetch: response chunks go to disk as they arrive rather
    /// than buffering the whole body.
    async fn download(&self, url: &str, path: &Path) -> Result<(), VaultError> {
        tokio::fs::create_dir_all(&self.dir).await.context(IoSnafu {
            path: self.dir.clone(),
        })?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .context(DownloadSnafu { url })?;

        let mut file = tokio::fs::File::create(path).await.context(IoSnafu {
            path: path.to_path_buf(),
        })?;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.context(DownloadSnafu { url })?;
            file.write_all(&chunk).await.context(IoSnafu {
                path: path.to_path_buf(),
            })?;
        }
        file.flush().await.context(IoSnafu {
            path: path.to_path_buf(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chanvault_api::types::Snowflake;

    use super::*;

    fn attachment(id: u64, filename: &str, url: &str) -> AttachmentEntry {
        AttachmentEntry {
            id: Snowflake(id),
            filename: filename.to_string(),
            url: url.to_string(),
            spoiler: false,
            size: None,
            width: None,
            height: None,
        }
    }

    #[test_log::test(tokio::test)]
    async fn existing_file_short_circuits_the_download() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = AttachmentFetcher::new(dir.path());
        // unroutable url: reaching the network would fail the test
        let attachment = attachment(9, "cat.png", "http://127.0.0.1:1/cat.png");
        std::fs::write(fetcher.local_path(&attachment), b"cat bytes").unwrap();

        let outcome = fetcher.ensure_local(&attachment).await;
        assert_eq!(outcome, FetchOutcome::AlreadyPresent);
        assert_eq!(
            std::fs::read(fetcher.local_path(&attachment)).unwrap(),
            b"cat bytes"
        );
    }

    #[test_log::test(tokio::test)]
    async fn failed_download_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = AttachmentFetcher::new(dir.path());
        let attachment = attachment(9, "cat.png", "http://127.0.0.1:1/cat.png");

        let outcome = fetcher.ensure_local(&attachment).await;
        assert_eq!(outcome, FetchOutcome::Failed);
        assert!(!fetcher.local_path(&attachment).exists());
    }

    #[test]
    fn local_paths_are_deterministic_per_id_and_filename() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = AttachmentFetcher::new(dir.path());
        let first = fetcher.local_path(&attachment(9, "cat.png", "https://a.example.test/x"));
        let second = fetcher.local_path(&attachment(9, "cat.png", "https://b.example.test/y"));
        assert_eq!(first, second);
        let other = fetcher.local_path(&attachment(10, "cat.png", "https://a.example.test/x"));
        assert_ne!(first, other);
    }
}
