//! Concurrent retrieval of signed artifacts.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures::future::try_join_all;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::api::{RequestBuilder, SignedFile, Transport};
use crate::errors::{Result, SignError};
use crate::ui::ProgressSink;

/// Terminal result of the download phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub success: bool,
    /// Local paths, in the order the signed files were listed.
    pub downloaded_files: Vec<PathBuf>,
}

/// Running byte totals shared by every download in a batch.
#[derive(Debug, Default)]
struct BatchProgress {
    received: AtomicU64,
    expected: AtomicU64,
    unknown_length: AtomicBool,
}

impl BatchProgress {
    fn expect(&self, content_length: Option<u64>) {
        match content_length {
            Some(len) => {
                self.expected.fetch_add(len, Ordering::SeqCst);
            }
            None => self.unknown_length.store(true, Ordering::SeqCst),
        }
    }

    fn add(&self, bytes: u64) -> (u64, Option<u64>) {
        let received = self.received.fetch_add(bytes, Ordering::SeqCst) + bytes;
        let expected = if self.unknown_length.load(Ordering::SeqCst) {
            None
        } else {
            Some(self.expected.load(Ordering::SeqCst))
        };
        (received, expected)
    }
}

/// Downloads the signed files of a finished signing job.
pub struct Downloader {
    transport: Arc<dyn Transport>,
    builder: RequestBuilder,
    progress: Arc<dyn ProgressSink>,
    target_dir: PathBuf,
}

impl Downloader {
    pub fn new(
        transport: Arc<dyn Transport>,
        builder: RequestBuilder,
        progress: Arc<dyn ProgressSink>,
        target_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transport,
            builder,
            progress,
            target_dir: target_dir.into(),
        }
    }

    /// Download every signed file concurrently.
    ///
    /// Unsigned entries are skipped with a warning. The first transport error
    /// aborts the batch; files already written stay on disk.
    pub async fn download(&self, files: &[SignedFile]) -> Result<DownloadOutcome> {
        let (signed, unsigned): (Vec<&SignedFile>, Vec<&SignedFile>) =
            files.iter().partition(|f| f.signed);

        for file in &unsigned {
            tracing::warn!(url = %file.download_url, "skipping file that was not signed");
        }
        if signed.is_empty() {
            return Err(SignError::NoSignedFiles);
        }

        let targets = self.target_paths(&signed)?;

        self.progress.on_status("Downloading signed files");
        let batch = BatchProgress::default();
        let downloads = signed
            .iter()
            .zip(targets)
            .map(|(file, path)| self.fetch_one(&file.download_url, path, &batch));
        let downloaded_files = try_join_all(downloads).await?;

        self.progress.on_complete();
        tracing::info!(count = downloaded_files.len(), "downloaded signed files");
        Ok(DownloadOutcome {
            success: true,
            downloaded_files,
        })
    }

    /// Local path for each file. Two files may not share a path.
    fn target_paths(&self, files: &[&SignedFile]) -> Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = Vec::with_capacity(files.len());
        for file in files {
            let path = self.target_dir.join(file_name_from_url(&file.download_url)?);
            if paths.contains(&path) {
                return Err(SignError::InvalidRequest(format!(
                    "more than one signed file would be written to {}",
                    path.display()
                )));
            }
            paths.push(path);
        }
        Ok(paths)
    }

    async fn fetch_one(&self, url: &str, path: PathBuf, batch: &BatchProgress) -> Result<PathBuf> {
        let request = self.builder.configure_request(url, &[])?;

        tracing::debug!(url = %url, path = %path.display(), "downloading signed file");
        let mut download = self
            .transport
            .download(request)
            .await
            .map_err(SignError::DownloadFailed)?;
        batch.expect(download.content_length);

        let mut out = tokio::fs::File::create(&path)
            .await
            .map_err(|source| write_failed(&path, source))?;
        while let Some(chunk) = download.body.next().await {
            let chunk = chunk.map_err(SignError::DownloadFailed)?;
            out.write_all(&chunk)
                .await
                .map_err(|source| write_failed(&path, source))?;
            let (received, expected) = batch.add(chunk.len() as u64);
            self.progress.on_bytes(received, expected);
        }
        out.flush()
            .await
            .map_err(|source| write_failed(&path, source))?;

        Ok(path)
    }
}

fn write_failed(path: &Path, source: std::io::Error) -> SignError {
    SignError::WriteFailed {
        path: path.to_path_buf(),
        source,
    }
}

/// Last path segment of `url`, without query string or fragment.
pub fn file_name_from_url(url: &str) -> Result<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    match without_query.rsplit('/').next() {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(SignError::InvalidRequest(format!(
            "cannot derive a file name from download URL {}",
            url
        ))),
    }
}
