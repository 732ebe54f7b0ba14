//! Top-level signing flow: submit, poll, download.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::api::{Credentials, RequestBuilder, Transport};
use crate::errors::Result;
use crate::schedule::{Scheduler, TokioScheduler};
use crate::signing::download::Downloader;
use crate::signing::poller::{PollConfig, PollOutcome, StatusPoller};
use crate::signing::submit::{SigningRequest, SubmitOutcome, submit};
use crate::ui::{NoopProgress, ProgressSink};

/// How a signing run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignStatus {
    /// Signed files were downloaded.
    Signed,
    /// The service refused the submission outright (e.g. version exists).
    SubmissionRejected { reason: String },
    /// The artifact did not pass validation.
    ValidationFailed { validation_url: Option<String> },
    /// Passed validation; waiting on a human reviewer.
    ManualReview,
}

/// Final result of [`Signer::sign`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignResult {
    pub success: bool,
    pub addon_id: String,
    #[serde(flatten)]
    pub status: SignStatus,
    pub downloaded_files: Vec<PathBuf>,
}

impl SignResult {
    fn unsuccessful(addon_id: &str, status: SignStatus) -> Self {
        Self {
            success: false,
            addon_id: addon_id.to_string(),
            status,
            downloaded_files: Vec::new(),
        }
    }
}

/// Signing client. Cheap to share: credentials and base URL are read-only.
pub struct Signer {
    transport: Arc<dyn Transport>,
    builder: RequestBuilder,
    scheduler: Arc<dyn Scheduler>,
    progress: Arc<dyn ProgressSink>,
    poll: PollConfig,
    download_dir: PathBuf,
}

impl Signer {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            transport,
            builder: RequestBuilder::new(base_url, credentials),
            scheduler: Arc::new(TokioScheduler),
            progress: Arc::new(NoopProgress),
            poll: PollConfig::default(),
            download_dir: PathBuf::from("."),
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Directory signed files are written to. Defaults to the working directory.
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Submit `request`, wait for the signing job, and fetch the signed files.
    ///
    /// Operational failures are errors; business outcomes such as a failed
    /// validation come back as `Ok` with `success == false`.
    pub async fn sign(&self, request: &SigningRequest) -> Result<SignResult> {
        let status_url = match submit(self.transport.as_ref(), &self.builder, request).await? {
            SubmitOutcome::Accepted { status_url } => status_url,
            SubmitOutcome::Rejected { reason } => {
                return Ok(SignResult::unsuccessful(
                    &request.id,
                    SignStatus::SubmissionRejected { reason },
                ));
            }
        };

        let poller = StatusPoller::new(
            Arc::clone(&self.transport),
            self.builder.clone(),
            Arc::clone(&self.scheduler),
            Arc::clone(&self.progress),
            self.poll,
        );
        let files = match poller.wait_for_signed(&status_url).await? {
            PollOutcome::Signed { files } => files,
            PollOutcome::Rejected { validation_url } => {
                return Ok(SignResult::unsuccessful(
                    &request.id,
                    SignStatus::ValidationFailed { validation_url },
                ));
            }
            PollOutcome::ManualReview { .. } => {
                return Ok(SignResult::unsuccessful(&request.id, SignStatus::ManualReview));
            }
        };

        let downloader = Downloader::new(
            Arc::clone(&self.transport),
            self.builder.clone(),
            Arc::clone(&self.progress),
            self.download_dir.clone(),
        );
        let outcome = downloader.download(&files).await?;

        Ok(SignResult {
            success: outcome.success,
            addon_id: request.id.clone(),
            status: SignStatus::Signed,
            downloaded_files: outcome.downloaded_files,
        })
    }
}
