//! Status polling state machine.
//!
//! ```text
//! Submitted ──▶ Polling ──▶ Signed
//!                  │  ╰───▶ ManualReview
//!                  │  ╰───▶ Rejected
//!                  ╰──────▶ TimedOut (error)
//! ```
//!
//! Polls run strictly one after another: the next poll timer is armed only
//! after the previous response has been evaluated. A single deadline timer
//! bounds the whole session.

use std::sync::Arc;
use std::time::Duration;

use crate::api::{RequestBuilder, SignedFile, StatusSnapshot, Transport, Verdict};
use crate::errors::{Result, SignError};
use crate::schedule::{Scheduler, Timer};
use crate::ui::ProgressSink;

/// Default deadline for a polling session.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(120_000);

/// Default gap between two status requests.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1_000);

/// Marker used in timeout errors when no response ever arrived.
pub const NO_STATUS_OBSERVED: &str = "[no status observed]";

/// Timing knobs for the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PollConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Terminal, non-error result of a polling session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Signing finished; hand these files to the downloader.
    Signed { files: Vec<SignedFile> },
    /// Valid, but a human must review before signing.
    ManualReview { snapshot: StatusSnapshot },
    /// Validation failed; `validation_url` points at the report.
    Rejected { validation_url: Option<String> },
}

/// Transient state owned by one polling run.
struct PollSession {
    last: Option<StatusSnapshot>,
    deadline: Timer,
    poll: Option<Timer>,
}

impl PollSession {
    /// Cancel every pending timer. Safe to call repeatedly.
    fn close(&mut self) {
        self.deadline.cancel();
        if let Some(mut poll) = self.poll.take() {
            poll.cancel();
        }
    }

    fn last_status(&self) -> String {
        self.last
            .as_ref()
            .map(StatusSnapshot::summary)
            .unwrap_or_else(|| NO_STATUS_OBSERVED.to_string())
    }
}

enum Wake {
    Poll,
    Deadline,
}

/// Polls a status URL until the signing job settles or the deadline passes.
pub struct StatusPoller {
    transport: Arc<dyn Transport>,
    builder: RequestBuilder,
    scheduler: Arc<dyn Scheduler>,
    progress: Arc<dyn ProgressSink>,
    config: PollConfig,
}

impl StatusPoller {
    pub fn new(
        transport: Arc<dyn Transport>,
        builder: RequestBuilder,
        scheduler: Arc<dyn Scheduler>,
        progress: Arc<dyn ProgressSink>,
        config: PollConfig,
    ) -> Self {
        Self {
            transport,
            builder,
            scheduler,
            progress,
            config,
        }
    }

    /// Run a polling session against `status_url`.
    pub async fn wait_for_signed(&self, status_url: &str) -> Result<PollOutcome> {
        let mut session = PollSession {
            last: None,
            deadline: self.scheduler.after("deadline", self.config.timeout),
            poll: None,
        };
        self.progress.on_status("Waiting for approval");
        tracing::info!(url = %status_url, timeout_ms = self.config.timeout.as_millis() as u64, "polling signing status");

        let result = self.run(&mut session, status_url).await;
        session.close();
        result
    }

    async fn run(&self, session: &mut PollSession, status_url: &str) -> Result<PollOutcome> {
        loop {
            // A status request that is still in flight when the deadline fires
            // is dropped and its result never looked at.
            let snapshot = tokio::select! {
                biased;
                snapshot = self.fetch_status(status_url) => snapshot?,
                _ = session.deadline.wait() => return Err(self.timed_out(session)),
            };

            let verdict = snapshot.verdict();
            tracing::debug!(
                processed = snapshot.processed,
                valid = snapshot.valid,
                active = snapshot.active,
                reviewed = snapshot.reviewed,
                automated_signing = ?snapshot.automated_signing,
                files = snapshot.files.len(),
                verdict = ?verdict,
                "status observed"
            );
            session.last = Some(snapshot);

            if let Some(verdict) = verdict {
                session.deadline.cancel();
                let snapshot = session.last.take().unwrap_or_default();
                return Ok(self.settle(verdict, snapshot));
            }

            let mut poll = self.scheduler.after("poll", self.config.interval);
            let wake = tokio::select! {
                biased;
                _ = session.deadline.wait() => Wake::Deadline,
                _ = poll.wait() => Wake::Poll,
            };
            match wake {
                Wake::Poll => continue,
                Wake::Deadline => {
                    session.poll = Some(poll);
                    return Err(self.timed_out(session));
                }
            }
        }
    }

    async fn fetch_status(&self, status_url: &str) -> Result<StatusSnapshot> {
        let request = self.builder.configure_request(status_url, &[])?;
        let url = request.url.clone();
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(SignError::unexpected_response(
                response.status,
                &response.body,
                response.headers,
            ));
        }
        response
            .json()
            .map_err(|source| SignError::Decode { url, source })
    }

    fn settle(&self, verdict: Verdict, snapshot: StatusSnapshot) -> PollOutcome {
        match verdict {
            Verdict::FailedValidation => {
                tracing::warn!(
                    validation_url = snapshot.validation_url.as_deref().unwrap_or("<none>"),
                    "the artifact failed validation"
                );
                PollOutcome::Rejected {
                    validation_url: snapshot.validation_url,
                }
            }
            Verdict::SignedAndReady => PollOutcome::Signed {
                files: snapshot.files,
            },
            Verdict::RequiresManualReview => {
                tracing::info!("validation passed; the artifact will be signed after a manual review");
                PollOutcome::ManualReview { snapshot }
            }
        }
    }

    fn timed_out(&self, session: &mut PollSession) -> SignError {
        session.close();
        let last_status = session.last_status();
        tracing::warn!(last_status = %last_status, "signing status polling timed out");
        SignError::PollTimeout {
            waited: self.config.timeout,
            last_status,
        }
    }
}
