//! Wire types for the signing API.

use serde::{Deserialize, Serialize};

/// A single file produced by the signing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedFile {
    pub download_url: String,
    #[serde(default)]
    pub signed: bool,
}

/// One observation of the remote signing job.
///
/// The service fills these fields in incrementally, so a snapshot is only
/// meaningful once `processed` is true.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub processed: bool,
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub reviewed: bool,
    /// `None` when the service does not report automated-signing support at all.
    #[serde(default)]
    pub automated_signing: Option<bool>,
    #[serde(default)]
    pub files: Vec<SignedFile>,
    #[serde(default)]
    pub validation_url: Option<String>,
}

impl StatusSnapshot {
    pub fn failed_validation(&self) -> bool {
        !self.valid
    }

    pub fn signed_and_ready(&self) -> bool {
        self.valid && self.active && self.reviewed && !self.files.is_empty()
    }

    /// Valid, but the service says it will not sign this version automatically.
    pub fn requires_manual_review(&self) -> bool {
        self.valid && matches!(self.automated_signing, Some(false))
    }

    /// Collapse the snapshot into a poll verdict, or `None` if the job is not
    /// settled yet.
    pub fn verdict(&self) -> Option<Verdict> {
        if !self.processed {
            return None;
        }
        if self.failed_validation() {
            Some(Verdict::FailedValidation)
        } else if self.signed_and_ready() {
            Some(Verdict::SignedAndReady)
        } else if self.requires_manual_review() {
            Some(Verdict::RequiresManualReview)
        } else {
            None
        }
    }

    /// One-line rendering used in timeout diagnostics.
    pub fn summary(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// Terminal classification of a processed snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    FailedValidation,
    SignedAndReady,
    RequiresManualReview,
}

/// Body of a successful submission response.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAccepted {
    /// Status-check URL for the new signing job.
    pub url: String,
}

/// Structured error body the service returns for rejected submissions.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
