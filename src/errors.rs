//! Typed error hierarchy for addon-sign.
//!
//! Two enums cover the library:
//! - `TransportError`: failures at the HTTP seam (connection, TLS, body reads)
//! - `SignError`: everything a signing operation can fail with
//!
//! Business outcomes such as a failed validation or a pending manual review are
//! not errors; they come back as an unsuccessful `SignResult`.

use std::time::Duration;

use thiserror::Error;

/// Longest response body kept in an `UnexpectedServerResponse`.
pub const MAX_BODY_EXCERPT: usize = 500;

/// Errors raised by a [`crate::api::Transport`] implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to read upload at {path}: {source}")]
    UploadRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

/// Errors from a signing operation.
#[derive(Debug, Error)]
pub enum SignError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Received bad response from the server; status: {status}; response: {body}; headers: {}", format_headers(.headers))]
    UnexpectedServerResponse {
        status: u16,
        body: String,
        headers: Vec<(String, String)>,
    },

    #[error("Signing is still pending after {} ms; last status: {last_status}", .waited.as_millis())]
    PollTimeout {
        waited: Duration,
        last_status: String,
    },

    #[error("The server returned no signed files")]
    NoSignedFiles,

    #[error("Download of signed files failed: {0}")]
    DownloadFailed(#[source] TransportError),

    #[error("Failed to write signed file {path}: {source}")]
    WriteFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to create authorization token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SignError {
    /// Build an `UnexpectedServerResponse`, truncating the body for display.
    pub fn unexpected_response(status: u16, body: &str, headers: Vec<(String, String)>) -> Self {
        SignError::UnexpectedServerResponse {
            status,
            body: truncate(body, MAX_BODY_EXCERPT),
            headers,
        }
    }
}

fn format_headers(headers: &[(String, String)]) -> String {
    let pairs: Vec<String> = headers.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
    format!("{{{}}}", pairs.join(", "))
}

/// Cut `text` to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max).collect();
    cut.push('…');
    cut
}

pub type Result<T, E = SignError> = std::result::Result<T, E>;
