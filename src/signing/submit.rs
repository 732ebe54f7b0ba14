//! Submission of an artifact to the signing service.

use std::path::PathBuf;

use crate::api::models::{ErrorBody, SubmitAccepted};
use crate::api::{Method, RequestBody, RequestBuilder, Transport};
use crate::errors::{Result, SignError};

/// What to sign. Built by the caller for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    pub artifact: PathBuf,
    /// Add-on identifier (guid).
    pub id: String,
    pub version: String,
    /// Release channel, e.g. `listed` or `unlisted`. Omitted when `None`.
    pub channel: Option<String>,
}

impl SigningRequest {
    pub fn new(artifact: impl Into<PathBuf>, id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            artifact: artifact.into(),
            id: id.into(),
            version: version.into(),
            channel: None,
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// API path of the version resource, relative to the base URL.
    pub fn version_path(&self) -> String {
        format!("/addons/{}/versions/{}/", self.id, self.version)
    }
}

/// Immediate classification of a submission response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The service created a signing job; poll `status_url` for progress.
    Accepted { status_url: String },
    /// The service refused the upload with a structured reason, e.g. the
    /// version already exists. Not an error.
    Rejected { reason: String },
}

/// Upload `request.artifact` and classify the response.
pub async fn submit(
    transport: &dyn Transport,
    builder: &RequestBuilder,
    request: &SigningRequest,
) -> Result<SubmitOutcome> {
    let mut fields = Vec::new();
    if let Some(channel) = &request.channel {
        fields.push(("channel".to_string(), channel.clone()));
    }

    let signed = builder
        .configure_request(&request.version_path(), &[])?
        .with_method(Method::Put)
        .with_body(RequestBody::Multipart {
            file_field: "upload".to_string(),
            file_path: request.artifact.clone(),
            fields,
        });
    let url = signed.url.clone();

    tracing::info!(id = %request.id, version = %request.version, url = %url, "submitting artifact for signing");
    let response = transport.send(signed).await?;
    tracing::debug!(status = response.status, "submission response received");

    match response.status {
        200 | 201 | 202 => {
            let accepted: SubmitAccepted = response
                .json()
                .map_err(|source| SignError::Decode { url, source })?;
            Ok(SubmitOutcome::Accepted {
                status_url: accepted.url,
            })
        }
        status => match response.json::<ErrorBody>() {
            Ok(body) => {
                tracing::warn!(status, reason = %body.error, "server rejected the submission");
                Ok(SubmitOutcome::Rejected { reason: body.error })
            }
            Err(_) => Err(SignError::unexpected_response(
                status,
                &response.body,
                response.headers,
            )),
        },
    }
}
