//! HTTP transport abstraction.
//!
//! The signing flow talks to the network only through [`Transport`]. The real
//! implementation is [`ReqwestTransport`]; tests swap in a scripted double.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use futures_util::StreamExt;

use crate::api::request::{Method, RequestBody, SignedRequest};
use crate::errors::TransportError;

/// A boxed stream of response body chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// A buffered API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

/// A streaming download: the advertised length plus the body chunks.
pub struct Download {
    /// `None` when the server sent no `content-length`.
    pub content_length: Option<u64>,
    pub body: BodyStream,
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Download")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Abstraction over the HTTP client for testability.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and buffer the whole response, whatever its status.
    async fn send(&self, request: SignedRequest) -> Result<ApiResponse, TransportError>;

    /// Open a streaming GET. Non-success statuses are transport errors.
    async fn download(&self, request: SignedRequest) -> Result<Download, TransportError>;
}

/// Production transport backed by `reqwest`. Follows redirects.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        Self::with_proxy(None)
    }

    /// Build a client that routes all traffic through `proxy` when given.
    pub fn with_proxy(proxy: Option<&str>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("addon-sign/", env!("CARGO_PKG_VERSION")));
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn build(&self, request: SignedRequest) -> Result<reqwest::RequestBuilder, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Put => self.client.put(&request.url),
        };
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        if let RequestBody::Multipart {
            file_field,
            file_path,
            fields,
        } = request.body
        {
            let content = tokio::fs::read(&file_path)
                .await
                .map_err(|source| TransportError::UploadRead {
                    path: file_path.clone(),
                    source,
                })?;
            let file_name = file_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "upload".to_string());
            let mut form = reqwest::multipart::Form::new().part(
                file_field,
                reqwest::multipart::Part::bytes(content).file_name(file_name),
            );
            for (name, value) in fields {
                form = form.text(name, value);
            }
            builder = builder.multipart(form);
        }

        Ok(builder)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: SignedRequest) -> Result<ApiResponse, TransportError> {
        let response = self.build(request).await?.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).to_string()))
            .collect();
        let body = response.text().await?;
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    async fn download(&self, request: SignedRequest) -> Result<Download, TransportError> {
        let response = self.build(request).await?.send().await?.error_for_status()?;
        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from));
        Ok(Download {
            content_length,
            body: Box::pin(body),
        })
    }
}
