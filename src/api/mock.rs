//! Scripted transport double used by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::api::request::{Method, SignedRequest};
use crate::api::transport::{ApiResponse, Download, Transport};
use crate::errors::TransportError;

enum ScriptedDownload {
    Body {
        chunks: Vec<Vec<u8>>,
        content_length: Option<u64>,
    },
    Fail(String),
}

/// Replays canned responses keyed by `(method, url)` and records every request.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<(String, String), VecDeque<ApiResponse>>>,
    downloads: Mutex<HashMap<String, ScriptedDownload>>,
    requests: Mutex<Vec<SignedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response; repeated calls for the same key are served in order.
    pub fn respond(&self, method: Method, url: &str, status: u16, body: serde_json::Value) {
        self.responses
            .lock()
            .unwrap()
            .entry((method.to_string(), url.to_string()))
            .or_default()
            .push_back(ApiResponse {
                status,
                headers: vec![("content-type".to_string(), "application/json".to_string())],
                body: body.to_string(),
            });
    }

    pub fn respond_raw(&self, method: Method, url: &str, status: u16, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .entry((method.to_string(), url.to_string()))
            .or_default()
            .push_back(ApiResponse {
                status,
                headers: vec![("content-type".to_string(), "text/html".to_string())],
                body: body.to_string(),
            });
    }

    /// Serve `content` for a download, split into two chunks.
    pub fn serve_file(&self, url: &str, content: &[u8], with_length: bool) {
        let mid = content.len() / 2;
        self.downloads.lock().unwrap().insert(
            url.to_string(),
            ScriptedDownload::Body {
                chunks: vec![content[..mid].to_vec(), content[mid..].to_vec()],
                content_length: with_length.then_some(content.len() as u64),
            },
        );
    }

    pub fn fail_download(&self, url: &str, message: &str) {
        self.downloads
            .lock()
            .unwrap()
            .insert(url.to_string(), ScriptedDownload::Fail(message.to_string()));
    }

    pub fn requests(&self) -> Vec<SignedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: SignedRequest) -> Result<ApiResponse, TransportError> {
        let key = (request.method.to_string(), request.url.clone());
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(|queue| queue.pop_front())
            .ok_or_else(|| TransportError::Other(format!("no response scripted for {} {}", key.0, key.1)))
    }

    async fn download(&self, request: SignedRequest) -> Result<Download, TransportError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);
        let downloads = self.downloads.lock().unwrap();
        match downloads.get(&url) {
            Some(ScriptedDownload::Body {
                chunks,
                content_length,
            }) => {
                let items: Vec<Result<Bytes, TransportError>> =
                    chunks.iter().map(|c| Ok(Bytes::from(c.clone()))).collect();
                Ok(Download {
                    content_length: *content_length,
                    body: Box::pin(futures::stream::iter(items)),
                })
            }
            Some(ScriptedDownload::Fail(message)) => Err(TransportError::Other(message.clone())),
            None => Err(TransportError::Other(format!("no download scripted for {}", url))),
        }
    }
}
