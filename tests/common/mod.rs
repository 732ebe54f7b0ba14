//! In-process signing service used by the integration tests.
//!
//! Serves the version upload, status and file endpoints on a loopback port
//! from a dedicated runtime thread, so both async tests and CLI tests can
//! point at it.

#![allow(dead_code)]

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, Mutex};

pub const ISSUER: &str = "user:4242:1";
pub const SECRET: &str = "integration-secret";
/// Guid the service always answers with 409.
pub const EXISTING_GUID: &str = "exists@example.com";

/// How the status endpoint resolves once processing is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Signed,
    ManualReview,
    Invalid,
    /// Never finishes processing.
    Pending,
}

#[derive(Debug, Clone)]
pub struct Behaviour {
    /// Number of `processed: false` answers before the verdict.
    pub pending_polls: usize,
    pub verdict: Verdict,
    /// Omit `Content-Length` on file downloads.
    pub chunked_files: bool,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            pending_polls: 1,
            verdict: Verdict::Signed,
            chunked_files: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub guid: String,
    pub version: String,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
    pub channel: Option<String>,
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub uploads: Vec<Upload>,
    pub status_polls: usize,
    pub downloads: Vec<String>,
    pub rejected_auth: usize,
}

#[derive(Clone)]
struct App {
    base: String,
    behaviour: Behaviour,
    recorded: Arc<Mutex<Recorded>>,
}

pub struct TestServer {
    /// API base URL, e.g. `http://127.0.0.1:PORT/api/v3`.
    pub base: String,
    pub recorded: Arc<Mutex<Recorded>>,
}

impl TestServer {
    pub fn start(behaviour: Behaviour) -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let base = format!("http://{}/api/v3", listener.local_addr().unwrap());
        let recorded = Arc::new(Mutex::new(Recorded::default()));

        let app = App {
            base: base.clone(),
            behaviour,
            recorded: Arc::clone(&recorded),
        };
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, router(app)).await.unwrap();
            });
        });

        Self { base, recorded }
    }

    pub fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap()
    }
}

fn router(app: App) -> Router {
    Router::new()
        .route("/api/v3/addons/{guid}/versions/{version}/", put(upload))
        .route(
            "/api/v3/addons/{guid}/versions/{version}/status/",
            get(status),
        )
        .route("/api/v3/files/{name}", get(file))
        .with_state(app)
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[allow(dead_code)]
    iss: String,
}

fn authorized(headers: &HeaderMap) -> bool {
    let Some(token) = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("JWT "))
    else {
        return false;
    };
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(SECRET.as_bytes()),
        &validation,
    )
    .is_ok()
}

fn unauthorized(app: &App) -> Response {
    app.recorded.lock().unwrap().rejected_auth += 1;
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Incorrect authentication credentials."})),
    )
        .into_response()
}

async fn upload(
    State(app): State<App>,
    Path((guid, version)): Path<(String, String)>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if !authorized(&headers) {
        return unauthorized(&app);
    }

    let mut upload = Upload {
        guid: guid.clone(),
        version: version.clone(),
        file_name: None,
        bytes: Vec::new(),
        channel: None,
    };
    while let Some(field) = multipart.next_field().await.unwrap() {
        match field.name().map(str::to_string).as_deref() {
            Some("upload") => {
                upload.file_name = field.file_name().map(str::to_string);
                upload.bytes = field.bytes().await.unwrap().to_vec();
            }
            Some("channel") => upload.channel = Some(field.text().await.unwrap()),
            _ => {}
        }
    }
    app.recorded.lock().unwrap().uploads.push(upload);

    if guid == EXISTING_GUID {
        return (
            StatusCode::CONFLICT,
            Json(json!({"error": "Version already exists."})),
        )
            .into_response();
    }

    (
        StatusCode::ACCEPTED,
        Json(json!({
            "guid": guid,
            "url": format!("{}/addons/{}/versions/{}/status/", app.base, guid, version),
        })),
    )
        .into_response()
}

async fn status(
    State(app): State<App>,
    Path((guid, version)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized(&app);
    }

    let polls = {
        let mut recorded = app.recorded.lock().unwrap();
        recorded.status_polls += 1;
        recorded.status_polls
    };
    let done = polls > app.behaviour.pending_polls;

    let body = match (done, app.behaviour.verdict) {
        (false, _) | (_, Verdict::Pending) => json!({
            "guid": guid,
            "version": version,
            "processed": false,
        }),
        (true, Verdict::Signed) => json!({
            "guid": guid,
            "version": version,
            "processed": true,
            "valid": true,
            "active": true,
            "reviewed": true,
            "automated_signing": true,
            "files": [
                {"download_url": format!("{}/files/signed-{}.xpi?src=api", app.base, version), "signed": true},
                {"download_url": format!("{}/files/source-{}.zip", app.base, version), "signed": false},
            ],
        }),
        (true, Verdict::ManualReview) => json!({
            "guid": guid,
            "version": version,
            "processed": true,
            "valid": true,
            "active": false,
            "reviewed": false,
            "automated_signing": false,
            "files": [],
        }),
        (true, Verdict::Invalid) => json!({
            "guid": guid,
            "version": version,
            "processed": true,
            "valid": false,
            "validation_url": format!("{}/validation/1/", app.base),
        }),
    };
    (StatusCode::OK, Json(body)).into_response()
}

async fn file(State(app): State<App>, Path(name): Path<String>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized(&app);
    }

    let uploaded = {
        let mut recorded = app.recorded.lock().unwrap();
        recorded.downloads.push(name.clone());
        recorded
            .uploads
            .last()
            .map(|u| u.bytes.clone())
            .unwrap_or_default()
    };
    let mut content = b"SIGNED:".to_vec();
    content.extend_from_slice(&uploaded);

    if app.behaviour.chunked_files {
        let chunks = content
            .chunks(3)
            .map(|c| Ok::<_, std::io::Error>(bytes::Bytes::copy_from_slice(c)))
            .collect::<Vec<_>>();
        let body = axum::body::Body::from_stream(futures::stream::iter(chunks));
        return (StatusCode::OK, body).into_response();
    }
    (StatusCode::OK, content).into_response()
}
