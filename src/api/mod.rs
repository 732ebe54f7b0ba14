//! Client side of the signing API: request signing, wire models and the
//! HTTP transport seam.

pub mod models;
pub mod request;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use models::{SignedFile, StatusSnapshot, Verdict};
pub use request::{Credentials, Method, RequestBody, RequestBuilder, SignedRequest};
pub use transport::{ApiResponse, BodyStream, Download, ReqwestTransport, Transport};
