//! Signed request construction.
//!
//! Every outbound request carries a freshly minted HS256 token in its
//! `Authorization` header. Tokens expire after [`TOKEN_TTL_SECS`] and are never
//! cached: building a request always mints a new one.

use std::fmt;
use std::path::PathBuf;

use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;

use crate::errors::{Result, SignError};

/// Lifetime of an authorization token, in seconds.
pub const TOKEN_TTL_SECS: i64 = 60;

/// API issuer and shared secret used to mint tokens.
#[derive(Clone)]
pub struct Credentials {
    issuer: String,
    secret: String,
}

impl Credentials {
    pub fn new(issuer: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            secret: secret.into(),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("issuer", &self.issuer)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    jti: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Put => write!(f, "PUT"),
        }
    }
}

/// Payload of an outbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Multipart form: one file part plus plain text fields.
    Multipart {
        file_field: String,
        file_path: PathBuf,
        fields: Vec<(String, String)>,
    },
}

/// A fully-qualified, authenticated request ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl SignedRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }
}

/// Builds authenticated requests against a base API URL.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: String,
    credentials: Credentials,
}

impl RequestBuilder {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            credentials,
        }
    }

    /// Resolve `url` against the base URL and attach auth headers.
    ///
    /// `headers` override the defaults key by key; anything that does not
    /// collide with a default is kept as given.
    pub fn configure_request(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<SignedRequest> {
        if url.is_empty() {
            return Err(SignError::InvalidRequest(
                "request URL must not be empty".to_string(),
            ));
        }

        let url = self.resolve(url);
        let token = self.token()?;

        let mut merged: Vec<(String, String)> = vec![
            ("Authorization".to_string(), format!("JWT {}", token)),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        for (key, value) in headers {
            match merged.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
                Some(existing) => *existing = (key.clone(), value.clone()),
                None => merged.push((key.clone(), value.clone())),
            }
        }

        Ok(SignedRequest {
            method: Method::Get,
            url,
            headers: merged,
            body: RequestBody::Empty,
        })
    }

    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }

    /// Mint a new token for the configured issuer.
    pub fn token(&self) -> Result<String> {
        let iat = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.credentials.issuer,
            jti: uuid::Uuid::new_v4().to_string(),
            iat,
            exp: iat + TOKEN_TTL_SECS,
        };
        let key = EncodingKey::from_secret(self.credentials.secret.as_bytes());
        Ok(encode(&Header::default(), &claims, &key)?)
    }
}
