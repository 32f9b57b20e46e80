//! Request identification and diagnostics.
//!
//! # Responsibilities
//! - Request ID type (monotonic, independent of connection IDs)
//! - Read the full request, body included, within a size limit
//! - Render a wire-style dump of the request for diagnostic output
//!
//! # Design Decisions
//! - The body is buffered before dispatch so an unreadable request is
//!   rejected before any fault action runs
//! - The dump mirrors the request line and headers as received; a `Host`
//!   line is synthesized from the URI authority when the header is absent

use std::fmt::Write as _;

use axum::body::{Body, Bytes};
use axum::http::{header, request::Parts, Request};
use http_body_util::{BodyExt, Limited};

/// Unique identifier for an inbound HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for RequestId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure to read a request body.
#[derive(Debug, thiserror::Error)]
#[error("reading body: {0}")]
pub struct ReadRequestError(#[source] Box<dyn std::error::Error + Send + Sync>);

/// A request whose body has been read in full.
#[derive(Debug)]
pub struct BufferedRequest {
    pub parts: Parts,
    pub body: Bytes,
}

impl BufferedRequest {
    /// Read the whole body, failing if it exceeds `limit` bytes or the
    /// transport reports an error.
    pub async fn read(request: Request<Body>, limit: usize) -> Result<Self, ReadRequestError> {
        let (parts, body) = request.into_parts();
        let body = Limited::new(body, limit)
            .collect()
            .await
            .map_err(ReadRequestError)?
            .to_bytes();
        Ok(Self { parts, body })
    }

    /// Host the client addressed, from the `Host` header or the URI authority.
    pub fn host(&self) -> &str {
        self.parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.parts.uri.authority().map(|a| a.as_str()))
            .unwrap_or("")
    }

    /// Value of a query parameter; the first occurrence wins.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.parts.uri.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Wire-style dump: request line, headers, blank line, body.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let target = self
            .parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let _ = write!(
            out,
            "{} {} {:?}\r\n",
            self.parts.method, target, self.parts.version
        );

        if !self.parts.headers.contains_key(header::HOST) {
            if let Some(authority) = self.parts.uri.authority() {
                let _ = write!(out, "Host: {authority}\r\n");
            }
        }
        for (name, value) in &self.parts.headers {
            let _ = write!(out, "{}: {}\r\n", name, String::from_utf8_lossy(value.as_bytes()));
        }
        out.push_str("\r\n");
        out.push_str(&String::from_utf8_lossy(&self.body));
        out
    }
}
