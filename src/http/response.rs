//! Response construction.
//!
//! # Responsibilities
//! - Serve an in-memory named document with standard content headers
//!   (type from extension, Last-Modified, byte ranges, HEAD)
//! - Plain-text error responses
//!
//! # Design Decisions
//! - Only single byte ranges are honored; multi-range or malformed `Range`
//!   headers fall back to the full document
//! - Conditional requests use `If-Modified-Since` at one-second resolution

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, NaiveDateTime, Utc};

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Plain-text error response.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let mut body = message.into();
    body.push('\n');
    (status, body).into_response()
}

/// Guess a content type from a file name's extension.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("txt") => "text/plain; charset=utf-8",
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("json") => "application/json",
        Some("css") => "text/css; charset=utf-8",
        _ => "application/octet-stream",
    }
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format(HTTP_DATE).to_string()
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), HTTP_DATE)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Outcome of evaluating a `Range` header against a document length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeRequest {
    Full,
    Partial { start: usize, end: usize },
    Unsatisfiable,
}

fn parse_range(value: &str, len: usize) -> RangeRequest {
    let Some(range_set) = value.trim().strip_prefix("bytes=") else {
        return RangeRequest::Full;
    };
    if range_set.contains(',') {
        return RangeRequest::Full;
    }
    let Some((first, last)) = range_set.trim().split_once('-') else {
        return RangeRequest::Full;
    };

    match (first.trim(), last.trim()) {
        ("", "") => RangeRequest::Full,
        ("", suffix) => match suffix.parse::<usize>() {
            Ok(0) => RangeRequest::Unsatisfiable,
            Ok(_) if len == 0 => RangeRequest::Unsatisfiable,
            Ok(n) => RangeRequest::Partial {
                start: len.saturating_sub(n),
                end: len - 1,
            },
            Err(_) => RangeRequest::Full,
        },
        (start, end) => {
            let Ok(start) = start.parse::<usize>() else {
                return RangeRequest::Full;
            };
            if start >= len {
                return RangeRequest::Unsatisfiable;
            }
            let end = if end.is_empty() {
                len - 1
            } else {
                match end.parse::<usize>() {
                    Ok(end) if end >= start => end.min(len - 1),
                    _ => return RangeRequest::Full,
                }
            };
            RangeRequest::Partial { start, end }
        }
    }
}

/// Serve `content` as the document `name`, last modified at `modified`.
pub fn serve_content(
    method: &Method,
    headers: &HeaderMap,
    name: &str,
    modified: DateTime<Utc>,
    content: &'static [u8],
) -> Response {
    let last_modified = http_date(modified);

    if method == Method::GET || method == Method::HEAD {
        let not_modified = headers
            .get(header::IF_MODIFIED_SINCE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date)
            .is_some_and(|since| modified.timestamp() <= since.timestamp());
        if not_modified {
            return Response::builder()
                .status(StatusCode::NOT_MODIFIED)
                .header(header::LAST_MODIFIED, last_modified)
                .body(Body::empty())
                .unwrap_or_default();
        }
    }

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(|v| parse_range(v, content.len()))
        .unwrap_or(RangeRequest::Full);

    let (status, slice, content_range) = match range {
        RangeRequest::Full => (StatusCode::OK, content, None),
        RangeRequest::Partial { start, end } => (
            StatusCode::PARTIAL_CONTENT,
            &content[start..=end],
            Some(format!("bytes {start}-{end}/{}", content.len())),
        ),
        RangeRequest::Unsatisfiable => {
            let mut response =
                error_response(StatusCode::RANGE_NOT_SATISFIABLE, "invalid range: failed to overlap");
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", content.len())) {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
            return response;
        }
    };

    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        Body::from(slice)
    };

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type_for(name))
        .header(header::LAST_MODIFIED, last_modified)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, slice.len());
    if let Some(content_range) = content_range {
        builder = builder.header(header::CONTENT_RANGE, content_range);
    }

    builder.body(body).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Building content response");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "can't build response")
    })
}
