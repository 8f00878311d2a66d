//! HTTP response building module
//!
//! `Reply` is what the dispatcher produces; `build_response` turns it into a
//! hyper response with the server headers attached.

use std::borrow::Cow;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

use super::mime;

/// Status, body and the headers the dispatcher cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Bytes,
    /// Absolute redirect target
    pub location: Option<String>,
}

impl Reply {
    pub fn new(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
            location: None,
        }
    }

    /// 200 with the given body
    pub fn ok(content_type: &'static str, body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, content_type, body)
    }

    /// 200 with no body
    pub fn empty() -> Self {
        Self::ok(mime::TEXT, Bytes::new())
    }

    /// 302 to `location`
    pub fn redirect(location: String) -> Self {
        Self {
            location: Some(location),
            ..Self::new(StatusCode::FOUND, mime::TEXT, Bytes::from_static(b"Redirecting..."))
        }
    }

    /// Body decoded lossily as UTF-8
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Build the wire response; every response closes its connection
pub fn build_response(reply: Reply, server_name: &str) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(reply.status)
        .header("Content-Type", reply.content_type)
        .header("Content-Length", reply.body.len())
        .header("Server", server_name)
        .header("Connection", "close");

    if let Some(ref location) = reply.location {
        builder = builder.header("Location", location);
    }

    let status = reply.status;
    builder.body(Full::new(reply.body)).unwrap_or_else(|e| {
        log_build_error(status, &e);
        let mut fallback = Response::new(Full::new(Bytes::new()));
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
