//! Request extraction module
//!
//! Turns a hyper request into the owned `IncomingRequest` the dispatcher
//! works on. Bodies are collected up to the configured limit.

use std::net::IpAddr;

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Method, Request};

use crate::error::DispatchError;
use crate::logger;

/// One request, detached from its connection
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: Method,
    /// Raw path, leading slash included
    pub path: String,
    /// Query string without the leading `?`
    pub query: Option<String>,
    pub body: Bytes,
    /// Client address; also the session identity
    pub peer: IpAddr,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

impl IncomingRequest {
    /// Build from a request target such as `/margs?b=2`
    pub fn new(method: Method, target: &str, peer: IpAddr) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };
        Self {
            method,
            path: path.to_string(),
            query,
            body: Bytes::new(),
            peer,
            user_agent: None,
            referer: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Copy everything but the body out of a hyper request
    pub fn from_parts<B>(req: &Request<B>, peer: IpAddr) -> Self {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };
        Self {
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            query: req.uri().query().map(ToString::to_string),
            body: Bytes::new(),
            peer,
            user_agent: header("user-agent"),
            referer: header("referer"),
        }
    }
}

/// Collect a request body, failing with `PayloadTooLarge` past `max_body_size`
pub async fn read_body<B>(req: Request<B>, max_body_size: u64) -> Result<Bytes, DispatchError>
where
    B: Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    if declared_length(&req).is_some_and(|size| size > max_body_size) {
        return Err(DispatchError::PayloadTooLarge {
            limit: max_body_size,
        });
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(DispatchError::PayloadTooLarge {
            limit: max_body_size,
        }),
        Err(e) => Err(DispatchError::Io(std::io::Error::other(e))),
    }
}

/// Content-Length header, if present and numeric
fn declared_length<B>(req: &Request<B>) -> Option<u64> {
    let value = req.headers().get("content-length")?;
    match value.to_str().ok().and_then(|s| s.parse::<u64>().ok()) {
        Some(size) => Some(size),
        None => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: {value:?}, skipping size check"
            ));
            None
        }
    }
}
