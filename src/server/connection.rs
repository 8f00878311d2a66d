// Connection module
// Serves a single TCP connection to completion: one request, then close

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::dispatch::Dispatcher;
use crate::http::{self, IncomingRequest};
use crate::logger;

/// Serve one connection inline.
///
/// Keep-alive is disabled, so the connection ends after its first response
/// and the caller can accept the next one.
///
/// # Arguments
///
/// * `stream` - The accepted TCP stream
/// * `peer_addr` - The peer's socket address; its IP is the session identity
/// * `dispatcher` - Shared dispatcher
pub async fn serve_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    dispatcher: &Arc<Dispatcher>,
) {
    let io = TokioIo::new(stream);

    let mut builder = http1::Builder::new();
    builder.keep_alive(false);

    let conn = builder.serve_connection(
        io,
        service_fn(move |req| {
            let dispatcher = Arc::clone(dispatcher);
            async move { handle_request(req, peer_addr, &dispatcher).await }
        }),
    );

    if let Err(err) = conn.await {
        logger::log_connection_error(&err);
    }
}

/// Collect the body, dispatch, and build the wire response
async fn handle_request(
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    dispatcher: &Dispatcher,
) -> Result<hyper::Response<http_body_util::Full<hyper::body::Bytes>>, Infallible> {
    let mut incoming = IncomingRequest::from_parts(&req, peer_addr.ip());

    let reply = match http::read_body(req, dispatcher.max_body_size()).await {
        Ok(body) => {
            incoming.body = body;
            dispatcher.dispatch(&incoming).await
        }
        Err(e) => dispatcher.reject(&incoming, e).await,
    };

    Ok(http::build_response(reply, dispatcher.server_name()))
}
