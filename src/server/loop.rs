// Server loop module
// Accepts connections one at a time until the shutdown future resolves

use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::serve_connection;
use crate::dispatch::Dispatcher;
use crate::logger;

/// Run the accept loop.
///
/// Each accepted connection is served to completion before the next accept,
/// so a shutdown requested mid-request takes effect after that request.
#[allow(clippy::ignored_unit_patterns)]
pub async fn start_server_loop(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        logger::log_connection_accepted(&peer_addr);
                        serve_connection(stream, peer_addr, &dispatcher).await;
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            _ = &mut shutdown => {
                logger::log_shutdown();
                break;
            }
        }
    }
}
