//! Prometheus Metrics HTTP Server
//!
//! Serves `/metrics` for Prometheus and `/health` with the control loop state.
//!
//! # Example
//!
//! ```no_run
//! use spool_uploadr::metrics::server::MetricsServer;
//! use spool_uploadr::uploader::LoopState;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (_tx, state) = watch::channel(LoopState::AwaitingQuota);
//!     let mut server = MetricsServer::new("127.0.0.1:9090", state);
//!     let addr = server.start().await?;
//!     println!("Metrics server listening on {}", addr);
//!     Ok(())
//! }
//! ```

use crate::uploader::LoopState;
use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, TextEncoder};
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};

/// Metrics server error
#[derive(Debug, thiserror::Error)]
pub enum MetricsServerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Server already started")]
    AlreadyStarted,
}

/// Prometheus metrics HTTP server
pub struct MetricsServer {
    address: String,
    state: watch::Receiver<LoopState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl MetricsServer {
    /// Create a new metrics server reporting the given loop state
    pub fn new(address: impl Into<String>, state: watch::Receiver<LoopState>) -> Self {
        Self {
            address: address.into(),
            state,
            shutdown_tx: None,
            server_handle: None,
        }
    }

    /// Start the metrics server
    ///
    /// Returns the actual bound address (useful when using port 0)
    pub async fn start(&mut self) -> Result<SocketAddr, MetricsServerError> {
        if self.server_handle.is_some() {
            return Err(MetricsServerError::AlreadyStarted);
        }

        let listener = TcpListener::bind(&self.address).await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        let state = self.state.clone();
        let handle = tokio::spawn(async move {
            run_server(listener, state, shutdown_rx).await;
        });
        self.server_handle = Some(handle);

        tracing::info!(%addr, "Metrics server listening");
        Ok(addr)
    }

    /// Shutdown the metrics server
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.server_handle.take() {
            let _ = handle.await;
        }
    }
}

/// Run the HTTP server loop
async fn run_server(
    listener: TcpListener,
    state: watch::Receiver<LoopState>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                break;
            }
            result = listener.accept() => {
                match result {
                    Ok((stream, _)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();
                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let current = *state.borrow();
                                async move { handle_request(req, current) }
                            });
                            let _ = http1::Builder::new()
                                .serve_connection(io, service)
                                .await;
                        });
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "Metrics accept failed");
                        continue;
                    }
                }
            }
        }
    }
}

/// Handle HTTP requests
fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: LoopState,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => metrics_handler(),
        (&Method::GET, "/health") => health_handler(state),
        _ => plain_response(StatusCode::NOT_FOUND, "text/plain", Bytes::from("Not Found")),
    };
    Ok(response)
}

/// Handle /metrics endpoint
fn metrics_handler() -> Response<Full<Bytes>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return plain_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "text/plain",
            Bytes::from("Failed to encode metrics"),
        );
    }

    plain_response(StatusCode::OK, encoder.format_type(), Bytes::from(buffer))
}

/// Handle /health endpoint
fn health_handler(state: LoopState) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "status": "ok", "state": state.as_str() }).to_string();
    plain_response(StatusCode::OK, "application/json", Bytes::from(body))
}

fn plain_response(status: StatusCode, content_type: &str, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    if let Ok(value) = hyper::header::HeaderValue::from_str(content_type) {
        response
            .headers_mut()
            .insert(hyper::header::CONTENT_TYPE, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_twice_fails() {
        let (_tx, rx) = watch::channel(LoopState::AwaitingQuota);
        let mut server = MetricsServer::new("127.0.0.1:0", rx);
        server.start().await.unwrap();
        assert!(matches!(
            server.start().await,
            Err(MetricsServerError::AlreadyStarted)
        ));
        server.shutdown().await;
    }

    #[test]
    fn test_health_body() {
        let response = health_handler(LoopState::Uploading);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(hyper::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
