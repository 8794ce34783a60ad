//! Local stub HTTP server for transport and end-to-end tests.
//!
//! Routes:
//! - `GET /bytes/:len` answers 200 with `len` bytes of body
//! - `GET /status/:code` answers with the given status and a short body
//! - `GET /delay/:ms` sleeps, then answers 200 with a short body

use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Body returned by the status and delay routes.
pub const STUB_BODY: &str = "stub";

/// A stub server bound to an ephemeral port on 127.0.0.1.
///
/// The server task is aborted when the value is dropped.
pub struct StubServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl StubServer {
    /// Bind and start serving. Panics if the port cannot be bound.
    pub async fn start() -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/bytes/:len", get(bytes))
            .route("/status/:code", get(status))
            .route("/delay/:ms", get(delay))
            .with_state(hits.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub server");
        let addr = listener
            .local_addr()
            .expect("Stub server has no local address");

        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { addr, hits, task }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Absolute URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Number of requests served so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn bytes(State(hits): State<Arc<AtomicUsize>>, Path(len): Path<usize>) -> Vec<u8> {
    hits.fetch_add(1, Ordering::SeqCst);
    vec![b'x'; len]
}

async fn status(
    State(hits): State<Arc<AtomicUsize>>,
    Path(code): Path<u16>,
) -> (StatusCode, &'static str) {
    hits.fetch_add(1, Ordering::SeqCst);
    let code = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, STUB_BODY)
}

async fn delay(State(hits): State<Arc<AtomicUsize>>, Path(ms): Path<u64>) -> &'static str {
    hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(ms)).await;
    STUB_BODY
}

/// A URL on 127.0.0.1 where nothing is listening.
///
/// The port is briefly bound and released, so connecting to it is refused.
pub fn refused_url() -> String {
    let listener = StdTcpListener::bind("127.0.0.1:0").expect("Failed to bind probe listener");
    let addr = listener
        .local_addr()
        .expect("Probe listener has no local address");
    drop(listener);
    format!("http://{}/", addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_server_routes() {
        let server = StubServer::start().await;

        let body = reqwest::get(server.url("/bytes/64")).await.unwrap();
        assert_eq!(body.status(), 200);
        assert_eq!(body.bytes().await.unwrap().len(), 64);

        let missing = reqwest::get(server.url("/status/404")).await.unwrap();
        assert_eq!(missing.status(), 404);

        assert_eq!(server.hits(), 2);
    }

    #[tokio::test]
    async fn test_refused_url_refuses() {
        let err = reqwest::get(refused_url()).await.unwrap_err();
        assert!(err.is_connect());
    }
}
