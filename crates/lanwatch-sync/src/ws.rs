//! WebSocket transport: one hub subscriber per connected client.
//!
//! Outbound hub messages are written as JSON text frames. Inbound text
//! frames that parse as JSON are relayed to the other clients; anything
//! else is ignored.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;

use crate::error::SyncError;
use crate::hub::BroadcastHub;
use crate::sink::Outbound;

/// Pause after a failed accept, so descriptor exhaustion is not a busy loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Source of incoming client streams.
pub(crate) trait Accept {
    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send;
}

impl Accept for TcpListener {
    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }
}

/// Accept clients on `listener` forever, attaching each to `hub`.
///
/// Upgrade requests for any path other than `path` are refused with 404.
/// Accept errors are logged and retried; only an unusable listener ends the
/// loop.
pub async fn serve(listener: TcpListener, hub: BroadcastHub, path: String) -> Result<(), SyncError> {
    tracing::info!(addr = ?listener.local_addr().ok(), path = %path, "WebSocket listener started");
    accept_loop(&listener, hub, path).await
}

pub(crate) async fn accept_loop<A: Accept>(listener: &A, hub: BroadcastHub, path: String) -> Result<(), SyncError> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) if is_fatal(&e) => return Err(e.into()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to accept WebSocket client");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        let hub = hub.clone();
        let path = path.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, hub, &path).await {
                tracing::warn!(%peer, error = %e, "WebSocket session failed");
            }
        });
    }
}

/// Errors that mean the listener itself is broken rather than one client.
fn is_fatal(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::InvalidInput
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub: BroadcastHub,
    path: &str,
) -> Result<(), SyncError> {
    let check_path = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        if request.uri().path() == path {
            Ok(response)
        } else {
            let mut refusal = ErrorResponse::new(Some(format!("no endpoint at {}", request.uri().path())));
            *refusal.status_mut() = StatusCode::NOT_FOUND;
            Err(refusal)
        }
    };

    let socket = accept_hdr_async(stream, check_path)
        .await
        .map_err(|e| SyncError::Handshake(e.to_string()))?;
    let (mut write, mut read) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
    let handle = hub.subscribe(Box::new(tx));
    tracing::info!(%peer, subscriber = %handle.id(), total = hub.subscriber_count(), "Client connected");

    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to encode outbound message");
                    continue;
                }
            };
            if write.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = write.close().await;
    });

    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<Value>(&text) {
                Ok(payload) => {
                    hub.relay(&handle, payload);
                }
                Err(e) => tracing::debug!(%peer, error = %e, "Ignoring non-JSON frame"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(%peer, error = %e, "WebSocket read failed");
                break;
            }
        }
    }

    // Dropping the hub's sender ends the writer once it has flushed.
    hub.unsubscribe(&handle);
    tracing::info!(%peer, subscriber = %handle.id(), total = hub.subscriber_count(), "Client disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time::timeout;
    use tokio_tungstenite::connect_async;

    /// Fails its first few accepts with `kind`, then behaves.
    struct FlakyListener {
        inner: TcpListener,
        failures_left: AtomicUsize,
        kind: io::ErrorKind,
    }

    impl Accept for FlakyListener {
        async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(io::Error::new(self.kind, "injected accept failure"));
            }
            self.inner.accept().await
        }
    }

    async fn flaky(failures: usize, kind: io::ErrorKind) -> (FlakyListener, SocketAddr) {
        let inner = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = inner.local_addr().unwrap();
        let listener = FlakyListener {
            inner,
            failures_left: AtomicUsize::new(failures),
            kind,
        };
        (listener, addr)
    }

    #[tokio::test]
    async fn test_transient_accept_errors_keep_listening() {
        let (listener, addr) = flaky(3, io::ErrorKind::ConnectionAborted).await;
        let hub = BroadcastHub::default();
        {
            let hub = hub.clone();
            tokio::spawn(async move { accept_loop(&listener, hub, "/ws".to_string()).await });
        }

        let (_client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        timeout(Duration::from_secs(2), async {
            while hub.subscriber_count() < 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_broken_listener_ends_the_loop() {
        let (listener, _) = flaky(1, io::ErrorKind::InvalidInput).await;
        let result = timeout(
            Duration::from_secs(2),
            accept_loop(&listener, BroadcastHub::default(), "/ws".to_string()),
        )
        .await
        .unwrap();
        assert!(matches!(result, Err(SyncError::Io(_))));
    }

    #[test]
    fn test_only_invalid_listener_is_fatal() {
        assert!(is_fatal(&io::Error::from(io::ErrorKind::InvalidInput)));
        assert!(!is_fatal(&io::Error::from(io::ErrorKind::ConnectionAborted)));
        assert!(!is_fatal(&io::Error::from(io::ErrorKind::Other)));
    }
}
