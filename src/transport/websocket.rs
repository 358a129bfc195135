//! WebSocket transport
//!
//! Serves `GET /socket`. Each text frame is one event envelope. The upgrade
//! is refused unless the request comes from the configured origin.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{
    Message,
    WebSocket,
    WebSocketUpgrade,
};
use axum::http::header::InvalidHeaderValue;
use axum::http::{
    HeaderMap,
    HeaderValue,
    Method,
    StatusCode,
    header,
};
use axum::response::{
    IntoResponse,
    Response,
};
use axum::routing::get;
use futures::{
    SinkExt,
    StreamExt,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::{
    AllowOrigin,
    CorsLayer,
};

use super::{
    ConnectionIds,
    Outbox,
    TransportEvent,
};
use crate::protocol::{
    ClientEvent,
    ServerEvent,
};
use crate::registry::ConnectionId;

/// Path of the socket endpoint
pub const SOCKET_PATH: &str = "/socket";

/// Shared state of the WebSocket endpoint
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    /// Queue consumed by the event loop
    events: mpsc::UnboundedSender<TransportEvent>,
    /// Connection id allocator
    ids: Arc<ConnectionIds>,
    /// The only origin allowed to connect
    allowed_origin: HeaderValue,
}

impl WebSocketTransport {
    /// Create the transport
    ///
    /// # Errors
    /// `allowed_origin` is not a valid header value
    pub fn new(
        events: mpsc::UnboundedSender<TransportEvent>,
        allowed_origin: &str,
    ) -> Result<Self, InvalidHeaderValue> {
        Ok(Self {
            events,
            ids: Arc::new(ConnectionIds::default()),
            allowed_origin: HeaderValue::from_str(allowed_origin)?,
        })
    }

    /// Build the router serving the socket endpoint
    ///
    /// CORS admits `GET` and `POST` from the allowed origin. Only `GET` is
    /// routed since there is no long-polling transport; `POST` answers 405.
    pub fn router(self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(AllowOrigin::exact(self.allowed_origin.clone()))
            .allow_methods([Method::GET, Method::POST]);

        Router::new().route(SOCKET_PATH, get(upgrade)).layer(cors).with_state(self)
    }

    /// Whether the handshake came from the allowed origin
    fn origin_allowed(&self, headers: &HeaderMap) -> bool {
        headers.get(header::ORIGIN).is_some_and(|origin| *origin == self.allowed_origin)
    }
}

/// Serve the transport on `listener` until `shutdown` resolves
///
/// # Errors
/// The underlying server failed
pub async fn serve(
    listener: TcpListener,
    transport: WebSocketTransport,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Server running on http://{addr}{SOCKET_PATH}");
    }
    axum::serve(listener, transport.router()).with_graceful_shutdown(shutdown).await
}

/// Handshake handler
async fn upgrade(
    State(transport): State<WebSocketTransport>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if !transport.origin_allowed(&headers) {
        tracing::warn!(origin = ?headers.get(header::ORIGIN), "Rejected connection from disallowed origin");
        return StatusCode::FORBIDDEN.into_response();
    }

    ws.on_upgrade(move |socket| run_connection(socket, transport))
}

/// Drive one connection until it closes
async fn run_connection(socket: WebSocket, transport: WebSocketTransport) {
    let connection = transport.ids.next_id();
    let (outbox, outgoing) = Outbox::channel();
    if transport.events.send(TransportEvent::Connected { connection, outbox }).is_err() {
        tracing::warn!(connection = %connection, "Event loop is gone, closing connection");
        return;
    }

    let (sink, mut stream) = socket.split();
    let writer = tokio::spawn(write_events(connection, sink, outgoing));

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => match ClientEvent::decode(text.as_str()) {
                Ok(Some(event)) => {
                    tracing::trace!(connection = %connection, event = event.name(), "Received event");
                    if transport.events.send(TransportEvent::Received { connection, event }).is_err()
                    {
                        break;
                    }
                }
                Ok(None) => {
                    tracing::debug!(connection = %connection, "Ignoring unknown event");
                }
                Err(error) => {
                    tracing::warn!(connection = %connection, %error, "Dropping malformed frame");
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(error) => {
                tracing::debug!(connection = %connection, %error, "Socket read failed");
                break;
            }
        }
    }

    // The event loop drops the outbox on disconnect, which ends the writer.
    let _ = transport.events.send(TransportEvent::Disconnected { connection });
    if let Err(error) = writer.await {
        tracing::debug!(connection = %connection, %error, "Writer task failed");
    }
}

/// Write queued server events to the socket in order
async fn write_events(
    connection: ConnectionId,
    mut sink: futures::stream::SplitSink<WebSocket, Message>,
    mut outgoing: mpsc::UnboundedReceiver<ServerEvent>,
) {
    while let Some(event) = outgoing.recv().await {
        let frame = match event.encode() {
            Ok(frame) => frame,
            Err(error) => {
                tracing::error!(connection = %connection, %error, "Failed to encode event");
                continue;
            }
        };
        if sink.send(Message::Text(frame.into())).await.is_err() {
            tracing::debug!(connection = %connection, "Socket closed, discarding pending events");
            break;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;

    fn transport() -> WebSocketTransport {
        let (events, _) = mpsc::unbounded_channel();
        WebSocketTransport::new(events, "http://localhost:5173").unwrap()
    }

    #[rstest]
    fn accepts_configured_origin() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static("http://localhost:5173"));

        assert_that!(transport().origin_allowed(&headers), eq(true));
    }

    #[rstest]
    #[case("http://localhost:3000")]
    #[case("https://localhost:5173")]
    #[case("http://evil.example")]
    fn rejects_other_origins(#[case] origin: &'static str) {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static(origin));

        assert_that!(transport().origin_allowed(&headers), eq(false));
    }

    #[rstest]
    fn rejects_missing_origin() {
        assert_that!(transport().origin_allowed(&HeaderMap::new()), eq(false));
    }

    #[rstest]
    fn invalid_origin_is_an_error() {
        let (events, _) = mpsc::unbounded_channel();

        assert!(WebSocketTransport::new(events, "http://bad\norigin").is_err());
    }
}
