//! WebSocket client transport using `tokio-tungstenite`.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, Connector, TransportError};

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// A [`Connector`] that dials `{base}/{hub}` over WebSocket.
///
/// The bearer token travels in the `access_token` query parameter, the
/// convention of the backend's realtime stack. JWTs are base64url so no
/// extra escaping is needed.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    base: String,
}

impl WebSocketConnector {
    /// Creates a connector for the given `ws://` or `wss://` base URL,
    /// e.g. `wss://api.example.com/hubs`. The hub name is appended as a
    /// path segment at dial time.
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self { base }
    }

    /// The base URL this connector dials under.
    pub fn base(&self) -> &str {
        &self.base
    }

    fn hub_url(&self, hub: &str, access_token: Option<&str>) -> String {
        match access_token {
            Some(token) => format!("{}/{hub}?access_token={token}", self.base),
            None => format!("{}/{hub}", self.base),
        }
    }
}

impl Connector for WebSocketConnector {
    type Conn = WebSocketConnection;

    async fn dial(
        &self,
        hub: &str,
        access_token: Option<&str>,
    ) -> Result<Self::Conn, TransportError> {
        let url = self.hub_url(hub, access_token);

        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        let id = ConnectionId::next();
        tracing::debug!(%id, hub, "WebSocket connected");

        Ok(WebSocketConnection {
            id,
            ws: Arc::new(Mutex::new(ws)),
        })
    }
}

/// A single WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    ws: Arc<Mutex<WsStream>>,
}

impl Connection for WebSocketConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        use futures_util::SinkExt;
        // Frames are JSON — send as text so they stay inspectable
        // in browser dev tools and server logs.
        let text = String::from_utf8(data.to_vec()).map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e,
            ))
        })?;
        self.ws
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    e,
                ))
            })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        use futures_util::StreamExt;
        loop {
            let msg = self.ws.lock().await.next().await;
            match msg {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.ws.lock().await.close(None).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
