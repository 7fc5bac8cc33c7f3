//! The handler-facing WebSocket.
//!
//! [`WebSocket`] owns the receiving half of an upgraded socket plus a shared
//! reference to its [`WebSocketSession`]. Dropping it closes the session, so
//! a handler that returns (or panics) always releases its registry entry.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, instrument};

use crate::error::{CloseCode, WsError, WsResult};
use crate::message::Message;
use crate::session::{SessionId, SessionInfo, WebSocketSession};

type BoxStream =
    Pin<Box<dyn Stream<Item = Result<tungstenite::Message, tungstenite::Error>> + Send>>;

/// An upgraded connection handed to a WebSocket handler.
///
/// # Example
///
/// ```ignore
/// use critter_ws::{Message, WebSocket};
///
/// async fn echo(mut ws: WebSocket) {
///     while let Some(Ok(msg)) = ws.recv().await {
///         if msg.is_text() || msg.is_binary() {
///             if ws.send(msg).await.is_err() {
///                 break;
///             }
///         }
///     }
/// }
/// ```
pub struct WebSocket {
    session: Arc<WebSocketSession>,
    receiver: BoxStream,
}

impl WebSocket {
    /// Wraps an established WebSocket stream.
    pub fn new<S>(stream: WebSocketStream<S>, info: SessionInfo) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, receiver) = stream.split();
        Self {
            session: Arc::new(WebSocketSession::new(Box::pin(sink), info)),
            receiver: Box::pin(receiver),
        }
    }

    /// The shared session handle.
    pub fn session(&self) -> &Arc<WebSocketSession> {
        &self.session
    }

    /// The session ID.
    pub fn id(&self) -> SessionId {
        self.session.id()
    }

    /// Receives the next message.
    ///
    /// Pings are answered by the protocol layer while reading. A close frame
    /// from the peer is returned once and acknowledged; after that, and after
    /// any read error, this returns `None`.
    #[instrument(skip(self), fields(session_id = %self.session.id()))]
    pub async fn recv(&mut self) -> Option<WsResult<Message>> {
        if self.session.is_closed() {
            return None;
        }

        match self.receiver.next().await {
            Some(Ok(msg)) => {
                let msg = Message::from(msg);
                if msg.is_close() {
                    debug!("received close frame");
                    self.session.flush().await;
                    self.session.mark_closed();
                }
                Some(Ok(msg))
            }
            Some(Err(e)) => {
                self.session.mark_closed();
                Some(Err(WsError::receive_failed(e.to_string())))
            }
            None => {
                self.session.mark_closed();
                None
            }
        }
    }

    /// Sends a message.
    ///
    /// Other tasks send through [`session`](Self::session).
    pub async fn send(&mut self, msg: Message) -> WsResult<()> {
        self.session.send(msg).await
    }

    /// Sends a text message.
    pub async fn send_text(&mut self, text: impl Into<String>) -> WsResult<()> {
        self.session.send_text(text).await
    }

    /// Sends a binary message.
    pub async fn send_binary(&mut self, data: impl Into<bytes::Bytes>) -> WsResult<()> {
        self.session.send_binary(data).await
    }

    /// Closes the session with a close frame.
    pub async fn close(&mut self, code: CloseCode, reason: impl Into<String>) -> WsResult<()> {
        self.session.close(code, reason).await
    }
}

impl Drop for WebSocket {
    fn drop(&mut self) {
        self.session.mark_closed();
    }
}

impl std::fmt::Debug for WebSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocket")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
