//! Shared handles to live WebSocket sessions.
//!
//! A [`WebSocketSession`] owns the sending half of an upgraded socket. It is
//! reference counted: the [`SessionRegistry`](crate::SessionRegistry) holds
//! one reference, the task running the handler holds another, and hosts may
//! hold more through snapshots. The receiving half stays with the
//! [`WebSocket`](crate::WebSocket) given to the handler.
//!
//! Closing is one-way and happens once. Whichever path observes the end
//! first (peer close frame, read error, application close, or the handler
//! dropping its `WebSocket`) flips the closed flag and runs the registered
//! close callbacks. Every later attempt is a no-op.

use std::fmt;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures_util::{Sink, SinkExt};
use parking_lot::Mutex;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{CloseCode, WsError, WsResult};
use crate::message::Message;

pub(crate) type BoxSink =
    Pin<Box<dyn Sink<tungstenite::Message, Error = tungstenite::Error> + Send>>;

type CloseCallback = Box<dyn FnOnce(&WebSocketSession) + Send>;

/// A unique identifier for a WebSocket session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new time-ordered session ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection facts captured at upgrade time.
#[derive(Debug, Clone, Default)]
pub struct SessionInfo {
    /// Remote address of the peer, when known.
    pub peer_addr: Option<SocketAddr>,
    /// Request path that was upgraded.
    pub path: String,
}

impl SessionInfo {
    /// Creates session info for the given path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            peer_addr: None,
            path: path.into(),
        }
    }

    /// Sets the peer address.
    pub fn peer_addr(mut self, addr: SocketAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }
}

/// A live upgraded connection.
pub struct WebSocketSession {
    id: SessionId,
    info: SessionInfo,
    opened_at: Instant,
    sink: tokio::sync::Mutex<BoxSink>,
    closed: AtomicBool,
    on_close: Mutex<Vec<CloseCallback>>,
}

impl WebSocketSession {
    pub(crate) fn new(sink: BoxSink, info: SessionInfo) -> Self {
        Self {
            id: SessionId::new(),
            info,
            opened_at: Instant::now(),
            sink: tokio::sync::Mutex::new(sink),
            closed: AtomicBool::new(false),
            on_close: Mutex::new(Vec::new()),
        }
    }

    /// The session ID.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Remote address of the peer.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.info.peer_addr
    }

    /// The upgraded request path.
    pub fn path(&self) -> &str {
        &self.info.path
    }

    /// How long the session has been open.
    pub fn age(&self) -> Duration {
        self.opened_at.elapsed()
    }

    /// Whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Registers a callback to run when the session closes.
    ///
    /// If the session is already closed the callback runs immediately on
    /// the calling thread. Callbacks run at most once.
    pub fn on_close<F>(&self, callback: F)
    where
        F: FnOnce(&WebSocketSession) + Send + 'static,
    {
        let mut callbacks = self.on_close.lock();
        if self.is_closed() {
            drop(callbacks);
            callback(self);
        } else {
            callbacks.push(Box::new(callback));
        }
    }

    /// Sends a message and flushes it.
    #[instrument(skip(self, msg), fields(session_id = %self.id))]
    pub async fn send(&self, msg: Message) -> WsResult<()> {
        if self.is_closed() {
            return Err(WsError::connection_closed(None, "session already closed"));
        }

        let result = self.sink.lock().await.send(msg.into()).await;
        if let Err(e) = result {
            debug!(error = %e, "send failed, closing session");
            self.mark_closed();
            return Err(WsError::send_failed(e.to_string()));
        }
        Ok(())
    }

    /// Sends a text message.
    pub async fn send_text(&self, text: impl Into<String>) -> WsResult<()> {
        self.send(Message::text(text)).await
    }

    /// Sends a binary message.
    pub async fn send_binary(&self, data: impl Into<bytes::Bytes>) -> WsResult<()> {
        self.send(Message::binary(data)).await
    }

    /// Serializes `value` and sends it as a text message.
    pub async fn send_json<T: serde::Serialize>(&self, value: &T) -> WsResult<()> {
        self.send(Message::from_json(value)?).await
    }

    /// Sends a close frame and marks the session closed.
    ///
    /// Closing an already closed session is a no-op.
    pub async fn close(&self, code: CloseCode, reason: impl Into<String>) -> WsResult<()> {
        if self.is_closed() {
            return Ok(());
        }

        let reason = reason.into();
        debug!(session_id = %self.id, code = code.as_u16(), reason = %reason, "closing session");
        let result = self
            .sink
            .lock()
            .await
            .send(Message::close(code, reason).into())
            .await;
        self.mark_closed();
        result.map_err(WsError::from)
    }

    /// Flushes queued protocol replies such as pongs and close acknowledgements.
    pub(crate) async fn flush(&self) {
        if let Err(e) = self.sink.lock().await.flush().await {
            debug!(session_id = %self.id, error = %e, "flush failed");
        }
    }

    /// Flips the session to closed and runs close callbacks.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub(crate) fn mark_closed(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let callbacks = std::mem::take(&mut *self.on_close.lock());
        for callback in callbacks {
            callback(self);
        }
        true
    }
}

impl fmt::Debug for WebSocketSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketSession")
            .field("id", &self.id)
            .field("peer_addr", &self.info.peer_addr)
            .field("path", &self.info.path)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
