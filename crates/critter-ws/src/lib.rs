//! WebSocket support for critter.
//!
//! This crate holds everything the dispatcher needs once a request asks for
//! a WebSocket: handshake validation, the session handle shared between the
//! handler and the host, and the registry of live sessions.
//!
//! # Lifecycle
//!
//! 1. The dispatcher validates the upgrade with [`validate_upgrade_request`]
//!    and answers with [`switching_protocols`].
//! 2. Once the raw stream is available, [`complete_upgrade`] wraps it in a
//!    [`WebSocket`].
//! 3. [`SessionRegistry::track`] adds the session and hooks its removal to
//!    the session's close.
//! 4. The handler runs with the `WebSocket`. When it returns, dropping the
//!    `WebSocket` closes the session, which removes it from the registry.
//!
//! # Broadcasting
//!
//! ```ignore
//! for session in registry.snapshot() {
//!     let _ = session.send_text("tick").await;
//! }
//! ```

mod config;
mod connection;
mod error;
mod message;
mod registry;
mod session;
mod upgrade;

pub use config::WebSocketConfig;
pub use connection::WebSocket;
pub use error::{CloseCode, WsError, WsResult};
pub use message::{CloseFrame, Message};
pub use registry::SessionRegistry;
pub use session::{SessionId, SessionInfo, WebSocketSession};
pub use upgrade::{
    accept_key, complete_upgrade, is_websocket_request, switching_protocols,
    validate_upgrade_request, wants_upgrade,
};

/// Prelude for common WebSocket types.
pub mod prelude {
    pub use crate::{
        CloseCode, Message, SessionRegistry, WebSocket, WebSocketSession, WsError, WsResult,
    };
}
