//! WebSocket HTTP upgrade handling (RFC 6455 section 4.2).
//!
//! The dispatcher uses two checks. [`wants_upgrade`] answers "did the
//! client ask for a WebSocket at all". [`validate_upgrade_request`] then
//! checks the full handshake and yields the accept key.

use base64::Engine;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Request, Response, StatusCode};
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tracing::instrument;

use crate::config::WebSocketConfig;
use crate::connection::WebSocket;
use crate::error::{WsError, WsResult};
use crate::session::SessionInfo;

/// The WebSocket magic GUID used in the handshake.
const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

fn header_str<'a>(headers: &'a HeaderMap, name: impl header::AsHeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// `Connection` lists the `upgrade` token.
fn has_connection_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
}

/// `Upgrade` names the websocket protocol.
fn has_websocket_upgrade(headers: &HeaderMap) -> bool {
    header_str(headers, header::UPGRADE)
        .map(|v| v.split(',').any(|p| p.trim().eq_ignore_ascii_case("websocket")))
        .unwrap_or(false)
}

/// Returns true if the request signals a WebSocket upgrade.
///
/// This only looks at `Connection` and `Upgrade`; the key and version are
/// checked by [`validate_upgrade_request`].
pub fn wants_upgrade<B>(request: &Request<B>) -> bool {
    let headers = request.headers();
    has_connection_upgrade(headers) && has_websocket_upgrade(headers)
}

/// Returns true if the request is a complete, valid upgrade request.
pub fn is_websocket_request<B>(request: &Request<B>) -> bool {
    validate_upgrade_request(request).is_ok()
}

/// Compute the Sec-WebSocket-Accept value from the key.
pub fn accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Validate a WebSocket upgrade request.
///
/// Returns the accept key if valid, or an error describing why it's invalid.
#[instrument(skip(request), level = "debug")]
pub fn validate_upgrade_request<B>(request: &Request<B>) -> WsResult<String> {
    let headers = request.headers();

    if request.method() != http::Method::GET {
        return Err(WsError::not_websocket("upgrade requires GET"));
    }

    if !has_connection_upgrade(headers) {
        return Err(WsError::not_websocket("missing Connection: Upgrade header"));
    }

    if !has_websocket_upgrade(headers) {
        return Err(WsError::not_websocket("missing Upgrade: websocket header"));
    }

    let key = header_str(headers, header::SEC_WEBSOCKET_KEY)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| WsError::not_websocket("missing Sec-WebSocket-Key header"))?;

    if header_str(headers, header::SEC_WEBSOCKET_VERSION) != Some("13") {
        return Err(WsError::not_websocket(
            "missing or invalid Sec-WebSocket-Version header (must be 13)",
        ));
    }

    Ok(accept_key(key))
}

/// Builds the `101 Switching Protocols` response for an accept key.
pub fn switching_protocols(accept_key: &str) -> WsResult<Response<Bytes>> {
    let accept = HeaderValue::from_str(accept_key)
        .map_err(|e| WsError::handshake_failed(format!("invalid accept key: {e}")))?;

    let mut response = Response::new(Bytes::new());
    *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    let headers = response.headers_mut();
    headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
    headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
    headers.insert(header::SEC_WEBSOCKET_ACCEPT, accept);
    Ok(response)
}

/// Complete a WebSocket upgrade on the raw upgraded stream.
///
/// Call this after the `101` response has been written.
pub async fn complete_upgrade<S>(stream: S, config: &WebSocketConfig, info: SessionInfo) -> WebSocket
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let ws_stream = WebSocketStream::from_raw_socket(
        stream,
        tungstenite::protocol::Role::Server,
        Some(config.to_protocol()),
    )
    .await;

    WebSocket::new(ws_stream, info)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ws_request() -> Request<()> {
        Request::builder()
            .uri("/ws")
            .header(header::CONNECTION, "keep-alive, Upgrade")
            .header(header::UPGRADE, "websocket")
            .header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
            .header("Sec-WebSocket-Version", "13")
            .body(())
            .unwrap()
    }

    #[test]
    fn test_accept_key_rfc_sample() {
        assert_eq!(accept_key("dGhlIHNhbXBsZSBub25jZQ=="), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn test_valid_request() {
        let request = make_ws_request();
        assert!(wants_upgrade(&request));
        assert!(is_websocket_request(&request));
        assert_eq!(
            validate_upgrade_request(&request).unwrap(),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn test_plain_request_does_not_want_upgrade() {
        let request = Request::builder().uri("/ws").body(()).unwrap();
        assert!(!wants_upgrade(&request));
        assert!(!is_websocket_request(&request));
    }

    #[test]
    fn test_missing_key_wants_upgrade_but_is_invalid() {
        let request = Request::builder()
            .header(header::CONNECTION, "Upgrade")
            .header(header::UPGRADE, "websocket")
            .header("Sec-WebSocket-Version", "13")
            .body(())
            .unwrap();
        assert!(wants_upgrade(&request));
        let err = validate_upgrade_request(&request).unwrap_err();
        assert!(err.to_string().contains("Sec-WebSocket-Key"));
    }

    #[test]
    fn test_wrong_version_rejected() {
        let request = Request::builder()
            .header(header::CONNECTION, "Upgrade")
            .header(header::UPGRADE, "websocket")
            .header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
            .header("Sec-WebSocket-Version", "8")
            .body(())
            .unwrap();
        assert!(validate_upgrade_request(&request).is_err());
    }

    #[test]
    fn test_non_get_rejected() {
        let mut request = make_ws_request();
        *request.method_mut() = http::Method::POST;
        assert!(validate_upgrade_request(&request).is_err());
    }

    #[test]
    fn test_switching_protocols_response() {
        let response = switching_protocols("s3pPLMBiTxaQ9kYGzzhZRbK+xOo=").unwrap();
        assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
        assert_eq!(
            response.headers()[header::SEC_WEBSOCKET_ACCEPT],
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
        assert_eq!(response.headers()[header::UPGRADE], "websocket");
    }

    #[tokio::test]
    async fn test_complete_upgrade_over_duplex() {
        let (server_io, _client_io) = tokio::io::duplex(1024);
        let ws = complete_upgrade(server_io, &WebSocketConfig::default(), SessionInfo::new("/ws")).await;
        assert_eq!(ws.session().path(), "/ws");
        assert!(!ws.session().is_closed());
    }
}
