//! Responses synthesized by the dispatcher.

use bytes::Bytes;
use http::{header, HeaderValue, Request, StatusCode, Version};

use crate::handler::{HandlerError, Response};

/// An HTML response with the given status and body.
pub(crate) fn html(status: StatusCode, body: impl Into<String>) -> Response {
    let mut response = Response::new(Bytes::from(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
    response
}

/// Body of the `404` for an unmatched request target.
pub(crate) fn not_found_message(target: &str) -> String {
    format!("The resource '{target}' was not found.")
}

/// `404` for an unmatched request target.
pub(crate) fn not_found(target: &str) -> Response {
    html(StatusCode::NOT_FOUND, not_found_message(target))
}

/// `400` for a WebSocket route reached without an upgrade.
pub(crate) fn upgrade_required(target: &str) -> Response {
    html(
        StatusCode::BAD_REQUEST,
        format!("The resource '{target}' requires a WebSocket upgrade."),
    )
}

/// `413` for a body over the configured limit.
pub(crate) fn payload_too_large(limit: usize) -> Response {
    let mut response = html(
        StatusCode::PAYLOAD_TOO_LARGE,
        format!("Request body exceeds {limit} bytes."),
    );
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}

/// Maps a handler failure to its status and message.
pub(crate) fn from_error(err: &HandlerError) -> Response {
    html(err.status(), err.message())
}

/// Whether the client asked for the connection to persist.
///
/// HTTP/1.1 persists unless `Connection: close`; HTTP/1.0 only with
/// `Connection: keep-alive`.
pub(crate) fn wants_keep_alive<B>(request: &Request<B>) -> bool {
    let has_token = |token: &str| {
        request
            .headers()
            .get_all(header::CONNECTION)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|t| t.trim().eq_ignore_ascii_case(token))
    };

    match request.version() {
        Version::HTTP_09 | Version::HTTP_10 => has_token("keep-alive"),
        _ => !has_token("close"),
    }
}

/// Applies the connection and `Server` headers to an outgoing response.
///
/// A `Connection` or `Server` header set by the handler is left alone.
pub(crate) fn finalize(mut response: Response, keep_alive: bool, server: &HeaderValue) -> Response {
    let headers = response.headers_mut();
    if !keep_alive && !headers.contains_key(header::CONNECTION) {
        headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
    }
    if !headers.contains_key(header::SERVER) {
        headers.insert(header::SERVER, server.clone());
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ApplicationError;

    fn request(version: Version, connection: Option<&str>) -> Request<()> {
        let mut builder = Request::builder().version(version).uri("/");
        if let Some(value) = connection {
            builder = builder.header(header::CONNECTION, value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_not_found_body() {
        let response = not_found("/missing?x=1");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
        assert_eq!(response.body(), "The resource '/missing?x=1' was not found.");
    }

    #[test]
    fn test_error_mapping() {
        let forbidden = from_error(&ApplicationError::forbidden("forbidden").into());
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(forbidden.body(), "forbidden");

        let internal = from_error(&HandlerError::unclassified("boom"));
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.body(), "boom");
    }

    #[test]
    fn test_keep_alive_rules() {
        assert!(wants_keep_alive(&request(Version::HTTP_11, None)));
        assert!(wants_keep_alive(&request(Version::HTTP_11, Some("keep-alive"))));
        assert!(!wants_keep_alive(&request(Version::HTTP_11, Some("Close"))));
        assert!(!wants_keep_alive(&request(Version::HTTP_10, None)));
        assert!(wants_keep_alive(&request(Version::HTTP_10, Some("Keep-Alive"))));
    }

    #[test]
    fn test_finalize_respects_handler_headers() {
        let server = HeaderValue::from_static("critter/test");

        let response = finalize(html(StatusCode::OK, "ok"), false, &server);
        assert_eq!(response.headers()[header::CONNECTION], "close");
        assert_eq!(response.headers()[header::SERVER], "critter/test");

        let mut custom = html(StatusCode::OK, "ok");
        custom
            .headers_mut()
            .insert(header::SERVER, HeaderValue::from_static("custom"));
        custom
            .headers_mut()
            .insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        let response = finalize(custom, false, &server);
        assert_eq!(response.headers()[header::CONNECTION], "keep-alive");
        assert_eq!(response.headers()[header::SERVER], "custom");

        let response = finalize(html(StatusCode::OK, "ok"), true, &server);
        assert!(response.headers().get(header::CONNECTION).is_none());
    }
}
