//! HTTP/1.1 framing helpers shared by the transports.
//!
//! # Design
//! Everything here is a pure function over strings and bytes so the wire
//! format can be tested without a socket. The socket transport is the only
//! caller of `encode_post_request` and `split_response`; the library-backed
//! transports reuse the host and URL helpers so all three agree on where a
//! request goes.

use std::borrow::Cow;

use crate::error::TransportError;

/// Content type sent with every POST; bodies are always form-encoded.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Host to address a request to: `{key}.{host}` when a non-empty subdomain
/// key is given, otherwise `host` unchanged.
pub fn effective_host<'a>(host: &'a str, subdomain_key: Option<&str>) -> Cow<'a, str> {
    match subdomain_key {
        Some(key) if !key.is_empty() => Cow::Owned(format!("{key}.{host}")),
        _ => Cow::Borrowed(host),
    }
}

pub fn is_absolute_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// Full URL for `path`. Absolute URLs are returned as given; origin-form
/// paths are joined to `host`, with `:port` only when a port is supplied.
pub fn request_url(host: &str, port: Option<u16>, path: &str) -> String {
    if is_absolute_url(path) {
        return path.to_string();
    }
    match port {
        Some(port) => format!("http://{host}:{port}{path}"),
        None => format!("http://{host}{path}"),
    }
}

/// Check a request target before anything is sent.
pub fn validate_path(path: &str) -> Result<(), TransportError> {
    if path.is_empty() {
        return Err(TransportError::communication("request path must not be empty"));
    }
    if path.contains(|c: char| c == '\r' || c == '\n' || c == ' ') {
        return Err(TransportError::communication(format!(
            "request path {path:?} contains whitespace"
        )));
    }
    Ok(())
}

/// Check a subdomain key before it is prefixed to the host. A key must be a
/// single DNS label: ASCII letters, digits and `-`, not starting or ending
/// with `-`. An empty key means no key and is accepted.
pub fn validate_subdomain_key(subdomain_key: Option<&str>) -> Result<(), TransportError> {
    let Some(key) = subdomain_key.filter(|k| !k.is_empty()) else {
        return Ok(());
    };
    let label_chars = key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-');
    if !label_chars || key.len() > 63 || key.starts_with('-') || key.ends_with('-') {
        return Err(TransportError::communication(format!(
            "subdomain key {key:?} is not a valid host name label"
        )));
    }
    Ok(())
}

/// Value of the `Content-Length` header: the UTF-8 byte count, not the
/// number of characters.
pub fn content_length(body: &str) -> usize {
    body.len()
}

/// Encode a complete HTTP/1.1 POST request.
pub fn encode_post_request(path: &str, host: &str, user_agent: &str, body: &str) -> Vec<u8> {
    let head = format!(
        "POST {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Content-Type: {FORM_CONTENT_TYPE}\r\n\
         Content-Length: {length}\r\n\
         User-Agent: {user_agent}\r\n\
         \r\n",
        length = content_length(body),
    );
    let mut request = Vec::with_capacity(head.len() + body.len());
    request.extend_from_slice(head.as_bytes());
    request.extend_from_slice(body.as_bytes());
    request
}

/// Return the payload that follows the first blank line of a raw response.
pub fn split_response(raw: &[u8]) -> Result<&[u8], TransportError> {
    raw.windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
        .map(|pos| &raw[pos + HEADER_TERMINATOR.len()..])
        .ok_or_else(|| TransportError::communication("invalid response returned by API server"))
}

/// Convert a payload to the `String` handed back to callers.
pub fn body_to_string(payload: Vec<u8>) -> Result<String, TransportError> {
    String::from_utf8(payload).map_err(|_| {
        TransportError::communication("response body returned by API server is not valid UTF-8")
    })
}
