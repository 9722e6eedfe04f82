// Raw request/response exchange against the gateway's embedded web server.
//
// The server frames its responses as an obsolete, headerless HTTP
// variant that conformant client libraries refuse to parse. The only
// reliable path is a minimal request line over a plain socket, reading
// until the peer closes, then locating the JSON span in whatever came
// back. `GatewayClient` calls this first and only falls back to a
// conformant client when the raw exchange is impossible.

use std::time::Duration;

use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::Error;

const READ_CHUNK: usize = 1024;

/// One raw exchange: connect, write a minimal request, read to EOF,
/// extract and parse the JSON body.
///
/// Every step is bounded by `timeout`; expiry yields [`Error::Timeout`]
/// ("no data"), socket failures yield [`Error::Connection`], a body
/// without a JSON span yields [`Error::Protocol`].
pub(crate) async fn exchange(
    host: &str,
    port: u16,
    path_query: &str,
    username: &str,
    password: &SecretString,
    timeout: Duration,
) -> Result<serde_json::Value, Error> {
    debug!(host, port, path_query, "raw http exchange");

    let timeout_secs = timeout.as_secs();
    let expired = || Error::Timeout { timeout_secs };
    let socket_err = |e: std::io::Error| Error::Connection {
        host: host.to_owned(),
        message: e.to_string(),
    };

    let mut stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
        .await
        .map_err(|_| expired())?
        .map_err(socket_err)?;

    let request = build_request(host, path_query, username, password);
    tokio::time::timeout(timeout, stream.write_all(request.as_bytes()))
        .await
        .map_err(|_| expired())?
        .map_err(socket_err)?;

    // Read until the peer closes the connection. The server does not
    // send a Content-Length (it barely sends headers at all).
    let mut response = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = tokio::time::timeout(timeout, stream.read(&mut chunk))
            .await
            .map_err(|_| expired())?
            .map_err(socket_err)?;
        if n == 0 {
            break;
        }
        response.extend_from_slice(&chunk[..n]);
    }

    let text = String::from_utf8_lossy(&response);
    parse_body(&text)
}

/// Minimal HTTP/1.0-style request the gateway tolerates: request line,
/// `Host`, optional basic auth, blank line.
fn build_request(host: &str, path_query: &str, username: &str, password: &SecretString) -> String {
    let mut request = format!("GET {path_query} HTTP/1.0\r\nHost: {host}\r\n");
    if !username.is_empty() || !password.expose_secret().is_empty() {
        let credentials = format!("{username}:{}", password.expose_secret());
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());
        request.push_str(&format!("Authorization: Basic {encoded}\r\n"));
    }
    request.push_str("\r\n");
    request
}

/// Extract the JSON span (first `{` through last `}`) and parse it.
pub(crate) fn parse_body(text: &str) -> Result<serde_json::Value, Error> {
    let span = extract_json(text).ok_or_else(|| Error::Protocol {
        message: "no JSON body in response".into(),
    })?;
    serde_json::from_str(span).map_err(|e| Error::Protocol {
        message: format!("malformed JSON body: {e}"),
    })
}

/// Locate the first `{` and last `}` in a response, the only framing
/// contract the gateway honors.
pub(crate) fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_span_from_headerless_response() {
        let body = "HTTP/1.0 200 OK\r\n\r\n{\"err\": 0}\r\ntrailing";
        assert_eq!(extract_json(body), Some("{\"err\": 0}"));
    }

    #[test]
    fn extracts_json_embedded_in_error_text() {
        // The shape a conformant client's parse error produces: prose
        // around the body the server actually sent.
        let text = "400, message='Expected HTTP/' : '{\"unit\": []}'";
        let value = parse_body(text).unwrap();
        assert_eq!(value["unit"], serde_json::json!([]));
    }

    #[test]
    fn no_braces_is_protocol_error() {
        assert!(extract_json("404 not found").is_none());
        assert!(matches!(
            parse_body("404 not found"),
            Err(Error::Protocol { .. })
        ));
    }

    #[test]
    fn reversed_braces_rejected() {
        assert_eq!(extract_json("} nothing here {"), None);
    }

    #[test]
    fn request_carries_basic_auth() {
        let request = build_request("10.0.0.5", "/cgi-bin/api.html?f=1", "admin", &SecretString::from(String::new()));
        assert!(request.starts_with("GET /cgi-bin/api.html?f=1 HTTP/1.0\r\n"));
        // "admin:" base64-encoded
        assert!(request.contains("Authorization: Basic YWRtaW46\r\n"));
        assert!(request.ends_with("\r\n\r\n"));
    }

    #[test]
    fn request_omits_auth_when_empty() {
        let request = build_request("10.0.0.5", "/x", "", &SecretString::from(String::new()));
        assert!(!request.contains("Authorization"));
    }
}
