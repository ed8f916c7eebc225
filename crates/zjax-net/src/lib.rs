//! zjax Networking
//!
//! Request/response types and the transports swaps fetch through: an
//! HTTP/1.1 client over `smol` sockets or rustls, and an in-process route
//! table.

mod http1;
mod loader;
mod memory;
mod tls;

pub use http1::{Http1Parser, MAX_BODY};
pub use loader::{HttpTransport, HttpTransportBuilder, Method, Request, Transport};
pub use memory::MemoryTransport;
pub use tls::{TlsConfig, TlsStream};
pub use url::Url;

/// HTTP Response
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// Response with the standard reason phrase for `status`
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            reason: reason_phrase(status).to_string(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// `200 OK` with an HTML body
    pub fn html(body: &str) -> Self {
        Self::new(200, body.as_bytes()).with_header("Content-Type", "text/html; charset=utf-8")
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Get header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, lossy
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Network error
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Malformed HTTP response: {0}")]
    Protocol(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Standard reason phrase for common status codes
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_response() {
        let resp = Response::html("<p>hi</p>");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.reason, "OK");
        assert!(resp.is_success());
        assert_eq!(resp.header("content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(resp.text(), "<p>hi</p>");
    }

    #[test]
    fn test_error_status() {
        let resp = Response::new(404, Vec::new());
        assert!(!resp.is_success());
        assert_eq!(resp.reason, "Not Found");
    }
}
