//! Resource Loader
//!
//! The `Transport` seam swaps fetch through, and the socket-backed
//! `HttpTransport` implementation.

use std::io::Write;
use std::sync::Arc;

use rustls::ClientConfig;
use serde::Serialize;
use smol::future::BoxedLocal;
use smol::io::{AssertAsync, AsyncWriteExt, BufReader};
use smol::net::TcpStream;
use url::Url;

use crate::http1::{Http1Parser, encode_request};
use crate::tls::{TlsConfig, TlsStream, client_config};
use crate::{NetError, Response};

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Case-insensitive lookup
    pub fn parse(token: &str) -> Option<Method> {
        [Method::Get, Method::Post, Method::Put, Method::Patch, Method::Delete]
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(token))
    }

    /// Whether a form payload travels in the query string
    pub fn uses_query(&self) -> bool {
        matches!(self, Method::Get | Method::Delete)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, url: &str) -> Self {
        Self {
            method,
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn get(url: &str) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: &str) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Get header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Something that can turn a request into a response
///
/// Futures are `'static` and single-threaded; implementations clone what
/// they need out of `self` before returning.
pub trait Transport {
    fn send(&self, request: Request) -> BoxedLocal<Result<Response, NetError>>;
}

/// HTTP/1.1 client over TCP or TLS, one connection per request
#[derive(Debug, Clone)]
pub struct HttpTransport {
    user_agent: String,
    default_headers: Vec<(String, String)>,
    tls: Arc<ClientConfig>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// User-Agent first, then the configured defaults
    fn extra_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("User-Agent".to_string(), self.user_agent.clone())];
        headers.extend(self.default_headers.iter().cloned());
        headers
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: Request) -> BoxedLocal<Result<Response, NetError>> {
        let this = self.clone();
        Box::pin(async move {
            tracing::info!("HTTP {} {}", request.method, request.url);

            let url = Url::parse(&request.url).map_err(|_| NetError::InvalidUrl(request.url.clone()))?;
            let secure = match url.scheme() {
                "http" => false,
                "https" => true,
                other => return Err(NetError::UnsupportedScheme(other.to_string())),
            };
            let host = url
                .host_str()
                .ok_or_else(|| NetError::InvalidUrl(request.url.clone()))?
                .to_string();
            let port = url.port_or_known_default().unwrap_or(if secure { 443 } else { 80 });
            let wire = encode_request(&url, &request, &this.extra_headers())?;

            if secure {
                return smol::unblock(move || send_tls(&host, port, this.tls, &wire)).await;
            }

            let mut stream = TcpStream::connect((host.as_str(), port))
                .await
                .map_err(|e| NetError::Network(format!("connect {}:{}: {}", host, port, e)))?;
            stream.write_all(&wire).await?;
            stream.flush().await?;

            let mut reader = BufReader::new(stream);
            Http1Parser::parse(&mut reader).await
        })
    }
}

/// Blocking round trip over TLS
fn send_tls(host: &str, port: u16, config: Arc<ClientConfig>, wire: &[u8]) -> Result<Response, NetError> {
    let mut stream = TlsStream::connect(host, port, config)
        .map_err(|e| NetError::Network(format!("connect {}:{}: {}", host, port, e)))?;
    stream.write_all(wire)?;
    stream.flush()?;

    let mut reader = BufReader::new(AssertAsync::new(stream));
    smol::block_on(Http1Parser::parse(&mut reader))
}

/// Builder for `HttpTransport`
#[derive(Debug, Clone)]
pub struct HttpTransportBuilder {
    user_agent: String,
    default_headers: Vec<(String, String)>,
    tls: TlsConfig,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            user_agent: format!("zjax/{}", env!("CARGO_PKG_VERSION")),
            default_headers: Vec::new(),
            tls: TlsConfig::default(),
        }
    }
}

impl HttpTransportBuilder {
    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Header sent with every request
    pub fn default_header(mut self, name: &str, value: &str) -> Self {
        self.default_headers.push((name.to_string(), value.to_string()));
        self
    }

    /// TLS settings for `https` requests
    pub fn tls_config(mut self, config: TlsConfig) -> Self {
        self.tls = config;
        self
    }

    pub fn build(self) -> HttpTransport {
        HttpTransport {
            user_agent: self.user_agent,
            default_headers: self.default_headers,
            tls: client_config(&self.tls),
        }
    }
}
