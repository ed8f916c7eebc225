//! TLS Layer
//!
//! rustls client streams for `https` requests, verified against Mozilla's
//! root store. Streams are blocking; the transport drives them from
//! smol's blocking pool.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};

/// TLS configuration
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Enable session resumption
    pub session_resumption: bool,
    /// ALPN protocols offered to the server
    pub alpn_protocols: Vec<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            session_resumption: true,
            alpn_protocols: vec!["http/1.1".into()],
        }
    }
}

/// Create the rustls client configuration
pub(crate) fn client_config(config: &TlsConfig) -> Arc<ClientConfig> {
    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let mut tls_config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    tls_config.alpn_protocols = config
        .alpn_protocols
        .iter()
        .map(|s| s.as_bytes().to_vec())
        .collect();
    if !config.session_resumption {
        tls_config.resumption = rustls::client::Resumption::disabled();
    }

    Arc::new(tls_config)
}

fn server_name(host: &str) -> io::Result<ServerName<'static>> {
    ServerName::try_from(host.to_string())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("invalid server name '{}'", host)))
}

/// Client TLS stream over a TCP socket
pub struct TlsStream {
    stream: StreamOwned<ClientConnection, TcpStream>,
}

impl TlsStream {
    /// Connect to `host:port` and complete the handshake
    pub fn connect(host: &str, port: u16, config: Arc<ClientConfig>) -> io::Result<Self> {
        let name = server_name(host)?;
        let conn = ClientConnection::new(config, name).map_err(|e| io::Error::other(e.to_string()))?;
        let tcp = TcpStream::connect((host, port))?;

        let mut stream = StreamOwned::new(conn, tcp);
        while stream.conn.is_handshaking() {
            stream.conn.complete_io(&mut stream.sock)?;
        }
        tracing::debug!(
            "TLS {}:{} {:?}",
            host,
            port,
            stream.conn.protocol_version().map(|v| match v {
                rustls::ProtocolVersion::TLSv1_2 => "TLSv1.2",
                rustls::ProtocolVersion::TLSv1_3 => "TLSv1.3",
                _ => "Unknown",
            })
        );
        Ok(Self { stream })
    }
}

impl Read for TlsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stream.read(buf) {
            // Servers commonly close `Connection: close` sockets without close_notify
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(0),
            other => other,
        }
    }
}

impl Write for TlsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}
