//! TCP / TLS transport

use std::sync::Arc;

use rustls::RootCertStore;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::error::{IrcError, Result};

/// Byte stream to an IRC server, plain or encrypted
pub trait IrcStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> IrcStream for T {}

pub type BoxedStream = Box<dyn IrcStream>;

/// Open a connection to `host:port`, wrapped in TLS when `tls` is set
pub async fn connect(host: &str, port: u16, tls: bool) -> Result<BoxedStream> {
    let tcp = TcpStream::connect((host, port)).await?;
    tcp.set_nodelay(true)?;

    if !tls {
        debug!("Connected to {}:{} (plain)", host, port);
        return Ok(Box::new(tcp));
    }

    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| IrcError::InvalidServer(host.to_string()))?;

    let stream = tls_connector()?
        .connect(server_name, tcp)
        .await
        .map_err(|e| IrcError::Tls(e.to_string()))?;

    debug!("Connected to {}:{} (TLS)", host, port);
    Ok(Box::new(stream))
}

fn tls_connector() -> Result<TlsConnector> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| IrcError::Tls(e.to_string()))?
    .with_root_certificates(roots)
    .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}
