//! Pluggable TLS strategy for `wss://` endpoints.
use std::{io, sync::Arc};

use futures::future::BoxFuture;
use tokio::net::TcpStream;
use tokio_rustls::{
    rustls::{self, pki_types::ServerName},
    TlsConnector,
};

use crate::{stream::MaybeTlsStream, Result, WebSocketError};

/// Layers TLS on an established TCP connection.
///
/// The provider is asked to wrap the socket only for secure endpoints. A failing provider
/// fails the connection attempt before any HTTP byte is written.
///
/// Any [`TlsConnector`] is a provider, which covers custom root stores, client certificates
/// and ALPN settings:
///
/// ```no_run
/// use std::sync::Arc;
/// use tokio_rustls::{rustls, TlsConnector};
/// use wsclient::Configuration;
///
/// # fn build(config: rustls::ClientConfig) {
/// let configuration =
///     Configuration::default().with_tls_provider(TlsConnector::from(Arc::new(config)));
/// # }
/// ```
pub trait SecureTransportProvider: Send + Sync {
    /// Runs the TLS handshake for `server_name` over `stream`.
    fn wrap(
        &self,
        server_name: &str,
        stream: TcpStream,
    ) -> BoxFuture<'static, Result<MaybeTlsStream>>;
}

impl SecureTransportProvider for TlsConnector {
    fn wrap(
        &self,
        server_name: &str,
        stream: TcpStream,
    ) -> BoxFuture<'static, Result<MaybeTlsStream>> {
        let connector = self.clone();
        let domain = ServerName::try_from(server_name.to_owned());

        Box::pin(async move {
            let domain = domain.map_err(|_| WebSocketError::InvalidDnsName)?;
            let stream = connector.connect(domain, stream).await?;
            Ok(MaybeTlsStream::Tls(Box::new(stream)))
        })
    }
}

/// The default provider: verifies servers against the Mozilla root store shipped in
/// `webpki-roots` and negotiates `http/1.1`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebPkiRoots;

impl SecureTransportProvider for WebPkiRoots {
    fn wrap(
        &self,
        server_name: &str,
        stream: TcpStream,
    ) -> BoxFuture<'static, Result<MaybeTlsStream>> {
        match tls_connector() {
            Ok(connector) => connector.wrap(server_name, stream),
            Err(err) => Box::pin(async move { Err(err) }),
        }
    }
}

fn tls_connector() -> Result<TlsConnector> {
    let mut root_cert_store = rustls::RootCertStore::empty();
    root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let provider = rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::ring::default_provider()));

    let mut config = rustls::ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(rustls::ALL_VERSIONS)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?
        .with_root_certificates(root_cert_store)
        .with_no_client_auth();
    config.alpn_protocols = vec!["http/1.1".into()];

    Ok(TlsConnector::from(Arc::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_default_connector_builds() {
        assert!(tls_connector().is_ok());
    }

    #[tokio::test]
    async fn test_invalid_server_name() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stream = TcpStream::connect(addr).await.unwrap();

        let result = WebPkiRoots.wrap("not a host name", stream).await;
        assert!(matches!(result, Err(WebSocketError::InvalidDnsName)));
    }
}
