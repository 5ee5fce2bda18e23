use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};

use super::{options::Configuration, tls::SecureTransportProvider, Endpoint};
use crate::{stream::MaybeTlsStream, Result};

/// Opens the byte stream a WebSocket connection runs on.
///
/// The default, [`TcpTransport`], dials TCP and layers TLS for secure endpoints. Other
/// implementations can hand out in-memory streams, proxied sockets, and so on.
pub trait Transport: Send + Sync {
    /// The stream type produced by [`Transport::open`].
    type Io: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Opens a new stream to `endpoint`.
    fn open(&self, endpoint: &Endpoint) -> BoxFuture<'static, Result<Self::Io>>;
}

/// TCP, with TLS on top for secure endpoints.
#[derive(Clone)]
pub struct TcpTransport {
    tls: Arc<dyn SecureTransportProvider>,
    no_delay: bool,
}

impl From<&Configuration> for TcpTransport {
    fn from(configuration: &Configuration) -> Self {
        Self {
            tls: configuration.tls_provider(),
            no_delay: configuration.no_delay(),
        }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::from(&Configuration::default())
    }
}

impl Transport for TcpTransport {
    type Io = MaybeTlsStream;

    fn open(&self, endpoint: &Endpoint) -> BoxFuture<'static, Result<Self::Io>> {
        let tls = Arc::clone(&self.tls);
        let no_delay = self.no_delay;
        let host = endpoint.host().to_owned();
        let port = endpoint.port();
        let is_secure = endpoint.is_secure();

        Box::pin(async move {
            let stream = TcpStream::connect((host.as_str(), port)).await?;
            stream.set_nodelay(no_delay)?;

            #[cfg(feature = "logging")]
            log::debug!("tcp connected to {}:{}", host, port);

            if is_secure {
                tls.wrap(&host, stream).await
            } else {
                Ok(MaybeTlsStream::Plain(stream))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_plain_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let transport = TcpTransport::default();
        let io = transport
            .open(&Endpoint::new("127.0.0.1", port, false))
            .await
            .unwrap();

        assert!(!io.is_tls());
        assert!(io.get_ref().nodelay().unwrap());
    }

    #[tokio::test]
    async fn test_no_delay_disabled() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let transport = TcpTransport::from(&Configuration::default().with_no_delay(false));
        let io = transport
            .open(&Endpoint::new("127.0.0.1", port, false))
            .await
            .unwrap();

        assert!(!io.get_ref().nodelay().unwrap());
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = TcpTransport::default()
            .open(&Endpoint::new("127.0.0.1", port, false))
            .await;
        assert!(matches!(result, Err(crate::WebSocketError::IoError(_))));
    }
}
