use std::str::FromStr;

use url::{Host, Url};

use crate::{Result, WebSocketError};

/// Where to connect: host, port, whether to use TLS, and the request target.
///
/// An endpoint is either built from its parts or from a URL whose scheme is one of
/// `ws`, `wss`, `http` or `https`. Validation happens here, before any network activity.
///
/// ```
/// use wsclient::Endpoint;
///
/// let endpoint: Endpoint = "wss://example.com/feed?x=1".parse()?;
/// assert_eq!(endpoint.host(), "example.com");
/// assert_eq!(endpoint.port(), 443);
/// assert!(endpoint.is_secure());
/// assert_eq!(endpoint.path(), "/feed?x=1");
///
/// // no scheme means plain ws
/// let endpoint: Endpoint = "localhost:9001".parse()?;
/// assert!(!endpoint.is_secure());
/// # Ok::<(), wsclient::WebSocketError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
    is_secure: bool,
    path: String,
}

impl Endpoint {
    /// Creates an endpoint requesting `/`.
    pub fn new(host: impl Into<String>, port: u16, is_secure: bool) -> Self {
        Self {
            host: host.into(),
            port,
            is_secure,
            path: String::from("/"),
        }
    }

    /// Sets the request target sent in the upgrade request.
    pub fn with_path(self, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.is_empty() {
            String::from("/")
        } else {
            path
        };
        Self { path, ..self }
    }

    /// Builds an endpoint from a URL.
    ///
    /// `wss` and `https` select TLS. Without an explicit port, 443 is used for secure
    /// schemes and 80 otherwise.
    ///
    /// # Errors
    /// - [`WebSocketError::InvalidHttpScheme`] for any other scheme.
    /// - [`WebSocketError::MissingHost`] if the URL has no host.
    pub fn from_url(url: &Url) -> Result<Self> {
        let scheme = url.scheme();
        let is_secure = match scheme.to_ascii_lowercase().as_str() {
            "wss" | "https" => true,
            "ws" | "http" => false,
            _ => return Err(WebSocketError::InvalidHttpScheme),
        };

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_owned(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(WebSocketError::MissingHost),
        };

        let port = url.port().unwrap_or(if is_secure { 443 } else { 80 });

        Ok(Self::new(host, port, is_secure).with_path(&url[url::Position::BeforePath..]))
    }

    /// The host name or address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether TLS is layered on the TCP connection.
    pub fn is_secure(&self) -> bool {
        self.is_secure
    }

    /// The request target, path and query.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Value of the `Host` header: the port is only spelled out when it is not the default.
    pub(crate) fn host_header(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };

        let default_port = if self.is_secure { 443 } else { 80 };
        if self.port == default_port {
            host
        } else {
            format!("{host}:{}", self.port)
        }
    }
}

impl TryFrom<&Url> for Endpoint {
    type Error = WebSocketError;

    fn try_from(url: &Url) -> Result<Self> {
        Self::from_url(url)
    }
}

impl TryFrom<Url> for Endpoint {
    type Error = WebSocketError;

    fn try_from(url: Url) -> Result<Self> {
        Self::from_url(&url)
    }
}

impl FromStr for Endpoint {
    type Err = WebSocketError;

    fn from_str(s: &str) -> Result<Self> {
        let url = if s.contains("://") {
            Url::parse(s)?
        } else {
            Url::parse(&format!("ws://{s}"))?
        };
        Self::from_url(&url)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scheme = if self.is_secure { "wss" } else { "ws" };
        write!(f, "{scheme}://{}{}", self.host_header(), self.path)
    }
}
