use std::sync::Arc;

use tokio::runtime::Handle;

use super::tls::{SecureTransportProvider, WebPkiRoots};
use crate::{Result, WebSocketError};

/// Default maximum payload accepted in a single inbound frame, 16 KiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1 << 14;

/// Connection parameters shared by every connection a client or session opens.
///
/// A `Configuration` is immutable once built: the `with_*` methods consume it and return
/// the updated value. Cloning is cheap, the TLS provider and runtime handle are shared.
///
/// # Example
/// ```
/// use wsclient::Configuration;
///
/// let configuration = Configuration::default()
///     .with_max_frame_size(64 * 1024)
///     .with_backpressure_boundary(128 * 1024);
///
/// assert_eq!(configuration.max_frame_size(), 64 * 1024);
/// ```
#[derive(Clone)]
pub struct Configuration {
    max_frame_size: usize,
    runtime: Option<Handle>,
    no_delay: bool,
    backpressure_boundary: Option<usize>,
    tls: Arc<dyn SecureTransportProvider>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            runtime: None,
            no_delay: true,
            backpressure_boundary: None,
            tls: Arc::new(WebPkiRoots::default()),
        }
    }
}

impl Configuration {
    /// Sets the largest inbound frame payload, in bytes.
    ///
    /// Frames above this size are a protocol error that ends the connection. Outbound
    /// messages are never split or checked against it.
    pub fn with_max_frame_size(self, max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            ..self
        }
    }

    /// Sets the runtime that drives the HTTP connection and the session's receive loop.
    ///
    /// Without one, the runtime the connecting task runs on is used.
    pub fn with_runtime(self, runtime: Handle) -> Self {
        Self {
            runtime: Some(runtime),
            ..self
        }
    }

    /// Enables or disables `TCP_NODELAY` on new sockets. Enabled by default.
    pub fn with_no_delay(self, no_delay: bool) -> Self {
        Self { no_delay, ..self }
    }

    /// Sets the amount of buffered outbound bytes above which writes wait for the transport.
    pub fn with_backpressure_boundary(self, boundary: usize) -> Self {
        Self {
            backpressure_boundary: Some(boundary),
            ..self
        }
    }

    /// Replaces the TLS strategy used for secure endpoints.
    pub fn with_tls_provider(self, tls: impl SecureTransportProvider + 'static) -> Self {
        Self {
            tls: Arc::new(tls),
            ..self
        }
    }

    /// Largest inbound frame payload, in bytes.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Whether `TCP_NODELAY` is set on new sockets.
    pub fn no_delay(&self) -> bool {
        self.no_delay
    }

    /// Outbound write buffer boundary, if any.
    pub fn backpressure_boundary(&self) -> Option<usize> {
        self.backpressure_boundary
    }

    pub(crate) fn tls_provider(&self) -> Arc<dyn SecureTransportProvider> {
        Arc::clone(&self.tls)
    }

    /// The runtime tasks are spawned on.
    pub(crate) fn runtime(&self) -> Result<Handle> {
        match &self.runtime {
            Some(handle) => Ok(handle.clone()),
            None => Handle::try_current().map_err(|_| WebSocketError::NoRuntime),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let configuration = Configuration::default();
        assert_eq!(configuration.max_frame_size(), 16 * 1024);
        assert!(configuration.no_delay());
        assert_eq!(configuration.backpressure_boundary(), None);
    }

    #[test]
    fn test_builder_keeps_other_fields() {
        let configuration = Configuration::default()
            .with_no_delay(false)
            .with_max_frame_size(1);
        assert!(!configuration.no_delay());
        assert_eq!(configuration.max_frame_size(), 1);
    }

    #[test]
    fn test_runtime_outside_tokio() {
        assert!(matches!(
            Configuration::default().runtime(),
            Err(WebSocketError::NoRuntime)
        ));
    }

    #[tokio::test]
    async fn test_runtime_falls_back_to_current() {
        assert!(Configuration::default().runtime().is_ok());
    }
}
