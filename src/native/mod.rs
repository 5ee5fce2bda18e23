//! Tokio based client: transports, the upgrade handshake and both session surfaces.

mod client;
mod endpoint;
mod options;
mod session;
mod tls;
mod transport;
mod upgrade;

// Re-exports
pub use client::{Inbound, Outbound, WebSocketClient};
pub use endpoint::Endpoint;
pub use options::{Configuration, DEFAULT_MAX_FRAME_SIZE};
pub use session::{SessionDelegate, WebSocketSession};
pub use tls::{SecureTransportProvider, WebPkiRoots};
pub use transport::{TcpTransport, Transport};

pub use crate::stream::MaybeTlsStream;
