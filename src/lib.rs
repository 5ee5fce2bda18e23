//! # wsclient
//! A WebSocket client (RFC 6455) for the Tokio runtime, with two ways to hold a connection:
//!
//! - [`WebSocketClient`]: a scoped connection. The caller's closure receives an [`Inbound`]
//!   stream of [`Response`]s and an [`Outbound`] writer of [`Message`]s, and the connection is
//!   released when the closure returns, fails, or is cancelled.
//! - [`WebSocketSession`]: a long lived connection whose inbound frames are pushed to a
//!   [`SessionDelegate`], with `connect`, `send` and `disconnect` driven by the caller.
//!
//! Both share the same HTTP/1.1 upgrade over hyper and the same frame codec. Outbound frames
//! are always final and masked; inbound frames are decoded into typed messages on a best
//! effort basis, never failing on malformed text or short close payloads.
//!
//! # Features
//! - `logging`: Enables debug logging of connection setup, upgrade, close and errors through
//!   the `log` crate.
//! - `simd`: Validates inbound text with `simdutf8`.
//!
//! # Client Example
//! ```no_run
//! use futures::StreamExt;
//! use wsclient::{CloseCode, Configuration, Message, WebSocketClient};
//!
//! async fn echo_once() -> wsclient::Result<()> {
//!     let client = WebSocketClient::new(
//!         "wss://echo.websocket.org".parse()?,
//!         Configuration::default(),
//!     );
//!
//!     client
//!         .connect(|mut inbound, mut outbound| {
//!             Box::pin(async move {
//!                 outbound.write(Message::text("hello")).await?;
//!                 if let Some(response) = inbound.next().await {
//!                     println!("{:?}", response.data);
//!                 }
//!                 outbound.write(Message::close(CloseCode::Normal)).await
//!             })
//!         })
//!         .await
//! }
//! ```
//!
//! # Memory Safety
//! - Inbound frames larger than [`Configuration::max_frame_size`] end the connection
//!   (default [`DEFAULT_MAX_FRAME_SIZE`]).
//! - Control frames above 125 bytes and fragmented control frames are rejected.

#![cfg_attr(docsrs, feature(doc_cfg))]

#[doc(hidden)]
mod native;

pub mod close;
pub mod codec;
pub mod frame;
mod mask;
pub mod message;
mod stream;

use thiserror::Error;

pub use close::CloseCode;
pub use frame::{Frame, OpCode};
pub use message::{Message, Response};
pub use native::*;

/// A result type for WebSocket operations, using `WebSocketError` as the error type.
pub type Result<T> = std::result::Result<T, WebSocketError>;

/// Represents errors that can occur while connecting, upgrading or exchanging frames.
///
/// Errors fall into a few groups:
///
/// - Endpoint errors, raised before any network activity (scheme, host).
/// - Handshake errors: the peer did not switch protocols.
/// - Protocol errors found while decoding inbound frames. They end the connection.
/// - Transport errors from the socket, TLS or the HTTP layer, passed through unchanged.
#[derive(Error, Debug)]
pub enum WebSocketError {
    /// The peer answered the upgrade request without switching to the WebSocket protocol:
    /// a status other than 101, a missing `Upgrade` or `Connection` header, or a
    /// `Sec-WebSocket-Accept` that does not match the key that was sent.
    #[error("Cannot upgrade connection")]
    CannotUpgrade,

    /// Returned when the endpoint URL has a scheme other than `ws`, `wss`, `http` or `https`.
    #[error("Invalid http scheme")]
    InvalidHttpScheme,

    /// The endpoint URL has no host.
    #[error("Missing host")]
    MissingHost,

    /// The host of a secure endpoint is not a valid TLS server name.
    #[error("Invalid DNS name")]
    InvalidDnsName,

    /// Returned when attempting to reconnect a session that has already been closed.
    #[error("Connection is closed")]
    ConnectionClosed,

    /// No runtime was configured and the caller is not running inside a Tokio runtime.
    #[error("No Tokio runtime available")]
    NoRuntime,

    /// Occurs when a received frame's payload length exceeds the maximum configured size.
    /// This helps prevent memory exhaustion attacks.
    #[error("Frame too large")]
    FrameTooLarge,

    /// Indicates that reserved bits in the WebSocket frame header are set. No extension is
    /// ever negotiated, so they must be 0.
    #[error("Reserved bits are not zero")]
    ReservedBitsNotZero,

    /// Indicates receipt of a frame with a reserved opcode value.
    #[error("Invalid opcode (byte={0})")]
    InvalidOpCode(u8),

    /// Occurs when a control frame (ping, pong, or close) is received with the FIN bit
    /// not set. RFC 6455 requires that control frames must not be fragmented.
    #[error("Control frame must not be fragmented")]
    ControlFrameFragmented,

    /// A control frame carried more than 125 bytes of payload.
    #[error("Control frame too large")]
    ControlFrameTooLarge,

    /// The upgrade request could not be built from the endpoint, e.g. an invalid path.
    #[error(transparent)]
    HttpBuild(#[from] hyper::http::Error),

    /// Wraps errors from URL parsing that may occur when processing WebSocket URLs.
    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    /// Wraps standard I/O errors that may occur during WebSocket communication,
    /// such as connection resets, refused connections or TLS failures.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Wraps errors from the hyper HTTP library that may occur during the WebSocket
    /// handshake process or connection upgrade.
    #[error(transparent)]
    HTTPError(#[from] hyper::Error),
}
