//! # Close codes
//!
//! Status codes carried in the first two bytes of a `Close` frame, as registered in
//! [RFC 6455 Section 7.4.1](https://datatracker.ietf.org/doc/html/rfc6455#section-7.4.1).
//!
//! The mapping between [`CloseCode`] and its 16-bit wire value is total in both directions:
//! every named variant has exactly one wire value, and any value outside the registered set
//! is carried verbatim by [`CloseCode::Unknown`].
//!
//! ```rust
//! use wsclient::close::CloseCode;
//!
//! assert_eq!(u16::from(CloseCode::Normal), 1000);
//! assert_eq!(CloseCode::from(1000), CloseCode::Normal);
//! assert_eq!(CloseCode::from(4000), CloseCode::Unknown(4000));
//! ```

/// Reason a WebSocket connection was closed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CloseCode {
    /// 1000: the purpose for which the connection was established has been fulfilled.
    Normal,
    /// 1001: an endpoint is going away, e.g. a server shutting down or a browser navigating away.
    Away,
    /// 1002: the peer is terminating the connection due to a protocol error.
    Protocol,
    /// 1003: the peer received a type of data it cannot accept.
    Unsupported,
    /// 1005: no status code was present. Never sent on the wire by a conforming peer.
    Status,
    /// 1006: the connection was closed abnormally, without a close frame.
    Abnormal,
    /// 1007: a message contained data inconsistent with its type (e.g. non UTF-8 text).
    Invalid,
    /// 1008: a message violated the peer's policy.
    Policy,
    /// 1009: a message was too big to process.
    Size,
    /// 1010: the client expected the server to negotiate one or more extensions.
    Extension,
    /// 1011: the server encountered an unexpected condition.
    Error,
    /// 1015: the TLS handshake failed.
    Tls,
    /// Any other value, carried as-is.
    Unknown(u16),
}

impl CloseCode {
    /// Returns `true` if the code is not one of the registered values.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Normal => "normal closure",
            Self::Away => "going away",
            Self::Protocol => "protocol error",
            Self::Unsupported => "unsupported data",
            Self::Status => "no status received",
            Self::Abnormal => "abnormal closure",
            Self::Invalid => "invalid frame payload data",
            Self::Policy => "policy violation",
            Self::Size => "message too big",
            Self::Extension => "mandatory extension missing",
            Self::Error => "internal server error",
            Self::Tls => "TLS handshake failure",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        match code {
            1000 => Self::Normal,
            1001 => Self::Away,
            1002 => Self::Protocol,
            1003 => Self::Unsupported,
            1005 => Self::Status,
            1006 => Self::Abnormal,
            1007 => Self::Invalid,
            1008 => Self::Policy,
            1009 => Self::Size,
            1010 => Self::Extension,
            1011 => Self::Error,
            1015 => Self::Tls,
            _ => Self::Unknown(code),
        }
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        match code {
            CloseCode::Normal => 1000,
            CloseCode::Away => 1001,
            CloseCode::Protocol => 1002,
            CloseCode::Unsupported => 1003,
            CloseCode::Status => 1005,
            CloseCode::Abnormal => 1006,
            CloseCode::Invalid => 1007,
            CloseCode::Policy => 1008,
            CloseCode::Size => 1009,
            CloseCode::Extension => 1010,
            CloseCode::Error => 1011,
            CloseCode::Tls => 1015,
            CloseCode::Unknown(code) => code,
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", u16::from(*self), self.name())
    }
}
