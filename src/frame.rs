//! # Frame
//!
//! The `frame` module implements WebSocket frames as defined in [RFC 6455 Section 5.2](https://datatracker.ietf.org/doc/html/rfc6455#section-5.2).
//! A frame is the wire-level unit exchanged with the peer: it is built from a
//! [`Message`](crate::Message) before being sent, or parsed from the transport before being
//! turned into a [`Response`](crate::Response). Frames are never persisted.
//!
//! ### Frame Binary Format
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |         (16 or 64 bits)       |
//! |N|V|V|V|       |S|             |                               |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |        Extended payload length continued, if payload len == 127|
//! +---------------------------------------------------------------+
//! |                               |   Masking-key, if MASK set to 1|
//! +-------------------------------+-------------------------------+
//! |     Masking-key (continued)       |          Payload Data      |
//! +-----------------------------------+ - - - - - - - - - - - - - -+
//! :                     Payload Data continued ...                :
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Masking
//!
//! [`Frame::payload`] always holds the application bytes in the clear. The masking key, when
//! present, is only metadata: the [`Encoder`](crate::codec::Encoder) XORs the payload with it
//! while writing to the wire, and the [`Decoder`](crate::codec::Decoder) removes it while
//! reading, keeping the key the peer used.
use bytes::Bytes;

use crate::{close::CloseCode, WebSocketError};

/// WebSocket operation code (OpCode) that determines the semantic meaning of a frame.
///
/// # Data Frame OpCodes
/// - `Continuation`: Continues a fragmented message started by another data frame
/// - `Text`: Contains UTF-8 encoded text data
/// - `Binary`: Contains raw binary data
///
/// # Control Frame OpCodes
/// - `Close`: Initiates or confirms connection closure
/// - `Ping`: Tests connection liveness
/// - `Pong`: Responds to a `Ping` frame
///
/// The ranges 0x3-0x7 and 0xB-0xF are reserved and rejected while decoding.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpCode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl OpCode {
    /// Returns `true` if the `OpCode` represents a control frame (`Close`, `Ping`, or `Pong`).
    ///
    /// Control frames cannot be fragmented and carry at most 125 bytes of payload.
    pub fn is_control(&self) -> bool {
        matches!(*self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }
}

impl TryFrom<u8> for OpCode {
    type Error = WebSocketError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x0 => Ok(Self::Continuation),
            0x1 => Ok(Self::Text),
            0x2 => Ok(Self::Binary),
            0x8 => Ok(Self::Close),
            0x9 => Ok(Self::Ping),
            0xA => Ok(Self::Pong),
            _ => Err(WebSocketError::InvalidOpCode(value)),
        }
    }
}

impl From<OpCode> for u8 {
    fn from(val: OpCode) -> Self {
        match val {
            OpCode::Continuation => 0x0,
            OpCode::Text => 0x1,
            OpCode::Binary => 0x2,
            OpCode::Close => 0x8,
            OpCode::Ping => 0x9,
            OpCode::Pong => 0xA,
        }
    }
}

/// A WebSocket frame: fin bit, opcode, optional masking key and payload.
///
/// Most code never builds frames by hand: outbound frames come from
/// `Frame::from(Message)` and inbound frames are wrapped in a [`Response`](crate::Response).
/// The raw frame stays available for callers that need metadata the typed message drops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Indicates if this is the final frame in a message.
    pub fin: bool,
    /// The opcode of the frame, defining its type.
    pub opcode: OpCode,
    /// The masking key used (outbound) or found (inbound) on the wire.
    mask: Option<[u8; 4]>,
    /// The unmasked payload.
    pub payload: Bytes,
}

/// Largest possible header: 2 bytes, 8 bytes of extended length and a 4 byte key.
pub(crate) const MAX_HEAD_SIZE: usize = 14;

/// Largest payload a control frame may carry.
pub(crate) const MAX_CONTROL_PAYLOAD: usize = 125;

impl Frame {
    /// Creates a new `Frame`.
    ///
    /// # Parameters
    /// - `fin`: Indicates if this frame is the final fragment in a message.
    /// - `opcode`: The operation code of the frame.
    /// - `mask`: Optional 4-byte masking key, applied by the encoder on the wire.
    /// - `payload`: The unmasked frame payload.
    pub fn new(
        fin: bool,
        opcode: OpCode,
        mask: Option<[u8; 4]>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            fin,
            opcode,
            mask,
            payload: payload.into(),
        }
    }

    /// Returns the masking key of the frame, if any.
    #[inline]
    pub fn mask_key(&self) -> Option<[u8; 4]> {
        self.mask
    }

    /// Returns whether the frame is masked on the wire.
    #[inline(always)]
    pub fn is_masked(&self) -> bool {
        self.mask.is_some()
    }

    /// Checks if the frame payload is valid UTF-8.
    #[inline(always)]
    pub fn is_utf8(&self) -> bool {
        std::str::from_utf8(&self.payload).is_ok()
    }

    /// Extracts the close code from a Close frame's payload.
    ///
    /// Returns `None` when the payload is shorter than two bytes.
    pub fn close_code(&self) -> Option<CloseCode> {
        let bytes = self.payload.get(0..2)?;
        Some(CloseCode::from(u16::from_be_bytes([bytes[0], bytes[1]])))
    }

    /// Extracts the close reason that follows the status code of a Close frame.
    ///
    /// Returns `None` if there is no status code or the reason is not valid UTF-8.
    pub fn close_reason(&self) -> Option<&str> {
        std::str::from_utf8(self.payload.get(2..)?).ok()
    }

    /// Formats the frame header into `head` and returns its length.
    ///
    /// # Panics
    /// Panics if `head` is shorter than [`MAX_HEAD_SIZE`].
    pub(crate) fn fmt_head(&self, head: &mut [u8]) -> usize {
        head[0] = (self.fin as u8) << 7 | u8::from(self.opcode);

        let len = self.payload.len();
        let size = if len < 126 {
            head[1] = len as u8;
            2
        } else if len < 65536 {
            head[1] = 126;
            head[2..4].copy_from_slice(&(len as u16).to_be_bytes());
            4
        } else {
            head[1] = 127;
            head[2..10].copy_from_slice(&(len as u64).to_be_bytes());
            10
        };

        if let Some(mask) = self.mask {
            head[1] |= 0x80;
            head[size..size + 4].copy_from_slice(&mask);
            size + 4
        } else {
            size
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod opcode_tests {
        use super::*;

        #[test]
        fn test_is_control() {
            assert!(OpCode::Close.is_control());
            assert!(OpCode::Ping.is_control());
            assert!(OpCode::Pong.is_control());

            assert!(!OpCode::Continuation.is_control());
            assert!(!OpCode::Text.is_control());
            assert!(!OpCode::Binary.is_control());
        }

        #[test]
        fn test_try_from_u8_invalid() {
            for code in [0x3, 0x4, 0x5, 0x6, 0x7, 0xB, 0xC, 0xD, 0xE, 0xF] {
                assert!(matches!(
                    OpCode::try_from(code),
                    Err(WebSocketError::InvalidOpCode(c)) if c == code
                ));
            }
        }

        #[test]
        fn test_u8_conversions_agree() {
            for opcode in [
                OpCode::Continuation,
                OpCode::Text,
                OpCode::Binary,
                OpCode::Close,
                OpCode::Ping,
                OpCode::Pong,
            ] {
                assert_eq!(OpCode::try_from(u8::from(opcode)).unwrap(), opcode);
            }
        }
    }

    mod frame_tests {
        use super::*;

        #[test]
        fn test_close_code_and_reason() {
            let payload = Bytes::from_static(b"\x03\xE8Goodbye");
            let frame = Frame::new(true, OpCode::Close, None, payload);
            assert_eq!(frame.close_code(), Some(CloseCode::Normal));
            assert_eq!(frame.close_reason(), Some("Goodbye"));
        }

        #[test]
        fn test_close_code_short_payload() {
            let empty = Frame::new(true, OpCode::Close, None, Bytes::new());
            assert_eq!(empty.close_code(), None);
            assert_eq!(empty.close_reason(), None);

            let one = Frame::new(true, OpCode::Close, None, vec![0x03]);
            assert_eq!(one.close_code(), None);
        }

        #[test]
        fn test_frame_is_utf8() {
            let frame = Frame::new(true, OpCode::Text, None, "Hello, 世界");
            assert!(frame.is_utf8());

            let frame = Frame::new(true, OpCode::Text, None, vec![0xFF, 0xFE, 0xFD]);
            assert!(!frame.is_utf8());
        }

        #[test]
        fn test_fmt_head_masked() {
            let mask_key = [0xAA, 0xBB, 0xCC, 0xDD];
            let frame = Frame::new(true, OpCode::Text, Some(mask_key), "Header test");

            let mut head = [0u8; MAX_HEAD_SIZE];
            let size = frame.fmt_head(&mut head);

            assert_eq!(size, 2 + 4);
            assert_eq!(head[0], 0x81);
            assert_eq!(head[1], 0x80 | 11);
            assert_eq!(&head[2..6], &mask_key);
        }

        #[test]
        fn test_fmt_head_extended_lengths() {
            let mut head = [0u8; MAX_HEAD_SIZE];

            let frame = Frame::new(false, OpCode::Binary, None, vec![0u8; 300]);
            assert_eq!(frame.fmt_head(&mut head), 4);
            assert_eq!(head[0], 0x02);
            assert_eq!(head[1], 126);
            assert_eq!(&head[2..4], &300u16.to_be_bytes());

            let frame = Frame::new(true, OpCode::Binary, Some([1, 2, 3, 4]), vec![0u8; 70_000]);
            assert_eq!(frame.fmt_head(&mut head), 14);
            assert_eq!(head[1], 0x80 | 127);
            assert_eq!(&head[2..10], &70_000u64.to_be_bytes());
            assert_eq!(&head[10..14], &[1, 2, 3, 4]);
        }
    }
}
