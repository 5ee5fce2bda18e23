//! Typed application messages and their mapping to and from [`Frame`]s.
//!
//! Encoding (`Frame::from(Message)`) always produces a single, final, masked frame. Decoding
//! (`Response::from(Frame)`) never fails: anything that cannot be given a typed meaning is
//! surfaced as a [`Response`] with no [`Response::data`], the raw frame still attached.
use bytes::Bytes;

use crate::{
    close::CloseCode,
    frame::{Frame, OpCode},
};

/// An application-level WebSocket message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A ping carrying a UTF-8 payload.
    Ping(String),
    /// A text message.
    Text(String),
    /// A binary message.
    Binary(Bytes),
    /// A close request carrying a status code.
    Close(CloseCode),
}

impl Message {
    /// Creates a text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Creates a binary message.
    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self::Binary(payload.into())
    }

    /// Creates a ping message.
    pub fn ping(payload: impl Into<String>) -> Self {
        Self::Ping(payload.into())
    }

    /// Creates a close message.
    pub fn close(code: CloseCode) -> Self {
        Self::Close(code)
    }

    /// The opcode a message of this kind is sent with.
    pub fn opcode(&self) -> OpCode {
        match self {
            Self::Ping(_) => OpCode::Ping,
            Self::Text(_) => OpCode::Text,
            Self::Binary(_) => OpCode::Binary,
            Self::Close(_) => OpCode::Close,
        }
    }
}

impl From<Message> for Frame {
    /// Encodes a message as a final frame masked with a fresh random key.
    ///
    /// Close messages carry exactly the two byte status code, without reason.
    fn from(message: Message) -> Self {
        let opcode = message.opcode();
        let payload = match message {
            Message::Ping(text) | Message::Text(text) => Bytes::from(text),
            Message::Binary(bytes) => bytes,
            Message::Close(code) => Bytes::copy_from_slice(&u16::from(code).to_be_bytes()),
        };

        Frame::new(true, opcode, Some(rand::random()), payload)
    }
}

/// An inbound frame together with its best-effort typed meaning.
#[derive(Debug, Clone)]
pub struct Response {
    /// The decoded message, `None` for continuation, ping and pong frames.
    pub data: Option<Message>,
    /// The frame as received.
    pub frame: Frame,
}

impl From<Frame> for Response {
    /// Decodes a received frame.
    ///
    /// Text payloads that are not valid UTF-8 fall back to [`Message::Binary`]; close frames
    /// shorter than two bytes decode to `CloseCode::Unknown(0)`.
    fn from(frame: Frame) -> Self {
        let data = match frame.opcode {
            OpCode::Text => Some(match utf8(&frame.payload) {
                Some(text) => Message::Text(text.to_owned()),
                None => Message::Binary(frame.payload.clone()),
            }),
            OpCode::Binary => Some(Message::Binary(frame.payload.clone())),
            OpCode::Close => Some(Message::Close(
                frame.close_code().unwrap_or(CloseCode::Unknown(0)),
            )),
            OpCode::Continuation | OpCode::Ping | OpCode::Pong => None,
        };

        Self { data, frame }
    }
}

#[cfg(not(feature = "simd"))]
#[inline]
fn utf8(payload: &[u8]) -> Option<&str> {
    std::str::from_utf8(payload).ok()
}

#[cfg(feature = "simd")]
#[inline]
fn utf8(payload: &[u8]) -> Option<&str> {
    simdutf8::basic::from_utf8(payload).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(message: Message) -> Response {
        Response::from(Frame::from(message))
    }

    #[test]
    fn test_text_round_trip() {
        let response = round_trip(Message::text("hello"));
        assert_eq!(response.data, Some(Message::Text("hello".into())));
        assert_eq!(response.frame.opcode, OpCode::Text);
    }

    #[test]
    fn test_binary_round_trip_is_exact() {
        let response = round_trip(Message::binary(vec![0x00, 0xFF]));
        assert_eq!(
            response.data,
            Some(Message::Binary(Bytes::from_static(&[0x00, 0xFF])))
        );
    }

    #[test]
    fn test_encoded_frames_are_final_and_masked() {
        for message in [
            Message::ping("p"),
            Message::text("t"),
            Message::binary(vec![1]),
            Message::close(CloseCode::Normal),
        ] {
            let opcode = message.opcode();
            let frame = Frame::from(message);
            assert!(frame.fin);
            assert!(frame.is_masked());
            assert_eq!(frame.opcode, opcode);
        }
    }

    #[test]
    fn test_close_encodes_code_only() {
        let frame = Frame::from(Message::close(CloseCode::Away));
        assert_eq!(frame.payload, Bytes::from_static(&[0x03, 0xE9]));

        let frame = Frame::from(Message::close(CloseCode::Unknown(4000)));
        assert_eq!(frame.payload, Bytes::copy_from_slice(&4000u16.to_be_bytes()));
    }

    #[test]
    fn test_invalid_utf8_text_falls_back_to_binary() {
        let raw = vec![0xC3, 0x28, 0xFF];
        let response = Response::from(Frame::new(true, OpCode::Text, None, raw.clone()));
        assert_eq!(response.data, Some(Message::Binary(Bytes::from(raw))));
    }

    #[test]
    fn test_close_decoding() {
        let response = Response::from(Frame::new(
            true,
            OpCode::Close,
            None,
            Bytes::from_static(b"\x03\xE8bye"),
        ));
        assert_eq!(response.data, Some(Message::Close(CloseCode::Normal)));
        assert_eq!(response.frame.close_reason(), Some("bye"));

        let response = Response::from(Frame::new(true, OpCode::Close, None, Bytes::new()));
        assert_eq!(response.data, Some(Message::Close(CloseCode::Unknown(0))));

        let response = Response::from(Frame::new(true, OpCode::Close, None, vec![0x03]));
        assert_eq!(response.data, Some(Message::Close(CloseCode::Unknown(0))));
    }

    #[test]
    fn test_untyped_frames_keep_raw_frame() {
        for opcode in [OpCode::Ping, OpCode::Pong, OpCode::Continuation] {
            let frame = Frame::new(opcode != OpCode::Continuation, opcode, None, "raw");
            let response = Response::from(frame.clone());
            assert_eq!(response.data, None);
            assert_eq!(response.frame, frame);
        }
    }

    #[test]
    fn test_each_frame_gets_a_fresh_key() {
        let keys: Vec<_> = (0..8)
            .map(|_| Frame::from(Message::text("x")).mask_key())
            .collect();
        assert!(keys.iter().all(Option::is_some));
        assert!(keys.windows(2).any(|w| w[0] != w[1]));
    }
}
