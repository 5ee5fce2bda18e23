#![allow(dead_code)]

use std::{
    io,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    task::{Context, Poll},
};

use base64::prelude::*;
use futures::future::BoxFuture;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};
use wsclient::{Endpoint, Transport};

pub fn endpoint() -> Endpoint {
    Endpoint::new("localhost", 9001, false).with_path("/chat")
}

/// Creates the client end of an in-memory connection and the scripted server end.
pub fn pair() -> (CountingIo, Peer, Arc<AtomicUsize>) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let drops = Arc::new(AtomicUsize::new(0));
    let io = CountingIo {
        inner: client,
        drops: Arc::clone(&drops),
    };
    (io, Peer { io: server }, drops)
}

/// Duplex stream that counts how many times it has been dropped.
pub struct CountingIo {
    inner: DuplexStream,
    drops: Arc<AtomicUsize>,
}

impl Drop for CountingIo {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

impl AsyncRead for CountingIo {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for CountingIo {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Transport handing out a single prepared stream.
pub struct MockTransport {
    io: Mutex<Option<CountingIo>>,
    opens: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new(io: CountingIo) -> (Self, Arc<AtomicUsize>) {
        let opens = Arc::new(AtomicUsize::new(0));
        let transport = Self {
            io: Mutex::new(Some(io)),
            opens: Arc::clone(&opens),
        };
        (transport, opens)
    }
}

impl Transport for MockTransport {
    type Io = CountingIo;

    fn open(&self, _endpoint: &Endpoint) -> BoxFuture<'static, wsclient::Result<Self::Io>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let io = self.io.lock().unwrap().take();
        Box::pin(async move {
            io.ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected).into())
        })
    }
}

/// A frame as read by the peer, already unmasked.
#[derive(Debug, PartialEq, Eq)]
pub struct PeerFrame {
    pub fin: bool,
    pub opcode: u8,
    pub masked: bool,
    pub payload: Vec<u8>,
}

/// Server side of an in-memory connection, driven step by step by a test.
pub struct Peer {
    io: DuplexStream,
}

impl Peer {
    /// Reads the HTTP upgrade request, stopping right after the blank line.
    pub async fn read_request(&mut self) -> String {
        let mut request = Vec::new();
        while !request.ends_with(b"\r\n\r\n") {
            request.push(self.io.read_u8().await.unwrap());
        }
        String::from_utf8(request).unwrap()
    }

    /// Answers `request` with `101 Switching Protocols`, followed by `trailing` in the same write.
    pub async fn switch_protocols(&mut self, request: &str, trailing: &[u8]) {
        let key = header(request, "sec-websocket-key").unwrap();
        let mut sha1 = Sha1::new();
        sha1.update(key.as_bytes());
        sha1.update(b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11");
        let accept = BASE64_STANDARD.encode(sha1.finalize());

        let mut response = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: {accept}\r\n\r\n"
        )
        .into_bytes();
        response.extend_from_slice(trailing);

        self.io.write_all(&response).await.unwrap();
    }

    /// Reads the request and accepts it.
    pub async fn accept(&mut self) -> String {
        let request = self.read_request().await;
        self.switch_protocols(&request, &[]).await;
        request
    }

    /// Answers the upgrade request with a plain HTTP response.
    pub async fn reject(&mut self, status: &str) {
        self.read_request().await;
        let response = format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\n\r\n");
        self.io.write_all(response.as_bytes()).await.unwrap();
    }

    /// Writes an unmasked, final frame.
    pub async fn send(&mut self, opcode: u8, payload: &[u8]) {
        self.io.write_all(&server_frame(opcode, payload)).await.unwrap();
    }

    /// Like [`send`](Self::send), for a client that may already be gone.
    pub async fn try_send(&mut self, opcode: u8, payload: &[u8]) -> io::Result<()> {
        self.io.write_all(&server_frame(opcode, payload)).await
    }

    /// Reads one frame, `None` once the client has shut the connection down.
    pub async fn read_frame(&mut self) -> Option<PeerFrame> {
        let mut head = [0u8; 2];
        if self.io.read_exact(&mut head).await.is_err() {
            return None;
        }

        let len = match head[1] & 0x7F {
            126 => self.io.read_u16().await.ok()? as usize,
            127 => self.io.read_u64().await.ok()? as usize,
            len => len as usize,
        };

        let masked = head[1] & 0x80 != 0;
        let mut mask = [0u8; 4];
        if masked {
            self.io.read_exact(&mut mask).await.ok()?;
        }

        let mut payload = vec![0u8; len];
        self.io.read_exact(&mut payload).await.ok()?;
        if masked {
            for (i, byte) in payload.iter_mut().enumerate() {
                *byte ^= mask[i % 4];
            }
        }

        Some(PeerFrame {
            fin: head[0] & 0x80 != 0,
            opcode: head[0] & 0x0F,
            masked,
            payload,
        })
    }

    /// Reads until the client shuts the connection down, returning what was left.
    pub async fn read_to_end(&mut self) -> Vec<u8> {
        let mut rest = Vec::new();
        let _ = self.io.read_to_end(&mut rest).await;
        rest
    }
}

/// Encodes an unmasked, final frame as a server would send it.
pub fn server_frame(opcode: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![0x80 | opcode];
    match payload.len() {
        len if len < 126 => frame.push(len as u8),
        len if len <= u16::MAX as usize => {
            frame.push(126);
            frame.extend_from_slice(&(len as u16).to_be_bytes());
        }
        len => {
            frame.push(127);
            frame.extend_from_slice(&(len as u64).to_be_bytes());
        }
    }
    frame.extend_from_slice(payload);
    frame
}

/// Value of header `name` in a raw HTTP message, case-insensitive.
pub fn header<'a>(message: &'a str, name: &str) -> Option<&'a str> {
    message.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim())
    })
}
