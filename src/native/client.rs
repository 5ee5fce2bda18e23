//! Scoped, stream based client.
use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::{
    future::BoxFuture,
    stream::{self, FusedStream, SplitSink, SplitStream},
    SinkExt, Stream, StreamExt,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use super::{
    options::Configuration,
    transport::{TcpTransport, Transport},
    upgrade, Endpoint,
};
use crate::{codec::Codec, Frame, Message, Response, Result, WebSocketError};

type Sink<S> = SplitSink<Framed<S, Codec>, Frame>;
type Source<S> = SplitStream<Framed<S, Codec>>;

/// A client that runs one WebSocket connection per call, scoped to a closure.
///
/// [`connect`](Self::connect) opens the transport, performs the upgrade and hands the body an
/// [`Inbound`] stream and an [`Outbound`] writer that borrow the connection. When the body
/// returns, with or without an error, the connection is shut down and released; dropping the
/// future returned by `connect` releases it as well. No close frame is sent on your behalf,
/// write [`Message::Close`] before returning for a clean closure.
///
/// # Example
/// ```no_run
/// use futures::StreamExt;
/// use wsclient::{Configuration, Message, WebSocketClient};
///
/// # async fn run() -> wsclient::Result<()> {
/// let client = WebSocketClient::new("ws://localhost:9001".parse()?, Configuration::default());
///
/// let echoed = client
///     .connect(|mut inbound, mut outbound| {
///         Box::pin(async move {
///             outbound.write(Message::text("hello")).await?;
///             Ok::<_, wsclient::WebSocketError>(inbound.next().await)
///         })
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct WebSocketClient<T: Transport = TcpTransport> {
    endpoint: Endpoint,
    configuration: Configuration,
    transport: T,
}

impl WebSocketClient {
    /// Creates a client that dials TCP, with TLS for secure endpoints.
    pub fn new(endpoint: Endpoint, configuration: Configuration) -> Self {
        let transport = TcpTransport::from(&configuration);
        Self::with_transport(endpoint, configuration, transport)
    }
}

impl<T: Transport> WebSocketClient<T> {
    /// Creates a client that opens its connections through `transport`.
    pub fn with_transport(endpoint: Endpoint, configuration: Configuration, transport: T) -> Self {
        Self {
            endpoint,
            configuration,
            transport,
        }
    }

    /// The endpoint connections are made to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Opens a connection, upgrades it and runs `body` with both directions of the channel.
    ///
    /// Connection and upgrade failures are returned before `body` runs. Whatever `body`
    /// returns is returned once the connection has been shut down.
    pub async fn connect<R, E, F>(&self, body: F) -> std::result::Result<R, E>
    where
        F: for<'a> FnOnce(
            Inbound<'a, T::Io>,
            Outbound<'a, T::Io>,
        ) -> BoxFuture<'a, std::result::Result<R, E>>,
        E: From<WebSocketError>,
    {
        let io = self.transport.open(&self.endpoint).await?;
        scoped(&self.endpoint, &self.configuration, io, body).await
    }

    /// Like [`connect`](Self::connect), over an already established stream.
    ///
    /// The stream is used as is: no TLS is layered on it regardless of the endpoint.
    pub async fn handshake<S, R, E, F>(&self, io: S, body: F) -> std::result::Result<R, E>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
        F: for<'a> FnOnce(
            Inbound<'a, S>,
            Outbound<'a, S>,
        ) -> BoxFuture<'a, std::result::Result<R, E>>,
        E: From<WebSocketError>,
    {
        scoped(&self.endpoint, &self.configuration, io, body).await
    }
}

async fn scoped<S, R, E, F>(
    endpoint: &Endpoint,
    configuration: &Configuration,
    io: S,
    body: F,
) -> std::result::Result<R, E>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    F: for<'a> FnOnce(
        Inbound<'a, S>,
        Outbound<'a, S>,
    ) -> BoxFuture<'a, std::result::Result<R, E>>,
    E: From<WebSocketError>,
{
    let framed = upgrade::handshake(endpoint, configuration, io).await?;
    let (mut sink, mut source) = framed.split();

    let result = body(Inbound::new(&mut source), Outbound::new(&mut sink)).await;

    if let Err(_err) = sink.close().await {
        #[cfg(feature = "logging")]
        log::debug!("shutting down {}: {}", endpoint, _err);
    }

    result
}

/// The receiving direction of a scoped connection.
///
/// A single pass [`Stream`] of [`Response`]s. It ends when the peer closes the transport or
/// when reading fails, and keeps returning `None` afterwards. Use
/// [`next_response`](Self::next_response) to observe the error that ended it.
pub struct Inbound<'a, S> {
    source: &'a mut Source<S>,
    terminated: bool,
}

impl<'a, S> Inbound<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn new(source: &'a mut Source<S>) -> Self {
        Self {
            source,
            terminated: false,
        }
    }

    /// Receives the next response.
    ///
    /// Returns `Ok(None)` once the stream has ended, and the read or decode error that ended
    /// it the one time it happens.
    pub async fn next_response(&mut self) -> Result<Option<Response>> {
        if self.terminated {
            return Ok(None);
        }

        match self.source.next().await {
            Some(Ok(frame)) => Ok(Some(Response::from(frame))),
            Some(Err(err)) => {
                self.terminated = true;
                Err(err)
            }
            None => {
                self.terminated = true;
                Ok(None)
            }
        }
    }
}

impl<S> Stream for Inbound<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    type Item = Response;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.terminated {
            return Poll::Ready(None);
        }

        match self.source.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(frame))) => Poll::Ready(Some(Response::from(frame))),
            Poll::Ready(Some(Err(_err))) => {
                #[cfg(feature = "logging")]
                log::debug!("inbound stream ended: {}", _err);

                self.terminated = true;
                Poll::Ready(None)
            }
            Poll::Ready(None) => {
                self.terminated = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S> FusedStream for Inbound<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

/// The sending direction of a scoped connection.
///
/// Every write waits until the transport has accepted and flushed the frame.
pub struct Outbound<'a, S> {
    sink: &'a mut Sink<S>,
}

impl<'a, S> Outbound<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn new(sink: &'a mut Sink<S>) -> Self {
        Self { sink }
    }

    /// Sends one message.
    pub async fn write(&mut self, message: Message) -> Result<()> {
        self.sink.send(Frame::from(message)).await
    }

    /// Sends every message of `messages`, in order.
    pub async fn write_all<I>(&mut self, messages: I) -> Result<()>
    where
        I: IntoIterator<Item = Message>,
    {
        let mut frames = stream::iter(
            messages
                .into_iter()
                .map(|message| Ok::<_, WebSocketError>(Frame::from(message))),
        );
        self.sink.send_all(&mut frames).await
    }

    /// Sends messages as `messages` produces them, until it ends.
    pub async fn write_stream<St>(&mut self, messages: St) -> Result<()>
    where
        St: Stream<Item = Message>,
    {
        let frames = messages.map(|message| Ok::<_, WebSocketError>(Frame::from(message)));
        futures::pin_mut!(frames);
        self.sink.send_all(&mut frames).await
    }
}
