//! Long lived, callback driven session.
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Weak,
};

use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::{codec::Framed, sync::CancellationToken};

use super::{
    options::Configuration,
    transport::{TcpTransport, Transport},
    upgrade, Endpoint,
};
use crate::{
    close::CloseCode, codec::Codec, Frame, Message, OpCode, Response, Result, WebSocketError,
};

type Sink<S> = SplitSink<Framed<S, Codec>, Frame>;
type Source<S> = SplitStream<Framed<S, Codec>>;

/// Receives the events of a [`WebSocketSession`].
///
/// Callbacks run on the session's receive task, one at a time and in wire order. Every
/// method has an empty default implementation.
pub trait SessionDelegate: Send + Sync {
    /// A frame other than a close frame arrived.
    fn did_receive(&self, _response: Response) {}

    /// The peer sent a close frame. Called at most once, before [`did_close`](Self::did_close).
    fn did_receive_close(&self, _code: CloseCode, _reason: &str) {}

    /// The connection is closed. Called exactly once for a session that was connected.
    fn did_close(&self) {}
}

enum State<S> {
    Unconnected,
    Open(Sink<S>),
    Closed,
}

struct Shared<S> {
    state: Mutex<State<S>>,
    delegate: Weak<dyn SessionDelegate>,
    notified: AtomicBool,
    abandoned: AtomicBool,
    cancel: CancellationToken,
}

impl<S> Shared<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    /// Tears the connection down if it is open.
    ///
    /// Reads and pending writes are cancelled first. The close frame is written only when
    /// `code` is given. Write failures are ignored: the transport is shut down and the
    /// delegate notified regardless.
    async fn close(&self, code: Option<CloseCode>) {
        self.cancel.cancel();

        let mut sink = {
            let mut state = self.state.lock().await;
            match std::mem::replace(&mut *state, State::Closed) {
                State::Open(sink) => sink,
                previous => {
                    *state = previous;
                    return;
                }
            }
        };

        // a frame cut short leaves the write side unframed
        if self.abandoned.load(Ordering::Acquire) {
            #[cfg(feature = "logging")]
            log::debug!("dropping transport after an abandoned write");
        } else {
            if let Some(code) = code {
                if let Err(_err) = sink.send(Frame::from(Message::Close(code))).await {
                    #[cfg(feature = "logging")]
                    log::warn!("sending close frame: {}", _err);
                }
            }

            if let Err(_err) = sink.close().await {
                #[cfg(feature = "logging")]
                log::debug!("shutting down transport: {}", _err);
            }
        }
        drop(sink);

        self.notify_closed();
    }

    fn notify_closed(&self) {
        if self.notified.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(delegate) = self.delegate.upgrade() {
            delegate.did_close();
        }
    }
}

/// A WebSocket connection that delivers inbound frames to a [`SessionDelegate`].
///
/// A session connects at most once. After it closes, locally or because the peer went
/// away, [`connect`](Self::connect) fails with [`WebSocketError::ConnectionClosed`] and
/// [`send`](Self::send) silently does nothing.
///
/// The delegate is held weakly: once the caller drops it, events are discarded.
///
/// ```no_run
/// use std::sync::Arc;
/// use wsclient::{Configuration, Message, Response, SessionDelegate, WebSocketSession};
///
/// struct Printer;
///
/// impl SessionDelegate for Printer {
///     fn did_receive(&self, response: Response) {
///         println!("{:?}", response.data);
///     }
/// }
///
/// # async fn run() -> wsclient::Result<()> {
/// let delegate = Arc::new(Printer);
/// let session = WebSocketSession::new(
///     "wss://echo.example.com".parse()?,
///     Configuration::default(),
///     &delegate,
/// );
///
/// session.connect().await?;
/// session.send(Message::text("hello")).await?;
/// session.disconnect().await;
/// # Ok(())
/// # }
/// ```
pub struct WebSocketSession<T: Transport = TcpTransport> {
    endpoint: Endpoint,
    configuration: Configuration,
    transport: T,
    connect_lock: Mutex<()>,
    reader: Mutex<Option<JoinHandle<()>>>,
    shared: Arc<Shared<T::Io>>,
}

impl WebSocketSession {
    /// Creates an unconnected session over TCP, with TLS for secure endpoints.
    pub fn new<D>(endpoint: Endpoint, configuration: Configuration, delegate: &Arc<D>) -> Self
    where
        D: SessionDelegate + 'static,
    {
        let transport = TcpTransport::from(&configuration);
        Self::with_transport(endpoint, configuration, transport, delegate)
    }
}

impl<T: Transport> WebSocketSession<T> {
    /// Creates an unconnected session that opens its connection through `transport`.
    pub fn with_transport<D>(
        endpoint: Endpoint,
        configuration: Configuration,
        transport: T,
        delegate: &Arc<D>,
    ) -> Self
    where
        D: SessionDelegate + 'static,
    {
        let delegate: Weak<D> = Arc::downgrade(delegate);
        let delegate: Weak<dyn SessionDelegate> = delegate;

        Self {
            endpoint,
            configuration,
            transport,
            connect_lock: Mutex::new(()),
            reader: Mutex::new(None),
            shared: Arc::new(Shared {
                state: Mutex::new(State::Unconnected),
                delegate,
                notified: AtomicBool::new(false),
                abandoned: AtomicBool::new(false),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// The endpoint the session connects to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns `true` while the connection is open.
    pub async fn is_open(&self) -> bool {
        matches!(*self.shared.state.lock().await, State::Open(_))
    }

    /// Opens the connection and starts delivering frames to the delegate.
    ///
    /// Does nothing if the session is already open. Concurrent calls are serialized, only
    /// the first one connects.
    ///
    /// # Errors
    /// - [`WebSocketError::ConnectionClosed`] if the session has been closed.
    /// - [`WebSocketError::CannotUpgrade`] if the peer refused the upgrade.
    /// - Transport errors, unchanged.
    pub async fn connect(&self) -> Result<()> {
        let _guard = self.connect_lock.lock().await;

        match *self.shared.state.lock().await {
            State::Open(_) => return Ok(()),
            State::Closed => return Err(WebSocketError::ConnectionClosed),
            State::Unconnected => {}
        }

        let runtime = self.configuration.runtime()?;
        let io = self.transport.open(&self.endpoint).await?;
        let framed = upgrade::handshake(&self.endpoint, &self.configuration, io).await?;
        let (sink, source) = framed.split();

        *self.shared.state.lock().await = State::Open(sink);

        let reader = runtime.spawn(receive(Arc::clone(&self.shared), source));
        *self.reader.lock().await = Some(reader);

        #[cfg(feature = "logging")]
        log::debug!("session connected to {}", self.endpoint);

        Ok(())
    }

    /// Sends a message.
    ///
    /// Without an open connection, before `connect` or after closing, nothing is sent and
    /// `Ok(())` is returned. A write the transport has not accepted when the session
    /// closes is abandoned, and `Ok(())` is returned as well.
    pub async fn send(&self, message: Message) -> Result<()> {
        let shared = &self.shared;
        let mut state = shared.state.lock().await;
        let sink = match &mut *state {
            State::Open(sink) if !shared.cancel.is_cancelled() => sink,
            _ => return Ok(()),
        };

        tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => {
                shared.abandoned.store(true, Ordering::Release);

                #[cfg(feature = "logging")]
                log::debug!("write abandoned, session closing");

                Ok(())
            }
            result = sink.send(Frame::from(message)) => result,
        }
    }

    /// Closes the connection with [`CloseCode::Normal`].
    pub async fn disconnect(&self) {
        self.disconnect_with(CloseCode::Normal).await
    }

    /// Sends a close frame with `code`, shuts the transport down and waits for the receive
    /// task to finish.
    ///
    /// The delegate's `did_close` has been called when this returns, unless the session was
    /// never connected.
    pub async fn disconnect_with(&self, code: CloseCode) {
        let _guard = self.connect_lock.lock().await;

        // never connected
        let Some(reader) = self.reader.lock().await.take() else {
            return;
        };

        self.shared.close(Some(code)).await;
        let _ = reader.await;
    }
}

impl<T: Transport> Drop for WebSocketSession<T> {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
        if let Ok(mut state) = self.shared.state.try_lock() {
            *state = State::Closed;
        }
    }
}

/// Reads frames until the peer closes, the transport fails or the session is cancelled.
async fn receive<S>(shared: Arc<Shared<S>>, mut source: Source<S>)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break,
            next = source.next() => next,
        };

        match next {
            Some(Ok(frame)) if frame.opcode == OpCode::Close => {
                let response = Response::from(frame);
                let code = match response.data {
                    Some(Message::Close(code)) => code,
                    _ => CloseCode::Unknown(0),
                };
                let reason =
                    String::from_utf8_lossy(response.frame.payload.get(2..).unwrap_or_default());

                #[cfg(feature = "logging")]
                log::debug!("received close {} {:?}", code, reason);

                if !shared.cancel.is_cancelled() {
                    if let Some(delegate) = shared.delegate.upgrade() {
                        delegate.did_receive_close(code, &reason);
                    }
                }

                shared.close(None).await;
                break;
            }
            Some(Ok(frame)) => {
                if shared.cancel.is_cancelled() {
                    break;
                }
                if let Some(delegate) = shared.delegate.upgrade() {
                    delegate.did_receive(Response::from(frame));
                }
            }
            Some(Err(_err)) => {
                #[cfg(feature = "logging")]
                log::debug!("receive failed: {}", _err);

                shared.close(None).await;
                break;
            }
            None => {
                shared.close(None).await;
                break;
            }
        }
    }

    #[cfg(feature = "logging")]
    log::trace!("receive task finished");
}
