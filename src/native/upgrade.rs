//! HTTP/1.1 upgrade from a fresh byte stream to a framed WebSocket channel.
use base64::prelude::*;
use bytes::Bytes;
use http_body_util::Empty;
use hyper::{
    client::conn::http1::SendRequest, header, upgrade::Upgraded, Method, Request, Response,
    StatusCode,
};
use hyper_util::rt::TokioIo;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, FramedParts};

use super::{options::Configuration, Endpoint};
use crate::{codec::Codec, Result, WebSocketError};

/// GUID appended to the client key when computing `Sec-WebSocket-Accept`.
const ACCEPT_GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Runs the opening handshake over `io` and returns the framed channel.
///
/// The HTTP connection is driven by a task on the configured runtime until the peer either
/// switches protocols or refuses. On refusal the task is aborted and awaited, so `io` has
/// been dropped by the time [`WebSocketError::CannotUpgrade`] is returned. Bytes the peer
/// sent right after its response are kept in the frame decoder's buffer.
pub(crate) async fn handshake<S>(
    endpoint: &Endpoint,
    configuration: &Configuration,
    io: S,
) -> Result<Framed<S, Codec>>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let runtime = configuration.runtime()?;
    let key = generate_key();

    let request = Request::builder()
        .method(Method::GET)
        .uri(endpoint.path())
        .header(header::HOST, endpoint.host_header())
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CONTENT_LENGTH, "0")
        .header(header::UPGRADE, "websocket")
        .header(header::CONNECTION, "upgrade")
        .header(header::SEC_WEBSOCKET_KEY, key.as_str())
        .header(header::SEC_WEBSOCKET_VERSION, "13")
        .body(Empty::<Bytes>::new())?;

    #[cfg(feature = "logging")]
    log::debug!("upgrading {}", endpoint);

    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(io)).await?;

    let conn_task = runtime.spawn(async move {
        if let Err(_err) = conn.with_upgrades().await {
            #[cfg(feature = "logging")]
            log::error!("upgrading connection: {:?}", _err);
        }
    });

    let upgraded = match request_upgrade(&mut sender, request, &key).await {
        Ok(upgraded) => upgraded,
        Err(err) => {
            #[cfg(feature = "logging")]
            log::debug!("upgrade of {} failed: {}", endpoint, err);

            drop(sender);
            conn_task.abort();
            let _ = conn_task.await;
            return Err(err);
        }
    };

    let parts = upgraded
        .downcast::<TokioIo<S>>()
        .map_err(|_| WebSocketError::CannotUpgrade)?;

    let mut framed_parts =
        FramedParts::new(parts.io.into_inner(), Codec::new(configuration.max_frame_size()));
    framed_parts.read_buf = parts.read_buf.as_ref().into();

    let mut framed = Framed::from_parts(framed_parts);
    if let Some(boundary) = configuration.backpressure_boundary() {
        framed.set_backpressure_boundary(boundary);
    }

    #[cfg(feature = "logging")]
    log::debug!("upgraded {}", endpoint);

    Ok(framed)
}

async fn request_upgrade(
    sender: &mut SendRequest<Empty<Bytes>>,
    request: Request<Empty<Bytes>>,
    key: &str,
) -> Result<Upgraded> {
    let mut response = sender.send_request(request).await?;
    verify(&response, key)?;
    Ok(hyper::upgrade::on(&mut response).await?)
}

/// Checks that the peer switched to the WebSocket protocol for our key.
fn verify<B>(response: &Response<B>, key: &str) -> Result<()> {
    if response.status() != StatusCode::SWITCHING_PROTOCOLS {
        return Err(WebSocketError::CannotUpgrade);
    }

    let headers = response.headers();

    let upgrade = headers
        .get(header::UPGRADE)
        .and_then(|h| h.to_str().ok())
        .map(|h| h.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);

    let connection = headers
        .get(header::CONNECTION)
        .and_then(|h| h.to_str().ok())
        .map(|h| h.split(',').any(|token| token.trim().eq_ignore_ascii_case("upgrade")))
        .unwrap_or(false);

    let accept = headers
        .get(header::SEC_WEBSOCKET_ACCEPT)
        .map(|h| h.as_bytes() == accept_key(key).as_bytes())
        .unwrap_or(false);

    if upgrade && connection && accept {
        Ok(())
    } else {
        Err(WebSocketError::CannotUpgrade)
    }
}

fn generate_key() -> String {
    let input: [u8; 16] = rand::random();
    BASE64_STANDARD.encode(input)
}

/// The `Sec-WebSocket-Accept` value a peer must answer `key` with.
pub(crate) fn accept_key(key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key.as_bytes());
    sha1.update(ACCEPT_GUID);
    BASE64_STANDARD.encode(sha1.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, headers: &[(&str, &str)]) -> Response<()> {
        let mut builder = Response::builder().status(status);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_accept_key() {
        // example from RFC 6455 section 1.3
        assert_eq!(
            accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn test_generated_keys_are_16_bytes() {
        let key = generate_key();
        assert_eq!(BASE64_STANDARD.decode(&key).unwrap().len(), 16);
        assert_ne!(key, generate_key());
    }

    #[test]
    fn test_verify_accepts_switching_protocols() {
        let key = generate_key();
        let accept = accept_key(&key);
        let ok = response(
            101,
            &[
                ("upgrade", "WebSocket"),
                ("connection", "keep-alive, Upgrade"),
                ("sec-websocket-accept", &accept),
            ],
        );
        assert!(verify(&ok, &key).is_ok());
    }

    #[test]
    fn test_verify_rejects() {
        let key = generate_key();
        let accept = accept_key(&key);

        let cases = [
            response(200, &[("upgrade", "websocket"), ("connection", "upgrade")]),
            response(101, &[("connection", "upgrade"), ("sec-websocket-accept", &accept)]),
            response(101, &[("upgrade", "websocket"), ("sec-websocket-accept", &accept)]),
            response(101, &[("upgrade", "websocket"), ("connection", "upgrade")]),
            response(
                101,
                &[
                    ("upgrade", "websocket"),
                    ("connection", "upgrade"),
                    ("sec-websocket-accept", "bogus"),
                ],
            ),
        ];

        for case in cases {
            assert!(matches!(
                verify(&case, &key),
                Err(WebSocketError::CannotUpgrade)
            ));
        }
    }
}
