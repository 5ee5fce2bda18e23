/// Example client that subscribes to Bybit's public trade stream for a few seconds
use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use tokio::time::{interval, sleep};
use tokio_rustls::{rustls, TlsConnector};
use wsclient::{CloseCode, Configuration, Message, OpCode, WebSocketClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    simple_logger::init_with_level(log::Level::Debug).expect("log");

    // Frames from this stream can be large
    let configuration = Configuration::default()
        .with_max_frame_size(1 << 20)
        .with_tls_provider(tls_connector());

    let client = WebSocketClient::new(
        "wss://stream.bybit.com/v5/public/linear".parse()?,
        configuration,
    );

    client
        .connect(|mut inbound, mut outbound| {
            Box::pin(async move {
                // JSON-formatted subscription request
                let text = r#"{
                    "req_id": "1",
                    "op": "subscribe",
                    "args": [
                        "publicTrade.BTCUSDT"
                    ]
                }"#;
                outbound.write(Message::text(text)).await?;

                // Send a ping every 3 seconds, stop after 10
                let mut ival = interval(Duration::from_secs(3));
                let deadline = sleep(Duration::from_secs(10));
                tokio::pin!(deadline);

                loop {
                    tokio::select! {
                        _ = ival.tick() => {
                            log::debug!("Tick");
                            outbound.write(Message::ping("idk")).await?;
                        }
                        _ = &mut deadline => {
                            outbound.write(Message::close(CloseCode::Normal)).await?;
                            break;
                        }
                        response = inbound.next() => {
                            let Some(response) = response else {
                                log::debug!("Disconnected");
                                break;
                            };

                            match response.data {
                                Some(Message::Text(text)) => {
                                    let value: serde_json::Value = serde_json::from_str(&text)?;
                                    log::info!("{value}");
                                }
                                Some(Message::Close(code)) => {
                                    log::debug!("Closed by server: {code}");
                                    break;
                                }
                                _ if response.frame.opcode == OpCode::Pong => {
                                    log::debug!("Pong: {:?}", response.frame.payload);
                                }
                                _ => {}
                            }
                        }
                    }
                }

                Ok::<_, anyhow::Error>(())
            })
        })
        .await
}

/// Creates a TLS connector trusting the webpki root certificates, without client
/// authentication.
fn tls_connector() -> TlsConnector {
    let mut root_cert_store = rustls::RootCertStore::empty();
    root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    // config.dangerous()... to ignore the cert verification

    TlsConnector::from(Arc::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth(),
    ))
}
