/// Example delegate driven session against a public echo server
use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use wsclient::{
    CloseCode, Configuration, Message, Response, SessionDelegate, WebSocketSession,
};

/// Forwards everything the session reports to the main task.
struct Forwarder {
    tx: UnboundedSender<String>,
}

impl SessionDelegate for Forwarder {
    fn did_receive(&self, response: Response) {
        let line = match response.data {
            Some(Message::Text(text)) => text,
            Some(other) => format!("{other:?}"),
            None => format!("<{:?}>", response.frame.opcode),
        };
        let _ = self.tx.send(line);
    }

    fn did_receive_close(&self, code: CloseCode, reason: &str) {
        let _ = self.tx.send(format!("server closed: {code} {reason}"));
    }

    fn did_close(&self) {
        log::info!("session closed");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    simple_logger::init_with_level(log::Level::Debug).expect("log");

    let (tx, mut rx) = unbounded_channel();
    let delegate = Arc::new(Forwarder { tx });

    let session = WebSocketSession::new(
        "wss://echo.websocket.org".parse()?,
        Configuration::default(),
        &delegate,
    );

    // nothing is sent before connecting
    session.send(Message::text("dropped")).await?;

    session.connect().await?;

    for i in 0..3 {
        session.send(Message::text(format!("hello {i}"))).await?;
    }

    let deadline = tokio::time::sleep(Duration::from_secs(5));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            line = rx.recv() => match line {
                Some(line) => log::info!("{line}"),
                None => break,
            },
        }
    }

    session.disconnect().await;
    Ok(())
}
