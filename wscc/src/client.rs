use std::time::Duration;

use clap::Args;
use futures::StreamExt;
use rustyline::ExternalPrinter;
use tokio::{
    runtime,
    sync::mpsc::{unbounded_channel, UnboundedReceiver},
    time::timeout,
};
use wsclient::{
    CloseCode, Configuration, Endpoint, Inbound, Message, Outbound, TcpTransport, Transport,
    WebSocketClient,
};

/// Command to connect and interact with a WebSocket server.
///
/// Lines are sent as text messages. `/ping [text]` sends a ping, `/close [code]` sends a
/// close frame and ends the session.
#[derive(Args)]
#[command(alias = "c")]
pub struct Cmd {
    /// Maximum duration to wait when establishing the connection.
    /// Accepts human-readable formats like "5s", "1m", "500ms".
    #[arg(short, long, value_parser = humantime::parse_duration, default_value = "5s")]
    timeout: Duration,

    /// When enabled, validates and pretty-prints received text messages as JSON.
    #[arg(long)]
    input_as_json: bool,

    /// Largest frame accepted from the server, in bytes.
    #[arg(long, default_value_t = wsclient::DEFAULT_MAX_FRAME_SIZE)]
    max_frame_size: usize,

    /// The server to connect to (ws://, wss://, http:// or https://).
    endpoint: Endpoint,
}

pub fn run(cmd: Cmd) -> anyhow::Result<()> {
    let history_path = home::home_dir()
        .ok_or(anyhow::anyhow!("unable to determine home path"))?
        .join(".wscc_history");

    // Handle user input with history
    let mut rl = rustyline::DefaultEditor::with_config(
        rustyline::Config::builder()
            .auto_add_history(true)
            .completion_type(rustyline::CompletionType::List)
            .max_history_size(1000)?
            .build(),
    )?;
    // ignore the error
    let _ = rl.load_history(&history_path);
    let printer = rl.create_external_printer()?;

    let runtime = runtime::Builder::new_current_thread().enable_all().build()?;
    let _guard = runtime.enter();

    let configuration = Configuration::default()
        .with_max_frame_size(cmd.max_frame_size)
        .with_runtime(runtime.handle().clone());

    let transport = TcpTransport::from(&configuration);
    let io = runtime.block_on(timeout(cmd.timeout, transport.open(&cmd.endpoint)))??;

    let (tx, rx) = unbounded_channel();

    runtime.spawn_blocking(move || loop {
        match rl.readline("> ") {
            Ok(mut line) => {
                let _ = rl.add_history_entry(line.as_str());
                // commented line
                if let Some(pos) = line.rfind("//") {
                    let _ = line.split_off(pos);
                }

                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(_) => {
                let _ = rl.save_history(&history_path);
                break;
            }
        }
    });

    let opts = Opts {
        input_as_json: cmd.input_as_json,
    };
    let endpoint = cmd.endpoint.clone();
    let client = WebSocketClient::new(cmd.endpoint, configuration);

    runtime.block_on(client.handshake(io, move |inbound, outbound| {
        println!("> Connected to {}", endpoint);
        Box::pin(interact(inbound, outbound, rx, printer, opts))
    }))?;

    runtime.shutdown_background();

    Ok(())
}

struct Opts {
    input_as_json: bool,
}

/// What a line typed by the user turns into.
fn parse_line(line: &str) -> anyhow::Result<(Message, bool)> {
    let trimmed = line.trim();

    if let Some(rest) = trimmed.strip_prefix("/close") {
        let code = match rest.trim() {
            "" => CloseCode::Normal,
            code => CloseCode::from(code.parse::<u16>()?),
        };
        return Ok((Message::close(code), true));
    }

    if let Some(rest) = trimmed.strip_prefix("/ping") {
        return Ok((Message::ping(rest.trim()), false));
    }

    Ok((Message::text(line), false))
}

async fn interact<S>(
    mut inbound: Inbound<'_, S>,
    mut outbound: Outbound<'_, S>,
    mut rx: UnboundedReceiver<String>,
    mut printer: impl ExternalPrinter + Send,
    opts: Opts,
) -> anyhow::Result<()>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
{
    loop {
        tokio::select! {
            line = rx.recv() => {
                let Some(line) = line else {
                    break;
                };

                let (message, last) = match parse_line(&line) {
                    Ok(parsed) => parsed,
                    Err(err) => {
                        let _ = printer.print(format!("invalid command: {}", err));
                        continue;
                    }
                };

                if let Err(err) = outbound.write(message).await {
                    let _ = printer.print(format!("unable to write: {}", err));
                    break;
                }
                if last {
                    break;
                }
            }
            response = inbound.next() => {
                let Some(response) = response else {
                    let _ = printer.print("<Disconnected>".to_string());
                    break;
                };

                let text = match response.data {
                    Some(Message::Text(text)) if opts.input_as_json => {
                        match serde_json::from_str::<serde_json::Value>(&text) {
                            Ok(ok) => format!("{:#}", ok),
                            Err(err) => format!("parsing json: {}", err),
                        }
                    }
                    Some(Message::Text(text)) => text,
                    Some(Message::Binary(bytes)) => format!("<Binary {} bytes>", bytes.len()),
                    Some(Message::Close(code)) => {
                        let reason = response.frame.close_reason().unwrap_or_default();
                        format!("<Close {} {}>", code, reason)
                    }
                    Some(Message::Ping(text)) => format!("<Ping {}>", text),
                    None => format!("<{:?}>", response.frame.opcode),
                };
                let _ = printer.print(text);
            }
        }
    }

    Ok(())
}
