use clap::{Parser, Subcommand};

mod client;

/// Interactive WebSocket client
///
/// Every line typed is sent as a text message. Supports inline comments using // for
/// documenting messages. Comments can be searched with ctrl+r in history.
///
/// Examples:
///   {"type": "ping"} // Heartbeat
///   /close 1001
///
#[derive(Parser)]
#[command(author, version)]
struct Cli {
    /// Log connection setup and teardown to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Client(client::Cmd),
}

fn main() {
    let args = Cli::parse();

    if args.verbose {
        let _ = simple_logger::SimpleLogger::new()
            .with_level(log::LevelFilter::Debug)
            .init();
    }

    let res = match args.command {
        Commands::Client(cmd) => client::run(cmd),
    };
    if let Err(err) = res {
        eprintln!("{:?}", err);
    }
}
