use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use nano_network::wire::constants::NANO_TCP_PORT;
use nano_network::wire::{Header, Message};
use nano_network::{Conversation, Direction, Error};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Replays a captured Nano TCP conversation and prints every decoded
/// message.
///
/// Input is one segment per line: `C <hex>` for bytes the client sent,
/// `S <hex>` for bytes the server sent. Blank lines and lines starting with
/// `#` are ignored.
#[derive(Parser)]
#[command(name = "nano-replay")]
struct Cli {
    /// Capture file; standard input when omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Port the server side of the conversation listens on.
    #[arg(long, default_value_t = NANO_TCP_PORT)]
    server_port: u16,

    /// Log every framed message.
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut conversation = Conversation::new(cli.server_port);
    let mut total = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let Some((direction, bytes)) = parse_line(index + 1, &line)? else {
            continue;
        };

        for result in conversation.feed(direction, &bytes) {
            match result {
                Ok(decoded) => {
                    total += 1;
                    print_message(
                        decoded.direction,
                        decoded.length,
                        decoded.header.as_ref(),
                        &decoded.message,
                    );
                }
                Err(e) => error!(line = index + 1, "{e}"),
            }
        }
    }

    for direction in [Direction::ClientToServer, Direction::ServerToClient] {
        let left = conversation.buffered(direction);
        if left > 0 {
            info!(%direction, bytes = left, "incomplete message left in buffer");
        }
    }

    info!(messages = total, "replay finished");
    Ok(())
}

fn parse_line(number: usize, line: &str) -> Result<Option<(Direction, Vec<u8>)>, Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (tag, data) = line
        .split_once(char::is_whitespace)
        .ok_or_else(|| Error::InvalidInput(format!("line {number}: expected `<C|S> <hex>`")))?;

    let direction = match tag {
        "C" | "c" => Direction::ClientToServer,
        "S" | "s" => Direction::ServerToClient,
        other => {
            return Err(Error::InvalidInput(format!(
                "line {number}: unknown direction `{other}`"
            )))
        }
    };

    let compact: String = data.split_whitespace().collect();
    let bytes = hex::decode(&compact)
        .map_err(|e| Error::InvalidInput(format!("line {number}: {e}")))?;

    Ok(Some((direction, bytes)))
}

fn describe_header(header: &Header) -> String {
    format!(
        "{}, version {} (min {}, max {}), extensions 0x{:04x}: {}",
        header.network().name(),
        header.version_using,
        header.version_min,
        header.version_max,
        header.extensions.raw(),
        header.extensions.decode(header.packet_type)
    )
}

fn print_message(direction: Direction, length: usize, header: Option<&Header>, message: &Message) {
    let tag = match direction {
        Direction::ClientToServer => "C->S",
        Direction::ServerToClient => "S->C",
    };

    println!("[{tag}] {} ({length} bytes)", message.summary());
    if let Some(header) = header {
        println!("    {}", describe_header(header));
    }

    match message {
        Message::Keepalive(peers) => {
            for (slot, peer) in peers.iter().enumerate() {
                println!("    peer {slot}: {peer}");
            }
        }
        Message::FrontierResponse(response) if !response.is_end() => {
            println!("    account:  {}", hex::encode(response.account));
            println!("    frontier: {}", hex::encode(response.frontier));
        }
        Message::TelemetryAck(ack) => {
            println!(
                "    blocks: {}, cemented: {}, peers: {}, version: {}.{}",
                ack.block_count,
                ack.cemented_count,
                ack.peer_count,
                ack.major_version,
                ack.minor_version
            );
            if let Some(ts) = ack.timestamp() {
                println!("    timestamp: {}", ts.to_rfc3339());
            }
        }
        Message::Unsupported { payload, .. } | Message::UnexpectedHeaderless { payload, .. } => {
            println!("    payload: {}", hex::encode(payload));
        }
        _ => {}
    }
}
