//! surisock - send commands to a running Suricata over its unix socket.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use surisock::{default_socket_path, KeyedArguments, ReadMode, SessionConfig, SuricataSocket};

#[derive(Parser, Debug)]
#[command(name = "surisock", version, about = "Send commands to Suricata over its unix socket")]
struct Cli {
    /// Command socket path (defaults to $SURICATA_SOCKET, then the stock install path)
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Keep reading until a complete response has arrived
    #[arg(long)]
    until_complete: bool,

    /// Print the commands the server accepts and exit
    #[arg(long, conflicts_with = "command")]
    list: bool,

    /// Keyed argument, may be repeated
    #[arg(
        short = 'a',
        long = "arg",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value,
        conflicts_with = "args"
    )]
    keyed: Vec<(String, String)>,

    /// Command to send (e.g. uptime, iface-stat, pcap-file)
    #[arg(required_unless_present = "list")]
    command: Option<String>,

    /// Positional arguments for the command
    args: Vec<String>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {}", raw))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "surisock=info".into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let socket_path = cli.socket.clone().unwrap_or_else(default_socket_path);

    let config = SessionConfig {
        read_mode: if cli.until_complete {
            ReadMode::UntilComplete
        } else {
            ReadMode::SingleRead
        },
        ..SessionConfig::default()
    };

    let mut socket = SuricataSocket::open_with_config(&socket_path, config)
        .await
        .with_context(|| format!("Failed to open Suricata socket at {}", socket_path.display()))?;
    tracing::info!(path = %socket_path.display(), "Session initialized");

    let result = run(&mut socket, &cli).await;

    if let Err(e) = socket.close().await {
        tracing::warn!("Failed to close socket cleanly: {}", e);
    }
    result
}

async fn run(socket: &mut SuricataSocket, cli: &Cli) -> Result<ExitCode> {
    if cli.list {
        for command in socket.valid_commands() {
            println!("{}", command);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command.as_deref() else {
        bail!("No command given");
    };

    let sent = if cli.keyed.is_empty() {
        socket.send(command, cli.args.as_slice()).await
    } else {
        let mut keyed = KeyedArguments::new();
        for (key, value) in &cli.keyed {
            keyed.entry(key.clone()).or_default().push(value.clone());
        }
        socket.send_keyed(command, &keyed).await
    };
    let response = sent.with_context(|| format!("Command {} failed", command))?;

    println!(
        "{}",
        response
            .message_pretty()
            .context("Failed to render response")?
    );

    if response.is_ok() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!(status = %response.status, "{} returned an error", command);
        Ok(ExitCode::FAILURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("output-dir=/tmp/out").unwrap(),
            ("output-dir".to_string(), "/tmp/out".to_string())
        );
        assert!(parse_key_value("no-equals").is_err());
    }

    #[test]
    fn test_cli_positional() {
        let cli = Cli::try_parse_from(["surisock", "pcap-file", "cap.pcap", "/out"]).unwrap();
        assert_eq!(cli.command.as_deref(), Some("pcap-file"));
        assert_eq!(cli.args, vec!["cap.pcap", "/out"]);
        assert!(cli.keyed.is_empty());
    }

    #[test]
    fn test_cli_keyed() {
        let cli = Cli::try_parse_from(["surisock", "-a", "iface=eth0", "iface-stat"]).unwrap();
        assert_eq!(cli.keyed, vec![("iface".to_string(), "eth0".to_string())]);
    }

    #[test]
    fn test_cli_requires_command_or_list() {
        assert!(Cli::try_parse_from(["surisock"]).is_err());
        assert!(Cli::try_parse_from(["surisock", "--list"]).is_ok());
    }
}
