//! kvgate-cli - kvgate Command Line Interface

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use kvgate::{DatagramSender, KvgateClient, KvgateError};

const DEFAULT_URL: &str = "http://localhost:5000";
const DEFAULT_UDP_ADDR: &str = "localhost:5000";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// kvgate HTTP API URL
    #[arg(short, long, env = "KVGATE_URL", default_value = DEFAULT_URL)]
    url: String,

    /// kvgate UDP listener address (host:port)
    #[arg(long, env = "KVGATE_UDP_ADDR", default_value = DEFAULT_UDP_ADDR)]
    udp: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that the HTTP API is up
    Health,

    /// Insert or overwrite a key over HTTP
    Upload { key: String, value: String },

    /// Print every key and value
    Get,

    /// Delete a key over HTTP
    Delete { key: String },

    /// Send a single `key:value` datagram (no acknowledgment)
    Send { key: String, value: String },

    /// Push a sequence of values for one key, then print the snapshot
    Stream {
        key: String,

        /// Number of updates to send
        #[arg(long, default_value_t = 100)]
        count: u32,

        /// Delay between updates in milliseconds
        #[arg(long, default_value_t = 10)]
        interval_ms: u64,

        /// Path to send the updates over
        #[arg(long, value_enum, default_value_t = Transport::Udp)]
        transport: Transport,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Transport {
    Udp,
    Http,
}

fn resolve_udp(addr: &str) -> Result<SocketAddr> {
    addr.to_socket_addrs()
        .with_context(|| format!("Invalid UDP address: {}", addr))?
        .next()
        .with_context(|| format!("UDP address did not resolve: {}", addr))
}

async fn datagram_sender(cli: &Cli) -> Result<DatagramSender> {
    let target = resolve_udp(&cli.udp)?;
    DatagramSender::new(target)
        .await
        .context("Failed to open UDP socket")
}

async fn cmd_health(cli: &Cli) -> Result<()> {
    let client = KvgateClient::new(&cli.url);
    let status = client
        .health()
        .await
        .with_context(|| format!("Health check against {} failed", cli.url))?;
    println!("{} {}", "Healthy:".green().bold(), status);
    Ok(())
}

async fn cmd_upload(cli: &Cli, key: &str, value: &str) -> Result<()> {
    let client = KvgateClient::new(&cli.url);
    let message = client.upload(key, value).await?;
    println!("{}", message.green());
    Ok(())
}

async fn cmd_get(cli: &Cli) -> Result<()> {
    let client = KvgateClient::new(&cli.url);
    let snapshot = client.get_all().await?;

    if snapshot.is_empty() {
        println!("{}", "Registry is empty.".yellow());
        return Ok(());
    }

    println!("{}", format!("Entries ({}):", snapshot.len()).cyan().bold());
    for (key, value) in &snapshot {
        println!("  {} = {}", key.bold(), value);
    }

    Ok(())
}

async fn cmd_delete(cli: &Cli, key: &str) -> Result<()> {
    let client = KvgateClient::new(&cli.url);
    match client.delete(key).await {
        Ok(message) => {
            println!("{}", message.green());
            Ok(())
        }
        Err(KvgateError::KeyNotFound(key)) => {
            bail!("{}", format!("Key '{}' not found.", key).red())
        }
        Err(e) => Err(e.into()),
    }
}

async fn cmd_send(cli: &Cli, key: &str, value: &str) -> Result<()> {
    let sender = datagram_sender(cli).await?;
    let sent = sender.send(key, value).await?;
    println!(
        "{}",
        format!("Sent {} bytes to {}", sent, sender.target()).green()
    );
    Ok(())
}

async fn cmd_stream(
    cli: &Cli,
    key: &str,
    count: u32,
    interval_ms: u64,
    transport: Transport,
) -> Result<()> {
    let client = KvgateClient::new(&cli.url);
    let sender = match transport {
        Transport::Udp => Some(datagram_sender(cli).await?),
        Transport::Http => None,
    };

    println!(
        "{}",
        format!("Streaming {} updates for '{}' over {:?}...", count, key, transport).green()
    );

    let interval = Duration::from_millis(interval_ms);
    for i in 0..count {
        let value = format!("{} 0 0", i);
        match &sender {
            Some(sender) => {
                sender.send(key, &value).await?;
            }
            None => {
                client.upload(key, &value).await?;
            }
        }
        tokio::time::sleep(interval).await;
    }

    let snapshot = client.get_all().await?;
    match snapshot.get(key) {
        Some(value) => println!("{} {} = {}", "Final:".cyan().bold(), key, value),
        None => println!("{}", format!("Key '{}' is not present.", key).yellow()),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Health => cmd_health(&cli).await,
        Commands::Upload { key, value } => cmd_upload(&cli, key, value).await,
        Commands::Get => cmd_get(&cli).await,
        Commands::Delete { key } => cmd_delete(&cli, key).await,
        Commands::Send { key, value } => cmd_send(&cli, key, value).await,
        Commands::Stream {
            key,
            count,
            interval_ms,
            transport,
        } => cmd_stream(&cli, key, *count, *interval_ms, *transport).await,
    }
}
