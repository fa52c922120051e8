//! socketmap-log
//!
//! A socketmap server that logs every request and always answers NOTFOUND.
//! Useful for watching what an MTA asks its maps.

use clap::Parser;
use socketmap::{Context, Network, Result, Server, ServerConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// Socketmap request logger
#[derive(Parser, Debug)]
#[command(name = "socketmap-log")]
#[command(about = "Socketmap server that logs all requests and answers NOTFOUND")]
#[command(version)]
struct Args {
    /// Protocol family (tcp or unix)
    #[arg(long, default_value = "tcp")]
    proto: Network,

    /// Bind to address/port or unix domain socket path
    #[arg(long, default_value = socketmap::config::DEFAULT_ADDR)]
    addr: String,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,socketmap=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("socketmap-log v{}", socketmap::VERSION);

    let config = ServerConfig::builder()
        .network(args.proto)
        .listen_addr(&args.addr)
        .build();

    let server = Server::new(config, |_ctx: &Context, map: &str, key: &str| -> Result<Option<String>> {
        tracing::info!("{} {}", map, key);
        Ok(None)
    });

    if let Err(e) = server.listen_and_serve() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
