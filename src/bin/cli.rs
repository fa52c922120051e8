//! socketmap-lookup
//!
//! Command-line client that performs a single socketmap lookup.

use clap::builder::NonEmptyStringValueParser;
use clap::Parser;
use socketmap::{Client, ClientConfig, Network};
use tracing_subscriber::{fmt, EnvFilter};

/// Socketmap test client
#[derive(Parser, Debug)]
#[command(name = "socketmap-lookup")]
#[command(about = "Look up one key on a socketmap server")]
#[command(version)]
struct Args {
    /// Protocol family (tcp or unix)
    #[arg(long, default_value = "tcp")]
    proto: Network,

    /// Server address/port or unix domain socket path
    #[arg(long, default_value = socketmap::config::DEFAULT_ADDR)]
    addr: String,

    /// Name of the map to use for lookup
    #[arg(long = "map", value_name = "NAME", value_parser = NonEmptyStringValueParser::new())]
    map: String,

    /// Name of the entry to look up
    #[arg(long, value_name = "NAME", value_parser = NonEmptyStringValueParser::new())]
    key: String,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    let config = ClientConfig::builder()
        .network(args.proto)
        .addr(&args.addr)
        .max_connections(1)
        .build();

    let client = Client::with_config(config);
    let result = client.lookup(&args.map, &args.key);
    client.close();

    match result {
        Ok(Some(value)) => tracing::info!("OK {:?}", value),
        Ok(None) => tracing::info!("NOTFOUND"),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}
