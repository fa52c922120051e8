//! Configuration for socketmap
//!
//! Centralized client and server configuration with sensible defaults.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;

/// Default address used by both command-line tools
pub const DEFAULT_ADDR: &str = "127.0.0.1:10931";

/// Transport family a client dials or a server listens on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    /// TCP, address is `host:port`
    #[default]
    Tcp,

    /// Unix domain stream socket, address is a filesystem path
    Unix,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Tcp => f.write_str("tcp"),
            Network::Unix => f.write_str("unix"),
        }
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Network::Tcp),
            "unix" => Ok(Network::Unix),
            other => Err(Error::Config(format!("invalid protocol name {:?}", other))),
        }
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for a [`Client`](crate::Client) and its connection pool
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Transport family to dial
    pub network: Network,

    /// Server address (`host:port` or socket path)
    pub addr: String,

    /// Max connections held by the pool (idle + in use)
    pub max_connections: usize,

    /// Upper bound on a single connect attempt
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: Network::Tcp,
            addr: DEFAULT_ADDR.to_string(),
            max_connections: 10,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Create a new client config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the transport family
    pub fn network(mut self, network: Network) -> Self {
        self.config.network = network;
        self
    }

    /// Set the server address
    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.config.addr = addr.into();
        self
    }

    /// Set the pool capacity (clamped to at least one)
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count.max(1);
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for a [`Server`](crate::network::Server)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Transport family to listen on
    pub network: Network,

    /// Listen address (`host:port` or socket path)
    pub listen_addr: String,

    /// Deadline for a single handler invocation
    pub handler_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            network: Network::Tcp,
            listen_addr: DEFAULT_ADDR.to_string(),
            handler_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Create a new server config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set the transport family
    pub fn network(mut self, network: Network) -> Self {
        self.config.network = network;
        self
    }

    /// Set the listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the per-request handler deadline
    pub fn handler_timeout(mut self, timeout: Duration) -> Self {
        self.config.handler_timeout = timeout;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}
