//! # socketmap
//!
//! Client and server for the Sendmail/Postfix socketmap protocol, which lets
//! a mail transfer agent query external lookup tables over a persistent
//! connection.
//!
//! - Netstring-style framing, binary safe, payloads up to 100000 bytes
//! - Pooled client with one retry on stale connections
//! - Thread-per-connection server with a per-request deadline
//! - Cooperative cancellation through [`Context`]
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────┐             ┌──────────────────────────┐
//! │          Client          │             │          Server          │
//! │  lookup(ctx, map, key)   │             │   accept ─► thread/conn  │
//! └────────────┬─────────────┘             └────────────┬─────────────┘
//!              │                                        │
//!   ┌──────────▼──────────┐                  ┌──────────▼──────────┐
//!   │        Pool         │                  │     Connection      │
//!   │ acquire / release / │                  │ read ─► Handler ─►  │
//!   │      destroy        │                  │  (deadline) ─► write│
//!   └──────────┬──────────┘                  └──────────┬──────────┘
//!              │                                        │
//!              └────────────► Codec ◄───────────────────┘
//!                       <len>:<payload>,
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use socketmap::{Client, Network};
//!
//! let client = Client::new(Network::Tcp, "127.0.0.1:10931");
//! match client.lookup("virtual", "user@example.com") {
//!     Ok(Some(value)) => println!("OK {}", value),
//!     Ok(None) => println!("NOTFOUND"),
//!     Err(e) => eprintln!("lookup failed: {}", e),
//! }
//! client.close();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod context;

pub mod protocol;
pub mod pool;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Error, Result};
pub use config::{ClientConfig, Network, ServerConfig};
pub use context::{CancelHandle, Context};
pub use client::Client;
pub use network::{listen_and_serve, serve, Handler, Server};
pub use protocol::MAX_SIZE;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of socketmap
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
