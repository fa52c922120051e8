//! Network Module
//!
//! Transports, the lookup handler interface, and the server.
//!
//! ## Architecture
//! - Single acceptor loop
//! - One thread per connection
//! - Requests answered by a shared `Handler`

mod connection;
mod handler;
mod server;
mod transport;

pub use connection::Connection;
pub use handler::Handler;
pub use server::{listen_and_serve, serve, Server};
pub use transport::{Dialer, Listener, NetDialer, NetListener, NetStream, Transport};
