//! Socketmap Server
//!
//! Accepts connections and serves each one on its own thread.

use std::sync::Arc;
use std::thread;

use crate::config::{Network, ServerConfig};
use crate::error::Result;

use super::{Connection, Handler, Listener, NetListener};

/// Socketmap server
pub struct Server<H: Handler> {
    config: ServerConfig,
    handler: Arc<H>,
}

impl<H: Handler> Server<H> {
    /// Create a new server with the given config and handler
    pub fn new(config: ServerConfig, handler: H) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address and serve (blocking)
    ///
    /// Only returns on a bind or accept failure.
    pub fn listen_and_serve(&self) -> Result<()> {
        let listener = NetListener::bind(self.config.network, &self.config.listen_addr)?;
        tracing::info!(
            "Listening on {} {}",
            self.config.network,
            listener.local_addr()
        );
        self.serve(listener)
    }

    /// Accept connections on `listener` until accepting fails (blocking)
    ///
    /// Each connection runs on a dedicated thread; failures inside a
    /// connection never stop the accept loop. The accept error is returned.
    pub fn serve<L: Listener>(&self, listener: L) -> Result<()> {
        loop {
            let stream = match listener.accept() {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!("Accept failed, stopping server: {}", e);
                    return Err(e.into());
                }
            };

            let conn = Connection::new(stream, self.handler.clone(), self.config.handler_timeout);
            let spawned = thread::Builder::new()
                .name("socketmap-conn".to_string())
                .spawn(move || {
                    let _ = conn.handle();
                });
            if let Err(e) = spawned {
                // The closure and the stream it owns are dropped here.
                tracing::warn!("Failed to spawn connection thread: {}", e);
            }
        }
    }
}

/// Serve `listener` with `handler` and default settings
pub fn serve<L: Listener, H: Handler>(listener: L, handler: H) -> Result<()> {
    Server::new(ServerConfig::default(), handler).serve(listener)
}

/// Bind `addr` on `network` and serve it with `handler`
pub fn listen_and_serve<H: Handler>(network: Network, addr: &str, handler: H) -> Result<()> {
    let config = ServerConfig::builder()
        .network(network)
        .listen_addr(addr)
        .build();
    Server::new(config, handler).listen_and_serve()
}
