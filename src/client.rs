//! # Socketmap Client
//!
//! Purpose: Expose a compact, blocking API for looking up keys on a
//! socketmap server over pooled connections.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `Client` hides pooling and framing details.
//! 2. **One Retry**: A failed write is taken as a sign the pooled connection
//!    went stale; it is destroyed and the write is retried once on a fresh
//!    connection. Nothing else is retried.
//! 3. **Fail Fast**: Protocol violations surface immediately as errors.
//! 4. **Cooperative Cancellation**: The context is checked before acquire,
//!    after acquire, before the retry acquire and before the read.

use std::io::BufReader;

use crate::config::{ClientConfig, Network};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::network::{Dialer, NetDialer, Transport};
use crate::pool::{Manager, Pool, PoolStats, Pooled};
use crate::protocol::{read_frame, Request, Response};

/// A single client connection with a reusable read buffer
pub struct ClientConnection<T: Transport> {
    // Buffered reader reduces syscalls while still allowing direct writes.
    reader: BufReader<T>,
}

impl<T: Transport> ClientConnection<T> {
    pub fn new(stream: T) -> Self {
        ClientConnection {
            reader: BufReader::new(stream),
        }
    }

    /// Write one request frame
    pub fn send(&mut self, request: &Request) -> Result<()> {
        request.write_to(self.reader.get_mut())
    }

    /// Read one response frame
    pub fn receive(&mut self) -> Result<Vec<u8>> {
        read_frame(&mut self.reader)
    }

    fn close(mut self) {
        let _ = self.reader.get_mut().close();
    }
}

/// Dials new connections for the pool and closes retired ones
pub struct ConnectionManager<D: Dialer> {
    dialer: D,
    network: Network,
    addr: String,
}

impl<D: Dialer> Manager for ConnectionManager<D> {
    type Resource = ClientConnection<D::Conn>;

    fn create(&self, ctx: &Context) -> Result<Self::Resource> {
        let stream = self.dialer.dial(ctx, self.network, &self.addr)?;
        tracing::debug!("Connected to {} {}", self.network, self.addr);
        Ok(ClientConnection::new(stream))
    }

    fn destroy(&self, conn: Self::Resource) {
        tracing::trace!("Closing connection to {}", self.addr);
        conn.close();
    }
}

/// Blocking socketmap client with connection pooling
///
/// Safe to share between threads; at most `max_connections` lookups run at
/// once, the rest wait for a free connection.
pub struct Client<D: Dialer = NetDialer> {
    pool: Pool<ConnectionManager<D>>,
}

impl Client<NetDialer> {
    /// Creates a client for `addr` with default settings
    pub fn new(network: Network, addr: impl Into<String>) -> Self {
        let config = ClientConfig::builder().network(network).addr(addr).build();
        Self::with_config(config)
    }

    /// Creates a client with a custom configuration and the default dialer
    pub fn with_config(config: ClientConfig) -> Self {
        let dialer = NetDialer::new(config.connect_timeout);
        Self::with_dialer(config, dialer)
    }
}

impl<D: Dialer> Client<D> {
    /// Creates a client that opens connections through `dialer`
    pub fn with_dialer(config: ClientConfig, dialer: D) -> Self {
        let manager = ConnectionManager {
            dialer,
            network: config.network,
            addr: config.addr,
        };
        Client {
            pool: Pool::new(manager, config.max_connections),
        }
    }

    /// Looks up `key` in `map` without a deadline
    pub fn lookup(&self, map: &str, key: &str) -> Result<Option<String>> {
        self.lookup_context(&Context::background(), map, key)
    }

    /// Looks up `key` in `map`
    ///
    /// Returns `Ok(Some(value))` when found and `Ok(None)` when the map has no
    /// entry. Server-side failures come back as `Temporary`, `Timeout` or
    /// `Permanent` errors; a done `ctx` yields its cancellation error.
    ///
    /// `map` must not contain a space. It is sent as-is and the server will
    /// split the request at the first space it sees.
    pub fn lookup_context(&self, ctx: &Context, map: &str, key: &str) -> Result<Option<String>> {
        ctx.check()?;
        let request = Request::new(map, key);

        let mut conn = self.pool.acquire(ctx)?;
        ctx.check()?;

        match conn.send(&request) {
            Ok(()) => {}
            Err(e @ Error::FrameTooLarge { .. }) => return Err(e),
            Err(e) => {
                tracing::debug!("Write failed on pooled connection, retrying once: {}", e);
                conn.destroy();
                ctx.check()?;
                conn = self.pool.acquire(ctx)?;
                ctx.check()?;
                if let Err(e) = conn.send(&request) {
                    conn.mark_broken();
                    return Err(e);
                }
            }
        }

        self.read_response(ctx, &mut conn)?.into_result()
    }

    fn read_response(
        &self,
        ctx: &Context,
        conn: &mut Pooled<ConnectionManager<D>>,
    ) -> Result<Response> {
        // Past this point the connection carries an outstanding response, so
        // any early exit must not put it back in the idle set.
        if let Err(e) = ctx.check() {
            conn.mark_broken();
            return Err(e);
        }
        let payload = match conn.receive() {
            Ok(payload) => payload,
            Err(e) => {
                conn.mark_broken();
                return Err(e);
            }
        };
        Response::parse(&payload)
    }

    /// Closes every connection, waiting for in-flight lookups to finish.
    /// Lookups after this fail with `PoolClosed`.
    pub fn close(&self) {
        self.pool.close();
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

impl<D: Dialer> Drop for Client<D> {
    fn drop(&mut self) {
        self.pool.close();
    }
}
