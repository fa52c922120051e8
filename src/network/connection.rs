//! Connection Handler
//!
//! Serves lookups on a single client connection.
//!
//! ```text
//! Reading ──► Dispatched ──► Responding ──► Reading
//!    │             │              │
//!    └─────────────┴──────────────┴──────► Closed
//! ```
//!
//! Any framing or transport failure closes the connection without a reply.

use std::io::BufReader;
use std::sync::Arc;
use std::time::Duration;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::protocol::{read_frame, Request, Response};

use super::{Handler, Transport};

/// Handles a single client connection
pub struct Connection<T: Transport, H: Handler> {
    /// Buffered reader; responses are written straight to the inner stream
    reader: BufReader<T>,

    /// Shared lookup handler
    handler: Arc<H>,

    /// Deadline for each handler call
    handler_timeout: Duration,

    /// Peer address for logging
    peer_addr: String,
}

impl<T: Transport, H: Handler> Connection<T, H> {
    /// Create a new connection handler
    pub fn new(stream: T, handler: Arc<H>, handler_timeout: Duration) -> Self {
        let peer_addr = stream.peer();
        Self {
            reader: BufReader::new(stream),
            handler,
            handler_timeout,
            peer_addr,
        }
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads requests in a loop and sends responses. Returns the error that
    /// ended the loop after closing the stream; a clean disconnect between
    /// requests returns `Ok(())`.
    pub fn handle(mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);
        let result = self.serve_requests();
        let _ = self.reader.get_mut().close();

        match result {
            Err(Error::Io(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                tracing::debug!("Client {} disconnected", self.peer_addr);
                Ok(())
            }
            Err(e) => {
                tracing::debug!("Dropping connection from {}: {}", self.peer_addr, e);
                Err(e)
            }
            Ok(()) => Ok(()),
        }
    }

    fn serve_requests(&mut self) -> Result<()> {
        loop {
            let payload = read_frame(&mut self.reader)?;
            let request = Request::parse(&payload)?;

            tracing::trace!(
                "Lookup from {}: map={:?} key={:?}",
                self.peer_addr,
                request.map,
                request.key
            );

            let response = self.dispatch(&request);
            response.write_to(self.reader.get_mut())?;
        }
    }

    /// Run the handler under a fresh deadline and build the reply
    ///
    /// The handler is not interrupted. If the deadline passed by the time it
    /// returns, the reply is `TIMEOUT` whatever the handler said.
    fn dispatch(&self, request: &Request) -> Response {
        let (ctx, cancel) = Context::background().with_timeout(self.handler_timeout);
        let result = self.handler.lookup(&ctx, &request.map, &request.key);
        let expired = ctx.err();
        cancel.cancel();

        match expired {
            Some(err) => {
                tracing::debug!(
                    "Handler for {} exceeded {:?}",
                    self.peer_addr,
                    self.handler_timeout
                );
                Response::Timeout(err.to_string())
            }
            None => Response::from_result(result),
        }
    }
}
