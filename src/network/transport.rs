//! Transport Capabilities
//!
//! The minimal interfaces the client and server need from the socket layer,
//! plus default TCP and Unix domain socket implementations.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};
use std::time::Duration;

use crate::config::Network;
use crate::context::Context;
use crate::error::{Error, Result};

/// A connected, blocking byte stream
pub trait Transport: Read + Write + Send + 'static {
    /// Shut the stream down in both directions
    fn close(&mut self) -> io::Result<()>;

    /// Peer description for logging
    fn peer(&self) -> String {
        "unknown".to_string()
    }
}

/// Establishes client connections
pub trait Dialer: Send + Sync + 'static {
    type Conn: Transport;

    fn dial(&self, ctx: &Context, network: Network, addr: &str) -> Result<Self::Conn>;
}

/// Accepts server connections
pub trait Listener {
    type Conn: Transport;

    fn accept(&self) -> io::Result<Self::Conn>;
}

impl Transport for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }

    fn peer(&self) -> String {
        self.peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

#[cfg(unix)]
impl Transport for UnixStream {
    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }

    fn peer(&self) -> String {
        "unix".to_string()
    }
}

impl Listener for TcpListener {
    type Conn = TcpStream;

    fn accept(&self) -> io::Result<TcpStream> {
        let (stream, _) = TcpListener::accept(self)?;
        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

#[cfg(unix)]
impl Listener for UnixListener {
    type Conn = UnixStream;

    fn accept(&self) -> io::Result<UnixStream> {
        let (stream, _) = UnixListener::accept(self)?;
        Ok(stream)
    }
}

// =============================================================================
// Network Stream
// =============================================================================

/// A TCP or Unix domain stream
#[derive(Debug)]
pub enum NetStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Read for NetStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            NetStream::Tcp(s) => s.read(buf),
            #[cfg(unix)]
            NetStream::Unix(s) => s.read(buf),
        }
    }
}

impl Write for NetStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            NetStream::Tcp(s) => s.write(buf),
            #[cfg(unix)]
            NetStream::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            NetStream::Tcp(s) => s.flush(),
            #[cfg(unix)]
            NetStream::Unix(s) => s.flush(),
        }
    }
}

impl Transport for NetStream {
    fn close(&mut self) -> io::Result<()> {
        match self {
            NetStream::Tcp(s) => Transport::close(s),
            #[cfg(unix)]
            NetStream::Unix(s) => Transport::close(s),
        }
    }

    fn peer(&self) -> String {
        match self {
            NetStream::Tcp(s) => Transport::peer(s),
            #[cfg(unix)]
            NetStream::Unix(s) => Transport::peer(s),
        }
    }
}

// =============================================================================
// Default Dialer
// =============================================================================

/// Dials TCP or Unix sockets with a bounded connect timeout
#[derive(Debug, Clone)]
pub struct NetDialer {
    /// Upper bound on one connect attempt; the context deadline may shorten it
    pub connect_timeout: Duration,
}

impl Default for NetDialer {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl NetDialer {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    fn timeout(&self, ctx: &Context) -> Result<Duration> {
        ctx.check()?;
        let timeout = match ctx.remaining() {
            Some(remaining) => remaining.min(self.connect_timeout),
            None => self.connect_timeout,
        };
        if timeout.is_zero() {
            return Err(Error::DeadlineExceeded);
        }
        Ok(timeout)
    }

    fn dial_tcp(&self, ctx: &Context, addr: &str) -> Result<TcpStream> {
        let mut last_err = None;
        for socket_addr in addr.to_socket_addrs()? {
            let timeout = self.timeout(ctx)?;
            match TcpStream::connect_timeout(&socket_addr, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err
            .unwrap_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("no addresses resolved for {}", addr),
                )
            })
            .into())
    }
}

impl Dialer for NetDialer {
    type Conn = NetStream;

    fn dial(&self, ctx: &Context, network: Network, addr: &str) -> Result<NetStream> {
        match network {
            Network::Tcp => Ok(NetStream::Tcp(self.dial_tcp(ctx, addr)?)),
            #[cfg(unix)]
            Network::Unix => {
                self.timeout(ctx)?;
                Ok(NetStream::Unix(UnixStream::connect(addr)?))
            }
            #[cfg(not(unix))]
            Network::Unix => Err(Error::Config(
                "unix sockets are not supported on this platform".to_string(),
            )),
        }
    }
}

// =============================================================================
// Default Listener
// =============================================================================

/// A bound TCP or Unix domain listener
#[derive(Debug)]
pub enum NetListener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl NetListener {
    /// Bind `addr` on the given network
    pub fn bind(network: Network, addr: &str) -> Result<Self> {
        match network {
            Network::Tcp => Ok(NetListener::Tcp(TcpListener::bind(addr)?)),
            #[cfg(unix)]
            Network::Unix => Ok(NetListener::Unix(UnixListener::bind(addr)?)),
            #[cfg(not(unix))]
            Network::Unix => Err(Error::Config(
                "unix sockets are not supported on this platform".to_string(),
            )),
        }
    }

    /// Bound address, for logging
    pub fn local_addr(&self) -> String {
        match self {
            NetListener::Tcp(l) => l
                .local_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
            #[cfg(unix)]
            NetListener::Unix(l) => l
                .local_addr()
                .ok()
                .and_then(|a| a.as_pathname().map(|p| p.display().to_string()))
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

impl Listener for NetListener {
    type Conn = NetStream;

    fn accept(&self) -> io::Result<NetStream> {
        match self {
            NetListener::Tcp(l) => Listener::accept(l).map(NetStream::Tcp),
            #[cfg(unix)]
            NetListener::Unix(l) => Listener::accept(l).map(NetStream::Unix),
        }
    }
}
