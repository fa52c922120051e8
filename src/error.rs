//! Error types for socketmap
//!
//! Provides a unified error type for the codec, pool, client and server.
//!
//! Errors fall into four groups:
//! - transport failures (`Io`), surfaced unchanged
//! - malformed frames or payloads (`FrameTooLarge`, `Protocol`), fatal to
//!   the connection they occurred on
//! - cancellation (`Cancelled`, `DeadlineExceeded`, `PoolClosed`)
//! - classified lookup failures (`Temporary`, `Timeout`, `Permanent`), which
//!   map one-to-one onto the `TEMP`, `TIMEOUT` and `PERM` wire tags

use std::fmt;
use std::io;

use thiserror::Error;

/// Result type alias using socketmap's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for socketmap operations
#[derive(Debug, Error)]
pub enum Error {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("data too big: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Cancellation Errors
    // -------------------------------------------------------------------------
    #[error("context canceled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("connection pool closed")]
    PoolClosed,

    // -------------------------------------------------------------------------
    // Classified Lookup Errors
    // -------------------------------------------------------------------------
    #[error("{}", Classified("temp error", .0))]
    Temporary(String),

    #[error("{}", Classified("timeout", .0))]
    Timeout(String),

    #[error("{}", Classified("permanent error", .0))]
    Permanent(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a temporary error from any displayable reason
    pub fn temporary(reason: impl Into<String>) -> Self {
        Error::Temporary(reason.into())
    }

    /// Create a timeout error from any displayable reason
    pub fn timeout(reason: impl Into<String>) -> Self {
        Error::Timeout(reason.into())
    }

    /// Create a permanent error from any displayable reason
    pub fn permanent(reason: impl Into<String>) -> Self {
        Error::Permanent(reason.into())
    }

    /// True when retrying the lookup later may succeed.
    ///
    /// Every error that reports as a timeout qualifies, as do temporary
    /// errors; permanent errors never do.
    pub fn is_temporary(&self) -> bool {
        matches!(self, Error::Temporary(_)) || self.is_timeout()
    }

    /// True when the error reports itself as a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::DeadlineExceeded => true,
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }

    /// True only for permanent lookup failures.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Error::Permanent(_))
    }

    /// The text carried on the wire for this error.
    ///
    /// Classified errors send their bare reason so the peer does not end up
    /// with a doubled prefix; everything else sends its display text.
    pub fn reason(&self) -> String {
        match self {
            Error::Temporary(r) | Error::Timeout(r) | Error::Permanent(r) => r.clone(),
            other => other.to_string(),
        }
    }
}

/// Display helper for classified errors: `"<kind>: <reason>"`, or just
/// `"<kind>"` when the reason is empty.
struct Classified<'a>(&'static str, &'a String);

impl fmt::Display for Classified<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.1.is_empty() {
            f.write_str(self.0)
        } else {
            write!(f, "{}: {}", self.0, self.1)
        }
    }
}
