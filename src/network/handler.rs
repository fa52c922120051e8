//! Lookup Handler
//!
//! The capability a server invokes to answer one lookup.

use crate::context::Context;
use crate::error::Result;

/// Answers socketmap lookups
///
/// `ctx` carries the server's per-request deadline; pass it on to anything
/// long-running. Return `Ok(Some(value))` when `key` is in `map`, `Ok(None)`
/// when it is not. Errors are sent back to the client: `Error::Permanent` as
/// `PERM`, timeout errors as `TIMEOUT`, everything else as `TEMP`.
///
/// Implemented for any `Fn(&Context, &str, &str) -> Result<Option<String>>`.
pub trait Handler: Send + Sync + 'static {
    fn lookup(&self, ctx: &Context, map: &str, key: &str) -> Result<Option<String>>;
}

impl<F> Handler for F
where
    F: Fn(&Context, &str, &str) -> Result<Option<String>> + Send + Sync + 'static,
{
    fn lookup(&self, ctx: &Context, map: &str, key: &str) -> Result<Option<String>> {
        self(ctx, map, key)
    }
}
