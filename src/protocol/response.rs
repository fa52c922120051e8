//! Response definitions
//!
//! The five replies a socketmap server can send.

use std::io::Write;

use crate::error::{Error, Result};

use super::codec::write_frame;

/// Wire tags
pub const TAG_OK: &str = "OK";
pub const TAG_NOTFOUND: &str = "NOTFOUND";
pub const TAG_TIMEOUT: &str = "TIMEOUT";
pub const TAG_TEMP: &str = "TEMP";
pub const TAG_PERM: &str = "PERM";

/// A response to a lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Key found, with its value
    Ok(String),

    /// Key not present in the map
    NotFound,

    /// Lookup timed out
    Timeout(String),

    /// Temporary failure, retry later
    Temp(String),

    /// Permanent failure
    Perm(String),
}

impl Response {
    /// Build the response a server sends for a handler outcome
    ///
    /// Permanent errors map to `PERM`, timeout-classified errors to
    /// `TIMEOUT`, and every other error to `TEMP`.
    pub fn from_result(result: Result<Option<String>>) -> Self {
        match result {
            Ok(Some(value)) => Response::Ok(value),
            Ok(None) => Response::NotFound,
            Err(e) if e.is_permanent() => Response::Perm(e.reason()),
            Err(e) if e.is_timeout() => Response::Timeout(e.reason()),
            Err(e) => Response::Temp(e.reason()),
        }
    }

    /// Convert into the value a client hands back to its caller
    pub fn into_result(self) -> Result<Option<String>> {
        match self {
            Response::Ok(value) => Ok(Some(value)),
            Response::NotFound => Ok(None),
            Response::Timeout(reason) => Err(Error::Timeout(reason)),
            Response::Temp(reason) => Err(Error::Temporary(reason)),
            Response::Perm(reason) => Err(Error::Permanent(reason)),
        }
    }

    /// Parse a response payload
    ///
    /// Unknown tags, and tags other than `NOTFOUND` without a trailing space,
    /// are reported as temporary errors. Payloads that are not valid UTF-8
    /// are protocol errors.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| Error::Protocol(format!("response is not utf-8: {}", e)))?;
        let (tag, rest) = match text.split_once(' ') {
            Some((tag, rest)) => (tag, Some(rest)),
            None => (text, None),
        };

        match (tag, rest) {
            (TAG_NOTFOUND, _) => Ok(Response::NotFound),
            (TAG_OK, Some(value)) => Ok(Response::Ok(value.to_string())),
            (TAG_TIMEOUT, Some(reason)) => Ok(Response::Timeout(reason.to_string())),
            (TAG_TEMP, Some(reason)) => Ok(Response::Temp(reason.to_string())),
            (TAG_PERM, Some(reason)) => Ok(Response::Perm(reason.to_string())),
            _ => Err(Error::Temporary(format!("unknown response {:?}", text))),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Response::Ok(_) => TAG_OK,
            Response::NotFound => TAG_NOTFOUND,
            Response::Timeout(_) => TAG_TIMEOUT,
            Response::Temp(_) => TAG_TEMP,
            Response::Perm(_) => TAG_PERM,
        }
    }

    /// Write this response as one frame
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let tag = self.tag().as_bytes();
        match self {
            Response::NotFound => write_frame(writer, &[tag]),
            Response::Ok(text)
            | Response::Timeout(text)
            | Response::Temp(text)
            | Response::Perm(text) => write_frame(writer, &[tag, b" ", text.as_bytes()]),
        }
    }
}
