//! Request definitions
//!
//! A lookup of `key` in the map named `map`.

use std::io::Write;

use crate::error::{Error, Result};

use super::codec::write_frame;

/// A parsed lookup request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Map (lookup table) name; must not contain a space
    pub map: String,

    /// Key to look up; may contain spaces
    pub key: String,
}

impl Request {
    pub fn new(map: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            map: map.into(),
            key: key.into(),
        }
    }

    /// Split a request payload on its first space
    ///
    /// Payloads that are not valid UTF-8 are rejected.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| Error::Protocol(format!("request is not utf-8: {}", e)))?;
        match text.split_once(' ') {
            Some((map, key)) => Ok(Request::new(map, key)),
            None => Err(Error::Protocol(format!(
                "request without separator: {:?}",
                text
            ))),
        }
    }

    /// Write this request as one frame
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_frame(writer, &[self.map.as_bytes(), b" ", self.key.as_bytes()])
    }
}
