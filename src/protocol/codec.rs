//! Protocol codec
//!
//! Encoding and decoding functions for socketmap frames.
//!
//! ## Wire Format
//!
//! ```text
//! ┌────────────────┬─────┬──────────────────────┬─────┐
//! │ Len (decimal)  │ ':' │   Payload (Len bytes)│ ',' │
//! └────────────────┴─────┴──────────────────────┴─────┘
//! ```
//!
//! The length prefix is at most six digits: the reader gives up after
//! `SIZE_WINDOW` bytes without a colon, whatever `MAX_SIZE` is.

use std::io::{Cursor, Read, Write};

use bytes::{BufMut, BytesMut};

use crate::error::{Error, Result};

/// Maximum payload size of a single frame
pub const MAX_SIZE: usize = 100_000;

/// Bytes scanned for the length-terminating colon
pub const SIZE_WINDOW: usize = 7;

const COLON: u8 = b':';
const COMMA: u8 = b',';

// =============================================================================
// Encoding
// =============================================================================

/// Encode the concatenation of `chunks` as one frame
///
/// Fails with `FrameTooLarge` when the payload exceeds `MAX_SIZE`.
pub fn encode_frame(chunks: &[&[u8]]) -> Result<BytesMut> {
    let size: usize = chunks.iter().map(|c| c.len()).sum();
    if size > MAX_SIZE {
        return Err(Error::FrameTooLarge {
            size,
            max: MAX_SIZE,
        });
    }

    let prefix = size.to_string();
    let mut frame = BytesMut::with_capacity(prefix.len() + size + 2);
    frame.put_slice(prefix.as_bytes());
    frame.put_u8(COLON);
    for chunk in chunks {
        frame.put_slice(chunk);
    }
    frame.put_u8(COMMA);

    Ok(frame)
}

/// Write one frame to a stream
///
/// Nothing is written when the payload is too large. The frame goes out in a
/// single `write_all` so a peer never sees a partial length prefix from us.
pub fn write_frame<W: Write>(writer: &mut W, chunks: &[&[u8]]) -> Result<()> {
    let frame = encode_frame(chunks)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Decoding
// =============================================================================

/// Read one frame from a stream and return its payload
///
/// Blocks until a complete frame is received or an error occurs. The length
/// prefix is read byte by byte so no byte past the trailing comma is consumed.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let size = read_size(reader)?;

    let mut payload = vec![0u8; size];
    if size > 0 {
        reader.read_exact(&mut payload)?;
    }

    let mut last = [0u8; 1];
    reader.read_exact(&mut last)?;
    if last[0] != COMMA {
        return Err(Error::Protocol(format!(
            "expected comma got {:?}",
            last[0] as char
        )));
    }

    Ok(payload)
}

/// Decode a frame held entirely in memory
///
/// Trailing bytes after the comma are rejected.
pub fn decode_frame(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(bytes);
    let payload = read_frame(&mut cursor)?;
    let consumed = cursor.position() as usize;
    if consumed != bytes.len() {
        return Err(Error::Protocol(format!(
            "{} trailing bytes after frame",
            bytes.len() - consumed
        )));
    }
    Ok(payload)
}

fn read_size<R: Read>(reader: &mut R) -> Result<usize> {
    let mut prefix = [0u8; SIZE_WINDOW];
    for i in 0..SIZE_WINDOW {
        reader.read_exact(&mut prefix[i..i + 1])?;
        if prefix[i] == COLON {
            return parse_size(&prefix[..i]);
        }
    }
    Err(Error::Protocol("colon missing".to_string()))
}

fn parse_size(digits: &[u8]) -> Result<usize> {
    let text = std::str::from_utf8(digits)
        .map_err(|_| Error::Protocol(format!("invalid size {:?}", digits)))?;
    let size: usize = text
        .parse()
        .map_err(|e| Error::Protocol(format!("invalid size {:?}: {}", text, e)))?;
    if size > MAX_SIZE {
        return Err(Error::Protocol(format!("invalid size {}", size)));
    }
    Ok(size)
}
