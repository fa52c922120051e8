//! Protocol Module
//!
//! Defines the socketmap wire protocol.
//!
//! ## Frame Format
//! ```text
//! <decimal length>:<payload>,
//! ```
//!
//! ### Request Payload
//! ```text
//! <map name> <key>
//! ```
//!
//! ### Response Payloads
//! - `OK <value>`
//! - `NOTFOUND`
//! - `TIMEOUT <reason>`
//! - `TEMP <reason>`
//! - `PERM <reason>`

mod codec;
mod request;
mod response;

pub use codec::{decode_frame, encode_frame, read_frame, write_frame, MAX_SIZE, SIZE_WINDOW};
pub use request::Request;
pub use response::{Response, TAG_NOTFOUND, TAG_OK, TAG_PERM, TAG_TEMP, TAG_TIMEOUT};
