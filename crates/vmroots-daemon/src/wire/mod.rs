//! Wire protocol between agent and listener
//!
//! A stream of newline-delimited JSON objects. The first object is always an
//! `init` registration carrying the guest id and its complete root set; every
//! later object is an `update` carrying only what changed. The session ends
//! when the transport closes.

mod framing;
mod types;

pub use framing::{MessageReader, MessageWriter, MAX_LINE_BYTES};
pub use types::Message;
