//! y-websocket frame codec.
//!
//! The CRDT sync server wraps every payload in a one byte message type
//! followed by varuint-prefixed fields. This crate decodes those frames far
//! enough to tell what kind of traffic is on the wire and how large it is. It
//! does not interpret state vectors or updates.

pub mod message;
pub mod summary;
pub mod varint;

pub use message::{DecodeError, EncodeError, Frame, MessageType};
pub use summary::FrameSummary;
pub use varint::{decode_var_u32, encode_var_u32, VarIntError, MAX_VAR_U32_LEN};
