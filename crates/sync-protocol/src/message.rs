#[cfg(test)]
#[path = "tests/message.rs"]
mod tests;

use core::fmt;
use core::str;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::varint::{decode_var_u32, encode_var_u32, VarIntError, MAX_VAR_U32_LEN};

/// Leading byte of every y-websocket frame.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MessageType {
    /// State vector exchange.
    SyncStep1 = 0,
    /// Document update.
    SyncStep2 = 1,
    /// Presence state (cursors, user names).
    Awareness = 2,
}

impl MessageType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SyncStep1 => "sync_step1",
            Self::SyncStep2 => "sync_step2",
            Self::Awareness => "awareness",
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = DecodeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(Self::SyncStep1),
            1 => Ok(Self::SyncStep2),
            2 => Ok(Self::Awareness),
            other => Err(DecodeError::UnknownType(other)),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(message_type: MessageType) -> Self {
        message_type as Self
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum DecodeError {
    #[error("empty frame")]
    Empty,

    #[error("unknown message type {0}")]
    UnknownType(u8),

    #[error("invalid length prefix: {0}")]
    Length(#[from] VarIntError),

    #[error("frame declares {expected} payload bytes but carries {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("awareness state is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[error("payload of {0} bytes does not fit a 32-bit length prefix")]
pub struct EncodeError(pub usize);

/// A decoded frame borrowing its payload from the received message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Frame<'a> {
    SyncStep1 {
        state_vector: &'a [u8],
    },
    SyncStep2 {
        update: &'a [u8],
    },
    /// `state` is `None` when the client's presence was removed.
    Awareness {
        client_id: u32,
        state: Option<&'a str>,
    },
}

impl<'a> Frame<'a> {
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        match self {
            Self::SyncStep1 { .. } => MessageType::SyncStep1,
            Self::SyncStep2 { .. } => MessageType::SyncStep2,
            Self::Awareness { .. } => MessageType::Awareness,
        }
    }

    /// The length-prefixed body of the frame. For awareness frames this is
    /// the raw JSON state, empty on removal.
    #[must_use]
    pub fn payload(&self) -> &'a [u8] {
        match *self {
            Self::SyncStep1 { state_vector } => state_vector,
            Self::SyncStep2 { update } => update,
            Self::Awareness { state, .. } => state.map(<str>::as_bytes).unwrap_or_default(),
        }
    }

    /// Decodes a frame, returning it with the number of bytes left over after
    /// the declared payload. Servers are known to pad frames, so leftovers are
    /// reported rather than rejected.
    pub fn decode(data: &'a [u8]) -> Result<(Self, usize), DecodeError> {
        let (&tag, body) = data.split_first().ok_or(DecodeError::Empty)?;

        match MessageType::try_from(tag)? {
            MessageType::SyncStep1 => {
                let (state_vector, rest) = read_payload(body)?;
                Ok((Self::SyncStep1 { state_vector }, rest.len()))
            }
            MessageType::SyncStep2 => {
                let (update, rest) = read_payload(body)?;
                Ok((Self::SyncStep2 { update }, rest.len()))
            }
            MessageType::Awareness => {
                let (client_id, consumed) = decode_var_u32(body)?;
                let (json, rest) = read_payload(&body[consumed..])?;

                let state = if json.is_empty() {
                    None
                } else {
                    Some(str::from_utf8(json).map_err(|_| DecodeError::InvalidUtf8)?)
                };

                Ok((Self::Awareness { client_id, state }, rest.len()))
            }
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let payload = self.payload();
        let mut buf = Vec::with_capacity(1 + 2 * MAX_VAR_U32_LEN + payload.len());

        buf.push(self.message_type().into());

        if let Self::Awareness { client_id, .. } = *self {
            let _ = encode_var_u32(client_id, &mut buf);
        }

        let len = u32::try_from(payload.len()).map_err(|_| EncodeError(payload.len()))?;
        let _ = encode_var_u32(len, &mut buf);
        buf.extend_from_slice(payload);

        Ok(buf)
    }

    /// Parses the JSON carried by an awareness frame. `None` for other frame
    /// kinds and for removals.
    #[must_use]
    pub fn awareness_state(&self) -> Option<serde_json::Result<serde_json::Value>> {
        match *self {
            Self::Awareness {
                state: Some(json), ..
            } => Some(serde_json::from_str(json)),
            _ => None,
        }
    }
}

fn read_payload(body: &[u8]) -> Result<(&[u8], &[u8]), DecodeError> {
    let (declared, consumed) = decode_var_u32(body)?;
    let rest = &body[consumed..];
    let expected = declared as usize;

    if rest.len() < expected {
        return Err(DecodeError::Truncated {
            expected,
            actual: rest.len(),
        });
    }

    Ok(rest.split_at(expected))
}
