#[cfg(test)]
#[path = "tests/summary.rs"]
mod tests;

use core::fmt;

use serde::Serialize;

use crate::message::{DecodeError, Frame, MessageType};

/// What a frame looked like on the wire, without its contents.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct FrameSummary {
    pub kind: MessageType,
    pub payload_len: usize,
    pub trailing_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<bool>,
}

impl FrameSummary {
    pub fn inspect(data: &[u8]) -> Result<Self, DecodeError> {
        let (frame, trailing_len) = Frame::decode(data)?;

        let (client_id, removed) = match frame {
            Frame::Awareness { client_id, state } => (Some(client_id), Some(state.is_none())),
            Frame::SyncStep1 { .. } | Frame::SyncStep2 { .. } => (None, None),
        };

        Ok(Self {
            kind: frame.message_type(),
            payload_len: frame.payload().len(),
            trailing_len,
            client_id,
            removed,
        })
    }
}

impl fmt::Display for FrameSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, payload {} bytes", self.kind, self.payload_len)?;

        if let Some(client_id) = self.client_id {
            write!(f, ", client {client_id}")?;
        }
        if self.removed == Some(true) {
            f.write_str(", removed")?;
        }
        if self.trailing_len > 0 {
            write!(f, ", {} trailing bytes", self.trailing_len)?;
        }

        Ok(())
    }
}
