#[cfg(test)]
#[path = "tests/varint.rs"]
mod tests;

use thiserror::Error;

/// Longest encoding of a `u32`: 7 bits per byte, rounded up.
pub const MAX_VAR_U32_LEN: usize = 5;

const CONTINUATION: u8 = 0x80;
const PAYLOAD_MASK: u8 = 0x7F;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum VarIntError {
    #[error("no bytes to decode")]
    Empty,

    #[error("varuint ends before its final byte")]
    Incomplete,

    #[error("varuint does not fit in 32 bits")]
    Overflow,
}

/// Appends the varuint encoding of `value` to `buf`, returning the number of
/// bytes written.
pub fn encode_var_u32(mut value: u32, buf: &mut Vec<u8>) -> usize {
    let start = buf.len();

    while value >= u32::from(CONTINUATION) {
        buf.push((value as u8 & PAYLOAD_MASK) | CONTINUATION);
        value >>= 7;
    }
    buf.push(value as u8);

    buf.len() - start
}

/// Decodes a varuint from the front of `data`, returning the value and the
/// number of bytes consumed.
pub fn decode_var_u32(data: &[u8]) -> Result<(u32, usize), VarIntError> {
    if data.is_empty() {
        return Err(VarIntError::Empty);
    }

    let mut value = 0_u32;
    let mut shift = 0_u32;

    for (index, byte) in data.iter().take(MAX_VAR_U32_LEN).enumerate() {
        let bits = u32::from(byte & PAYLOAD_MASK);

        // Only the low four bits of the fifth byte land inside a u32.
        if index == MAX_VAR_U32_LEN - 1 && bits > 0x0F {
            return Err(VarIntError::Overflow);
        }

        value |= bits << shift;

        if byte & CONTINUATION == 0 {
            return Ok((value, index + 1));
        }

        shift += 7;
    }

    if data.len() >= MAX_VAR_U32_LEN {
        Err(VarIntError::Overflow)
    } else {
        Err(VarIntError::Incomplete)
    }
}
