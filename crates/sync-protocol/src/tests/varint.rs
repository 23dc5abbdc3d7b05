use super::*;

fn encoded(value: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    let _ = encode_var_u32(value, &mut buf);
    buf
}

#[test]
fn single_byte_values() {
    assert_eq!(encoded(0), [0x00]);
    assert_eq!(encoded(1), [0x01]);
    assert_eq!(encoded(127), [0x7F]);
}

#[test]
fn multi_byte_values() {
    assert_eq!(encoded(128), [0x80, 0x01]);
    assert_eq!(encoded(300), [0xAC, 0x02]);
    assert_eq!(encoded(16_384), [0x80, 0x80, 0x01]);
    assert_eq!(encoded(u32::MAX), [0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
}

#[test]
fn encode_appends_and_reports_length() {
    let mut buf = vec![0xAA];

    let written = encode_var_u32(300, &mut buf);

    assert_eq!(written, 2, "300 takes two bytes");
    assert_eq!(buf, [0xAA, 0xAC, 0x02]);
}

#[test]
fn decode_reports_bytes_consumed() {
    assert_eq!(decode_var_u32(&[0xAC, 0x02, 0x99]), Ok((300, 2)));
    assert_eq!(decode_var_u32(&[0x05]), Ok((5, 1)));
    assert_eq!(
        decode_var_u32(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
        Ok((u32::MAX, MAX_VAR_U32_LEN))
    );
}

#[test]
fn decode_empty() {
    assert_eq!(decode_var_u32(&[]), Err(VarIntError::Empty));
}

#[test]
fn decode_incomplete() {
    assert_eq!(decode_var_u32(&[0x80]), Err(VarIntError::Incomplete));
    assert_eq!(decode_var_u32(&[0xFF, 0xFF, 0xFF]), Err(VarIntError::Incomplete));
}

#[test]
fn decode_overflow() {
    // Fifth byte carries bits above bit 31.
    assert_eq!(
        decode_var_u32(&[0xFF, 0xFF, 0xFF, 0xFF, 0x10]),
        Err(VarIntError::Overflow)
    );
    // Continuation bit on the fifth byte.
    assert_eq!(
        decode_var_u32(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]),
        Err(VarIntError::Overflow)
    );
}
