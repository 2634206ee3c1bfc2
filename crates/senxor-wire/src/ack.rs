//! Device-to-host acknowledgement decoding.

use crate::checksum::parse_hex_u8;
use crate::error::{Result, WireError};
use crate::frame::{words, FrameData};

/// A decoded device acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    /// `RREG`: the value of one register.
    Register(u8),
    /// `WREG`: write confirmed.
    Write,
    /// `RRSE`: `(address, value)` pairs, in device order.
    Registers(Vec<(u8, u8)>),
    /// `GFRA`: one thermal frame.
    Frame(FrameData),
    /// `SERR`: the device reports that no sensor module is attached.
    ModuleError,
}

fn invalid_body(command: &str, reason: impl Into<String>) -> WireError {
    WireError::InvalidBody {
        command: command.to_string(),
        reason: reason.into(),
    }
}

/// Decode an `RREG` acknowledgement body: exactly 2 hex characters.
pub fn decode_register_ack(body: &[u8]) -> Result<u8> {
    if body.len() != 2 {
        return Err(invalid_body(
            "RREG",
            format!("expected 2 hex characters, got {}", body.len()),
        ));
    }
    parse_hex_u8(body).ok_or_else(|| invalid_body("RREG", "value is not hex"))
}

/// Decode a `WREG` acknowledgement body, which must be empty.
pub fn decode_write_ack(body: &[u8]) -> Result<()> {
    if !body.is_empty() {
        return Err(invalid_body(
            "WREG",
            format!("expected empty body, got {} bytes", body.len()),
        ));
    }
    Ok(())
}

/// Decode an `RRSE` acknowledgement body: repeating `addr(2) + value(2)`
/// hex groups.
pub fn decode_multi_register_ack(body: &[u8]) -> Result<Vec<(u8, u8)>> {
    if body.len() % 4 != 0 {
        return Err(invalid_body(
            "RRSE",
            format!("body length {} is not a multiple of 4", body.len()),
        ));
    }
    let mut pairs = Vec::with_capacity(body.len() / 4);
    for group in body.chunks_exact(4) {
        let addr = parse_hex_u8(&group[..2])
            .ok_or_else(|| invalid_body("RRSE", "address is not hex"))?;
        let value = parse_hex_u8(&group[2..])
            .ok_or_else(|| invalid_body("RRSE", "value is not hex"))?;
        pairs.push((addr, value));
    }
    Ok(pairs)
}

/// Decode a `GFRA` acknowledgement body into header and pixel words.
///
/// The body starts with reserved bytes, optionally carries a telemetry
/// header, and ends with pixel data; the slice boundaries are fixed per
/// total body length:
///
/// | body length | header bytes | data bytes | geometry |
/// |-------------|--------------|------------|----------|
/// | 10080       | none         | 9920       | 62 x 80  |
/// | 10240       | 160          | 9920       | 62 x 80  |
/// | 39360       | none         | 38400      | 120 x 160|
/// | 39680       | 320          | 38400      | 120 x 160|
///
/// Any other length fails with [`WireError::UnsupportedFrameLength`].
pub fn decode_frame_ack(body: &[u8]) -> Result<FrameData> {
    let (header_span, data_start, rows, cols) = match body.len() {
        10080 => (None, 160, 62, 80),
        10240 => (Some(160..320), 320, 62, 80),
        39360 => (None, 960, 120, 160),
        39680 => (Some(960..1280), 1280, 120, 160),
        length => return Err(WireError::UnsupportedFrameLength { length }),
    };
    Ok(FrameData {
        header: header_span.map(|span| words(&body[span])),
        data: words(&body[data_start..]),
        rows,
        cols,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_register_ack() {
        assert_eq!(decode_register_ack(b"5F").unwrap(), 0x5F);
        assert_eq!(decode_register_ack(b"00").unwrap(), 0x00);
        assert_eq!(decode_register_ack(b"FF").unwrap(), 0xFF);
    }

    #[test]
    fn test_decode_register_ack_rejects_bad_body() {
        assert!(matches!(
            decode_register_ack(b""),
            Err(WireError::InvalidBody { .. })
        ));
        assert!(matches!(
            decode_register_ack(b"5F0"),
            Err(WireError::InvalidBody { .. })
        ));
        assert!(matches!(
            decode_register_ack(b"ZZ"),
            Err(WireError::InvalidBody { .. })
        ));
    }

    #[test]
    fn test_decode_write_ack() {
        decode_write_ack(b"").unwrap();
        assert!(matches!(
            decode_write_ack(b"X"),
            Err(WireError::InvalidBody { .. })
        ));
    }

    #[test]
    fn test_decode_multi_register_ack() {
        let pairs = decode_multi_register_ack(b"B102B600").unwrap();
        assert_eq!(pairs, vec![(0xB1, 0x02), (0xB6, 0x00)]);
    }

    #[test]
    fn test_decode_multi_register_ack_empty() {
        assert!(decode_multi_register_ack(b"").unwrap().is_empty());
    }

    #[test]
    fn test_decode_multi_register_ack_rejects_ragged_body() {
        assert!(matches!(
            decode_multi_register_ack(b"B102B6"),
            Err(WireError::InvalidBody { .. })
        ));
    }

    #[test]
    fn test_decode_frame_ack_with_header() {
        let body = vec![0u8; 10240];
        let frame = decode_frame_ack(&body).unwrap();
        assert_eq!(frame.header.as_ref().map(Vec::len), Some(80));
        assert_eq!(frame.data.len(), 4960);
        assert_eq!(frame.shape(), (62, 80));
    }

    #[test]
    fn test_decode_frame_ack_without_header() {
        let body = vec![0u8; 10080];
        let frame = decode_frame_ack(&body).unwrap();
        assert!(frame.header.is_none());
        assert_eq!(frame.data.len(), 4960);
        assert_eq!(frame.shape(), (62, 80));
    }

    #[test]
    fn test_decode_frame_ack_large_variant() {
        let frame = decode_frame_ack(&vec![0u8; 39680]).unwrap();
        assert_eq!(frame.header.as_ref().map(Vec::len), Some(160));
        assert_eq!(frame.data.len(), 19200);
        assert_eq!(frame.shape(), (120, 160));

        let frame = decode_frame_ack(&vec![0u8; 39360]).unwrap();
        assert!(frame.header.is_none());
        assert_eq!(frame.data.len(), 19200);
        assert_eq!(frame.shape(), (120, 160));
    }

    #[test]
    fn test_decode_frame_ack_unsupported_length() {
        assert!(matches!(
            decode_frame_ack(&vec![0u8; 10081]),
            Err(WireError::UnsupportedFrameLength { length: 10081 })
        ));
        assert!(matches!(
            decode_frame_ack(b""),
            Err(WireError::UnsupportedFrameLength { length: 0 })
        ));
    }

    #[test]
    fn test_decode_frame_ack_pixel_order() {
        let mut body = vec![0u8; 10080];
        // First two pixels, little-endian.
        body[160] = 0x34;
        body[161] = 0x12;
        body[162] = 0xFF;
        body[163] = 0x00;
        let frame = decode_frame_ack(&body).unwrap();
        assert_eq!(frame.data[0], 0x1234);
        assert_eq!(frame.data[1], 0x00FF);
    }
}
