//! Wire checksum and ASCII-hex field helpers.

/// Compute the wire checksum: the arithmetic sum of all bytes, truncated to
/// 16 bits.
///
/// For a framed message the checksum covers the length field, the command
/// name, and the body (everything between the marker and the checksum field
/// itself).
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes.iter().map(|&b| u32::from(b)).sum::<u32>() as u16
}

/// Parse a 2-character big-endian ASCII-hex field.
pub(crate) fn parse_hex_u8(ascii: &[u8]) -> Option<u8> {
    let text = std::str::from_utf8(ascii).ok()?;
    u8::from_str_radix(text, 16).ok()
}

/// Parse a 4-character big-endian ASCII-hex field.
pub(crate) fn parse_hex_u16(ascii: &[u8]) -> Option<u16> {
    let text = std::str::from_utf8(ascii).ok()?;
    u16::from_str_radix(text, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_ack_checksum() {
        assert_eq!(checksum(b"0008WREG"), 0x01FD);
    }

    #[test]
    fn test_read_command_checksum() {
        assert_eq!(checksum(b"000ARREG01"), 0x0262);
    }

    #[test]
    fn test_checksum_truncates_to_16_bits() {
        let bytes = vec![0xFFu8; 1024];
        assert_eq!(checksum(&bytes), (1024u32 * 0xFF) as u16);
    }

    #[test]
    fn test_checksum_empty() {
        assert_eq!(checksum(b""), 0);
    }

    #[test]
    fn test_parse_hex_u16() {
        assert_eq!(parse_hex_u16(b"01FD"), Some(0x01FD));
        assert_eq!(parse_hex_u16(b"9B08"), Some(0x9B08));
        assert_eq!(parse_hex_u16(b"XXXX"), None);
    }

    #[test]
    fn test_parse_hex_u8() {
        assert_eq!(parse_hex_u8(b"CA"), Some(0xCA));
        assert_eq!(parse_hex_u8(b"00"), Some(0x00));
        assert_eq!(parse_hex_u8(b"G0"), None);
    }
}
