//! Host-to-device command encoding.
//!
//! Every message on the wire, command or acknowledgement, shares one frame
//! layout:
//!
//! ```text
//! ┌────────────┬────────────┬───────────┬────────────┬────────────┐
//! │ Marker     │ Length     │ Command   │ Body       │ Checksum   │
//! │ (4B) "   #"│ (4B hex)   │ (4B ascii)│ (variable) │ (4B hex)   │
//! └────────────┴────────────┴───────────┴────────────┴────────────┘
//! ```
//!
//! The length field counts everything after itself (command + body +
//! checksum). Acknowledgements carry a real checksum over the length field,
//! command, and body; host-to-device commands carry the dummy `XXXX`.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, WireError};

/// Frame marker: three spaces and a hash.
pub const MARKER: [u8; 4] = *b"   #";

/// Marker (4) + length field (4) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Dummy checksum field carried by host-to-device commands.
pub const DUMMY_CHECKSUM: [u8; 4] = *b"XXXX";

fn encode_command(cmd: &[u8; 4], body: &[u8]) -> Bytes {
    let len = cmd.len() + body.len() + DUMMY_CHECKSUM.len();
    let mut dst = BytesMut::with_capacity(HEADER_SIZE + len);
    dst.put_slice(&MARKER);
    dst.put_slice(format!("{len:04X}").as_bytes());
    dst.put_slice(cmd);
    dst.put_slice(body);
    dst.put_slice(&DUMMY_CHECKSUM);
    dst.freeze()
}

/// Encode an `RREG` command reading one register.
///
/// `encode_read_register(0x01)` produces `b"   #000ARREG01XXXX"`.
pub fn encode_read_register(addr: u8) -> Bytes {
    encode_command(b"RREG", format!("{addr:02X}").as_bytes())
}

/// Encode a `WREG` command writing one register.
///
/// `encode_write_register(0xCA, 0x5F)` produces `b"   #000CWREGCA5FXXXX"`.
pub fn encode_write_register(addr: u8, value: u8) -> Bytes {
    encode_command(b"WREG", format!("{addr:02X}{value:02X}").as_bytes())
}

/// Encode an `RRSE` command reading several registers at once.
///
/// The body lists each address as 2 hex characters and ends with the `FF`
/// terminator. Fails with [`WireError::NoAddresses`] on an empty list.
pub fn encode_read_registers(addrs: &[u8]) -> Result<Bytes> {
    if addrs.is_empty() {
        return Err(WireError::NoAddresses);
    }
    let mut body = String::with_capacity(2 * addrs.len() + 2);
    for addr in addrs {
        body.push_str(&format!("{addr:02X}"));
    }
    body.push_str("FF");
    Ok(encode_command(b"RRSE", body.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ack::Ack;
    use crate::checksum::checksum;
    use crate::decoder::AckDecoder;

    #[test]
    fn test_encode_read_register() {
        assert_eq!(encode_read_register(0x01).as_ref(), b"   #000ARREG01XXXX");
        assert_eq!(encode_read_register(0xB6).as_ref(), b"   #000ARREGB6XXXX");
    }

    #[test]
    fn test_encode_write_register() {
        assert_eq!(
            encode_write_register(0xCA, 0x5F).as_ref(),
            b"   #000CWREGCA5FXXXX"
        );
        assert_eq!(
            encode_write_register(0x00, 0x00).as_ref(),
            b"   #000CWREG0000XXXX"
        );
    }

    #[test]
    fn test_encode_read_registers() {
        let cmd = encode_read_registers(&[0xB1, 0xB6]).unwrap();
        assert_eq!(cmd.as_ref(), b"   #000ERRSEB1B6FFXXXX");
    }

    #[test]
    fn test_encode_read_registers_single() {
        let cmd = encode_read_registers(&[0x01]).unwrap();
        assert_eq!(cmd.as_ref(), b"   #000CRRSE01FFXXXX");
    }

    #[test]
    fn test_encode_read_registers_empty() {
        assert!(matches!(
            encode_read_registers(&[]),
            Err(WireError::NoAddresses)
        ));
    }

    #[test]
    fn test_length_field_counts_trailer() {
        // LEN covers command + body + checksum for every address count.
        for count in 1..=16usize {
            let addrs: Vec<u8> = (0..count as u8).collect();
            let cmd = encode_read_registers(&addrs).unwrap();
            let len = usize::from_str_radix(std::str::from_utf8(&cmd[4..8]).unwrap(), 16).unwrap();
            assert_eq!(len, cmd.len() - HEADER_SIZE);
            assert_eq!(len, 2 * count + 10);
        }
    }

    #[test]
    fn test_command_checksum_region_matches_ack_rule() {
        // A device acknowledging RREG checksums the same region the host
        // would: length field + command + body.
        let cmd = encode_read_register(0x01);
        let sum = checksum(&cmd[4..cmd.len() - 4]);
        assert_eq!(sum, 0x0262);

        // Every address yields a region the receive side accepts once the
        // dummy trailer is replaced with the real sum.
        let mut decoder = AckDecoder::new();
        for addr in 0..=255u8 {
            let cmd = encode_read_register(addr);
            let sum = checksum(&cmd[4..cmd.len() - 4]);
            let mut echoed = cmd[..cmd.len() - 4].to_vec();
            echoed.extend_from_slice(format!("{sum:04X}").as_bytes());
            decoder.feed(&echoed);
            assert_eq!(decoder.next_ack().unwrap(), Some(Ack::Register(addr)));
        }
    }
}
