//! Receive-side buffer state machine.
//!
//! The device interleaves register acknowledgements and frame
//! acknowledgements on one byte stream, and the stream may be corrupted or
//! begin mid-message (the sensor keeps streaming while the host reopens the
//! port). [`AckDecoder`] accumulates raw bytes, classifies what it holds,
//! extracts one validated message at a time, and realigns itself after
//! corruption. Unrecoverable corruption (realignment or parsing failing
//! repeatedly with no progress) surfaces as a fatal error; the transport
//! owner is expected to close the connection.

use bytes::{Buf, BytesMut};
use tracing::{debug, warn};

use crate::ack::{
    decode_frame_ack, decode_multi_register_ack, decode_register_ack, decode_write_ack, Ack,
};
use crate::checksum::{checksum, parse_hex_u16};
use crate::command::{HEADER_SIZE, MARKER};
use crate::error::{Result, WireError};

/// Initial capacity of the receive accumulator.
const INITIAL_BUFFER_CAPACITY: usize = 64 * 1024;

/// Smallest valid length field: command (4) + empty body + checksum (4).
const MIN_MESSAGE_LEN: usize = 8;

/// Largest valid length field: a 120x160 frame acknowledgement with header.
const MAX_MESSAGE_LEN: usize = 39_688;

/// Where the decoder stands relative to its buffered bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Transport not open; no further processing.
    Closed,
    /// Not yet classified since the last consumed message.
    Unknown,
    /// Fewer than 8 bytes buffered; the length field cannot be read.
    Empty,
    /// The buffer does not begin with the frame marker.
    Misaligned,
    /// Header complete, message incomplete; waiting for more bytes.
    Pending,
    /// A complete message is available.
    Aligned,
    /// The last complete message failed to parse.
    AckError,
}

/// Tuning knobs for the decoder.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Consecutive failed realignments tolerated before giving up. Default: 4.
    pub max_misalignments: u32,
    /// Consecutive malformed messages tolerated before giving up. Default: 4.
    pub max_ack_errors: u32,
    /// Verify the trailing checksum of `GFRA` acknowledgements.
    ///
    /// Off by default: the frame payload carries its own integrity check, and
    /// some firmware revisions send a dummy frame checksum.
    pub validate_frame_checksums: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_misalignments: 4,
            max_ack_errors: 4,
            validate_frame_checksums: false,
        }
    }
}

/// Streaming acknowledgement decoder.
///
/// Feed raw bytes with [`feed`](Self::feed), then call
/// [`next_ack`](Self::next_ack) until it returns `Ok(None)` (no complete
/// message buffered). A fatal error closes the decoder; every later call
/// returns `Ok(None)`.
#[derive(Debug)]
pub struct AckDecoder {
    buf: BytesMut,
    state: BufferState,
    config: DecoderConfig,
    misaligned_streak: u32,
    ack_error_streak: u32,
}

impl AckDecoder {
    /// Create a decoder with default configuration.
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// Create a decoder with the given configuration.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            state: BufferState::Unknown,
            config,
            misaligned_streak: 0,
            ack_error_streak: 0,
        }
    }

    /// Append received bytes to the accumulator. Ignored once closed.
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.state == BufferState::Closed {
            return;
        }
        self.buf.extend_from_slice(bytes);
    }

    /// The current lifecycle state.
    pub fn state(&self) -> BufferState {
        self.state
    }

    /// Number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Stop processing and drop any buffered bytes.
    pub fn close(&mut self) {
        self.state = BufferState::Closed;
        self.buf.clear();
    }

    /// Extract the next complete acknowledgement.
    ///
    /// Returns `Ok(None)` when no complete message is buffered yet. Errors
    /// are fatal: the decoder closes itself and the caller should tear down
    /// the transport.
    pub fn next_ack(&mut self) -> Result<Option<Ack>> {
        loop {
            if self.state == BufferState::Closed {
                return Ok(None);
            }
            self.state = self.classify();
            match self.state {
                BufferState::Empty | BufferState::Pending => return Ok(None),
                BufferState::Misaligned => self.realign()?,
                BufferState::Aligned => match self.take_message() {
                    Ok(Some(ack)) => return Ok(Some(ack)),
                    Ok(None) => {}
                    Err(err) => self.discard_malformed(err)?,
                },
                BufferState::AckError => {
                    let text = String::from_utf8_lossy(&self.buf[4..8]).into_owned();
                    self.discard_malformed(WireError::InvalidLength { text })?;
                }
                BufferState::Closed | BufferState::Unknown => return Ok(None),
            }
        }
    }

    fn classify(&self) -> BufferState {
        if self.buf.len() < HEADER_SIZE {
            return BufferState::Empty;
        }
        if self.buf[..4] != MARKER {
            return BufferState::Misaligned;
        }
        match message_len(&self.buf[4..8]) {
            Some(len) if self.buf.len() < HEADER_SIZE + len => BufferState::Pending,
            Some(_) => BufferState::Aligned,
            None => BufferState::AckError,
        }
    }

    /// Search for the marker and discard everything before it.
    fn realign(&mut self) -> Result<()> {
        match find_marker(&self.buf) {
            Some(offset) => {
                debug!(discarded = offset, "realigned to frame marker");
                self.buf.advance(offset);
            }
            None => {
                // Keep a trailing partial marker: the rest of it may arrive
                // with the next read.
                let keep = marker_prefix_len(&self.buf);
                let discarded = self.buf.len() - keep;
                debug!(discarded, "no frame marker in buffer");
                self.buf.advance(discarded);
            }
        }
        self.state = BufferState::Unknown;
        self.misaligned_streak += 1;
        if self.misaligned_streak >= self.config.max_misalignments {
            self.state = BufferState::Closed;
            return Err(WireError::MisalignedBuffer {
                attempts: self.misaligned_streak,
            });
        }
        Ok(())
    }

    /// Drop the marker of a malformed message so the next realignment pass
    /// re-synchronizes on the following marker.
    fn discard_malformed(&mut self, err: WireError) -> Result<()> {
        warn!(error = %err, "discarding malformed message");
        self.buf.advance(MARKER.len());
        self.state = BufferState::Misaligned;
        self.ack_error_streak += 1;
        if self.ack_error_streak >= self.config.max_ack_errors {
            self.state = BufferState::Closed;
            return Err(WireError::ParseFailed {
                attempts: self.ack_error_streak,
            });
        }
        Ok(())
    }

    /// Parse and consume the complete message at the head of the buffer.
    ///
    /// `Ok(None)` means a well-formed message with an unknown command name
    /// was consumed and skipped.
    fn take_message(&mut self) -> Result<Option<Ack>> {
        let len = message_len(&self.buf[4..8]).ok_or_else(|| WireError::InvalidLength {
            text: String::from_utf8_lossy(&self.buf[4..8]).into_owned(),
        })?;
        let message = &self.buf[HEADER_SIZE..HEADER_SIZE + len];
        let cmd = &message[..4];
        let body = &message[4..len - 4];

        let wants_checksum = match cmd {
            b"GFRA" => self.config.validate_frame_checksums,
            _ => true,
        };
        if wants_checksum {
            let expected =
                parse_hex_u16(&message[len - 4..]).ok_or_else(|| WireError::InvalidBody {
                    command: String::from_utf8_lossy(cmd).into_owned(),
                    reason: "checksum field is not hex".into(),
                })?;
            // The checksum covers the length field, command, and body.
            let computed = checksum(&self.buf[4..HEADER_SIZE + len - 4]);
            if computed != expected {
                return Err(WireError::ChecksumMismatch {
                    command: String::from_utf8_lossy(cmd).into_owned(),
                    expected,
                    computed,
                });
            }
        }

        let ack = match cmd {
            b"RREG" => Some(Ack::Register(decode_register_ack(body)?)),
            b"WREG" => {
                decode_write_ack(body)?;
                Some(Ack::Write)
            }
            b"RRSE" => Some(Ack::Registers(decode_multi_register_ack(body)?)),
            b"GFRA" => Some(Ack::Frame(decode_frame_ack(body)?)),
            b"SERR" => Some(Ack::ModuleError),
            other if other.iter().all(u8::is_ascii_alphabetic) => {
                warn!(command = %String::from_utf8_lossy(other), "skipping unknown command");
                None
            }
            other => {
                return Err(WireError::InvalidBody {
                    command: format!("{other:02X?}"),
                    reason: "not a command name".into(),
                })
            }
        };

        debug!(len, "message consumed");
        self.buf.advance(HEADER_SIZE + len);
        self.misaligned_streak = 0;
        self.ack_error_streak = 0;
        self.state = BufferState::Unknown;
        Ok(ack)
    }
}

impl Default for AckDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse and bound the length field. `None` for unparseable or impossible
/// lengths.
fn message_len(field: &[u8]) -> Option<usize> {
    let len = usize::from(parse_hex_u16(field)?);
    (MIN_MESSAGE_LEN..=MAX_MESSAGE_LEN)
        .contains(&len)
        .then_some(len)
}

fn find_marker(buf: &[u8]) -> Option<usize> {
    buf.windows(MARKER.len()).position(|window| window == MARKER)
}

/// Length of the longest buffer suffix that is a proper prefix of the
/// marker.
fn marker_prefix_len(buf: &[u8]) -> usize {
    for keep in (1..MARKER.len()).rev() {
        if buf.len() >= keep && buf[buf.len() - keep..] == MARKER[..keep] {
            return keep;
        }
    }
    0
}
