//! SenXor wire protocol: command framing, checksums, and ack decoding.
//!
//! Every message on the wire is framed with:
//! - A 4-byte marker (`"   #"`) for stream synchronization
//! - A 4-byte ASCII-hex length covering everything after itself
//! - A 4-byte ASCII command name
//! - A 4-byte ASCII-hex checksum trailer
//!
//! Commands are encoded host-side with a dummy checksum; acknowledgements
//! are decoded and verified through a buffer state machine that survives
//! partial reads and mid-stream corruption.

pub mod ack;
pub mod checksum;
pub mod command;
pub mod decoder;
pub mod error;
pub mod frame;

pub use ack::Ack;
pub use checksum::checksum;
pub use command::{
    encode_read_register, encode_read_registers, encode_write_register, DUMMY_CHECKSUM,
    HEADER_SIZE, MARKER,
};
pub use decoder::{AckDecoder, BufferState, DecoderConfig};
pub use error::{Result, WireError};
pub use frame::FrameData;
