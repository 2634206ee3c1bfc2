/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The buffer does not begin with the frame marker where one is expected.
    #[error("invalid frame header (marker \"   #\" not found)")]
    InvalidHeader,

    /// The length field is not parseable or names an impossible message size.
    #[error("invalid length field {text:?}")]
    InvalidLength { text: String },

    /// The message body does not match the layout of its command kind.
    #[error("invalid {command} body: {reason}")]
    InvalidBody {
        command: String,
        reason: String,
    },

    /// The trailing checksum does not match the message contents.
    #[error("checksum mismatch for {command} (expected {expected:04X}, computed {computed:04X})")]
    ChecksumMismatch {
        command: String,
        expected: u16,
        computed: u16,
    },

    /// A frame acknowledgement body has a length outside the known table.
    #[error("unsupported frame payload length {length}")]
    UnsupportedFrameLength { length: usize },

    /// A multi-register read was requested with no addresses.
    #[error("multi-register read requires at least one address")]
    NoAddresses,

    /// Realignment failed too many times in a row.
    #[error("cannot recover from misaligned buffer ({attempts} consecutive realignments)")]
    MisalignedBuffer { attempts: u32 },

    /// Complete messages kept failing to parse.
    #[error("parse continuously failed ({attempts} consecutive malformed messages)")]
    ParseFailed { attempts: u32 },
}

pub type Result<T> = std::result::Result<T, WireError>;
