use std::time::Duration;

use senxor_wire::WireError;

/// Broad classification of link failures, used to select an
/// [`ErrorPolicy`](crate::policy::ErrorPolicy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The frame marker was missing where a message should start.
    InvalidHeader,
    /// A message body was malformed.
    InvalidBody,
    /// A message arrived with a bad checksum.
    ChecksumMismatch,
    /// No matching acknowledgement arrived within the deadline.
    AckTimeout,
    /// The link is closed or was never opened.
    NotConnected,
    /// The transport failed mid-session.
    LostConnection,
    /// The device reports that no sensor module is installed.
    NoModule,
    /// A caller-supplied value was rejected before touching hardware.
    Validation,
}

/// Errors that can occur on an open link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// No matching acknowledgement arrived within the deadline.
    #[error("no acknowledgement within {0:?}")]
    AckTimeout(Duration),

    /// The link is closed or was never opened.
    #[error("not connected")]
    NotConnected,

    /// The transport failed mid-session.
    #[error("connection lost: {0}")]
    LostConnection(#[source] std::io::Error),

    /// The device reports that no sensor module is installed.
    #[error("no sensor module installed")]
    NoModule,

    /// The receive stream could not be decoded.
    #[error("stream decode failed: {0}")]
    Decode(#[from] WireError),
}

impl LinkError {
    /// The policy classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LinkError::AckTimeout(_) => ErrorKind::AckTimeout,
            LinkError::NotConnected => ErrorKind::NotConnected,
            LinkError::LostConnection(_) => ErrorKind::LostConnection,
            LinkError::NoModule => ErrorKind::NoModule,
            LinkError::Decode(err) => match err {
                WireError::InvalidHeader => ErrorKind::InvalidHeader,
                WireError::InvalidLength { .. }
                | WireError::InvalidBody { .. }
                | WireError::UnsupportedFrameLength { .. } => ErrorKind::InvalidBody,
                WireError::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
                WireError::NoAddresses => ErrorKind::Validation,
                // Decoder gave up on the stream; the transport is unusable.
                WireError::MisalignedBuffer { .. } | WireError::ParseFailed { .. } => {
                    ErrorKind::LostConnection
                }
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
