use senxor_link::LinkError;
use senxor_regmap::RegmapError;
use senxor_transport::TransportError;
use thiserror::Error;

/// Unified error for device-level operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Failure opening or driving the serial port.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Failure in the command/acknowledgement link.
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// Failure in register or field access.
    #[error("register map error: {0}")]
    Regmap(#[from] RegmapError),
}

pub type Result<T> = std::result::Result<T, Error>;
