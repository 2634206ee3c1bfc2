use senxor_link::LinkError;
use thiserror::Error;

/// Errors produced by the register and field map.
///
/// Validation failures are raised before any hardware access and carry
/// the offending address or value. Transport failures bubble up from the
/// underlying link unchanged.
#[derive(Debug, Error)]
pub enum RegmapError {
    /// Address has no entry in the register table.
    #[error("unknown register address 0x{0:02X}")]
    UnknownRegister(u8),

    /// Name has no entry in the field table.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Hardware read attempted on a write-only register.
    #[error("register {name} (0x{addr:02X}) is not readable")]
    NotReadable { name: &'static str, addr: u8 },

    /// Hardware write attempted on a read-only register.
    #[error("register {name} (0x{addr:02X}) is not writable")]
    NotWritable { name: &'static str, addr: u8 },

    /// Read attempted on a write-only field.
    #[error("field {0} is not readable")]
    FieldNotReadable(&'static str),

    /// Write attempted on a read-only field.
    #[error("field {0} is not writable")]
    FieldNotWritable(&'static str),

    /// Value does not fit the field's bit width.
    #[error("value {value} out of range for field {name} (max {max})")]
    OutOfRange {
        name: &'static str,
        value: u32,
        max: u32,
    },

    /// Value refused by the field's validator.
    #[error("value {value} rejected by validator for field {name}")]
    Rejected { name: &'static str, value: u32 },

    /// Device answered a bulk read without reporting this register.
    #[error("device returned no value for register 0x{0:02X}")]
    NoResponse(u8),

    /// Failure in the underlying device link.
    #[error("link error: {0}")]
    Link(#[from] LinkError),
}

pub type Result<T> = std::result::Result<T, RegmapError>;
