//! Host-side driver for SenXor thermal imaging modules.
//!
//! SenXor cameras enumerate as USB serial devices and speak a framed,
//! checksummed ASCII-hex protocol. This crate stacks the pieces into one
//! handle:
//!
//! - [`wire`]: frame codec with commands, acknowledgements, the receive
//!   decoder and thermal frame payloads
//! - [`transport`]: serial port setup and the byte stream over it
//! - [`link`]: worker thread pumping the transport, with blocking
//!   request/response calls and retry policies
//! - [`regmap`]: named registers and fields with caching over the link
//!
//! [`Senxor`] ties them together; [`FrameStream`] adds push-style frame
//! delivery on a dedicated thread.
//!
//! ```no_run
//! use senxor::Senxor;
//!
//! # fn main() -> senxor::Result<()> {
//! let camera = Senxor::open("/dev/ttyACM0")?;
//! println!("firmware {}", camera.firmware_version()?);
//! camera.start_stream()?;
//! let frame = camera.read_frame(true)?;
//! # Ok(())
//! # }
//! ```

mod device;
mod error;
mod stream;

pub use device::{DeviceConfig, Senxor};
pub use error::{Error, Result};
pub use senxor_wire::FrameData;
pub use stream::{FrameStream, StreamError};

/// Re-export wire protocol types.
pub mod wire {
    pub use senxor_wire::*;
}

/// Re-export transport types.
pub mod transport {
    pub use senxor_transport::*;
}

/// Re-export link types.
pub mod link {
    pub use senxor_link::*;
}

/// Re-export register map types.
pub mod regmap {
    pub use senxor_regmap::*;
}
