//! Serial transport for SenXor thermal camera modules.
//!
//! The modules enumerate as USB CDC-ACM devices and speak the SenXor wire
//! protocol over a plain 8N1 serial line. This crate owns the port setup
//! and exposes the open port as a blocking [`Read`](std::io::Read) +
//! [`Write`](std::io::Write) stream; everything above it is
//! transport-agnostic.

pub mod error;
pub mod serial;

pub use error::{Result, TransportError};
pub use serial::{SerialConfig, SerialLink};
