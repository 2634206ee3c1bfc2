//! Threaded request/response link for SenXor modules.
//!
//! [`SenxorLink`] drives a byte transport from a dedicated worker thread:
//! commands are queued to it, acknowledgements and thermal frames come
//! back through the shared link state. Callers get a blocking API with
//! per-error retry policies on top.

pub mod error;
pub mod link;
pub mod policy;

mod state;
mod worker;

pub use error::{ErrorKind, LinkError, Result};
pub use link::{LinkConfig, SenxorLink};
pub use policy::ErrorPolicy;
