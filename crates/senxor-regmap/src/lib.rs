//! Register and field map for SenXor thermal camera modules.
//!
//! The hardware exposes its controls as byte registers, many of them
//! packing several unrelated switches. This crate names both layers:
//!
//! - a static register table with access attributes and auto-reset
//!   behavior,
//! - a static field table mapping names to bit spans across registers,
//! - [`RegMap`], which caches observed values and issues the minimum
//!   device traffic needed to honor them.

pub mod def;
pub mod error;
pub mod fields;
pub mod map;
pub mod registers;

pub use def::{BitRange, FieldDef, RegisterDef};
pub use error::{RegmapError, Result};
pub use fields::{field, FIELDS};
pub use map::{RegMap, RegisterBus};
pub use registers::{register, register_by_name, REGISTERS};
