//! Static descriptors for registers and multi-bit fields.
//!
//! The tables in [`crate::registers`] and [`crate::fields`] are built from
//! these types at compile time. Runtime state (cached bytes and field
//! values) lives in [`crate::map::RegMap`], not here.

/// One contiguous bit span inside a register, `start..end` exclusive,
/// bit 0 being the least significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitRange {
    pub addr: u8,
    pub start: u8,
    pub end: u8,
}

impl BitRange {
    /// Number of bits covered by the span.
    pub const fn width(&self) -> u32 {
        (self.end - self.start) as u32
    }

    /// Mask of `width` low bits, before shifting into register position.
    pub const fn value_mask(&self) -> u32 {
        if self.width() >= 32 {
            u32::MAX
        } else {
            (1 << self.width()) - 1
        }
    }

    /// Mask of the span in register position.
    pub const fn register_mask(&self) -> u8 {
        ((self.value_mask() << self.start) & 0xFF) as u8
    }
}

/// One hardware register.
#[derive(Debug, Clone, Copy)]
pub struct RegisterDef {
    pub name: &'static str,
    pub addr: u8,
    pub readable: bool,
    pub writable: bool,
    /// The hardware reverts this register right after acting on it, so a
    /// cached copy is stale the moment it is observed.
    pub auto_reset: bool,
    /// Datasheet summary of what the register controls.
    pub description: &'static str,
}

/// One named field, composed of bit spans across one or more registers.
///
/// Spans are ordered least significant first: the first range supplies the
/// low bits of the field value, each later range the bits above it.
#[derive(Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub bitmap: &'static [BitRange],
    pub readable: bool,
    pub writable: bool,
    /// Custom acceptance check run before any hardware write.
    pub validator: Option<fn(u32) -> bool>,
    /// Human-readable rendering. Fields without one display as decimal.
    pub display: Option<fn(u32) -> String>,
}

impl FieldDef {
    pub fn width(&self) -> u32 {
        self.bitmap.iter().map(BitRange::width).sum()
    }

    /// Largest value the field's bit width can hold.
    pub fn max_value(&self) -> u32 {
        let width = self.width();
        if width >= 32 {
            u32::MAX
        } else {
            (1 << width) - 1
        }
    }

    /// Register addresses the field touches, in bitmap order, deduplicated.
    pub fn registers(&self) -> impl Iterator<Item = u8> + '_ {
        self.bitmap
            .iter()
            .enumerate()
            .filter(|(i, range)| !self.bitmap[..*i].iter().any(|prior| prior.addr == range.addr))
            .map(|(_, range)| range.addr)
    }
}

impl std::fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("bitmap", &self.bitmap)
            .field("readable", &self.readable)
            .field("writable", &self.writable)
            .field("validator", &self.validator.is_some())
            .field("display", &self.display.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPAN: BitRange = BitRange {
        addr: 0xB5,
        start: 6,
        end: 7,
    };

    #[test]
    fn test_bit_range_masks() {
        assert_eq!(SPAN.width(), 1);
        assert_eq!(SPAN.value_mask(), 0b1);
        assert_eq!(SPAN.register_mask(), 0b0100_0000);
    }

    #[test]
    fn test_field_width_spans_registers() {
        const SERIAL: &[BitRange] = &[
            BitRange {
                addr: 0xE3,
                start: 0,
                end: 8,
            },
            BitRange {
                addr: 0xE4,
                start: 0,
                end: 8,
            },
            BitRange {
                addr: 0xE5,
                start: 0,
                end: 8,
            },
        ];
        let field = FieldDef {
            name: "SERIAL",
            bitmap: SERIAL,
            readable: true,
            writable: false,
            validator: None,
            display: None,
        };
        assert_eq!(field.width(), 24);
        assert_eq!(field.max_value(), 0x00FF_FFFF);
        assert_eq!(field.registers().collect::<Vec<_>>(), vec![0xE3, 0xE4, 0xE5]);
    }
}
