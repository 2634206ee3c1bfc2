//! The SenXor field table.
//!
//! Fields name the individual controls and status bits packed into the
//! registers: each entry maps a name to one or more bit spans, ordered
//! least significant first. Many carry a validator or a display hook
//! where the raw integer is not meaningful on its own.

use crate::def::{BitRange, FieldDef};

const fn bits(addr: u8, start: u8, end: u8) -> BitRange {
    BitRange { addr, start, end }
}

const fn rw(name: &'static str, bitmap: &'static [BitRange]) -> FieldDef {
    FieldDef {
        name,
        bitmap,
        readable: true,
        writable: true,
        validator: None,
        display: None,
    }
}

const fn ro(name: &'static str, bitmap: &'static [BitRange]) -> FieldDef {
    FieldDef {
        writable: false,
        ..rw(name, bitmap)
    }
}

const fn wo(name: &'static str, bitmap: &'static [BitRange]) -> FieldDef {
    FieldDef {
        readable: false,
        ..rw(name, bitmap)
    }
}

/// Single-bit toggle shown as `True`/`False`.
const fn rw_bool(name: &'static str, bitmap: &'static [BitRange]) -> FieldDef {
    FieldDef {
        display: Some(display_bool),
        ..rw(name, bitmap)
    }
}

const fn ro_bool(name: &'static str, bitmap: &'static [BitRange]) -> FieldDef {
    FieldDef {
        writable: false,
        ..rw_bool(name, bitmap)
    }
}

/// All known fields, ordered by the address of their first bit span.
pub const FIELDS: &[FieldDef] = &[
    FieldDef {
        display: Some(display_bool),
        ..wo("SW_RESET", &[bits(0x00, 0, 1)])
    },
    rw_bool("DMA_TIMEOUT_ENABLE", &[bits(0x01, 0, 1)]),
    FieldDef {
        display: Some(display_timeout_period),
        ..rw("TIMEOUT_PERIOD", &[bits(0x01, 1, 3)])
    },
    rw_bool("STOP_HOST_XFER", &[bits(0x01, 3, 4)]),
    rw_bool("REQ_RETRANSMIT", &[bits(0x19, 0, 1)]),
    rw_bool("AUTO_RETRANSMIT", &[bits(0x19, 1, 2)]),
    rw_bool("STARK_ENABLE", &[bits(0x20, 0, 1)]),
    FieldDef {
        display: Some(display_stark_type),
        ..rw("STARK_TYPE", &[bits(0x20, 1, 4)])
    },
    FieldDef {
        display: Some(display_kernel_size),
        ..rw("SPATIAL_KERNEL", &[bits(0x20, 4, 5)])
    },
    rw("STARK_CUTOFF", &[bits(0x21, 0, 7)]),
    rw("STARK_GRADIENT", &[bits(0x22, 0, 8)]),
    rw("STARK_SCALE", &[bits(0x23, 0, 8)]),
    rw_bool("MMS_KXMS", &[bits(0x25, 0, 1)]),
    rw_bool("MMS_RA", &[bits(0x25, 1, 2)]),
    rw_bool("MEDIAN_ENABLE", &[bits(0x30, 0, 1)]),
    FieldDef {
        display: Some(display_kernel_size),
        ..rw("MEDIAN_KERNEL_SIZE", &[bits(0x30, 1, 2)])
    },
    FieldDef {
        validator: Some(temp_units_defined),
        display: Some(display_temp_units),
        ..rw("TEMP_UNITS", &[bits(0x31, 0, 3)])
    },
    ro("MCU_TYPE", &[bits(0x33, 0, 8)]),
    rw_bool("GET_SINGLE_FRAME", &[bits(0xB1, 0, 1)]),
    rw_bool("CONTINUOUS_STREAM", &[bits(0xB1, 1, 2)]),
    FieldDef {
        validator: Some(readout_mode_defined),
        display: Some(display_readout_mode),
        ..rw("READOUT_MODE", &[bits(0xB1, 2, 5)])
    },
    rw_bool("NO_HEADER", &[bits(0xB1, 5, 6)]),
    ro("FW_VERSION_MINOR", &[bits(0xB2, 0, 4)]),
    ro("FW_VERSION_MAJOR", &[bits(0xB2, 4, 8)]),
    ro("FW_VERSION_BUILD", &[bits(0xB3, 0, 8)]),
    FieldDef {
        display: Some(display_frame_rate_divider),
        ..rw("FRAME_RATE_DIVIDER", &[bits(0xB4, 0, 7)])
    },
    rw("SLEEP_PERIOD", &[bits(0xB5, 0, 6)]),
    rw_bool("PERIOD_X100", &[bits(0xB5, 6, 7)]),
    rw_bool("SLEEP", &[bits(0xB5, 7, 8)]),
    ro_bool("READOUT_TOO_SLOW", &[bits(0xB6, 1, 2)]),
    ro_bool("SENXOR_IF_ERROR", &[bits(0xB6, 2, 3)]),
    ro_bool("CAPTURE_ERROR", &[bits(0xB6, 3, 4)]),
    ro_bool("DATA_READY", &[bits(0xB6, 4, 5)]),
    ro_bool("BOOTING_UP", &[bits(0xB6, 5, 6)]),
    rw_bool("CLK_SLOW_DOWN", &[bits(0xB7, 0, 1)]),
    FieldDef {
        validator: Some(module_gain_defined),
        display: Some(display_module_gain),
        ..rw("MODULE_GAIN", &[bits(0xB9, 0, 4)])
    },
    ro("SENXOR_TYPE", &[bits(0xBA, 0, 8)]),
    ro("MODULE_TYPE", &[bits(0xBB, 0, 8)]),
    FieldDef {
        display: Some(display_lut_source),
        ..rw("LUT_SOURCE", &[bits(0xBC, 0, 1)])
    },
    rw("LUT_SELECTOR", &[bits(0xBC, 1, 3)]),
    ro("LUT_VERSION", &[bits(0xBC, 4, 8)]),
    rw("CORR_FACTOR", &[bits(0xC2, 0, 8)]),
    rw_bool("START_COLOFFS_CALIB", &[bits(0xC5, 1, 2)]),
    ro("COLOFFS_CALIB_ON", &[bits(0xC5, 2, 3)]),
    rw_bool("USE_SELF_CALIB", &[bits(0xC5, 4, 5)]),
    FieldDef {
        display: Some(display_calib_sample_size),
        ..rw("CALIB_SAMPLE_SIZE", &[bits(0xC5, 5, 8)])
    },
    FieldDef {
        validator: Some(emissivity_in_range),
        display: Some(display_percent),
        ..rw("EMISSIVITY", &[bits(0xCA, 0, 8)])
    },
    FieldDef {
        display: Some(display_offset_tenths),
        ..rw("OFFSET", &[bits(0xCB, 0, 8)])
    },
    FieldDef {
        display: Some(display_conversion_factor),
        ..rw("OTF", &[bits(0xCD, 0, 8)])
    },
    rw_bool("TEMPORAL_ENABLE", &[bits(0xD0, 0, 1)]),
    rw_bool("TEMPORAL_INIT", &[bits(0xD0, 1, 2)]),
    rw("TEMPORAL", &[bits(0xD1, 0, 8), bits(0xD2, 0, 8)]),
    rw_bool("USER_FLASH_ENABLE", &[bits(0xD8, 0, 1)]),
    FieldDef {
        display: Some(display_production_year),
        ..ro("PRODUCTION_YEAR", &[bits(0xE0, 0, 8)])
    },
    ro("PRODUCTION_WEEK", &[bits(0xE1, 0, 8)]),
    ro("MANUF_LOCATION", &[bits(0xE2, 0, 8)]),
    ro(
        "SERIAL_NUMBER",
        &[bits(0xE3, 0, 8), bits(0xE4, 0, 8), bits(0xE5, 0, 8)],
    ),
];

/// Look up a field by name.
pub fn field(name: &str) -> Option<&'static FieldDef> {
    FIELDS.iter().find(|f| f.name == name)
}

fn display_timeout_period(value: u32) -> String {
    match value {
        0 => "500 ms",
        1 => "1000 ms",
        2 => "2000 ms",
        3 => "100 ms",
        _ => "N/A",
    }
    .to_string()
}

fn display_stark_type(value: u32) -> String {
    match value {
        1 => "Stark V1(auto)",
        2 => "Stark V2",
        3 => "Stark V1(Background Smooth)",
        4 => "Full Stark",
        0 | 5..=7 => "Quick Stark",
        _ => "N/A",
    }
    .to_string()
}

fn display_kernel_size(value: u32) -> String {
    match value {
        0 => "3x3",
        1 => "5x5",
        _ => "N/A",
    }
    .to_string()
}

fn display_temp_units(value: u32) -> String {
    match value {
        0 => "0.1 K",
        1 => "0.1 \u{b0}C",
        2 => "0.1 \u{b0}F",
        4 => "1 K",
        5 => "1 \u{b0}C",
        6 => "1 \u{b0}F",
        _ => "N/A",
    }
    .to_string()
}

fn display_readout_mode(value: u32) -> String {
    match value {
        0 => "Full-Frame Readout Mode",
        _ => "N/A",
    }
    .to_string()
}

fn display_frame_rate_divider(value: u32) -> String {
    if value <= 1 {
        "MAX FPS".to_string()
    } else {
        format!("1/{value} MAX FPS")
    }
}

fn display_module_gain(value: u32) -> String {
    match value {
        0 | 4 => "maximum: 1.0",
        1 => "auto: 1.0, 0.5, or 0.25",
        2 => "quarter: 0.25",
        3 => "half: 0.5",
        _ => "N/A",
    }
    .to_string()
}

fn display_lut_source(value: u32) -> String {
    match value {
        0 => "Module flash",
        1 => "FW",
        _ => "N/A",
    }
    .to_string()
}

fn display_bool(value: u32) -> String {
    if value == 0 { "False" } else { "True" }.to_string()
}

fn display_calib_sample_size(value: u32) -> String {
    format!("{} frames", (1 + value) * 100)
}

fn display_percent(value: u32) -> String {
    format!("{value}%")
}

// Stored as a signed byte holding tenths of a unit.
fn display_offset_tenths(value: u32) -> String {
    let raw = value as u8 as i8;
    format!("{:.1} K", f64::from(raw) / 10.0)
}

// Stored as a signed byte of hundredths away from a factor of 1.
fn display_conversion_factor(value: u32) -> String {
    let raw = value as u8 as i8;
    format!("{:.2}", f64::from(raw) / 100.0 + 1.0)
}

fn display_production_year(value: u32) -> String {
    (2000 + value).to_string()
}

fn emissivity_in_range(value: u32) -> bool {
    value <= 100
}

// Values outside these sets are reserved by the firmware.
fn temp_units_defined(value: u32) -> bool {
    matches!(value, 0..=2 | 4..=6)
}

fn readout_mode_defined(value: u32) -> bool {
    value == 0
}

fn module_gain_defined(value: u32) -> bool {
    value <= 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::register;

    #[test]
    fn test_names_are_unique() {
        for (i, f) in FIELDS.iter().enumerate() {
            assert!(
                !FIELDS[..i].iter().any(|prior| prior.name == f.name),
                "duplicate field name {}",
                f.name
            );
        }
    }

    #[test]
    fn test_bitmaps_reference_known_registers() {
        for f in FIELDS {
            for range in f.bitmap {
                let reg = register(range.addr);
                assert!(reg.is_some(), "{} references unknown 0x{:02X}", f.name, range.addr);
                assert!(range.start < range.end, "{} has an empty span", f.name);
                assert!(range.end <= 8, "{} spills past bit 7", f.name);
            }
            assert!(f.width() <= 32, "{} wider than 32 bits", f.name);
        }
    }

    #[test]
    fn test_field_access_never_exceeds_register_access() {
        for f in FIELDS {
            for range in f.bitmap {
                let reg = register(range.addr).unwrap();
                if f.readable {
                    assert!(reg.readable, "{} readable on write-only register", f.name);
                }
                if f.writable {
                    assert!(reg.writable, "{} writable on read-only register", f.name);
                }
            }
        }
    }

    #[test]
    fn test_spans_within_one_register_never_overlap() {
        for f in FIELDS {
            for other in FIELDS {
                if std::ptr::eq(f, other) {
                    continue;
                }
                for a in f.bitmap {
                    for b in other.bitmap {
                        if a.addr == b.addr {
                            assert_eq!(
                                a.register_mask() & b.register_mask(),
                                0,
                                "{} and {} overlap in 0x{:02X}",
                                f.name,
                                other.name,
                                a.addr
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_lookup_by_name() {
        let emissivity = field("EMISSIVITY").unwrap();
        assert_eq!(emissivity.bitmap, &[bits(0xCA, 0, 8)][..]);
        assert!(emissivity.validator.is_some());
        assert!(field("NOT_A_FIELD").is_none());
    }

    #[test]
    fn test_field_validators() {
        assert!(temp_units_defined(6));
        assert!(!temp_units_defined(3));
        assert!(!temp_units_defined(7));
        assert!(readout_mode_defined(0));
        assert!(!readout_mode_defined(1));
        assert!(module_gain_defined(4));
        assert!(!module_gain_defined(9));
        assert!(emissivity_in_range(100));
        assert!(!emissivity_in_range(101));
    }

    #[test]
    fn test_display_hooks() {
        assert_eq!(display_temp_units(1), "0.1 \u{b0}C");
        assert_eq!(display_temp_units(3), "N/A");
        assert_eq!(display_frame_rate_divider(0), "MAX FPS");
        assert_eq!(display_frame_rate_divider(4), "1/4 MAX FPS");
        assert_eq!(display_bool(1), "True");
        assert_eq!(display_bool(0), "False");
        assert_eq!(display_calib_sample_size(3), "400 frames");
        assert_eq!(display_offset_tenths(0xFF), "-0.1 K");
        assert_eq!(display_conversion_factor(0x00), "1.00");
        assert_eq!(display_conversion_factor(0xFF), "0.99");
        assert_eq!(display_production_year(23), "2023");
    }
}
