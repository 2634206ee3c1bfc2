//! The SenXor register table.
//!
//! Address layout and access attributes follow the MI48 interface
//! documentation. Registers below 0xB0 configure the image processing
//! pipeline, 0xB0 and up hold camera control, identification and
//! calibration state.

use crate::def::RegisterDef;

const fn rw(name: &'static str, addr: u8, description: &'static str) -> RegisterDef {
    RegisterDef {
        name,
        addr,
        readable: true,
        writable: true,
        auto_reset: false,
        description,
    }
}

const fn rw_auto(name: &'static str, addr: u8, description: &'static str) -> RegisterDef {
    RegisterDef {
        auto_reset: true,
        ..rw(name, addr, description)
    }
}

const fn ro(name: &'static str, addr: u8, description: &'static str) -> RegisterDef {
    RegisterDef {
        writable: false,
        ..rw(name, addr, description)
    }
}

const fn ro_auto(name: &'static str, addr: u8, description: &'static str) -> RegisterDef {
    RegisterDef {
        auto_reset: true,
        ..ro(name, addr, description)
    }
}

const fn wo_auto(name: &'static str, addr: u8, description: &'static str) -> RegisterDef {
    RegisterDef {
        readable: false,
        auto_reset: true,
        ..rw(name, addr, description)
    }
}

/// All known registers, ascending by address.
pub const REGISTERS: &[RegisterDef] = &[
    wo_auto("MCU_RESET", 0x00, "Software Reset of the MI48"),
    rw_auto("HOST_XFER_CTRL", 0x01, "Host DMA transfer control"),
    rw_auto("SPI_RTY", 0x19, "SPI retransmission control"),
    rw("STARK_CTRL", 0x20, "STARK denoising filter control"),
    rw("STARK_CUTOFF", 0x21, "STARK filter cutoff"),
    rw("STARK_GRAD", 0x22, "STARK filter gradient"),
    rw("STARK_SCALE", 0x23, "STARK filter scale"),
    rw("MMS_CTRL", 0x25, "Min/Max Stabilization control"),
    rw("MEDIAN_CTRL", 0x30, "Median denoising filter control"),
    rw("FRAME_FORMAT", 0x31, "Temperature units of output frame"),
    ro("MCU_TYPE", 0x33, "MCU type"),
    rw_auto("FRAME_MODE", 0xB1, "Control capture and readout of thermal data"),
    ro("FW_VERSION_1", 0xB2, "Firmware Version (Major, Minor)"),
    ro("FW_VERSION_2", 0xB3, "Firmware Version (Build)"),
    rw("FRAME_RATE", 0xB4, "Frame rate"),
    rw_auto("SLEEP_MODE", 0xB5, "Control of low power state"),
    ro_auto("STATUS", 0xB6, "MI48 and SenXor Status"),
    rw("CLK_SPEED", 0xB7, "Control of internal clock parameters"),
    rw("SENXOR_GAIN", 0xB9, "Module ADC gain control"),
    ro("SENXOR_TYPE", 0xBA, "SenXor chip type"),
    ro("MODULE_TYPE", 0xBB, "Module type (chip-lens combination)"),
    rw("TEMP_CONVERT_CTRL", 0xBC, "Temperature Conversion Control"),
    rw("SENSITIVITY_FACTOR", 0xC2, "Sensitivity correction factor"),
    rw_auto("SELF_CALIBRATION", 0xC5, "Self-Calibration of column offset"),
    rw("EMISSIVITY", 0xCA, "Emissivity value for temperature conversion"),
    rw("OFFSET_CORR", 0xCB, "Offset correction to the entire frame"),
    rw("OBJECT_TEMP_FACTOR", 0xCD, "Object temperature factor"),
    rw_auto("FILTER_CONTROL", 0xD0, "Temporal domain denoising filter control"),
    rw("FILTER_SETTING_1_0", 0xD1, "Parameters for the temporal filter Low Byte"),
    rw("FILTER_SETTING_1_1", 0xD2, "Parameters for the temporal filter High Byte"),
    rw("USER_FLASH_CTRL", 0xD8, "Enable/Disable host access to User Flash"),
    ro("SENXOR_ID_0", 0xE0, "Serial number of the attached camera module byte 0"),
    ro("SENXOR_ID_1", 0xE1, "Serial number of the attached camera module byte 1"),
    ro("SENXOR_ID_2", 0xE2, "Serial number of the attached camera module byte 2"),
    ro("SENXOR_ID_3", 0xE3, "Serial number of the attached camera module byte 3"),
    ro("SENXOR_ID_4", 0xE4, "Serial number of the attached camera module byte 4"),
    ro("SENXOR_ID_5", 0xE5, "Serial number of the attached camera module byte 5"),
    ro("SENXOR_ID_6", 0xE6, "Serial number of the attached camera module byte 6"),
];

/// Look up a register by address.
pub fn register(addr: u8) -> Option<&'static RegisterDef> {
    REGISTERS.iter().find(|reg| reg.addr == addr)
}

/// Look up a register by name.
pub fn register_by_name(name: &str) -> Option<&'static RegisterDef> {
    REGISTERS.iter().find(|reg| reg.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses_are_unique_and_sorted() {
        for pair in REGISTERS.windows(2) {
            assert!(
                pair[0].addr < pair[1].addr,
                "{} and {} out of order",
                pair[0].name,
                pair[1].name
            );
        }
    }

    #[test]
    fn test_lookup_by_address() {
        assert_eq!(register(0xB6).map(|reg| reg.name), Some("STATUS"));
        assert!(register(0xB6).is_some_and(|reg| reg.auto_reset && !reg.writable));
        assert!(register(0x7F).is_none());
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(register_by_name("EMISSIVITY").map(|reg| reg.addr), Some(0xCA));
        assert!(register_by_name("BOGUS").is_none());
    }

    #[test]
    fn test_reset_register_is_write_only() {
        let reset = register(0x00).unwrap();
        assert!(!reset.readable);
        assert!(reset.writable);
        assert!(reset.auto_reset);
    }

    #[test]
    fn test_every_register_is_described() {
        for reg in REGISTERS {
            assert!(!reg.description.is_empty(), "{} lacks a description", reg.name);
        }
    }
}
