//! High-level handle to one SenXor camera module.

use std::io::{Read, Write};
use std::sync::Arc;

use senxor_link::{LinkConfig, LinkError, SenxorLink};
use senxor_regmap::RegMap;
use senxor_transport::{SerialConfig, SerialLink};
use senxor_wire::FrameData;
use tracing::{debug, info};

use crate::error::Result;

const FRAME_MODE: u8 = 0xB1;
const FRAME_MODE_SINGLE: u8 = 0b01;
const FRAME_MODE_CONTINUOUS: u8 = 0b10;
const FRAME_MODE_OFF: u8 = 0x00;

/// Open-time behavior and layer tuning for one device.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub serial: SerialConfig,
    pub link: LinkConfig,
    /// Halt any stream left running by a previous session before the
    /// first register read. Default: true.
    pub stop_stream_on_open: bool,
    /// Read every readable register once after opening so cached lookups
    /// have real values behind them. Default: true.
    pub refresh_on_open: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            link: LinkConfig::default(),
            stop_stream_on_open: true,
            refresh_on_open: true,
        }
    }
}

/// One connected SenXor module: the threaded link plus the register map
/// layered over it.
///
/// All methods are callable from any thread. Dropping the handle stops
/// the worker and releases the port.
pub struct Senxor {
    link: Arc<SenxorLink>,
    regmap: RegMap<Arc<SenxorLink>>,
    config: DeviceConfig,
    port_name: String,
}

impl Senxor {
    /// Open the module on a serial port with default settings.
    pub fn open(port: &str) -> Result<Self> {
        Self::open_with_config(port, DeviceConfig::default())
    }

    /// Open the module on a serial port.
    pub fn open_with_config(port: &str, config: DeviceConfig) -> Result<Self> {
        let serial = SerialLink::open(port, &config.serial)?;
        Self::from_transport(serial, port, config)
    }

    /// Bring up a device over an already-open transport. Used for serial
    /// ports by [`open_with_config`](Self::open_with_config) and directly for bridged
    /// transports (TCP-serial gateways, test harnesses).
    pub fn from_transport<T>(transport: T, port_name: &str, config: DeviceConfig) -> Result<Self>
    where
        T: Read + Write + Send + 'static,
    {
        let link = Arc::new(SenxorLink::open(transport, config.link.clone()));
        let regmap = RegMap::new(Arc::clone(&link));
        let device = Self {
            link,
            regmap,
            config,
            port_name: port_name.to_string(),
        };
        if device.config.stop_stream_on_open {
            device.stop_stream()?;
        }
        if device.config.refresh_on_open {
            device.regmap.read_all()?;
        }
        info!(port = %device.port_name, "senxor device ready");
        Ok(device)
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    /// The underlying command link, for frame plumbing that bypasses the
    /// register map.
    pub fn link(&self) -> &Arc<SenxorLink> {
        &self.link
    }

    /// The register and field map layered over this device.
    pub fn regmap(&self) -> &RegMap<Arc<SenxorLink>> {
        &self.regmap
    }

    /// Read a register from hardware, updating the caches.
    pub fn read_register(&self, addr: u8) -> Result<u8> {
        Ok(self.regmap.read_reg(addr)?)
    }

    /// Write a register.
    pub fn write_register(&self, addr: u8, value: u8) -> Result<()> {
        Ok(self.regmap.write_reg(addr, value)?)
    }

    /// Read several registers, batching the uncached ones into one
    /// transaction.
    pub fn read_registers(&self, addrs: &[u8]) -> Result<Vec<(u8, u8)>> {
        Ok(self.regmap.read_regs(addrs)?)
    }

    /// Refresh the register cache from every readable register.
    pub fn read_all(&self) -> Result<()> {
        Ok(self.regmap.read_all()?)
    }

    /// Current value of a named field.
    pub fn get_field(&self, name: &str) -> Result<u32> {
        Ok(self.regmap.get_field(name)?)
    }

    /// Write a named field, preserving neighboring bits.
    pub fn set_field(&self, name: &str, value: u32) -> Result<()> {
        Ok(self.regmap.set_field(name, value)?)
    }

    /// Human-readable rendering of a named field.
    pub fn get_field_display(&self, name: &str) -> Result<String> {
        Ok(self.regmap.get_field_display(name)?)
    }

    /// Firmware version as `major.minor.build`.
    pub fn firmware_version(&self) -> Result<String> {
        let major = self.regmap.get_field("FW_VERSION_MAJOR")?;
        let minor = self.regmap.get_field("FW_VERSION_MINOR")?;
        let build = self.regmap.get_field("FW_VERSION_BUILD")?;
        Ok(format!("{major}.{minor}.{build}"))
    }

    /// Module serial number as printed on the flex, six hex digits.
    pub fn serial_number(&self) -> Result<String> {
        let serial = self.regmap.get_field("SERIAL_NUMBER")?;
        Ok(format!("{serial:06X}"))
    }

    /// Put the module in continuous capture mode.
    pub fn start_stream(&self) -> Result<()> {
        self.write_register(FRAME_MODE, FRAME_MODE_CONTINUOUS)?;
        debug!(port = %self.port_name, "stream started");
        Ok(())
    }

    /// Halt continuous capture.
    pub fn stop_stream(&self) -> Result<()> {
        self.write_register(FRAME_MODE, FRAME_MODE_OFF)
    }

    /// Whether the module reports continuous capture as active. Always a
    /// fresh read: the frame mode register is auto-reset.
    pub fn is_streaming(&self) -> Result<bool> {
        let mode = self.regmap.get_reg(FRAME_MODE)?;
        Ok(mode & FRAME_MODE_CONTINUOUS != 0)
    }

    /// Request and wait for one frame without entering continuous mode.
    pub fn capture(&self) -> Result<FrameData> {
        self.write_register(FRAME_MODE, FRAME_MODE_SINGLE)?;
        match self.link.read_frame(true)? {
            Some(frame) => Ok(frame),
            None => Err(LinkError::AckTimeout(self.config.link.frame_timeout).into()),
        }
    }

    /// Fetch the next decoded frame, blocking when asked.
    pub fn read_frame(&self, block: bool) -> Result<Option<FrameData>> {
        Ok(self.link.read_frame(block)?)
    }

    /// Stop streaming and shut the link down. Idempotent; errors during
    /// the final stream halt are logged and swallowed.
    pub fn close(&self) {
        if self.link.is_connected() {
            if let Err(err) = self.stop_stream() {
                debug!(error = %err, "stream halt on close failed");
            }
        }
        self.link.stop();
        info!(port = %self.port_name, "senxor device closed");
    }
}

impl Drop for Senxor {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Senxor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Senxor")
            .field("port", &self.port_name)
            .field("connected", &self.is_connected())
            .finish()
    }
}
