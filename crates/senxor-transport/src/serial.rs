use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::info;

use crate::error::{Result, TransportError};

/// Serial line parameters for a SenXor module.
///
/// Modules speak 8N1 with no flow control; the defaults match, and only
/// the rate and the timeouts normally vary between setups.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Line rate in baud. Default: 115 200.
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// How long a read blocks before reporting a timeout. Kept short so a
    /// polling reader stays responsive. Default: 5 ms.
    pub read_timeout: Duration,
    /// How long a write may block before reporting a timeout. Default: 200 ms.
    pub write_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            read_timeout: Duration::from_millis(5),
            write_timeout: Duration::from_millis(200),
        }
    }
}

/// An open serial connection to a SenXor module.
///
/// Wraps a system serial port opened in 8N1 mode. The port is owned
/// exclusively; dropping the link closes it.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    name: String,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl SerialLink {
    /// Open the named port.
    pub fn open(name: &str, config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(name, config.baud_rate)
            .data_bits(config.data_bits)
            .parity(config.parity)
            .stop_bits(config.stop_bits)
            .flow_control(config.flow_control)
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| TransportError::Open {
                port: name.to_string(),
                source: e,
            })?;
        info!(port = %name, baud = config.baud_rate, "opened serial port");
        Ok(Self {
            port,
            name: name.to_string(),
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
        })
    }

    /// The port name this link was opened on.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // The port has a single timeout for both directions; switch to the
        // longer one while a write is in flight.
        self.port
            .set_timeout(self.write_timeout)
            .map_err(io::Error::from)?;
        let written = self.port.write(buf);
        let restored = self.port.set_timeout(self.read_timeout);
        let n = written?;
        restored.map_err(io::Error::from)?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("port", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_8n1() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.flow_control, FlowControl::None);
        assert_eq!(config.read_timeout, Duration::from_millis(5));
        assert_eq!(config.write_timeout, Duration::from_millis(200));
    }

    #[test]
    fn test_open_missing_port() {
        let result = SerialLink::open("/dev/senxor-test-missing", &SerialConfig::default());
        match result {
            Err(TransportError::Open { port, .. }) => {
                assert_eq!(port, "/dev/senxor-test-missing");
            }
            other => panic!("expected open error, got {other:?}"),
        }
    }
}
