//! Serial port handling
//!
//! Opens the scale's serial line with the 8217 line parameters.

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::time::Duration;

use super::{ProtocolError, READ_TIMEOUT};

/// Serial line parameters for one scale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSettings {
    /// Port name (e.g., "/dev/ttyS0" or "COM3")
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits per character
    pub data_bits: DataBits,
    /// Parity
    pub parity: Parity,
    /// Stop bits
    pub stop_bits: StopBits,
    /// Read timeout for a single byte
    pub timeout: Duration,
}

impl LineSettings {
    /// 7 data bits, even parity, one stop bit, 1 s read timeout
    pub fn seven_even_one(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            data_bits: DataBits::Seven,
            parity: Parity::Even,
            stop_bits: StopBits::One,
            timeout: READ_TIMEOUT,
        }
    }
}

/// Open a serial port with the given line settings
pub fn open_port(settings: &LineSettings) -> Result<Box<dyn SerialPort>, ProtocolError> {
    let mut port = serialport::new(&settings.port_name, settings.baud_rate)
        .data_bits(settings.data_bits)
        .parity(settings.parity)
        .stop_bits(settings.stop_bits)
        .flow_control(FlowControl::None)
        .timeout(settings.timeout)
        .open()
        .map_err(|e| {
            ProtocolError::Connection(format!("cannot open {}: {}", settings.port_name, e))
        })?;

    clear_buffers(port.as_mut())?;
    tracing::debug!(
        port = %settings.port_name,
        baud = settings.baud_rate,
        "serial port opened"
    );
    Ok(port)
}

/// Clear the serial port buffers
pub fn clear_buffers(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.clear(serialport::ClearBuffer::All)
        .map_err(|e| ProtocolError::Connection(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seven_even_one() {
        let settings = LineSettings::seven_even_one("/dev/ttyS0", 9600);
        assert_eq!(settings.data_bits, DataBits::Seven);
        assert_eq!(settings.parity, Parity::Even);
        assert_eq!(settings.stop_bits, StopBits::One);
        assert_eq!(settings.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_open_missing_port_fails() {
        let settings = LineSettings::seven_even_one("/dev/scalelink-no-such-port", 9600);
        let err = open_port(&settings).err().map(|e| e.to_string());
        assert!(err.is_some_and(|e| e.contains("/dev/scalelink-no-such-port")));
    }
}
