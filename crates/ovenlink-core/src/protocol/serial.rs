//! Serial port handling
//!
//! Provides the RS-232 [`Transport`] used against real hardware.

use serialport::{ClearBuffer, FlowControl, SerialPort};
use std::io::{Read, Write};
use std::time::{Duration, Instant};
use tracing::debug;

use super::transport::{Connector, DataBits, LineConfig, Parity, StopBits, Transport};
use super::{ProtocolError, MAX_FRAME_LEN};

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Open a serial port with the given line parameters
pub fn open_port(name: &str, config: &LineConfig) -> Result<Box<dyn SerialPort>, ProtocolError> {
    serialport::new(name, config.baud_rate)
        .data_bits(config.data_bits.into())
        .parity(config.parity.into())
        .stop_bits(config.stop_bits.into())
        .flow_control(FlowControl::None)
        .timeout(config.read_timeout())
        .open()
        .map_err(|e| ProtocolError::OpenFailed(format!("{}: {}", name, e)))
}

/// Clear the serial port buffers
pub fn clear_buffers(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.clear(ClearBuffer::All)
        .map_err(|e| ProtocolError::TransportFault(e.to_string()))
}

/// Opens [`SerialTransport`]s on a named port
#[derive(Debug, Clone)]
pub struct SerialConnector {
    port_name: String,
}

impl SerialConnector {
    /// Connector for a port such as "/dev/ttyUSB0" or "COM3"
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
        }
    }

    /// Port name
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl Connector for SerialConnector {
    type Transport = SerialTransport;

    fn connect(&mut self, config: &LineConfig) -> Result<SerialTransport, ProtocolError> {
        let port = open_port(&self.port_name, config)?;
        debug!(port = %self.port_name, baud = config.baud_rate, "serial port opened");
        Ok(SerialTransport {
            port: Some(port),
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
        })
    }
}

/// An open RS-232 line
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl SerialTransport {
    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, ProtocolError> {
        self.port.as_mut().ok_or(ProtocolError::NotOpen)
    }

    /// serialport has one timeout for both directions
    fn use_timeout(&mut self, timeout: Duration) -> Result<(), ProtocolError> {
        if self.read_timeout == self.write_timeout {
            return Ok(());
        }
        set_port_timeout(self.port()?.as_mut(), timeout)
    }
}

fn set_port_timeout(port: &mut dyn SerialPort, timeout: Duration) -> Result<(), ProtocolError> {
    port.set_timeout(timeout)
        .map_err(|e| ProtocolError::TransportFault(e.to_string()))
}

/// Read one CR-terminated line within `timeout`
///
/// Each read is limited to what is left of the deadline. Bytes map 1:1 to
/// chars so noise on the line survives into the recorded response.
fn read_line_from<R, F>(
    reader: &mut R,
    timeout: Duration,
    mut set_timeout: F,
) -> Result<String, ProtocolError>
where
    R: Read + ?Sized,
    F: FnMut(&mut R, Duration) -> Result<(), ProtocolError>,
{
    let start = Instant::now();
    let mut line = Vec::with_capacity(32);
    let mut byte = [0u8; 1];

    loop {
        let remaining = timeout.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            return Err(ProtocolError::Timeout);
        }
        set_timeout(reader, remaining)?;

        match reader.read(&mut byte) {
            Ok(0) => {
                return Err(ProtocolError::TransportFault(
                    "port returned end of stream".to_string(),
                ))
            }
            Ok(_) => {
                line.push(byte[0]);
                if byte[0] == b'\r' {
                    break;
                }
                if line.len() >= MAX_FRAME_LEN {
                    return Err(ProtocolError::TransportFault(format!(
                        "line exceeds {} bytes",
                        MAX_FRAME_LEN
                    )));
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(line.iter().map(|&b| b as char).collect())
}

impl Transport for SerialTransport {
    fn discard_buffers(&mut self) -> Result<(), ProtocolError> {
        clear_buffers(self.port()?.as_mut())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        let timeout = self.write_timeout;
        self.use_timeout(timeout)?;
        let port = self.port()?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, ProtocolError> {
        let timeout = self.read_timeout;
        let port = self.port()?;

        let result = read_line_from(&mut *port, timeout, |port, remaining| {
            set_port_timeout(port.as_mut(), remaining)
        });
        // Put back the full timeout the deadline loop shrank
        let restored = set_port_timeout(port.as_mut(), timeout);
        let line = result?;
        restored?;
        Ok(line)
    }

    fn close(&mut self) -> Result<(), ProtocolError> {
        // Dropping the handle closes the OS port
        match self.port.take() {
            Some(_) => Ok(()),
            None => Err(ProtocolError::NotOpen),
        }
    }
}
