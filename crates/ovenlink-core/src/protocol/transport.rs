//! Transport abstraction
//!
//! The session talks to the controller through these traits so the same code
//! drives a real serial line or the in-memory fake in [`super::mock`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ProtocolError, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};

/// Number of data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBits {
    /// 7 bits
    Seven,
    /// 8 bits
    Eight,
}

/// Parity checking mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    /// No parity bit
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBits {
    /// 1 stop bit
    One,
    /// 2 stop bits
    Two,
}

/// Serial line parameters passed to [`Connector::connect`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits
    pub data_bits: DataBits,
    /// Parity
    pub parity: Parity,
    /// Stop bits
    pub stop_bits: StopBits,
    /// Read timeout in milliseconds
    pub read_timeout_ms: u64,
    /// Write timeout in milliseconds
    pub write_timeout_ms: u64,
}

impl Default for LineConfig {
    /// 9600 baud, 8E1, 1 s timeouts
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            parity: Parity::Even,
            stop_bits: StopBits::One,
            read_timeout_ms: DEFAULT_TIMEOUT_MS,
            write_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl LineConfig {
    /// Read timeout as a [`Duration`]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Write timeout as a [`Duration`]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// An open, line-oriented byte stream to the controller
pub trait Transport: Send {
    /// Drop anything pending in either direction
    fn discard_buffers(&mut self) -> Result<(), ProtocolError>;

    /// Write all of `bytes`
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ProtocolError>;

    /// Block until a CR arrives or the read timeout expires
    ///
    /// The returned line includes the CR and the `*` before it.
    fn read_line(&mut self) -> Result<String, ProtocolError>;

    /// Release the line
    fn close(&mut self) -> Result<(), ProtocolError>;
}

/// Opens a [`Transport`] with the given line parameters
pub trait Connector {
    /// Transport produced by this connector
    type Transport: Transport;

    /// Acquire the line
    fn connect(&mut self, config: &LineConfig) -> Result<Self::Transport, ProtocolError>;
}
