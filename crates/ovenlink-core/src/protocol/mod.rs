//! Serial Protocol Communication
//!
//! Implements the TTC B2 UpS command/response protocol for heat/oven controllers.
//!
//! Every frame is ASCII, starts with `@`, ends with `*` CR and carries a
//! single-byte XOR checksum (FCS) as two uppercase hex digits.

pub mod frame;
pub mod mock;
pub mod payload;
pub mod serial;
pub mod signals;
pub mod transport;
mod error;
mod session;

pub use error::{ErrorKind, ProtocolError};
pub use frame::{build_request, compute_checksum, decode_response, verify_response, Address};
pub use serial::{SerialConnector, SerialTransport};
pub use session::{Counters, Session, Transaction};
pub use signals::{OperationMode, OperationStatus, Signal};
pub use transport::{Connector, LineConfig, Transport};

/// Default baud rate of the controller
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default read and write timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Default controller address
pub const DEFAULT_ADDRESS: &str = "01";

/// Longest line accepted from the controller
pub const MAX_FRAME_LEN: usize = 256;
