//! # OvenLink Core Library
//!
//! Master-side driver for TTC B2 UpS multi-zone heat/oven controllers.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Frame encoding and FCS verification
//! - A serialized request/response session over RS-232
//! - The typed read and write command vocabulary of the controller
//! - An in-memory transport for testing without hardware
//!
//! ## Example
//!
//! ```rust,no_run
//! use ovenlink_core::protocol::{LineConfig, OperationMode, Session};
//!
//! let mut session = Session::serial("/dev/ttyUSB0");
//! session.open(&LineConfig::default())?;
//!
//! let analog = session.analog_data();
//! println!("{}: {:?}", analog.status(), analog.value());
//!
//! let run = session.set_operation_mode(OperationMode::Run);
//! assert!(run.is_ok(), "{}", run.status());
//! # Ok::<(), ovenlink_core::protocol::ProtocolError>(())
//! ```

pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::protocol::{
        Address, Connector, ErrorKind, LineConfig, OperationMode, OperationStatus,
        ProtocolError, Session, Signal, Transaction, Transport,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
