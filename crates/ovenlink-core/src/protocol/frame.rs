//! Frame encoding/decoding
//!
//! Implements the ASCII frame format of the TTC B2 UpS controller.
//!
//! Frame format:
//! - 1 char: Head (`@`)
//! - 2 chars: Controller address
//! - 2 chars: Signal code
//! - N chars: Payload
//! - 2 chars: FCS, XOR of every byte from the head through the payload, uppercase hex
//! - 2 chars: End marker (`*` CR)
//!
//! Everything here is pure; the session owns the I/O.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ProtocolError;

/// Frame head
pub const FRAME_HEAD: char = '@';

/// Frame end marker
pub const FRAME_END: &str = "*\r";

/// Width of the FCS field
pub const FCS_LEN: usize = 2;

/// XOR of every character in `data`, each taken as its low byte
///
/// Frames are ASCII. A line read off the wire maps each received byte to the
/// char of the same value, so folding chars reproduces the on-wire XOR.
pub fn compute_checksum(data: &str) -> u8 {
    data.chars().fold(0u8, |acc, c| acc ^ c as u8)
}

/// Format an FCS the way it travels on the wire
pub fn format_checksum(fcs: u8) -> String {
    format!("{:02X}", fcs)
}

/// Append FCS and end marker to a frame body
pub fn encode_frame(body: &str) -> String {
    let mut frame = String::with_capacity(body.len() + FCS_LEN + FRAME_END.len());
    frame.push_str(body);
    frame.push_str(&format_checksum(compute_checksum(body)));
    frame.push_str(FRAME_END);
    frame
}

/// Build a complete request frame
///
/// `param_a` and `param_b` are copied verbatim; the controller rejects
/// malformed payloads, this layer does not.
pub fn build_request(address: &str, signal_code: &str, param_a: &str, param_b: &str) -> String {
    let mut body = String::with_capacity(
        1 + address.len() + signal_code.len() + param_a.len() + param_b.len(),
    );
    body.push(FRAME_HEAD);
    body.push_str(address);
    body.push_str(signal_code);
    body.push_str(param_a);
    body.push_str(param_b);
    encode_frame(&body)
}

/// Split a frame (end marker already removed) into body and FCS field
pub fn split_checksum(frame: &str) -> Option<(&str, &str)> {
    let split = frame.len().checked_sub(FCS_LEN)?;
    if !frame.is_char_boundary(split) {
        return None;
    }
    Some(frame.split_at(split))
}

/// Check the FCS of a frame whose end marker is already removed
///
/// Frames shorter than the FCS field never verify.
pub fn verify_response(frame: &str) -> bool {
    match split_checksum(frame) {
        Some((body, received)) => format_checksum(compute_checksum(body)) == received,
        None => false,
    }
}

/// Remove the end marker from a received line
///
/// Tolerates a line that lost its `*` or its CR; the FCS check catches the rest.
pub fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\r').unwrap_or(line);
    line.strip_suffix('*').unwrap_or(line)
}

/// Strip the end marker, verify the FCS and return the body without FCS
pub fn decode_response(line: &str) -> Result<&str, ProtocolError> {
    let frame = strip_terminator(line);
    if frame.is_empty() {
        return Err(ProtocolError::EmptyResponse);
    }

    let (body, received) = split_checksum(frame).unwrap_or(("", frame));
    let expected = format_checksum(compute_checksum(body));
    if expected != received {
        return Err(ProtocolError::ChecksumMismatch {
            expected,
            actual: received.to_string(),
        });
    }

    Ok(body)
}

/// Two-character controller address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Validate an address; exactly two ASCII alphanumerics
    pub fn new(address: impl Into<String>) -> Result<Self, ProtocolError> {
        let address = address.into();
        if address.len() != 2 || !address.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ProtocolError::InvalidField {
                field: "address",
                value: address,
            });
        }
        Ok(Self(address))
    }

    /// Address as sent on the wire
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Address {
    fn default() -> Self {
        Self(super::DEFAULT_ADDRESS.to_string())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::new(value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}
