//! Write payloads
//!
//! Builds the fixed-width, zero-padded parameter fields of the write commands.
//!
//! Layouts:
//! - step:        pattern(2) + step(2)
//! - const value: temp(4) `0000` slope(4) `0000` `0001` `00` `0` `0`
//! - operation:   mode(2) + execute(1)
//! - run mode:    fixed `0A000000101210096015E`

use super::signals::{OperationMode, OPERATION_EXECUTE};
use super::ProtocolError;

/// Largest value of a 2-digit field
pub const MAX_STEP_FIELD: u8 = 99;

/// Largest value of a 4-digit field
pub const MAX_VALUE_FIELD: u16 = 9999;

/// Run mode initialisation payload: program group 0A, constant-value run, immediate start
pub const RUN_MODE_INIT_PAYLOAD: &str = "0A000000101210096015E";

/// Build the two step fields
pub fn step_fields(pattern: u8, step: u8) -> Result<(String, String), ProtocolError> {
    Ok((
        pad_field("pattern", pattern as u16, 2)?,
        pad_field("step", step as u16, 2)?,
    ))
}

/// Build the constant-value payload
pub fn const_value_payload(temp: u16, slope: u16) -> Result<String, ProtocolError> {
    let temp = pad_field("temp", temp, 4)?;
    let slope = pad_field("slope", slope, 4)?;
    Ok([temp.as_str(), "0000", slope.as_str(), "0000", "0001", "00", "0", "0"].concat())
}

/// Build the operation payload
pub fn operation_payload(mode: OperationMode) -> String {
    let mut payload = String::with_capacity(3);
    payload.push_str(mode.code());
    payload.push(OPERATION_EXECUTE);
    payload
}

/// Zero-pad a decimal field, rejecting values wider than `width`
fn pad_field(field: &'static str, value: u16, width: usize) -> Result<String, ProtocolError> {
    let text = format!("{:0width$}", value, width = width);
    if text.len() > width {
        return Err(ProtocolError::InvalidField { field, value: text });
    }
    Ok(text)
}
