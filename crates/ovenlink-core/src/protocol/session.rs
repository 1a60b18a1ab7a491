//! Session management
//!
//! Owns the line to the controller and runs one request/response exchange at
//! a time. Every exchange returns a [`Transaction`] carrying the verbatim
//! request and response text together with the outcome.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::frame::{build_request, decode_response, Address};
use super::payload::{const_value_payload, operation_payload, step_fields, RUN_MODE_INIT_PAYLOAD};
use super::serial::SerialConnector;
use super::signals::{OperationMode, Signal};
use super::transport::{Connector, LineConfig, Transport};
use super::{ErrorKind, ProtocolError};

const STATUS_TRANSMIT_OK: &str = "transmit successful";
const STATUS_READ_OK: &str = "read successful";
const STATUS_WRITE_OK: &str = "write successful";
const STATUS_OPERATION_OK: &str = "operation setting succeeded";

/// Outcome of one exchange with the controller
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction<T> {
    request: String,
    response: String,
    success: &'static str,
    outcome: Result<T, ProtocolError>,
}

impl<T> Transaction<T> {
    fn new(
        request: String,
        response: String,
        success: &'static str,
        outcome: Result<T, ProtocolError>,
    ) -> Self {
        Self {
            request,
            response,
            success,
            outcome,
        }
    }

    /// Failed before any I/O
    fn rejected(error: ProtocolError) -> Self {
        Self::new(String::new(), String::new(), "", Err(error))
    }

    /// Apply an acknowledgement check to a successful exchange
    fn and_then<U, F>(self, success: &'static str, check: F) -> Transaction<U>
    where
        F: FnOnce(T) -> Result<U, ProtocolError>,
    {
        Transaction {
            request: self.request,
            response: self.response,
            success,
            outcome: self.outcome.and_then(check),
        }
    }

    /// Request frame as written, empty if nothing was sent
    pub fn request(&self) -> &str {
        &self.request
    }

    /// Response line as received, empty if nothing arrived
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Human-readable status
    pub fn status(&self) -> String {
        match &self.outcome {
            Ok(_) => self.success.to_string(),
            Err(e) => e.to_string(),
        }
    }

    /// Check if the exchange succeeded
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Decoded value on success
    pub fn value(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    /// Failure cause
    pub fn error(&self) -> Option<&ProtocolError> {
        self.outcome.as_ref().err()
    }

    /// Drop the frame texts and keep the outcome
    pub fn into_result(self) -> Result<T, ProtocolError> {
        self.outcome
    }
}

/// Cumulative traffic on a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// Bytes written
    pub tx_bytes: u64,
    /// Bytes read, end markers included
    pub rx_bytes: u64,
    /// Requests written
    pub tx_frames: u64,
    /// Lines read
    pub rx_frames: u64,
}

/// Master-side session with one controller
pub struct Session<C: Connector> {
    /// Opens the line
    connector: C,
    /// Controller address substituted into every request
    address: Address,
    /// Open line, if any
    port: Option<C::Transport>,
    /// Traffic counters
    counters: Counters,
}

impl Session<SerialConnector> {
    /// Session on a named serial port with the default address
    pub fn serial(port_name: impl Into<String>) -> Self {
        Self::new(SerialConnector::new(port_name))
    }
}

impl<C: Connector> Session<C> {
    /// Create a closed session for the default controller address
    pub fn new(connector: C) -> Self {
        Self::with_address(connector, Address::default())
    }

    /// Create a closed session for a specific controller address
    pub fn with_address(connector: C, address: Address) -> Self {
        Self {
            connector,
            address,
            port: None,
            counters: Counters::default(),
        }
    }

    /// Controller address
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Check if the line is open
    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Get cumulative tx/rx counters
    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Borrow the connector
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Open the line
    ///
    /// An already open session is left untouched and reports `AlreadyOpen`.
    pub fn open(&mut self, config: &LineConfig) -> Result<(), ProtocolError> {
        if self.port.is_some() {
            warn!(address = %self.address, "open: already opened");
            return Err(ProtocolError::AlreadyOpen);
        }

        let port = self.connector.connect(config).map_err(|e| match e {
            ProtocolError::OpenFailed(_) => e,
            other => ProtocolError::OpenFailed(other.to_string()),
        })?;
        info!(
            address = %self.address,
            baud = config.baud_rate,
            "line opened"
        );
        self.port = Some(port);
        Ok(())
    }

    /// Close the line
    ///
    /// The handle is released even when the transport reports a close error.
    pub fn close(&mut self) -> Result<(), ProtocolError> {
        let mut port = self.port.take().ok_or(ProtocolError::NotOpen)?;
        port.close().map_err(|e| match e {
            ProtocolError::CloseFailed(_) => e,
            other => ProtocolError::CloseFailed(other.to_string()),
        })?;
        info!(address = %self.address, "line closed");
        Ok(())
    }

    /// Send one request and read one line back
    ///
    /// Success carries the raw response line; no checksum is verified here.
    pub fn transmit(&mut self, signal: Signal, param_a: &str, param_b: &str) -> Transaction<String> {
        if self.port.is_none() {
            warn!(signal = signal.code(), "transmit: port not open");
            return Transaction::rejected(ProtocolError::NotOpen);
        }

        let request = build_request(self.address.as_str(), signal.code(), param_a, param_b);
        let outcome = self.exchange(&request);

        match &outcome {
            Ok(line) => debug!(
                signal = signal.code(),
                tx = %request.escape_debug(),
                rx = %line.escape_debug(),
                "exchange complete"
            ),
            Err(e) => warn!(
                signal = signal.code(),
                tx = %request.escape_debug(),
                error = %e,
                "exchange failed"
            ),
        }

        let response = outcome.as_ref().map(String::clone).unwrap_or_default();
        Transaction::new(request, response, STATUS_TRANSMIT_OK, outcome)
    }

    /// Read a register family; success carries the body without FCS and end marker
    pub fn read_register(
        &mut self,
        signal: Signal,
        param_a: &str,
        param_b: &str,
    ) -> Transaction<String> {
        let tx = self
            .transmit(signal, param_a, param_b)
            .and_then(STATUS_READ_OK, |line| {
                decode_response(&line).map(str::to_string)
            });
        log_rejection(signal, &tx);
        tx
    }

    /// Analog data ('01')
    pub fn analog_data(&mut self) -> Transaction<String> {
        self.read_register(Signal::AnalogData, "", "")
    }

    /// Digital data ('51')
    pub fn digital_data(&mut self) -> Transaction<String> {
        self.read_register(Signal::DigitalData, "", "")
    }

    /// Remaining step count ('80')
    pub fn remaining_steps(&mut self) -> Transaction<String> {
        self.read_register(Signal::RemainingSteps, "", "")
    }

    /// Operation settings ('22')
    pub fn operation_setting(&mut self) -> Transaction<String> {
        self.read_register(Signal::OperationSetting, "", "")
    }

    /// PID zone settings ('28')
    pub fn pid_zone_setting(&mut self) -> Transaction<String> {
        self.read_register(Signal::PidZoneSetting, "", "")
    }

    /// Constant value settings ('25')
    pub fn const_value_setting(&mut self) -> Transaction<String> {
        self.read_register(Signal::ConstValueSetting, "", "")
    }

    /// Step settings ('20')
    pub fn step_setting(&mut self) -> Transaction<String> {
        self.read_register(Signal::StepSetting, "", "")
    }

    /// Time signal settings ('24')
    pub fn time_signal_setting(&mut self) -> Transaction<String> {
        self.read_register(Signal::TimeSignalSetting, "", "")
    }

    /// Repeat settings ('21')
    pub fn repeat_setting(&mut self) -> Transaction<String> {
        self.read_register(Signal::RepeatSetting, "", "")
    }

    /// PID parameter settings ('29')
    pub fn pid_parameter_setting(&mut self) -> Transaction<String> {
        self.read_register(Signal::PidParameterSetting, "", "")
    }

    /// ON/OFF system settings ('2B')
    pub fn on_off_system_setting(&mut self) -> Transaction<String> {
        self.read_register(Signal::OnOffSystemSetting, "", "")
    }

    /// Select the program pattern and step
    ///
    /// Succeeds as soon as the controller answers; the answer is not inspected.
    pub fn set_step(&mut self, pattern: u8, step: u8) -> Transaction<()> {
        match step_fields(pattern, step) {
            Ok((pattern, step)) => self
                .transmit(Signal::SetStep, &pattern, &step)
                .and_then(STATUS_WRITE_OK, |_| Ok(())),
            Err(e) => Transaction::rejected(e),
        }
    }

    /// Write the constant-value setpoint and slope
    ///
    /// Succeeds as soon as the controller answers; the answer is not inspected.
    pub fn set_const_value(&mut self, temp: u16, slope: u16) -> Transaction<()> {
        match const_value_payload(temp, slope) {
            Ok(payload) => self
                .transmit(Signal::SetConstValue, &payload, "")
                .and_then(STATUS_WRITE_OK, |_| Ok(())),
            Err(e) => Transaction::rejected(e),
        }
    }

    /// Put the controller into constant-value run mode with immediate start
    ///
    /// Succeeds as soon as the controller answers; the answer is not inspected.
    pub fn set_run_mode_init(&mut self) -> Transaction<()> {
        self.transmit(Signal::SetRunMode, RUN_MODE_INIT_PAYLOAD, "")
            .and_then(STATUS_WRITE_OK, |_| Ok(()))
    }

    /// Run, stop, hold or advance the program
    ///
    /// The answer must pass the FCS check and echo both the operation signal
    /// and the requested mode.
    pub fn set_operation_mode(&mut self, mode: OperationMode) -> Transaction<()> {
        let payload = operation_payload(mode);
        let tx = self
            .transmit(Signal::SetOperation, &payload, "")
            .and_then(STATUS_OPERATION_OK, |line| {
                let body = decode_response(&line)?;
                check_operation_ack(body, mode)
            });
        log_rejection(Signal::SetOperation, &tx);
        tx
    }

    fn exchange(&mut self, request: &str) -> Result<String, ProtocolError> {
        let port = self.port.as_mut().ok_or(ProtocolError::NotOpen)?;

        port.discard_buffers()?;
        port.write_bytes(request.as_bytes())?;
        self.counters.tx_bytes = self.counters.tx_bytes.saturating_add(request.len() as u64);
        self.counters.tx_frames = self.counters.tx_frames.saturating_add(1);

        let line = port.read_line()?;
        self.counters.rx_bytes = self.counters.rx_bytes.saturating_add(line.len() as u64);
        self.counters.rx_frames = self.counters.rx_frames.saturating_add(1);
        Ok(line)
    }
}

impl<C: Connector> Drop for Session<C> {
    fn drop(&mut self) {
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.close() {
                warn!(error = %e, "close on drop failed");
            }
        }
    }
}

/// Acknowledgement body: `@` address(2) signal(2) mode(2) ...
fn check_operation_ack(body: &str, mode: OperationMode) -> Result<(), ProtocolError> {
    let signal = body.get(3..5);
    let echoed = body.get(5..7);
    if signal == Some(Signal::SetOperation.code()) && echoed == Some(mode.code()) {
        return Ok(());
    }

    Err(ProtocolError::AcknowledgementMismatch {
        expected: format!("{}{}", Signal::SetOperation.code(), mode.code()),
        actual: body.get(3..).unwrap_or_default().chars().take(4).collect(),
    })
}

/// Transport failures are already logged by `transmit`
fn log_rejection<T>(signal: Signal, tx: &Transaction<T>) {
    let Some(e) = tx.error() else {
        return;
    };
    if matches!(
        e.kind(),
        ErrorKind::ChecksumMismatch | ErrorKind::AcknowledgementMismatch | ErrorKind::EmptyResponse
    ) {
        warn!(
            signal = signal.code(),
            rx = %tx.response().escape_debug(),
            error = %e,
            "response rejected"
        );
    }
}
