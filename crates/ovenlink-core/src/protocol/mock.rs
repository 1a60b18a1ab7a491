//! Mock transport for testing without hardware
//!
//! Records everything the session writes and answers reads from a scripted
//! queue. An empty queue behaves like a read timeout.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::frame::encode_frame;
use super::transport::{Connector, LineConfig, Transport};
use super::ProtocolError;

/// Shared record of what happened on the fake line
#[derive(Debug, Default)]
pub struct MockState {
    /// Every write, decoded as text
    pub written: Vec<String>,
    /// Scripted results for `read_line`
    pub replies: VecDeque<Result<String, ProtocolError>>,
    /// Number of `discard_buffers` calls
    pub discards: usize,
    /// Number of successful connects
    pub opens: usize,
    /// Number of close calls
    pub closes: usize,
    /// Line parameters of the last connect
    pub last_config: Option<LineConfig>,
    /// Fail the next connects with this reason
    pub fail_open: Option<String>,
    /// Fail writes with this reason
    pub fail_write: Option<String>,
    /// Fail closes with this reason
    pub fail_close: Option<String>,
}

/// Connector handing out [`MockTransport`]s over one [`MockState`]
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    /// Create a connector with an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the shared state
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }

    /// Queue a raw reply line, sent as-is
    pub fn reply(&self, line: impl Into<String>) -> &Self {
        self.state().replies.push_back(Ok(line.into()));
        self
    }

    /// Queue a well-formed reply frame around `body`
    pub fn reply_frame(&self, body: &str) -> &Self {
        self.reply(encode_frame(body))
    }

    /// Queue a failing read
    pub fn reply_error(&self, error: ProtocolError) -> &Self {
        self.state().replies.push_back(Err(error));
        self
    }

    /// Make connects fail
    pub fn fail_open(&self, reason: impl Into<String>) -> &Self {
        self.state().fail_open = Some(reason.into());
        self
    }

    /// Make writes fail
    pub fn fail_write(&self, reason: impl Into<String>) -> &Self {
        self.state().fail_write = Some(reason.into());
        self
    }

    /// Make closes fail
    pub fn fail_close(&self, reason: impl Into<String>) -> &Self {
        self.state().fail_close = Some(reason.into());
        self
    }

    /// Copy of everything written so far
    pub fn written(&self) -> Vec<String> {
        self.state().written.clone()
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    fn connect(&mut self, config: &LineConfig) -> Result<MockTransport, ProtocolError> {
        let mut state = self.state();
        if let Some(reason) = &state.fail_open {
            return Err(ProtocolError::OpenFailed(reason.clone()));
        }
        state.opens += 1;
        state.last_config = Some(config.clone());
        Ok(MockTransport {
            state: Arc::clone(&self.state),
        })
    }
}

/// Fake open line
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl Transport for MockTransport {
    fn discard_buffers(&mut self) -> Result<(), ProtocolError> {
        lock(&self.state).discards += 1;
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        let mut state = lock(&self.state);
        if let Some(reason) = &state.fail_write {
            return Err(ProtocolError::TransportFault(reason.clone()));
        }
        state
            .written
            .push(String::from_utf8_lossy(bytes).into_owned());
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, ProtocolError> {
        lock(&self.state)
            .replies
            .pop_front()
            .unwrap_or(Err(ProtocolError::Timeout))
    }

    fn close(&mut self) -> Result<(), ProtocolError> {
        let mut state = lock(&self.state);
        state.closes += 1;
        match &state.fail_close {
            Some(reason) => Err(ProtocolError::CloseFailed(reason.clone())),
            None => Ok(()),
        }
    }
}

/// Ignores poisoning so the record stays readable after a failed assertion
fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
