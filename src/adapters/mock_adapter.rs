//! Mock instrument link for testing
//!
//! This adapter stands in for a VISA session without requiring hardware. It
//! provides:
//! - Scripted responses per query command
//! - Controllable failure injection for writes and reads
//! - A log of every command written, for test verification

use super::InstrumentLink;
use crate::error::{ScopeError, ScopeResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::trace;

/// Resource name reported by mock links.
pub const MOCK_RESOURCE: &str = "MOCK::TDS2024B::INSTR";

#[derive(Default)]
struct MockState {
    responses: HashMap<String, VecDeque<String>>,
    pending: VecDeque<String>,
    call_log: Vec<String>,
    fail_next_write: bool,
    fail_next_read: bool,
    latency: Duration,
}

/// Scripted instrument link
///
/// Responses are registered per query command (matched case-insensitively).
/// When several responses are queued for a command they are returned in
/// order; the last one is then repeated for every further query. A query
/// with no scripted response leaves nothing to read, so the following
/// `read` fails the way a VISA read timeout would.
///
/// Clones share state, so a test can keep a handle for inspection after
/// moving the adapter into a driver.
///
/// # Example
///
/// ```
/// use tds2024b::adapters::{InstrumentLink, MockAdapter};
///
/// # tokio_test_block_on(async {
/// let mut link = MockAdapter::new().with_response("*idn?", "TEKTRONIX,TDS 2024B,0,CF:91.1CT");
/// let idn = link.query("*idn?").await.unwrap();
/// assert!(idn.starts_with("TEKTRONIX"));
/// assert_eq!(link.call_log(), vec!["*idn?".to_string()]);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MockAdapter {
    state: Arc<Mutex<MockState>>,
}

impl MockAdapter {
    /// Create a mock link with no scripted responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `command` (builder form)
    pub fn with_response(self, command: &str, response: &str) -> Self {
        self.push_response(command, response);
        self
    }

    /// Simulated delay applied to every write and read
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = latency;
        self
    }

    /// Queue a response for `command`
    pub fn push_response(&self, command: &str, response: &str) {
        self.lock()
            .responses
            .entry(normalize(command))
            .or_default()
            .push_back(response.to_string());
    }

    /// Make the next `write` fail with a transport error
    pub fn inject_write_failure(&self) {
        self.lock().fail_next_write = true;
    }

    /// Make the next `read` fail with a transport error
    pub fn inject_read_failure(&self) {
        self.lock().fail_next_read = true;
    }

    /// Every command written so far, in order
    pub fn call_log(&self) -> Vec<String> {
        self.lock().call_log.clone()
    }

    /// Clear the call log
    pub fn clear_log(&self) {
        self.lock().call_log.clear();
    }

    /// Responses produced by queries but not read yet
    pub fn pending_reads(&self) -> usize {
        self.lock().pending.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_latency(&self) {
        let latency = self.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl InstrumentLink for MockAdapter {
    async fn write(&mut self, command: &str) -> ScopeResult<()> {
        self.simulate_latency().await;
        let mut state = self.lock();
        state.call_log.push(command.to_string());

        if std::mem::take(&mut state.fail_next_write) {
            return Err(ScopeError::transport(command, "injected write failure"));
        }

        let key = normalize(command);
        if key.ends_with('?') {
            let response = match state.responses.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            };
            if let Some(response) = response {
                trace!(command, %response, "mock response queued");
                state.pending.push_back(response);
            }
        }
        Ok(())
    }

    async fn read(&mut self) -> ScopeResult<String> {
        self.simulate_latency().await;
        let mut state = self.lock();

        if std::mem::take(&mut state.fail_next_read) {
            return Err(ScopeError::transport("<read>", "injected read failure"));
        }

        state
            .pending
            .pop_front()
            .map(|line| line.trim_end_matches(['\r', '\n']).to_string())
            .ok_or_else(|| ScopeError::transport("<read>", "read timed out: no response pending"))
    }

    fn resource_name(&self) -> &str {
        MOCK_RESOURCE
    }
}

fn normalize(command: &str) -> String {
    command.trim().to_ascii_lowercase()
}
