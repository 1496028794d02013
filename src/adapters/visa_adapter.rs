//! VISA instrument link for USB/GPIB/Ethernet instruments
//!
//! Implements `InstrumentLink` on top of the `visa-rs` crate. VISA calls are
//! synchronous, so every write and read runs on Tokio's blocking pool. The
//! adapter timeout is programmed into the session (`VI_ATTR_TMO_VALUE`) on
//! connect, so VISA itself ends a slow read and releases the session; the
//! async side waits one extra second before reporting a stuck driver.
//!
//! Without the `instrument_visa` feature the adapter can still be built and
//! configured, but every I/O call fails with `ScopeError::FeatureNotEnabled`.

use super::InstrumentLink;
use crate::config::InstrumentConfig;
use crate::error::{ScopeError, ScopeResult};
use async_trait::async_trait;
use std::time::Duration;

#[cfg(feature = "instrument_visa")]
use std::sync::Arc;
#[cfg(feature = "instrument_visa")]
use tokio::sync::Mutex;
#[cfg(feature = "instrument_visa")]
use tracing::{debug, warn};
#[cfg(feature = "instrument_visa")]
use visa_rs::prelude::*;

/// Resource string of the TDS2024B on the lab bench.
pub const DEFAULT_RESOURCE: &str = "USB::0x0699::0x036A::C041309::INSTR";

#[cfg(feature = "instrument_visa")]
const READ_CHUNK: usize = 4096;

/// Extra time the async side waits past the VISA timeout before giving up.
const BACKSTOP_GRACE: Duration = Duration::from_secs(1);

/// VISA link to one instrument
///
/// Supports resource strings like:
/// - "USB::0x0699::0x036A::C041309::INSTR" (USBTMC)
/// - "GPIB0::1::INSTR" (GPIB interface)
/// - "TCPIP0::192.168.1.100::INSTR" (Ethernet/LXI)
pub struct VisaAdapter {
    /// VISA resource string
    pub(crate) resource_string: String,

    /// Per-call write/read timeout
    pub(crate) timeout: Duration,

    /// Appended to every command
    pub(crate) write_terminator: String,

    /// Marks the end of a response
    pub(crate) read_terminator: String,

    /// The open VISA session (behind Arc<Mutex> for the blocking pool)
    #[cfg(feature = "instrument_visa")]
    instrument: Option<Arc<Mutex<Instrument>>>,
}

impl VisaAdapter {
    /// Create an unconnected adapter with default settings
    pub fn new(resource_string: impl Into<String>) -> Self {
        Self {
            resource_string: resource_string.into(),
            timeout: Duration::from_secs(5),
            write_terminator: "\n".to_string(),
            read_terminator: "\n".to_string(),
            #[cfg(feature = "instrument_visa")]
            instrument: None,
        }
    }

    /// Create an unconnected adapter from the `[instrument]` config section
    pub fn from_config(config: &InstrumentConfig) -> Self {
        Self::new(config.resource_string.clone())
            .with_timeout(config.timeout())
            .with_write_terminator(config.write_terminator.clone())
            .with_read_terminator(config.read_terminator.clone())
    }

    /// Set read/write timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the terminator appended to commands
    pub fn with_write_terminator(mut self, terminator: String) -> Self {
        self.write_terminator = terminator;
        self
    }

    /// Set the terminator that ends a response
    pub fn with_read_terminator(mut self, terminator: String) -> Self {
        self.read_terminator = terminator;
        self
    }

    /// Read/write timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Timeout programmed into the VISA session, in milliseconds.
    pub fn session_timeout_ms(&self) -> u32 {
        u32::try_from(self.timeout.as_millis()).unwrap_or(u32::MAX)
    }

    /// How long a blocking call is awaited before the link reports a timeout.
    ///
    /// VISA enforces `timeout` on the session itself; this only catches a
    /// driver that never returns.
    pub fn backstop_timeout(&self) -> Duration {
        self.timeout.saturating_add(BACKSTOP_GRACE)
    }

    /// Human-readable summary for logs
    pub fn info(&self) -> String {
        format!(
            "VisaAdapter({} @ {}ms timeout)",
            self.resource_string,
            self.timeout.as_millis()
        )
    }
}

#[cfg(feature = "instrument_visa")]
impl VisaAdapter {
    /// Open the VISA session
    ///
    /// # Errors
    /// `ScopeError::Transport` if the resource manager cannot be created or
    /// the resource cannot be opened (instrument unplugged, wrong address).
    pub async fn connect(&mut self) -> ScopeResult<()> {
        let resource = self.resource_string.clone();
        let timeout_ms = self.session_timeout_ms();
        let instrument = self
            .run_blocking("<open>", move || {
                let rm = DefaultRM::new().map_err(std::io::Error::other)?;
                let c_string = std::ffi::CString::new(resource)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
                let visa_string = visa_rs::VisaString::from(c_string);
                let instrument = rm
                    .open(&visa_string, AccessMode::NO_LOCK, TIMEOUT_IMMEDIATE)
                    .map_err(std::io::Error::other)?;

                let tmo = visa_rs::attribute::AttrTmoValue::new_checked(timeout_ms).ok_or_else(
                    || {
                        std::io::Error::new(
                            std::io::ErrorKind::InvalidInput,
                            format!("VISA timeout {}ms out of range", timeout_ms),
                        )
                    },
                )?;
                instrument.set_attr(tmo).map_err(std::io::Error::other)?;
                Ok(instrument)
            })
            .await?;

        self.instrument = Some(Arc::new(Mutex::new(instrument)));
        debug!(
            "VISA resource '{}' opened with {}ms timeout",
            self.resource_string,
            self.timeout.as_millis()
        );
        Ok(())
    }

    /// Drop the VISA session
    pub fn disconnect(&mut self) {
        if self.instrument.take().is_some() {
            debug!("VISA resource '{}' closed", self.resource_string);
        }
    }

    /// Whether a session is open
    pub fn is_connected(&self) -> bool {
        self.instrument.is_some()
    }

    fn session(&self) -> ScopeResult<Arc<Mutex<Instrument>>> {
        self.instrument.clone().ok_or(ScopeError::NotConnected)
    }

    /// Run blocking VISA I/O on a dedicated thread, bounded by the backstop.
    async fn run_blocking<T, F>(&self, command: &str, io: F) -> ScopeResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> std::io::Result<T> + Send + 'static,
    {
        let backstop = self.backstop_timeout();
        let outcome = tokio::time::timeout(backstop, tokio::task::spawn_blocking(io)).await;
        let result = match outcome {
            Ok(Ok(Ok(value))) => return Ok(value),
            Ok(Ok(Err(io_error))) => ScopeError::transport(command, io_error),
            Ok(Err(join_error)) => ScopeError::transport(command, join_error),
            Err(_) => ScopeError::transport(
                command,
                format!("no answer from VISA after {}ms", backstop.as_millis()),
            ),
        };
        warn!(
            resource = %self.resource_string,
            "Unable to communicate with the instrument, make sure it is plugged in: {}",
            result
        );
        Err(result)
    }
}

#[cfg(feature = "instrument_visa")]
#[async_trait]
impl InstrumentLink for VisaAdapter {
    async fn write(&mut self, command: &str) -> ScopeResult<()> {
        use std::io::Write;

        let session = self.session()?;
        let line = format!("{}{}", command, self.write_terminator);
        self.run_blocking(command, move || {
            let mut instrument = session.blocking_lock();
            instrument.write_all(line.as_bytes())?;
            instrument.flush()
        })
        .await?;
        debug!("VISA write sent: {}", command);
        Ok(())
    }

    async fn read(&mut self) -> ScopeResult<String> {
        use std::io::Read;

        let session = self.session()?;
        let terminator = self.read_terminator.clone().into_bytes();
        let bytes = self
            .run_blocking("<read>", move || {
                let mut instrument = session.blocking_lock();
                let mut response = Vec::new();
                let mut chunk = [0u8; READ_CHUNK];
                loop {
                    let n = instrument.read(&mut chunk)?;
                    response.extend_from_slice(&chunk[..n]);
                    if n == 0 || terminator.is_empty() || response.ends_with(&terminator) {
                        break;
                    }
                }
                Ok(response)
            })
            .await?;

        let response = String::from_utf8_lossy(&bytes)
            .trim_end_matches('\0')
            .trim_end_matches(self.read_terminator.as_str())
            .trim_end()
            .to_string();
        debug!("VISA read: {}", response);
        Ok(response)
    }

    fn resource_name(&self) -> &str {
        &self.resource_string
    }
}

#[cfg(not(feature = "instrument_visa"))]
impl VisaAdapter {
    /// Always fails: VISA support is not compiled in
    pub async fn connect(&mut self) -> ScopeResult<()> {
        Err(ScopeError::FeatureNotEnabled("instrument_visa".to_string()))
    }

    /// No session can exist without VISA support
    pub fn disconnect(&mut self) {}

    /// Always false without VISA support
    pub fn is_connected(&self) -> bool {
        false
    }
}

#[cfg(not(feature = "instrument_visa"))]
#[async_trait]
impl InstrumentLink for VisaAdapter {
    async fn write(&mut self, _command: &str) -> ScopeResult<()> {
        Err(ScopeError::FeatureNotEnabled("instrument_visa".to_string()))
    }

    async fn read(&mut self) -> ScopeResult<String> {
        Err(ScopeError::FeatureNotEnabled("instrument_visa".to_string()))
    }

    fn resource_name(&self) -> &str {
        &self.resource_string
    }
}
