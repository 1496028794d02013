//! Instrument link implementations
//!
//! This module defines the `InstrumentLink` trait, the line-oriented text
//! channel the driver talks through, and its implementations:
//! - `VisaAdapter`: a VISA session (USB, GPIB, LAN) via `visa-rs`
//! - `MockAdapter`: scripted responses for tests and offline use

pub mod mock_adapter;
pub mod visa_adapter;

pub use mock_adapter::MockAdapter;
pub use visa_adapter::VisaAdapter;

use crate::error::ScopeResult;
use async_trait::async_trait;

/// A duplex ASCII command channel to one instrument.
///
/// `write` sends one command (the implementation appends the terminator);
/// `read` returns one response line with the terminator stripped. Both fail
/// with `ScopeError::Transport` when the underlying session fails.
#[async_trait]
pub trait InstrumentLink: Send {
    /// Send one command.
    async fn write(&mut self, command: &str) -> ScopeResult<()>;

    /// Read one response line.
    async fn read(&mut self) -> ScopeResult<String>;

    /// Send a command and read its response.
    async fn query(&mut self, command: &str) -> ScopeResult<String> {
        self.write(command).await?;
        self.read().await
    }

    /// Resource identifier of the instrument behind this link.
    fn resource_name(&self) -> &str;
}
