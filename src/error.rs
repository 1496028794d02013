//! Error types for the oscilloscope driver.
//!
//! `ScopeError` is the single error type returned by every fallible operation
//! in the crate. It separates the failure modes a caller can act on:
//!
//! - **`Transport`**: the link could not write a command or read a response
//!   (VISA session failure, I/O error, read timeout).
//! - **`Parse`**: a response arrived but did not contain the expected labeled
//!   token or numeric data.
//! - **`OperationTimeout`**: the operation-complete bit was never observed
//!   within the configured poll budget.
//! - **`SampleCount`**: the instrument returned a curve whose length differs
//!   from the number of samples requested.
//!
//! Configuration problems surface as `Config` (loading) or `Configuration`
//! (validation), CSV export failures as `Csv`, and calls into VISA functionality on a build without the
//! `instrument_visa` feature fail with `FeatureNotEnabled`.

use crate::instrument::Channel;
use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the driver error type.
pub type ScopeResult<T> = std::result::Result<T, ScopeError>;

#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum ScopeError {
    #[error("Transport error on '{command}': {message}")]
    Transport { command: String, message: String },

    #[error("Instrument link is not connected")]
    NotConnected,

    #[error("Failed to parse {what} from response '{response}'")]
    Parse { what: String, response: String },

    #[error("Operation complete not observed after {attempts} polls ({waited:?})")]
    OperationTimeout { attempts: u32, waited: Duration },

    #[error("Channel {channel} returned {actual} samples, expected {expected}")]
    SampleCount {
        channel: Channel,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid channel number {0}. Valid channels: 1-4")]
    InvalidChannel(u8),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),
}

impl ScopeError {
    /// Builds a `Transport` error for the command that was in flight.
    pub fn transport(command: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            command: command.into(),
            message: message.to_string(),
        }
    }

    /// Builds a `Parse` error carrying the offending response.
    pub fn parse(what: impl Into<String>, response: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            response: response.into(),
        }
    }

    /// True when the failure came from the link rather than from the data.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::NotConnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScopeError::transport("*idn?", "USB session closed");
        assert_eq!(
            err.to_string(),
            "Transport error on '*idn?': USB session closed"
        );
        assert!(err.is_transport());
    }

    #[test]
    fn test_parse_error_is_not_transport() {
        let err = ScopeError::parse("YMULT", ":WFMPRE:BYT_NR 1");
        assert!(!err.is_transport());
        assert!(err.to_string().contains("YMULT"));
    }

    #[test]
    fn test_sample_count_error_names_channel() {
        let err = ScopeError::SampleCount {
            channel: Channel::Ch3,
            expected: 2500,
            actual: 2000,
        };
        assert_eq!(
            err.to_string(),
            "Channel ch3 returned 2000 samples, expected 2500"
        );
    }
}
