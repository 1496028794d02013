//! Driver library for the Tektronix TDS2024B oscilloscope.
//!
//! The crate formats the instrument's SCPI commands, sends them over an
//! [`InstrumentLink`](adapters::InstrumentLink) (a VISA session in
//! production, a scripted mock in tests) and parses the ASCII replies into
//! typed values: scaled waveforms, preambles, measurements and status
//! registers.

pub mod adapters;
pub mod config;
pub mod error;
pub mod error_recovery;
pub mod instrument;
pub mod tracing_init;

pub use adapters::{InstrumentLink, MockAdapter, VisaAdapter};
pub use config::ScopeConfig;
pub use error::{ScopeError, ScopeResult};
pub use instrument::{AcquisitionResult, Channel, Tds2024b};
