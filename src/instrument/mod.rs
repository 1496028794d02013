//! TDS2024B instrument support.
//!
//! - [`channel`]: channels and front-panel setting enums
//! - [`commands`]: the SCPI command vocabulary
//! - [`parse`]: response parsers (preamble, curve, labeled values)
//! - [`status`]: IEEE 488.2 status registers
//! - [`waveform`]: decoded acquisition results
//! - [`tds2024b`]: the driver itself

pub mod channel;
pub mod commands;
pub mod parse;
pub mod status;
pub mod tds2024b;
pub mod waveform;

pub use channel::{AcquireMode, Channel, Coupling, MeasurementType};
pub use parse::{PreambleValue, WaveformPreamble};
pub use status::{EventStatus, StatusByte};
pub use tds2024b::Tds2024b;
pub use waveform::{AcquisitionResult, ChannelWaveform};
