//! Physical probe inputs and front-panel settings that take a channel.

use crate::error::ScopeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four analog inputs of the TDS2024B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Channel {
    /// Channel 1
    Ch1,
    /// Channel 2
    Ch2,
    /// Channel 3
    Ch3,
    /// Channel 4
    Ch4,
}

impl Channel {
    /// All inputs in front-panel order.
    pub const ALL: [Channel; 4] = [Channel::Ch1, Channel::Ch2, Channel::Ch3, Channel::Ch4];

    /// The 1-based channel number used in SCPI mnemonics.
    pub fn number(self) -> u8 {
        match self {
            Channel::Ch1 => 1,
            Channel::Ch2 => 2,
            Channel::Ch3 => 3,
            Channel::Ch4 => 4,
        }
    }
}

impl TryFrom<u8> for Channel {
    type Error = ScopeError;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        match number {
            1 => Ok(Channel::Ch1),
            2 => Ok(Channel::Ch2),
            3 => Ok(Channel::Ch3),
            4 => Ok(Channel::Ch4),
            other => Err(ScopeError::InvalidChannel(other)),
        }
    }
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> Self {
        channel.number()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.number())
    }
}

/// Input coupling of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coupling {
    /// Blocks the DC component
    Ac,
    /// Passes the full signal
    Dc,
    /// Disconnects the input signal
    Gnd,
}

impl Coupling {
    /// SCPI argument for `ch<N>:coupling`.
    pub fn as_scpi(self) -> &'static str {
        match self {
            Coupling::Ac => "ac",
            Coupling::Dc => "dc",
            Coupling::Gnd => "gnd",
        }
    }
}

/// Acquisition mode of the digitizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquireMode {
    /// One sample per interval
    Sample,
    /// Min/max capture per interval
    PeakDetect,
    /// Averaged over several acquisitions
    Average,
}

impl AcquireMode {
    /// SCPI argument for `acquire:mode`.
    pub fn as_scpi(self) -> &'static str {
        match self {
            AcquireMode::Sample => "sample",
            AcquireMode::PeakDetect => "peakdetect",
            AcquireMode::Average => "average",
        }
    }
}

/// Measurement performed by the immediate measurement engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementType {
    /// Frequency of the first cycle
    Frequency,
    /// Arithmetic mean over the record
    Mean,
    /// Period of the first cycle
    Period,
    /// Peak-to-peak amplitude
    PeakToPeak,
    /// RMS over the first complete cycle
    CycleRms,
    /// Most negative value
    Minimum,
    /// Most positive value
    Maximum,
    /// 10%-90% rise time
    Rise,
    /// 90%-10% fall time
    Fall,
    /// Positive pulse width
    PositiveWidth,
    /// Negative pulse width
    NegativeWidth,
}

impl MeasurementType {
    /// SCPI argument for `measurement:immed:type`.
    pub fn as_scpi(self) -> &'static str {
        match self {
            MeasurementType::Frequency => "freq",
            MeasurementType::Mean => "mean",
            MeasurementType::Period => "period",
            MeasurementType::PeakToPeak => "pk2pk",
            MeasurementType::CycleRms => "crms",
            MeasurementType::Minimum => "minimum",
            MeasurementType::Maximum => "maximum",
            MeasurementType::Rise => "rise",
            MeasurementType::Fall => "fall",
            MeasurementType::PositiveWidth => "pwidth",
            MeasurementType::NegativeWidth => "nwidth",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_round_trips_through_number() {
        for channel in Channel::ALL {
            assert_eq!(Channel::try_from(channel.number()).unwrap(), channel);
        }
    }

    #[test]
    fn test_invalid_channel_numbers() {
        assert!(matches!(
            Channel::try_from(0),
            Err(ScopeError::InvalidChannel(0))
        ));
        assert!(matches!(
            Channel::try_from(5),
            Err(ScopeError::InvalidChannel(5))
        ));
    }

    #[test]
    fn test_channel_display_is_scpi_mnemonic() {
        assert_eq!(Channel::Ch2.to_string(), "ch2");
    }

    #[test]
    fn test_channel_deserializes_from_number() {
        let channels: Vec<Channel> = serde_json::from_str("[1, 4]").unwrap();
        assert_eq!(channels, vec![Channel::Ch1, Channel::Ch4]);
        assert!(serde_json::from_str::<Channel>("7").is_err());
    }
}
