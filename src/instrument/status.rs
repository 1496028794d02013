//! IEEE 488.2 status registers.

use serde::Serialize;
use std::fmt;

/// Standard event status register, as returned by `*esr?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventStatus(pub u8);

impl EventStatus {
    const OPC: u8 = 1 << 0;
    const QYE: u8 = 1 << 2;
    const DDE: u8 = 1 << 3;
    const EXE: u8 = 1 << 4;
    const CME: u8 = 1 << 5;
    const URQ: u8 = 1 << 6;
    const PON: u8 = 1 << 7;

    /// Operation complete
    pub fn operation_complete(self) -> bool {
        self.0 & Self::OPC != 0
    }

    /// Query error
    pub fn query_error(self) -> bool {
        self.0 & Self::QYE != 0
    }

    /// Device-dependent error
    pub fn device_error(self) -> bool {
        self.0 & Self::DDE != 0
    }

    /// Execution error
    pub fn execution_error(self) -> bool {
        self.0 & Self::EXE != 0
    }

    /// Command error
    pub fn command_error(self) -> bool {
        self.0 & Self::CME != 0
    }

    /// User request
    pub fn user_request(self) -> bool {
        self.0 & Self::URQ != 0
    }

    /// Power on
    pub fn power_on(self) -> bool {
        self.0 & Self::PON != 0
    }

    /// Any of the four error bits.
    pub fn has_error(self) -> bool {
        self.0 & (Self::QYE | Self::DDE | Self::EXE | Self::CME) != 0
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ESR 0x{:02X}", self.0)
    }
}

/// Status byte register, as returned by `*stb?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusByte(pub u8);

impl StatusByte {
    const MAV: u8 = 1 << 4;
    const ESB: u8 = 1 << 5;
    const MSS: u8 = 1 << 6;

    /// Message available in the output queue
    pub fn message_available(self) -> bool {
        self.0 & Self::MAV != 0
    }

    /// An enabled event status bit is set
    pub fn event_status(self) -> bool {
        self.0 & Self::ESB != 0
    }

    /// Master summary status
    pub fn master_summary(self) -> bool {
        self.0 & Self::MSS != 0
    }
}

impl fmt::Display for StatusByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "STB 0x{:02X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_status_bits() {
        let esr = EventStatus(0b1010_0001);
        assert!(esr.operation_complete());
        assert!(esr.command_error());
        assert!(esr.power_on());
        assert!(esr.has_error());
        assert!(!esr.execution_error());
        assert!(!EventStatus(1).has_error());
        assert_eq!(esr.to_string(), "ESR 0xA1");
    }

    #[test]
    fn test_status_byte_bits() {
        let stb = StatusByte(0x30);
        assert!(stb.message_available());
        assert!(stb.event_status());
        assert!(!stb.master_summary());
    }
}
