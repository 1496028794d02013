//! SCPI command strings understood by the TDS2024B.
//!
//! Every string the driver sends is built here so the vocabulary can be
//! checked in one place. Values are formatted verbatim; range checking is
//! left to the instrument firmware.

use super::channel::{AcquireMode, Channel, Coupling, MeasurementType};

/// Identification query.
pub const IDN: &str = "*idn?";
/// Event status register query.
pub const ESR: &str = "*esr?";
/// Status byte query.
pub const STB: &str = "*stb?";
/// Operation complete query.
pub const OPC: &str = "*opc?";
/// Full waveform preamble query.
pub const WFMPRE: &str = "wfmpre?";
/// Curve data query for the current data source.
pub const CURVE: &str = "curve?";
/// Route operation complete into the device event status enable register.
pub const DESE_OPC: &str = "dese 1";
/// Route operation complete into the event status enable register.
pub const ESE_OPC: &str = "*ese 1";
/// Disable service requests.
pub const SRE_OFF: &str = "*sre 0";
/// Arm a single-sequence acquisition.
pub const SINGLE_SEQUENCE: &str = "acquire:stopafter sequence; state on";
/// Force a trigger event.
pub const TRIGGER_FORCE: &str = "trigger force";
/// Immediate measurement value query.
pub const MEASUREMENT_VALUE: &str = "measurement:immed:value?";

/// `select:ch<N> on|off`
pub fn select(channel: Channel, on: bool) -> String {
    format!("select:{} {}", channel, if on { "on" } else { "off" })
}

/// ASCII transfer of one byte per point over `1..=stop`.
pub fn data_range(stop: usize) -> String {
    format!("data:width 1;start 1;stop {};encdg ascii", stop)
}

/// `data:source ch<N>`
pub fn data_source(channel: Channel) -> String {
    format!("data:source {}", channel)
}

/// Time increment query for one channel's preamble.
pub fn xincr(channel: Channel) -> String {
    format!("wfmpre:{}:xincr?", channel)
}

/// `measurement:immed:source1 ch<N>`
pub fn measurement_source(channel: Channel) -> String {
    format!("measurement:immed:source1 {}", channel)
}

/// `measurement:immed:type <type>`
pub fn measurement_type(kind: MeasurementType) -> String {
    format!("measurement:immed:type {}", kind.as_scpi())
}

/// `acquire:mode <mode>`
pub fn acquire_mode(mode: AcquireMode) -> String {
    format!("acquire:mode {}", mode.as_scpi())
}

/// `ch<N>:bandwidth off`
pub fn bandwidth_off(channel: Channel) -> String {
    format!("{}:bandwidth off", channel)
}

/// `ch<N>:coupling ac|dc|gnd`
pub fn coupling(channel: Channel, coupling: Coupling) -> String {
    format!("{}:coupling {}", channel, coupling.as_scpi())
}

/// `horizontal:main:scale <seconds>`
pub fn seconds_per_division(seconds: f64) -> String {
    format!("horizontal:main:scale {}", seconds)
}

/// `ch<N>:scale <volts>`
pub fn volts_per_division(channel: Channel, volts: f64) -> String {
    format!("{}:scale {}", channel, volts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_commands() {
        assert_eq!(select(Channel::Ch1, true), "select:ch1 on");
        assert_eq!(select(Channel::Ch4, false), "select:ch4 off");
    }

    #[test]
    fn test_transfer_commands() {
        assert_eq!(data_range(2500), "data:width 1;start 1;stop 2500;encdg ascii");
        assert_eq!(data_source(Channel::Ch3), "data:source ch3");
        assert_eq!(xincr(Channel::Ch2), "wfmpre:ch2:xincr?");
    }

    #[test]
    fn test_setter_commands() {
        assert_eq!(bandwidth_off(Channel::Ch1), "ch1:bandwidth off");
        assert_eq!(coupling(Channel::Ch2, Coupling::Ac), "ch2:coupling ac");
        assert_eq!(acquire_mode(AcquireMode::PeakDetect), "acquire:mode peakdetect");
        assert_eq!(
            measurement_type(MeasurementType::PeakToPeak),
            "measurement:immed:type pk2pk"
        );
        assert_eq!(seconds_per_division(0.0005), "horizontal:main:scale 0.0005");
        assert_eq!(volts_per_division(Channel::Ch4, 2.0), "ch4:scale 2");
    }

    #[test]
    fn test_values_pass_through_unvalidated() {
        assert_eq!(volts_per_division(Channel::Ch1, -50.0), "ch1:scale -50");
        assert_eq!(seconds_per_division(1e9), "horizontal:main:scale 1000000000");
    }
}
