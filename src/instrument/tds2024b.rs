//! Tektronix TDS2024B oscilloscope driver
//!
//! `Tds2024b` wraps an [`InstrumentLink`] and speaks the instrument's SCPI
//! dialect: channel selection, single-sequence capture, ASCII curve transfer,
//! immediate measurements, status registers and front-panel setters.
//!
//! ## Acquisition sequence
//!
//! 1. Switch each of the four inputs on or off to match the request.
//! 2. Enable the operation-complete path, arm a single sequence, force a
//!    trigger.
//! 3. Poll `*opc?` under the configured [`RetryPolicy`].
//! 4. Transfer each channel as ASCII, one byte per point, and scale it with
//!    that channel's own preamble.
//!
//! ## Example
//!
//! ```no_run
//! use tds2024b::adapters::VisaAdapter;
//! use tds2024b::instrument::{Channel, Tds2024b};
//!
//! # async fn example() -> tds2024b::error::ScopeResult<()> {
//! let mut link = VisaAdapter::new("USB::0x0699::0x036A::C041309::INSTR");
//! link.connect().await?;
//! let mut scope = Tds2024b::new(link);
//!
//! let capture = scope.acquire(&[Channel::Ch1, Channel::Ch2], 2500).await?;
//! println!("{} samples, dt = {:e} s", capture.sample_count(), capture.time[1]);
//! # Ok(())
//! # }
//! ```

use super::channel::{AcquireMode, Channel, Coupling, MeasurementType};
use super::commands;
use super::parse::{self, WaveformPreamble};
use super::status::{EventStatus, StatusByte};
use super::waveform::{decode_volts, time_axis, AcquisitionResult, ChannelWaveform};
use crate::adapters::InstrumentLink;
use crate::config::{ScopeConfig, MAX_RECORD_LENGTH};
use crate::error::{ScopeError, ScopeResult};
use crate::error_recovery::{wait_for_completion, CompletionProbe, RetryPolicy};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

/// Value reported by the measurement engine when it cannot measure.
const NO_MEASUREMENT: f64 = 9.9e37;

/// TDS2024B driver over any instrument link.
pub struct Tds2024b<L: InstrumentLink> {
    link: L,
    opc_policy: RetryPolicy,
    default_sample_count: usize,
}

impl<L: InstrumentLink> Tds2024b<L> {
    /// Wrap an open link with default sequencing settings.
    pub fn new(link: L) -> Self {
        Self {
            link,
            opc_policy: RetryPolicy::default(),
            default_sample_count: MAX_RECORD_LENGTH,
        }
    }

    /// Wrap an open link using the `[acquisition]` config section.
    pub fn with_config(link: L, config: &ScopeConfig) -> Self {
        Self {
            link,
            opc_policy: config.acquisition.opc_policy(),
            default_sample_count: config.acquisition.default_sample_count,
        }
    }

    /// Replace the operation-complete poll policy.
    pub fn with_opc_policy(mut self, policy: RetryPolicy) -> Self {
        self.opc_policy = policy;
        self
    }

    /// The operation-complete poll policy in use.
    pub fn opc_policy(&self) -> &RetryPolicy {
        &self.opc_policy
    }

    /// Borrow the underlying link.
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Mutably borrow the underlying link.
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Release the underlying link.
    pub fn into_inner(self) -> L {
        self.link
    }

    // ---------------------------------------------------------------------
    // Raw I/O
    // ---------------------------------------------------------------------

    /// Send a command verbatim.
    pub async fn write(&mut self, command: &str) -> ScopeResult<()> {
        debug!("write: {}", command);
        self.link.write(command).await.inspect_err(|e| {
            warn!(resource = self.link.resource_name(), "write failed: {}", e);
        })
    }

    /// Send a command and read one response line.
    pub async fn query(&mut self, command: &str) -> ScopeResult<String> {
        self.write(command).await?;
        let response = self.link.read().await.inspect_err(|e| {
            warn!(resource = self.link.resource_name(), "read failed: {}", e);
        })?;
        debug!("read: {}", response);
        Ok(response)
    }

    // ---------------------------------------------------------------------
    // Acquisition
    // ---------------------------------------------------------------------

    /// Single-sequence acquisition with the configured sample count.
    pub async fn acquire_default(&mut self, channels: &[Channel]) -> ScopeResult<AcquisitionResult> {
        let samples = self.default_sample_count;
        self.acquire(channels, samples).await
    }

    /// Capture one single-sequence acquisition and return scaled waveforms.
    ///
    /// The time axis comes from the first channel's `XINCR`; each channel is
    /// then scaled with its own `YMULT`/`YOFF`.
    ///
    /// # Errors
    /// - `InvalidArgument` for an empty channel list, a sample count
    ///   outside `1..=2500`, or a poll policy with zero attempts
    /// - `OperationTimeout` if the capture never completes
    /// - `SampleCount` if a curve has the wrong length
    /// - `Transport` / `Parse` from the link and the response parsers
    #[instrument(skip(self), fields(resource = self.link.resource_name()))]
    pub async fn acquire(
        &mut self,
        channels: &[Channel],
        sample_count: usize,
    ) -> ScopeResult<AcquisitionResult> {
        let first = *channels.first().ok_or_else(|| {
            ScopeError::InvalidArgument("at least one channel must be requested".to_string())
        })?;
        if sample_count == 0 || sample_count > MAX_RECORD_LENGTH {
            return Err(ScopeError::InvalidArgument(format!(
                "sample count {} outside 1-{}",
                sample_count, MAX_RECORD_LENGTH
            )));
        }
        if self.opc_policy.max_attempts == 0 {
            return Err(ScopeError::InvalidArgument(
                "operation-complete policy allows no polls".to_string(),
            ));
        }

        self.select_channels(channels).await?;
        self.arm_single_sequence().await?;

        let policy = self.opc_policy.clone();
        let polls = wait_for_completion(self, &policy).await?;
        info!(polls, "acquisition complete");

        self.write(&commands::data_range(sample_count)).await?;
        let xincr_response = self.query(&commands::xincr(first)).await?;
        let xincr = parse::parse_labeled_value(&xincr_response, "XINCR")?;
        let time = time_axis(xincr, sample_count);

        let mut waveforms = Vec::with_capacity(channels.len());
        for &channel in channels {
            waveforms.push(self.transfer_channel(channel, sample_count).await?);
        }

        info!(
            channels = waveforms.len(),
            samples = sample_count,
            xincr,
            "waveforms transferred"
        );
        Ok(AcquisitionResult {
            acquired_at: Utc::now(),
            time,
            channels: waveforms,
        })
    }

    /// Turn requested inputs on and every other input off.
    async fn select_channels(&mut self, channels: &[Channel]) -> ScopeResult<()> {
        for channel in Channel::ALL {
            let on = channels.contains(&channel);
            self.write(&commands::select(channel, on)).await?;
        }
        Ok(())
    }

    async fn arm_single_sequence(&mut self) -> ScopeResult<()> {
        for command in [
            commands::DESE_OPC,
            commands::ESE_OPC,
            commands::SRE_OFF,
            commands::SINGLE_SEQUENCE,
            commands::TRIGGER_FORCE,
        ] {
            self.write(command).await?;
        }
        Ok(())
    }

    async fn transfer_channel(
        &mut self,
        channel: Channel,
        sample_count: usize,
    ) -> ScopeResult<ChannelWaveform> {
        self.write(&commands::data_source(channel)).await?;
        let curve = self.query(commands::CURVE).await?;
        let raw = parse::parse_curve(&curve)?;
        if raw.len() != sample_count {
            return Err(ScopeError::SampleCount {
                channel,
                expected: sample_count,
                actual: raw.len(),
            });
        }

        // Vertical scale is per channel: YMULT/YOFF come from this channel's preamble.
        let preamble = self.read_wfmpre().await?;
        let ymult = preamble.ymult()?;
        let yoff = preamble.yoff()?;
        debug!(%channel, ymult, yoff, "channel scaling");

        Ok(ChannelWaveform {
            channel,
            ymult,
            yoff,
            volts: decode_volts(&raw, ymult, yoff),
        })
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Event status register (`*esr?`). Reading clears it.
    pub async fn read_esr(&mut self) -> ScopeResult<EventStatus> {
        let response = self.query(commands::ESR).await?;
        Ok(EventStatus(parse::parse_register(&response, "event status register")?))
    }

    /// Identification string (`*idn?`).
    pub async fn read_idn(&mut self) -> ScopeResult<String> {
        Ok(self.query(commands::IDN).await?.trim().to_string())
    }

    /// Status byte (`*stb?`).
    pub async fn read_stb(&mut self) -> ScopeResult<StatusByte> {
        let response = self.query(commands::STB).await?;
        Ok(StatusByte(parse::parse_register(&response, "status byte")?))
    }

    /// Operation complete flag (`*opc?`).
    pub async fn read_opc(&mut self) -> ScopeResult<bool> {
        let response = self.query(commands::OPC).await?;
        parse::parse_opc(&response)
    }

    /// Waveform preamble of the current data source (`wfmpre?`).
    pub async fn read_wfmpre(&mut self) -> ScopeResult<WaveformPreamble> {
        let response = self.query(commands::WFMPRE).await?;
        WaveformPreamble::parse(&response)
    }

    /// Immediate measurement on each channel, in the order given.
    ///
    /// The measurement type is whatever was last set with
    /// [`set_immediate_measurement_type`](Self::set_immediate_measurement_type).
    pub async fn read_immediate_measurement_value(
        &mut self,
        channels: &[Channel],
    ) -> ScopeResult<Vec<f64>> {
        let mut values = Vec::with_capacity(channels.len());
        for &channel in channels {
            self.write(&commands::measurement_source(channel)).await?;
            let response = self.query(commands::MEASUREMENT_VALUE).await?;
            let value = parse::parse_labeled_value(&response, "VALUE")?;
            if value >= NO_MEASUREMENT {
                warn!(%channel, "instrument could not make the measurement");
            }
            values.push(value);
        }
        Ok(values)
    }

    // ---------------------------------------------------------------------
    // Setters
    // ---------------------------------------------------------------------

    /// Select sample, peak-detect or average acquisition.
    pub async fn set_acquire_mode(&mut self, mode: AcquireMode) -> ScopeResult<()> {
        self.write(&commands::acquire_mode(mode)).await
    }

    /// Disable the 20 MHz bandwidth limit on `channel`.
    pub async fn set_bandwidth_off(&mut self, channel: Channel) -> ScopeResult<()> {
        self.write(&commands::bandwidth_off(channel)).await
    }

    /// Set the input coupling of `channel`.
    pub async fn set_coupling(&mut self, channel: Channel, coupling: Coupling) -> ScopeResult<()> {
        self.write(&commands::coupling(channel, coupling)).await
    }

    /// AC-couple `channel`.
    pub async fn set_coupling_ac(&mut self, channel: Channel) -> ScopeResult<()> {
        self.set_coupling(channel, Coupling::Ac).await
    }

    /// DC-couple `channel`.
    pub async fn set_coupling_dc(&mut self, channel: Channel) -> ScopeResult<()> {
        self.set_coupling(channel, Coupling::Dc).await
    }

    /// Choose what the immediate measurement engine measures.
    pub async fn set_immediate_measurement_type(
        &mut self,
        kind: MeasurementType,
    ) -> ScopeResult<()> {
        self.write(&commands::measurement_type(kind)).await
    }

    /// Horizontal scale. The firmware rounds to the nearest supported value.
    pub async fn set_seconds_per_division(&mut self, seconds: f64) -> ScopeResult<()> {
        self.write(&commands::seconds_per_division(seconds)).await
    }

    /// Vertical scale of `channel`.
    pub async fn set_volts_per_division(&mut self, channel: Channel, volts: f64) -> ScopeResult<()> {
        self.write(&commands::volts_per_division(channel, volts)).await
    }
}

#[async_trait]
impl<L: InstrumentLink> CompletionProbe for Tds2024b<L> {
    async fn is_complete(&mut self) -> ScopeResult<bool> {
        self.read_opc().await
    }
}
