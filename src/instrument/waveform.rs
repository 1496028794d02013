//! Decoded waveforms returned by a single-sequence acquisition.

use super::channel::Channel;
use crate::error::ScopeResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

/// Sample times `i * xincr` for `i` in `0..sample_count`.
pub fn time_axis(xincr: f64, sample_count: usize) -> Vec<f64> {
    (0..sample_count).map(|i| i as f64 * xincr).collect()
}

/// Converts raw digitizer counts to volts: `ymult * (raw - yoff)`.
pub fn decode_volts(raw: &[i32], ymult: f64, yoff: f64) -> Vec<f64> {
    raw.iter()
        .map(|&count| ymult * (f64::from(count) - yoff))
        .collect()
}

/// Voltage samples of one channel together with the scaling used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelWaveform {
    /// Source channel
    pub channel: Channel,
    /// Volts per digitizer count from this channel's preamble
    pub ymult: f64,
    /// Digitizer count offset from this channel's preamble
    pub yoff: f64,
    /// Decoded samples in volts
    pub volts: Vec<f64>,
}

/// Result of `Tds2024b::acquire`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcquisitionResult {
    /// When the acquisition completed
    pub acquired_at: DateTime<Utc>,
    /// Shared time axis in seconds
    pub time: Vec<f64>,
    /// One waveform per requested channel, in request order
    pub channels: Vec<ChannelWaveform>,
}

impl AcquisitionResult {
    /// Number of samples per series.
    pub fn sample_count(&self) -> usize {
        self.time.len()
    }

    /// The waveform of the first requested occurrence of `channel`.
    pub fn channel(&self, channel: Channel) -> Option<&ChannelWaveform> {
        self.channels.iter().find(|w| w.channel == channel)
    }

    /// Writes the acquisition as CSV: a `time_s,ch<N>_v,...` header, then
    /// one row per sample.
    pub fn write_csv<W: Write>(&self, writer: W) -> ScopeResult<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        let mut header = vec!["time_s".to_string()];
        header.extend(self.channels.iter().map(|w| format!("{}_v", w.channel)));
        csv_writer.write_record(&header)?;

        for (i, t) in self.time.iter().enumerate() {
            let mut row = vec![t.to_string()];
            row.extend(self.channels.iter().map(|w| w.volts[i].to_string()));
            csv_writer.write_record(&row)?;
        }

        csv_writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Positional form `[time, volts_1, volts_2, ...]`.
    pub fn into_series(self) -> Vec<Vec<f64>> {
        std::iter::once(self.time)
            .chain(self.channels.into_iter().map(|w| w.volts))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{a} != {e}");
        }
    }

    #[test]
    fn test_time_axis() {
        assert_close(&time_axis(0.001, 4), &[0.0, 0.001, 0.002, 0.003]);
        assert!(time_axis(1e-6, 0).is_empty());
    }

    #[test]
    fn test_time_axis_strictly_increasing() {
        let axis = time_axis(2.0e-6, 2500);
        assert_eq!(axis.len(), 2500);
        assert!(axis.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_decode_volts_is_affine() {
        assert_close(&decode_volts(&[10, 20, 30, 40], 0.1, 5.0), &[0.5, 1.5, 2.5, 3.5]);
        assert_close(&decode_volts(&[-128, 0, 127], 0.04, 0.0), &[-5.12, 0.0, 5.08]);
    }

    #[test]
    fn test_write_csv() {
        let result = AcquisitionResult {
            acquired_at: Utc::now(),
            time: vec![0.0, 0.001],
            channels: vec![
                ChannelWaveform {
                    channel: Channel::Ch2,
                    ymult: 0.1,
                    yoff: 0.0,
                    volts: vec![0.5, -1.5],
                },
                ChannelWaveform {
                    channel: Channel::Ch4,
                    ymult: 1.0,
                    yoff: 0.0,
                    volts: vec![2.0, 3.0],
                },
            ],
        };

        let mut out = Vec::new();
        result.write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "time_s,ch2_v,ch4_v\n0,0.5,2\n0.001,-1.5,3\n"
        );
    }

    #[test]
    fn test_into_series_keeps_order() {
        let result = AcquisitionResult {
            acquired_at: Utc::now(),
            time: vec![0.0, 1.0],
            channels: vec![
                ChannelWaveform {
                    channel: Channel::Ch3,
                    ymult: 1.0,
                    yoff: 0.0,
                    volts: vec![3.0, 3.0],
                },
                ChannelWaveform {
                    channel: Channel::Ch1,
                    ymult: 1.0,
                    yoff: 0.0,
                    volts: vec![1.0, 1.0],
                },
            ],
        };
        assert_eq!(result.sample_count(), 2);
        assert_eq!(result.channel(Channel::Ch1).unwrap().volts, vec![1.0, 1.0]);
        let series = result.into_series();
        assert_eq!(series, vec![vec![0.0, 1.0], vec![3.0, 3.0], vec![1.0, 1.0]]);
    }
}
