//! Configuration loading using Figment
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Built-in defaults (the bench TDS2024B over USB)
//! 2. `config/tds2024b.toml` (or a path given to `load_from`)
//! 3. Environment variables prefixed with `TDS2024B_`
//!
//! # Environment Variable Overrides
//!
//! Sections and keys are separated by a double underscore:
//!
//! ```text
//! TDS2024B_APPLICATION__LOG_LEVEL=debug
//! TDS2024B_INSTRUMENT__RESOURCE_STRING="USB0::0x0699::0x036A::C000001::INSTR"
//! TDS2024B_ACQUISITION__OPC_MAX_ATTEMPTS=300
//! ```
//!
//! # Example
//!
//! ```no_run
//! use tds2024b::config::ScopeConfig;
//!
//! let config = ScopeConfig::load()?;
//! config.validate()?;
//! println!("Resource: {}", config.instrument.resource_string);
//! # Ok::<(), tds2024b::error::ScopeError>(())
//! ```

use crate::adapters::visa_adapter::DEFAULT_RESOURCE;
use crate::error::{ScopeError, ScopeResult};
use crate::error_recovery::RetryPolicy;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/tds2024b.toml";

/// Record length of the TDS2024B.
pub const MAX_RECORD_LENGTH: usize = 2500;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScopeConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Instrument link settings
    #[serde(default)]
    pub instrument: InstrumentConfig,
    /// Acquisition sequencing settings
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// VISA link configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// VISA resource string of the oscilloscope
    pub resource_string: String,
    /// Per-call write/read timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Appended to every command
    #[serde(default = "default_terminator")]
    pub write_terminator: String,
    /// Marks the end of a response
    #[serde(default = "default_terminator")]
    pub read_terminator: String,
}

/// Acquisition configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Samples per channel when none is given
    #[serde(default = "default_sample_count")]
    pub default_sample_count: usize,
    /// Delay between `*opc?` polls in milliseconds
    #[serde(default = "default_opc_poll_interval_ms")]
    pub opc_poll_interval_ms: u64,
    /// Polls before the acquisition is declared hung
    #[serde(default = "default_opc_max_attempts")]
    pub opc_max_attempts: u32,
}

// Default value functions
fn default_timeout_ms() -> u64 {
    5000
}

fn default_terminator() -> String {
    "\n".to_string()
}

fn default_sample_count() -> usize {
    MAX_RECORD_LENGTH
}

fn default_opc_poll_interval_ms() -> u64 {
    200
}

fn default_opc_max_attempts() -> u32 {
    150
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "tds2024b".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            resource_string: DEFAULT_RESOURCE.to_string(),
            timeout_ms: default_timeout_ms(),
            write_terminator: default_terminator(),
            read_terminator: default_terminator(),
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            default_sample_count: default_sample_count(),
            opc_poll_interval_ms: default_opc_poll_interval_ms(),
            opc_max_attempts: default_opc_max_attempts(),
        }
    }
}

impl InstrumentConfig {
    /// Per-call timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl AcquisitionConfig {
    /// Poll policy for the operation-complete wait
    pub fn opc_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.opc_max_attempts,
            Duration::from_millis(self.opc_poll_interval_ms),
        )
    }
}

impl ScopeConfig {
    /// Load configuration from the default file and environment variables
    pub fn load() -> ScopeResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> ScopeResult<Self> {
        Ok(Self::figment(path.as_ref()).extract()?)
    }

    /// The layered provider, exposed for callers that merge further sources
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(ScopeConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("TDS2024B_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> ScopeResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(ScopeError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.instrument.resource_string.trim().is_empty() {
            return Err(ScopeError::Configuration(
                "instrument.resource_string must not be empty".to_string(),
            ));
        }

        if self.instrument.timeout_ms == 0 {
            return Err(ScopeError::Configuration(
                "instrument.timeout_ms must be greater than 0".to_string(),
            ));
        }

        let samples = self.acquisition.default_sample_count;
        if samples == 0 || samples > MAX_RECORD_LENGTH {
            return Err(ScopeError::Configuration(format!(
                "Invalid default_sample_count {}. Must be 1-{}",
                samples, MAX_RECORD_LENGTH
            )));
        }

        if self.acquisition.opc_poll_interval_ms == 0 || self.acquisition.opc_max_attempts == 0 {
            return Err(ScopeError::Configuration(
                "acquisition.opc_poll_interval_ms and opc_max_attempts must be greater than 0"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScopeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.instrument.resource_string, DEFAULT_RESOURCE);
        assert_eq!(config.acquisition.default_sample_count, 2500);
        assert_eq!(
            config.acquisition.opc_policy(),
            RetryPolicy::new(150, Duration::from_millis(200))
        );
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        Jail::expect_with(|_jail| {
            let config = ScopeConfig::load_from("does/not/exist.toml")
                .map_err(|e| e.to_string())?;
            assert_eq!(config, ScopeConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_file_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "scope.toml",
                r#"
                [application]
                name = "bench"
                log_level = "debug"

                [instrument]
                resource_string = "USB0::0x0699::0x036A::C000001::INSTR"
                timeout_ms = 2000

                [acquisition]
                default_sample_count = 1000
                "#,
            )?;
            jail.set_env("TDS2024B_ACQUISITION__OPC_MAX_ATTEMPTS", "10");

            let config = ScopeConfig::load_from("scope.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.application.name, "bench");
            assert_eq!(config.instrument.timeout(), Duration::from_millis(2000));
            assert_eq!(config.instrument.write_terminator, "\n");
            assert_eq!(config.acquisition.default_sample_count, 1000);
            assert_eq!(config.acquisition.opc_max_attempts, 10);
            assert_eq!(config.acquisition.opc_poll_interval_ms, 200);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_file_outside_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.toml");
        std::fs::write(
            &path,
            "[instrument]\nresource_string = \"GPIB0::7::INSTR\"\n\n[acquisition]\nopc_poll_interval_ms = 50\n",
        )
        .unwrap();

        let config = ScopeConfig::load_from(&path).unwrap();
        assert_eq!(config.instrument.resource_string, "GPIB0::7::INSTR");
        assert_eq!(config.instrument.timeout_ms, 5000);
        assert_eq!(config.acquisition.opc_poll_interval_ms, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ScopeConfig::default();
        config.application.log_level = "verbose".to_string();
        assert!(matches!(
            config.validate(),
            Err(ScopeError::Configuration(_))
        ));

        let mut config = ScopeConfig::default();
        config.acquisition.default_sample_count = 2501;
        assert!(config.validate().is_err());

        let mut config = ScopeConfig::default();
        config.acquisition.opc_max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = ScopeConfig::default();
        config.instrument.resource_string = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
