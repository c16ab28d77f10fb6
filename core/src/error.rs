//! # Error Types
//!
//! | Error | Scope | Recovery |
//! |-------|-------|----------|
//! | [`SensorError`] | one cycle | no action, fast retry |
//! | [`ActuatorError`] | one core | skip the core, keep going |
//! | [`ConfigError`] | initialization | fatal, controller not created |
//! | [`ShutdownFailure`] | emergency path | escalate graceful → forced |
//! | [`AttrError`] | one attribute store | value unchanged |
//!
//! Per-cycle errors never leave the cycle: they are logged and counted in
//! [`crate::stats::ThermalStats`]. [`ThermalError`] covers only what a
//! caller of the controller can see.

use core::fmt;

pub use thermcap_hal::{ActuatorError, SensorError, ShutdownFailure};

use crate::config::Band;

/// Result type for controller operations
pub type ThermalResult<T> = Result<T, ThermalError>;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A required field was never set
    MissingField(&'static str),
    /// Sensor ID is not below the sensor count
    SensorOutOfRange {
        /// Requested sensor
        sensor: u32,
        /// Number of sensors
        max: u32,
    },
    /// A band's clear threshold is not below its trip threshold
    ClearNotBelowTrip(Band),
    /// Trip thresholds of two adjacent bands are not increasing
    BandsOutOfOrder {
        /// Lower band
        lower: Band,
        /// Upper band
        upper: Band,
    },
    /// Shutdown threshold is below the max band trip threshold
    ShutdownBelowMaxTrip,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingField(name) => write!(f, "missing field '{}'", name),
            ConfigError::SensorOutOfRange { sensor, max } => {
                write!(f, "sensor id {} out of range (max {})", sensor, max)
            },
            ConfigError::ClearNotBelowTrip(band) => {
                write!(f, "{} band: clear threshold not below trip threshold", band.name())
            },
            ConfigError::BandsOutOfOrder { lower, upper } => write!(
                f,
                "{} band trip not below {} band trip",
                lower.name(),
                upper.name()
            ),
            ConfigError::ShutdownBelowMaxTrip => {
                write!(f, "shutdown_temp below max band trip threshold")
            },
        }
    }
}

/// Attribute access errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrError {
    /// No attribute with this name
    UnknownAttribute,
    /// Attribute cannot be written
    ReadOnly,
    /// Input is not a non-negative integer
    InvalidInput,
    /// Rendered value does not fit the attribute buffer
    BufferFull,
}

impl fmt::Display for AttrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrError::UnknownAttribute => write!(f, "unknown attribute"),
            AttrError::ReadOnly => write!(f, "attribute is read-only"),
            AttrError::InvalidInput => write!(f, "invalid input"),
            AttrError::BufferFull => write!(f, "attribute buffer full"),
        }
    }
}

/// Controller error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermalError {
    /// Configuration rejected
    Config(ConfigError),
    /// A cycle is already running
    CycleInProgress,
    /// The controller is not started, or was stopped
    NotRunning,
}

impl fmt::Display for ThermalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThermalError::Config(e) => write!(f, "config: {}", e),
            ThermalError::CycleInProgress => write!(f, "cycle already in progress"),
            ThermalError::NotRunning => write!(f, "controller not running"),
        }
    }
}

impl From<ConfigError> for ThermalError {
    fn from(err: ConfigError) -> Self {
        ThermalError::Config(err)
    }
}
