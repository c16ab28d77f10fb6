//! # Temperature Sensors
//!
//! A sensor is read once per throttling cycle. Failures are transient by
//! contract: the caller retries on its next cycle.

use core::fmt;

use crate::types::{SensorId, Temperature};

/// Temperature read failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Sensor did not answer in time
    Timeout,
    /// Sensor is not calibrated or not yet enabled
    NotReady,
    /// Requested sensor does not exist
    NoSuchSensor(SensorId),
    /// Raw value could not be converted
    InvalidReading,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Timeout => write!(f, "sensor timed out"),
            SensorError::NotReady => write!(f, "sensor not ready"),
            SensorError::NoSuchSensor(id) => write!(f, "no such sensor: {}", id),
            SensorError::InvalidReading => write!(f, "invalid sensor reading"),
        }
    }
}

/// Source of temperature readings
pub trait TemperatureSensor: Send + Sync {
    /// Read the current temperature of `sensor`
    fn read_temperature(&self, sensor: SensorId) -> Result<Temperature, SensorError>;
}
