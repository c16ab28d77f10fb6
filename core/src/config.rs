//! # Thermal Configuration
//!
//! Trip thresholds, frequency caps, poll intervals and the shutdown
//! threshold. Temperatures are whole degrees Celsius, frequencies kHz,
//! intervals milliseconds.
//!
//! ## Hysteresis Bands
//!
//! ```text
//!   temp ▲
//!        │        shutdown ─────────────────────── power-off
//!        │   max.trip ──────┐
//!        │   max.clear ─────┘  tier 3 ⇄ 2
//!        │   mid.trip ──────┐
//!        │   mid.clear ─────┘  tier 2 ⇄ 1
//!        │   low.trip ──────┐
//!        │   low.clear ─────┘  tier 1 → 0
//!        └──────────────────────────────────────────▶
//! ```
//!
//! The bands only behave when `clear < trip` inside each band and the trips
//! increase from low to max. [`ThermalConfig::validate_bands`] checks this,
//! but a violating configuration is still accepted: the controller logs it.
//!
//! Every cycle works on one [`SharedConfig::snapshot`], so a concurrent
//! store lands either in this cycle or the next one, never halfway.

use core::fmt;

use spin::RwLock;
use static_assertions::{assert_impl_all, const_assert_eq};
use thermcap_hal::{Frequency, SensorId};

use crate::error::ConfigError;

/// Number of TSENS sensors; valid sensor IDs are below this
pub const MAX_SENSORS: u32 = 16;

// =============================================================================
// Bands
// =============================================================================

/// Hysteresis band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    /// Tier 0 ⇄ 1
    Low,
    /// Tier 1 ⇄ 2
    Mid,
    /// Tier 2 ⇄ 3
    Max,
}

impl Band {
    /// Get band name
    pub const fn name(&self) -> &'static str {
        match self {
            Band::Low => "low",
            Band::Mid => "mid",
            Band::Max => "max",
        }
    }
}

/// Trip/clear pair and the cap applied while in the band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TripBand {
    /// Rising threshold (°C)
    pub trip: u32,
    /// Falling threshold (°C)
    pub clear: u32,
    /// Cap in kHz
    pub freq: u32,
}

impl TripBand {
    /// Create a band
    pub const fn new(trip: u32, clear: u32, freq: u32) -> Self {
        Self { trip, clear, freq }
    }

    /// Cap as a frequency
    pub const fn cap(&self) -> Frequency {
        Frequency::from_khz(self.freq)
    }
}

// =============================================================================
// Fields
// =============================================================================

/// Runtime-writable configuration field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConfigField {
    /// Emergency shutdown threshold
    ShutdownTemp   = 0,
    /// Max band trip
    AllowedMaxHigh = 1,
    /// Max band clear
    AllowedMaxLow  = 2,
    /// Max band cap
    AllowedMaxFreq = 3,
    /// Mid band trip
    AllowedMidHigh = 4,
    /// Mid band clear
    AllowedMidLow  = 5,
    /// Mid band cap
    AllowedMidFreq = 6,
    /// Low band trip
    AllowedLowHigh = 7,
    /// Low band clear
    AllowedLowLow  = 8,
    /// Low band cap
    AllowedLowFreq = 9,
    /// Tier 0 poll interval
    PollMs         = 10,
    /// Tier 1 poll interval
    LowPollMs      = 11,
    /// Tier 2/3 poll interval
    MidMaxPollMs   = 12,
}

impl ConfigField {
    /// Number of fields
    pub const COUNT: usize = 13;

    /// Every field, in attribute-listing order
    pub const ALL: [ConfigField; ConfigField::COUNT] = [
        ConfigField::ShutdownTemp,
        ConfigField::AllowedMaxHigh,
        ConfigField::AllowedMaxLow,
        ConfigField::AllowedMaxFreq,
        ConfigField::AllowedMidHigh,
        ConfigField::AllowedMidLow,
        ConfigField::AllowedMidFreq,
        ConfigField::AllowedLowHigh,
        ConfigField::AllowedLowLow,
        ConfigField::AllowedLowFreq,
        ConfigField::PollMs,
        ConfigField::LowPollMs,
        ConfigField::MidMaxPollMs,
    ];

    /// Attribute name
    pub const fn name(&self) -> &'static str {
        match self {
            ConfigField::ShutdownTemp => "shutdown_temp",
            ConfigField::AllowedMaxHigh => "allowed_max_high",
            ConfigField::AllowedMaxLow => "allowed_max_low",
            ConfigField::AllowedMaxFreq => "allowed_max_freq",
            ConfigField::AllowedMidHigh => "allowed_mid_high",
            ConfigField::AllowedMidLow => "allowed_mid_low",
            ConfigField::AllowedMidFreq => "allowed_mid_freq",
            ConfigField::AllowedLowHigh => "allowed_low_high",
            ConfigField::AllowedLowLow => "allowed_low_low",
            ConfigField::AllowedLowFreq => "allowed_low_freq",
            ConfigField::PollMs => "poll_ms",
            ConfigField::LowPollMs => "low_poll_ms",
            ConfigField::MidMaxPollMs => "mid_max_poll_ms",
        }
    }

    /// Look up a field by attribute name
    pub fn from_name(name: &str) -> Option<ConfigField> {
        ConfigField::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// Does a change to this field affect the hysteresis bands?
    pub const fn is_threshold(&self) -> bool {
        matches!(
            self,
            ConfigField::ShutdownTemp
                | ConfigField::AllowedMaxHigh
                | ConfigField::AllowedMaxLow
                | ConfigField::AllowedMidHigh
                | ConfigField::AllowedMidLow
                | ConfigField::AllowedLowHigh
                | ConfigField::AllowedLowLow
        )
    }

    const fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const_assert_eq!(ConfigField::ALL.len(), ConfigField::COUNT);
const_assert_eq!(ConfigField::MidMaxPollMs as usize, ConfigField::COUNT - 1);

// =============================================================================
// Configuration
// =============================================================================

/// Complete controller configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThermalConfig {
    /// Sensor to sample
    pub sensor_id: SensorId,
    /// Power off at or above this temperature
    pub shutdown_temp: u32,
    /// Tier 0 ⇄ 1 band
    pub low: TripBand,
    /// Tier 1 ⇄ 2 band
    pub mid: TripBand,
    /// Tier 2 ⇄ 3 band
    pub max: TripBand,
    /// Poll interval at tier 0
    pub poll_ms: u32,
    /// Poll interval at tier 1
    pub low_poll_ms: u32,
    /// Poll interval at tiers 2 and 3, and after a sensor fault
    pub mid_max_poll_ms: u32,
}

impl ThermalConfig {
    /// Start building a configuration
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Get a band
    pub const fn band(&self, band: Band) -> &TripBand {
        match band {
            Band::Low => &self.low,
            Band::Mid => &self.mid,
            Band::Max => &self.max,
        }
    }

    /// Read a field
    pub const fn get(&self, field: ConfigField) -> u32 {
        match field {
            ConfigField::ShutdownTemp => self.shutdown_temp,
            ConfigField::AllowedMaxHigh => self.max.trip,
            ConfigField::AllowedMaxLow => self.max.clear,
            ConfigField::AllowedMaxFreq => self.max.freq,
            ConfigField::AllowedMidHigh => self.mid.trip,
            ConfigField::AllowedMidLow => self.mid.clear,
            ConfigField::AllowedMidFreq => self.mid.freq,
            ConfigField::AllowedLowHigh => self.low.trip,
            ConfigField::AllowedLowLow => self.low.clear,
            ConfigField::AllowedLowFreq => self.low.freq,
            ConfigField::PollMs => self.poll_ms,
            ConfigField::LowPollMs => self.low_poll_ms,
            ConfigField::MidMaxPollMs => self.mid_max_poll_ms,
        }
    }

    /// Write a field
    pub fn set(&mut self, field: ConfigField, value: u32) {
        let slot = match field {
            ConfigField::ShutdownTemp => &mut self.shutdown_temp,
            ConfigField::AllowedMaxHigh => &mut self.max.trip,
            ConfigField::AllowedMaxLow => &mut self.max.clear,
            ConfigField::AllowedMaxFreq => &mut self.max.freq,
            ConfigField::AllowedMidHigh => &mut self.mid.trip,
            ConfigField::AllowedMidLow => &mut self.mid.clear,
            ConfigField::AllowedMidFreq => &mut self.mid.freq,
            ConfigField::AllowedLowHigh => &mut self.low.trip,
            ConfigField::AllowedLowLow => &mut self.low.clear,
            ConfigField::AllowedLowFreq => &mut self.low.freq,
            ConfigField::PollMs => &mut self.poll_ms,
            ConfigField::LowPollMs => &mut self.low_poll_ms,
            ConfigField::MidMaxPollMs => &mut self.mid_max_poll_ms,
        };
        *slot = value;
    }

    /// Check the sensor ID
    pub fn validate_sensor(&self) -> Result<(), ConfigError> {
        if self.sensor_id.raw() >= MAX_SENSORS {
            return Err(ConfigError::SensorOutOfRange {
                sensor: self.sensor_id.raw(),
                max: MAX_SENSORS,
            });
        }
        Ok(())
    }

    /// Check band consistency, reporting the first violation
    pub fn validate_bands(&self) -> Result<(), ConfigError> {
        for band in [Band::Low, Band::Mid, Band::Max] {
            let b = self.band(band);
            if b.clear >= b.trip {
                return Err(ConfigError::ClearNotBelowTrip(band));
            }
        }
        for (lower, upper) in [(Band::Low, Band::Mid), (Band::Mid, Band::Max)] {
            if self.band(lower).trip >= self.band(upper).trip {
                return Err(ConfigError::BandsOutOfOrder { lower, upper });
            }
        }
        if self.shutdown_temp < self.max.trip {
            return Err(ConfigError::ShutdownBelowMaxTrip);
        }
        Ok(())
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder that refuses to produce a partial configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    sensor_id: Option<u32>,
    fields: [Option<u32>; ConfigField::COUNT],
}

impl ConfigBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sensor ID
    pub fn sensor_id(mut self, id: u32) -> Self {
        self.sensor_id = Some(id);
        self
    }

    /// Set any field
    pub fn field(mut self, field: ConfigField, value: u32) -> Self {
        self.fields[field.index()] = Some(value);
        self
    }

    /// Set the shutdown threshold
    pub fn shutdown_temp(self, temp: u32) -> Self {
        self.field(ConfigField::ShutdownTemp, temp)
    }

    /// Set a whole band
    pub fn band(self, band: Band, trip: u32, clear: u32, freq: u32) -> Self {
        let (t, c, f) = match band {
            Band::Low => (
                ConfigField::AllowedLowHigh,
                ConfigField::AllowedLowLow,
                ConfigField::AllowedLowFreq,
            ),
            Band::Mid => (
                ConfigField::AllowedMidHigh,
                ConfigField::AllowedMidLow,
                ConfigField::AllowedMidFreq,
            ),
            Band::Max => (
                ConfigField::AllowedMaxHigh,
                ConfigField::AllowedMaxLow,
                ConfigField::AllowedMaxFreq,
            ),
        };
        self.field(t, trip).field(c, clear).field(f, freq)
    }

    /// Set the three poll intervals
    pub fn poll_intervals(self, poll_ms: u32, low_poll_ms: u32, mid_max_poll_ms: u32) -> Self {
        self.field(ConfigField::PollMs, poll_ms)
            .field(ConfigField::LowPollMs, low_poll_ms)
            .field(ConfigField::MidMaxPollMs, mid_max_poll_ms)
    }

    /// Produce the configuration
    ///
    /// Fails on the first missing field or an out-of-range sensor. Band
    /// consistency is not checked here.
    pub fn build(self) -> Result<ThermalConfig, ConfigError> {
        let sensor = self.sensor_id.ok_or(ConfigError::MissingField("sensor_id"))?;
        let mut config = ThermalConfig {
            sensor_id: SensorId::new(sensor),
            shutdown_temp: 0,
            low: TripBand::default(),
            mid: TripBand::default(),
            max: TripBand::default(),
            poll_ms: 0,
            low_poll_ms: 0,
            mid_max_poll_ms: 0,
        };
        for field in ConfigField::ALL {
            let value = self.fields[field.index()].ok_or(ConfigError::MissingField(field.name()))?;
            config.set(field, value);
        }
        config.validate_sensor()?;
        Ok(config)
    }
}

// =============================================================================
// Shared configuration
// =============================================================================

/// Configuration shared between the cycle and the store path
#[derive(Debug)]
pub struct SharedConfig {
    inner: RwLock<ThermalConfig>,
}

impl SharedConfig {
    /// Wrap a configuration
    pub const fn new(config: ThermalConfig) -> Self {
        Self {
            inner: RwLock::new(config),
        }
    }

    /// Consistent copy for one cycle
    pub fn snapshot(&self) -> ThermalConfig {
        *self.inner.read()
    }

    /// Read one field
    pub fn get(&self, field: ConfigField) -> u32 {
        self.inner.read().get(field)
    }

    /// Store one field, returning the resulting configuration
    pub fn store(&self, field: ConfigField, value: u32) -> ThermalConfig {
        let mut config = self.inner.write();
        config.set(field, value);
        *config
    }
}

assert_impl_all!(SharedConfig: Send, Sync);

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn full_builder() -> ConfigBuilder {
        ThermalConfig::builder()
            .sensor_id(7)
            .shutdown_temp(80)
            .band(Band::Low, 60, 55, 1_512_000)
            .band(Band::Mid, 65, 60, 1_296_000)
            .band(Band::Max, 70, 65, 918_000)
            .poll_intervals(1000, 500, 250)
    }

    #[test]
    fn test_build_complete() {
        let config = full_builder().build().unwrap();
        assert_eq!(config.sensor_id, SensorId::new(7));
        assert_eq!(config.mid.freq, 1_296_000);
        assert_eq!(config.get(ConfigField::LowPollMs), 500);
        assert!(config.validate_bands().is_ok());
    }

    #[test]
    fn test_build_missing_field() {
        let result = ThermalConfig::builder()
            .sensor_id(0)
            .shutdown_temp(80)
            .band(Band::Low, 60, 55, 1_512_000)
            .band(Band::Max, 70, 65, 918_000)
            .poll_intervals(1000, 500, 250)
            .build();
        assert_eq!(result, Err(ConfigError::MissingField("allowed_mid_high")));
    }

    #[test]
    fn test_build_missing_sensor() {
        let result = ConfigBuilder::new().build();
        assert_eq!(result, Err(ConfigError::MissingField("sensor_id")));
    }

    #[test]
    fn test_build_sensor_out_of_range() {
        let result = full_builder().sensor_id(MAX_SENSORS).build();
        assert_eq!(
            result,
            Err(ConfigError::SensorOutOfRange {
                sensor: MAX_SENSORS,
                max: MAX_SENSORS
            })
        );
    }

    #[test]
    fn test_field_names_roundtrip() {
        for field in ConfigField::ALL {
            assert_eq!(ConfigField::from_name(field.name()), Some(field));
        }
        assert_eq!(ConfigField::from_name("thermal_throttled"), None);
    }

    #[test]
    fn test_get_set_every_field() {
        let mut config = full_builder().build().unwrap();
        for (i, field) in ConfigField::ALL.iter().enumerate() {
            config.set(*field, 1000 + i as u32);
        }
        for (i, field) in ConfigField::ALL.iter().enumerate() {
            assert_eq!(config.get(*field), 1000 + i as u32);
        }
    }

    #[test]
    fn test_validate_clear_not_below_trip() {
        let config = full_builder().band(Band::Mid, 65, 65, 1_296_000).build().unwrap();
        assert_eq!(config.validate_bands(), Err(ConfigError::ClearNotBelowTrip(Band::Mid)));
    }

    #[test]
    fn test_validate_bands_out_of_order() {
        let config = full_builder().band(Band::Max, 64, 62, 918_000).build().unwrap();
        assert_eq!(
            config.validate_bands(),
            Err(ConfigError::BandsOutOfOrder {
                lower: Band::Mid,
                upper: Band::Max
            })
        );
    }

    #[test]
    fn test_validate_shutdown_below_max() {
        let config = full_builder().shutdown_temp(69).build().unwrap();
        assert_eq!(config.validate_bands(), Err(ConfigError::ShutdownBelowMaxTrip));
    }

    #[test]
    fn test_shared_store_is_visible_in_next_snapshot() {
        let shared = SharedConfig::new(full_builder().build().unwrap());
        let before = shared.snapshot();
        let after = shared.store(ConfigField::PollMs, 2000);

        assert_eq!(before.poll_ms, 1000);
        assert_eq!(after.poll_ms, 2000);
        assert_eq!(shared.snapshot().poll_ms, 2000);
        assert_eq!(shared.get(ConfigField::PollMs), 2000);
    }
}
