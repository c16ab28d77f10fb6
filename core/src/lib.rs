//! # thermcap Core
//!
//! Closed-loop CPU thermal throttling. A delayed work item samples one
//! temperature sensor, maps the reading onto four throttle tiers with
//! hysteresis, and caps the maximum frequency of every core accordingly.
//! Runaway temperature triggers a one-time emergency power-off.
//!
//! ## Components
//!
//! - **Configuration** ([`config`]): thresholds, caps, poll intervals
//! - **Throttle State** ([`state`]): tier, baseline, shutdown guard
//! - **Decision Engine** ([`engine`]): the rule chain and the cycle
//! - **Actuator** ([`actuator`]): per-core cap sweep, power-off escalation
//! - **Scheduler** ([`scheduler`]): tier-dependent re-arming
//! - **Attributes** ([`attr`]): file-like show/store surface
//! - **Controller** ([`controller`]): ties everything together
//!
//! ## Cycle
//!
//! ```text
//!   work fires ─▶ read sensor ─▶ shutdown check ─▶ rule chain
//!                                                      │
//!   re-arm (tier delay) ◀── commit tier ◀── cap every core
//! ```
//!
//! The platform is reached only through the traits of `thermcap-hal`.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub mod actuator;
pub mod attr;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod state;
pub mod stats;
pub mod tier;

use core::fmt;

pub use config::{Band, ConfigBuilder, ConfigField, ThermalConfig, TripBand, MAX_SENSORS};
pub use controller::ThermalController;
pub use engine::{CycleFlags, CycleOutcome, Decision, FreqCap, Rule};
pub use error::{AttrError, ConfigError, ThermalError, ThermalResult};
pub use scheduler::PollMode;
pub use stats::ThermalStats;
pub use tier::Tier;

/// Controller version
pub const VERSION: Version = Version {
    major: 0,
    minor: 1,
    patch: 0,
};

/// Version structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u16,
    /// Patch version
    pub patch: u16,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thermcap {}.{}.{}", self.major, self.minor, self.patch)
    }
}
