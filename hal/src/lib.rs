//! # thermcap Hardware Abstraction Layer
//!
//! The HAL is the boundary between the thermal throttling controller and the
//! platform. The controller never touches hardware directly: every
//! capability it consumes is expressed here as a trait.
//!
//! ## Capabilities
//!
//! | Trait | Provided by | Used for |
//! |-------|-------------|----------|
//! | [`TemperatureSensor`] | TSENS driver | One reading per cycle |
//! | [`CpuFreq`] | cpufreq core | Per-core policy lookup and max-cap updates |
//! | [`PowerControl`] | reboot/power core | Emergency power-off |
//! | [`DelayedWork`] | workqueue | Self re-arming cycle timer |
//! | [`CpuHotplug`] | cpu hotplug core | Onlining/offlining secondary cores |
//!
//! ## Simulation
//!
//! With the `sim` feature the crate also provides [`sim`], an in-memory
//! platform that implements every capability. It backs the unit tests of
//! the controller crates and lets integrators run the controller off-target.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

#[cfg(feature = "sim")]
extern crate alloc;

pub mod cpufreq;
pub mod hotplug;
pub mod power;
pub mod sensor;
pub mod types;
pub mod workqueue;

#[cfg(feature = "sim")]
pub mod sim;

pub use cpufreq::{ActuatorError, CpuFreq, FreqPolicy};
pub use hotplug::{CpuHotplug, HotplugError};
pub use power::{PowerControl, PowerOffMode, ShutdownFailure};
pub use sensor::{SensorError, TemperatureSensor};
pub use types::{CpuId, Frequency, SensorId, Temperature};
pub use workqueue::DelayedWork;
