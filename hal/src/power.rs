//! # System Power Control
//!
//! Power-off is terminal: on real hardware neither call returns on success.
//! Returning `Ok` is still allowed so that host platforms can record the
//! request and carry on.

use core::fmt;

/// How to power off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerOffMode {
    /// Orderly shutdown through userspace and the reboot notifiers
    Graceful,
    /// Immediate power-off, no notifiers
    Forced,
}

impl PowerOffMode {
    /// Get mode name
    pub const fn name(&self) -> &'static str {
        match self {
            PowerOffMode::Graceful => "graceful",
            PowerOffMode::Forced => "forced",
        }
    }
}

/// Power-off could not be started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownFailure {
    /// This mode is not available on the platform
    Unavailable(PowerOffMode),
    /// The power-off request failed
    Failed(PowerOffMode),
}

impl fmt::Display for ShutdownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownFailure::Unavailable(m) => write!(f, "{} power-off unavailable", m.name()),
            ShutdownFailure::Failed(m) => write!(f, "{} power-off failed", m.name()),
        }
    }
}

/// Power control capability
pub trait PowerControl: Send + Sync {
    /// Request a power-off
    fn power_off(&self, mode: PowerOffMode) -> Result<(), ShutdownFailure>;
}
