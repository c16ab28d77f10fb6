//! # CPU Hotplug
//!
//! Bringing secondary CPUs up and down. CPU 0 is the boot CPU and is never
//! taken offline by callers of this trait.

use core::fmt;

use crate::types::CpuId;

/// Hotplug operation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotplugError {
    /// CPU does not exist
    NoSuchCpu(CpuId),
    /// The hotplug core refused the transition
    Refused(CpuId),
    /// Another transition is in progress
    Busy(CpuId),
}

impl fmt::Display for HotplugError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HotplugError::NoSuchCpu(cpu) => write!(f, "{}: no such cpu", cpu),
            HotplugError::Refused(cpu) => write!(f, "{}: transition refused", cpu),
            HotplugError::Busy(cpu) => write!(f, "{}: hotplug busy", cpu),
        }
    }
}

/// CPU hotplug capability
pub trait CpuHotplug: Send + Sync {
    /// Number of possible CPUs
    fn possible_cpus(&self) -> u32;

    /// Is `cpu` online?
    fn is_online(&self, cpu: CpuId) -> bool;

    /// Bring `cpu` online
    fn cpu_up(&self, cpu: CpuId) -> Result<(), HotplugError>;

    /// Take `cpu` offline
    fn cpu_down(&self, cpu: CpuId) -> Result<(), HotplugError>;

    /// Number of online CPUs
    fn online_count(&self) -> u32 {
        (0..self.possible_cpus())
            .filter(|&i| self.is_online(CpuId::new(i)))
            .count() as u32
    }
}
