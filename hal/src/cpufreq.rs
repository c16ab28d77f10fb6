//! # CPU Frequency Policies
//!
//! Each possible CPU may have a frequency policy. A CPU without a policy
//! (offline, or its driver not yet registered) is simply not returned by
//! [`CpuFreq::policy`].

use core::fmt;

use crate::types::{CpuId, Frequency};

/// Failure to update a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Policy vanished between lookup and update (CPU went offline)
    PolicyGone(CpuId),
    /// The cpufreq driver rejected the update
    Rejected(CpuId),
    /// The driver is busy with a transition
    Busy(CpuId),
}

impl ActuatorError {
    /// CPU the failure belongs to
    pub fn cpu(&self) -> CpuId {
        match *self {
            ActuatorError::PolicyGone(cpu)
            | ActuatorError::Rejected(cpu)
            | ActuatorError::Busy(cpu) => cpu,
        }
    }
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActuatorError::PolicyGone(cpu) => write!(f, "{}: policy gone", cpu),
            ActuatorError::Rejected(cpu) => write!(f, "{}: update rejected", cpu),
            ActuatorError::Busy(cpu) => write!(f, "{}: driver busy", cpu),
        }
    }
}

/// Snapshot of a CPU's frequency policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreqPolicy {
    /// Owning CPU
    pub cpu: CpuId,
    /// Current lower bound
    pub min: Frequency,
    /// Current upper bound (the cap)
    pub max: Frequency,
    /// Hardware maximum
    pub cpuinfo_max: Frequency,
}

impl FreqPolicy {
    /// Create a policy snapshot
    pub const fn new(cpu: CpuId, min: Frequency, max: Frequency, cpuinfo_max: Frequency) -> Self {
        Self {
            cpu,
            min,
            max,
            cpuinfo_max,
        }
    }

    /// Cap that would actually be applied for `requested`
    ///
    /// Never below the policy minimum, never above the hardware maximum.
    #[inline]
    pub fn verify_within_limits(&self, requested: Frequency) -> Frequency {
        let ceiling = if self.cpuinfo_max < self.min {
            self.min
        } else {
            self.cpuinfo_max
        };
        requested.clamp_to(self.min, ceiling)
    }
}

/// cpufreq core capability
pub trait CpuFreq: Send + Sync {
    /// Number of possible CPUs (online or not)
    fn possible_cpus(&self) -> u32;

    /// Policy handle for `cpu`, `None` if it has none right now
    fn policy(&self, cpu: CpuId) -> Option<FreqPolicy>;

    /// Set the policy's upper bound
    ///
    /// Implementations clamp through [`FreqPolicy::verify_within_limits`];
    /// an out-of-range request is not an error.
    fn set_max_frequency(&self, policy: &FreqPolicy, cap: Frequency) -> Result<(), ActuatorError>;
}

// =============================================================================
// TESTS
// =============================================================================
