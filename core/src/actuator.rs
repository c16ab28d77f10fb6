//! # Actuator
//!
//! Applies a frequency cap to every core and drives the emergency power-off.
//!
//! Cores are visited in ascending index. A core without a policy is skipped;
//! a failed update on one core is logged and the sweep moves on. The cap is
//! clamped by the cpufreq backend, so an out-of-range request never fails.

use thermcap_hal::{
    ActuatorError, CpuFreq, CpuId, FreqPolicy, Frequency, PowerControl, PowerOffMode,
    ShutdownFailure,
};

use crate::engine::FreqCap;

// =============================================================================
// Cap sweep
// =============================================================================

/// Result of one sweep over the cores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyReport {
    /// Cores whose cap was updated
    pub applied: u32,
    /// Cores without a policy
    pub skipped: u32,
    /// Cores whose update failed
    pub failed: u32,
    /// First failure seen
    pub first_error: Option<ActuatorError>,
    /// Core 0 cap read before any change, when requested
    pub baseline: Option<Frequency>,
}

impl ApplyReport {
    /// Did every core with a policy take the cap?
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Concrete frequency for `cap` on `policy`
#[inline]
pub fn resolve(cap: FreqCap, policy: &FreqPolicy) -> Frequency {
    match cap {
        FreqCap::Limit(freq) => freq,
        FreqCap::Unrestricted => policy.cpuinfo_max,
    }
}

/// Sweep all possible cores
///
/// With `capture_baseline` set, core 0's current cap is recorded before it is
/// touched; a zero cap is recorded as-is and means "unset". With `cap` unset,
/// only core 0 is looked at and nothing is counted.
pub fn apply<F: CpuFreq>(cpus: &F, cap: Option<FreqCap>, capture_baseline: bool) -> ApplyReport {
    let mut report = ApplyReport::default();

    let Some(cap) = cap else {
        if capture_baseline {
            report.baseline = cpus.policy(CpuId::BOOT).map(|p| p.max);
        }
        return report;
    };

    for index in 0..cpus.possible_cpus() {
        let cpu = CpuId::new(index);
        let Some(policy) = cpus.policy(cpu) else {
            log::debug!("thermcap: no policy on {}", cpu);
            report.skipped += 1;
            continue;
        };

        if capture_baseline && cpu.is_boot() {
            report.baseline = Some(policy.max);
        }

        let freq = resolve(cap, &policy);
        match cpus.set_max_frequency(&policy, freq) {
            Ok(()) => {
                #[cfg(feature = "debug")]
                log::trace!("thermcap: {} capped at {}", cpu, freq);
                report.applied += 1;
            },
            Err(err) => {
                log::warn!("thermcap: failed to cap {}: {}", cpu, err);
                report.failed += 1;
                report.first_error.get_or_insert(err);
            },
        }
    }

    report
}

// =============================================================================
// Emergency power-off
// =============================================================================

/// Request a power-off, graceful first
///
/// Returns the mode that was accepted. Both failing is reported at error
/// level; nothing else can be done from here.
pub fn emergency_power_off<P: PowerControl>(power: &P) -> Result<PowerOffMode, ShutdownFailure> {
    log::warn!("thermcap: emergency shutdown");

    match power.power_off(PowerOffMode::Graceful) {
        Ok(()) => return Ok(PowerOffMode::Graceful),
        Err(err) => log::warn!("thermcap: {}, forcing power-off", err),
    }

    power.power_off(PowerOffMode::Forced).map(|()| PowerOffMode::Forced).map_err(|err| {
        log::error!("thermcap: {}", err);
        err
    })
}

// =============================================================================
// TESTS
// =============================================================================
