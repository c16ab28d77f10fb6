//! # Controller Statistics
//!
//! Monotonic counters updated at the end of every cycle. Relaxed ordering:
//! the counters are independent and only ever read as a snapshot.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::engine::{CycleFlags, CycleOutcome};

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThermalStats {
    /// Completed cycles, including sensor faults
    pub cycles: u64,
    /// Cycles without a reading
    pub sensor_faults: u64,
    /// Failed per-core updates
    pub actuator_faults: u64,
    /// Cycles that changed the tier
    pub tier_transitions: u64,
    /// Power-off requests issued
    pub shutdown_requests: u64,
    /// Cycles rejected because one was already running
    pub overlapping_cycles: u64,
}

/// Live counters
#[derive(Debug, Default)]
pub struct StatsCounters {
    cycles: AtomicU64,
    sensor_faults: AtomicU64,
    actuator_faults: AtomicU64,
    tier_transitions: AtomicU64,
    shutdown_requests: AtomicU64,
    overlapping_cycles: AtomicU64,
}

impl StatsCounters {
    /// All zero
    pub const fn new() -> Self {
        Self {
            cycles: AtomicU64::new(0),
            sensor_faults: AtomicU64::new(0),
            actuator_faults: AtomicU64::new(0),
            tier_transitions: AtomicU64::new(0),
            shutdown_requests: AtomicU64::new(0),
            overlapping_cycles: AtomicU64::new(0),
        }
    }

    /// Account for a finished cycle
    pub fn record(&self, outcome: &CycleOutcome) {
        self.cycles.fetch_add(1, Ordering::Relaxed);

        let flags = outcome.flags;
        if flags.contains(CycleFlags::SENSOR_FAULT) {
            self.sensor_faults.fetch_add(1, Ordering::Relaxed);
        }
        if flags.contains(CycleFlags::TIER_CHANGED) {
            self.tier_transitions.fetch_add(1, Ordering::Relaxed);
        }
        if flags.contains(CycleFlags::SHUTDOWN_REQUESTED) {
            self.shutdown_requests.fetch_add(1, Ordering::Relaxed);
        }
        self.actuator_faults
            .fetch_add(u64::from(outcome.report.failed), Ordering::Relaxed);
    }

    /// Account for a rejected overlapping cycle
    pub fn record_overlap(&self) {
        self.overlapping_cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters
    pub fn snapshot(&self) -> ThermalStats {
        ThermalStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            sensor_faults: self.sensor_faults.load(Ordering::Relaxed),
            actuator_faults: self.actuator_faults.load(Ordering::Relaxed),
            tier_transitions: self.tier_transitions.load(Ordering::Relaxed),
            shutdown_requests: self.shutdown_requests.load(Ordering::Relaxed),
            overlapping_cycles: self.overlapping_cycles.load(Ordering::Relaxed),
        }
    }
}
