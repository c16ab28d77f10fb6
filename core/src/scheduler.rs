//! # Poll Scheduler
//!
//! The cycle is a single delayed work item that re-arms itself. The delay
//! for the next cycle depends only on the tier the cycle ended in:
//!
//! | Tier | Delay |
//! |------|-------|
//! | 0 | `poll_ms` |
//! | 1 | `low_poll_ms` |
//! | 2, 3 | `mid_max_poll_ms` |
//! | sensor fault | `mid_max_poll_ms` |
//!
//! ## Lifecycle
//!
//! ```text
//!   Idle ──start──▶ Armed ──begin_cycle──▶ Running
//!                     ▲                       │  ▲
//!                     └─────finish_cycle──────┘  │ start
//!                                           stop │  │
//!                                                ▼  │
//!   Stopped ◀────────finish_cycle──────────── Stopping
//!   Idle/Armed ──stop──▶ Stopped ──start──▶ Armed
//! ```
//!
//! Only one cycle runs at a time: `begin_cycle` fails while another cycle
//! is in progress, and after `stop` nothing re-arms. A cycle still in
//! flight when the scheduler is stopped leaves it in `Stopping`; starting
//! again from there resumes the in-flight cycle instead of arming a second
//! one.

use core::sync::atomic::{AtomicU8, Ordering};

use thermcap_hal::DelayedWork;

use crate::config::ThermalConfig;
use crate::error::{ThermalError, ThermalResult};
use crate::tier::Tier;

// =============================================================================
// Delay lookup
// =============================================================================

/// How the next delay is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollMode {
    /// Per-tier interval
    #[default]
    Dynamic,
    /// Always `poll_ms`
    Fixed,
}

/// Tier to delay lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    /// Tier 0 interval
    pub poll_ms: u32,
    /// Tier 1 interval
    pub low_poll_ms: u32,
    /// Tier 2/3 and sensor fault interval
    pub mid_max_poll_ms: u32,
    /// Lookup mode
    pub mode: PollMode,
}

impl PollSchedule {
    /// Take the intervals from a configuration snapshot
    pub const fn from_config(config: &ThermalConfig, mode: PollMode) -> Self {
        Self {
            poll_ms: config.poll_ms,
            low_poll_ms: config.low_poll_ms,
            mid_max_poll_ms: config.mid_max_poll_ms,
            mode,
        }
    }

    /// Delay before the next cycle
    pub const fn next_delay(&self, tier: Tier, sensor_fault: bool) -> u32 {
        if let PollMode::Fixed = self.mode {
            return self.poll_ms;
        }
        if sensor_fault {
            return self.mid_max_poll_ms;
        }
        match tier {
            Tier::Unthrottled => self.poll_ms,
            Tier::Low => self.low_poll_ms,
            Tier::Mid | Tier::Max => self.mid_max_poll_ms,
        }
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Scheduler phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    /// Never started
    Idle    = 0,
    /// Work pending
    Armed   = 1,
    /// Cycle in progress
    Running = 2,
    /// Stopped, nothing re-arms
    Stopped = 3,
    /// Stopped while a cycle is still in progress
    Stopping = 4,
}

impl Phase {
    const fn from_u8(v: u8) -> Phase {
        match v {
            1 => Phase::Armed,
            2 => Phase::Running,
            3 => Phase::Stopped,
            4 => Phase::Stopping,
            _ => Phase::Idle,
        }
    }
}

/// Self re-arming cycle driver
#[derive(Debug)]
pub struct Scheduler<W: DelayedWork> {
    work: W,
    phase: AtomicU8,
}

impl<W: DelayedWork> Scheduler<W> {
    /// Wrap a work item
    pub const fn new(work: W) -> Self {
        Self {
            work,
            phase: AtomicU8::new(Phase::Idle as u8),
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// The underlying work item
    pub fn work(&self) -> &W {
        &self.work
    }

    fn transition(&self, from: Phase, to: Phase) -> bool {
        self.phase
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Arm the first cycle with no delay
    ///
    /// Starting an already running scheduler does nothing. Starting while a
    /// stopped cycle is still in flight lets that cycle re-arm on finish.
    pub fn start(&self) -> bool {
        if self.transition(Phase::Idle, Phase::Armed)
            || self.transition(Phase::Stopped, Phase::Armed)
        {
            self.work.schedule_after(0);
            return true;
        }
        self.transition(Phase::Stopping, Phase::Running)
    }

    /// Enter a cycle
    pub fn begin_cycle(&self) -> ThermalResult<()> {
        if self.transition(Phase::Armed, Phase::Running) {
            return Ok(());
        }
        match self.phase() {
            Phase::Running | Phase::Stopping => Err(ThermalError::CycleInProgress),
            _ => Err(ThermalError::NotRunning),
        }
    }

    /// Leave a cycle and re-arm after `delay_ms`
    ///
    /// Returns `false` if the scheduler was stopped during the cycle.
    pub fn finish_cycle(&self, delay_ms: u32) -> bool {
        if self.transition(Phase::Running, Phase::Armed) {
            self.work.schedule_after(delay_ms);
            return true;
        }
        self.transition(Phase::Stopping, Phase::Stopped);
        false
    }

    /// Stop and cancel pending work
    ///
    /// Returns `true` if the scheduler was armed or running.
    pub fn stop(&self) -> bool {
        let prev = self
            .phase
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                let next = match Phase::from_u8(v) {
                    Phase::Running | Phase::Stopping => Phase::Stopping,
                    _ => Phase::Stopped,
                };
                Some(next as u8)
            })
            .unwrap_or_else(|v| v);
        let prev = Phase::from_u8(prev);
        self.work.cancel();
        matches!(prev, Phase::Armed | Phase::Running)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use thermcap_hal::sim::SimWork;

    fn schedule(mode: PollMode) -> PollSchedule {
        PollSchedule {
            poll_ms: 1000,
            low_poll_ms: 500,
            mid_max_poll_ms: 250,
            mode,
        }
    }

    #[test]
    fn test_dynamic_delay_per_tier() {
        let s = schedule(PollMode::Dynamic);
        assert_eq!(s.next_delay(Tier::Unthrottled, false), 1000);
        assert_eq!(s.next_delay(Tier::Low, false), 500);
        assert_eq!(s.next_delay(Tier::Mid, false), 250);
        assert_eq!(s.next_delay(Tier::Max, false), 250);
    }

    #[test]
    fn test_sensor_fault_uses_fast_interval() {
        let s = schedule(PollMode::Dynamic);
        assert_eq!(s.next_delay(Tier::Unthrottled, true), 250);
    }

    #[test]
    fn test_fixed_mode() {
        let s = schedule(PollMode::Fixed);
        for tier in Tier::ALL {
            assert_eq!(s.next_delay(tier, false), 1000);
        }
        assert_eq!(s.next_delay(Tier::Max, true), 1000);
    }

    #[test]
    fn test_lifecycle() {
        let sched = Scheduler::new(SimWork::new());
        assert_eq!(sched.begin_cycle(), Err(ThermalError::NotRunning));

        assert!(sched.start());
        assert!(!sched.start());
        assert_eq!(sched.work().take_pending(), Some(0));

        sched.begin_cycle().unwrap();
        assert_eq!(sched.phase(), Phase::Running);
        assert_eq!(sched.begin_cycle(), Err(ThermalError::CycleInProgress));

        assert!(sched.finish_cycle(500));
        assert_eq!(sched.phase(), Phase::Armed);
        assert_eq!(sched.work().pending_delay(), Some(500));
    }

    #[test]
    fn test_stop_during_cycle_prevents_rearm() {
        let sched = Scheduler::new(SimWork::new());
        sched.start();
        sched.work().take_pending();
        sched.begin_cycle().unwrap();

        assert!(sched.stop());
        assert!(!sched.finish_cycle(250));
        assert!(!sched.work().is_pending());
        assert_eq!(sched.begin_cycle(), Err(ThermalError::NotRunning));
    }

    #[test]
    fn test_restart_while_stopped_cycle_in_flight() {
        let sched = Scheduler::new(SimWork::new());
        sched.start();
        sched.work().take_pending();
        sched.begin_cycle().unwrap();

        sched.stop();
        assert_eq!(sched.phase(), Phase::Stopping);
        assert_eq!(sched.begin_cycle(), Err(ThermalError::CycleInProgress));

        assert!(sched.start());
        assert!(!sched.work().is_pending());
        assert_eq!(sched.begin_cycle(), Err(ThermalError::CycleInProgress));

        // The in-flight cycle is the one that re-arms
        assert!(sched.finish_cycle(500));
        assert_eq!(sched.work().pending_delay(), Some(500));
        assert_eq!(sched.work().history(), vec![0, 500]);
        sched.begin_cycle().unwrap();
    }

    #[test]
    fn test_restart_after_stop() {
        let sched = Scheduler::new(SimWork::new());
        sched.start();
        assert!(sched.stop());
        assert!(!sched.work().is_pending());

        assert!(sched.start());
        assert_eq!(sched.work().pending_delay(), Some(0));
    }
}
