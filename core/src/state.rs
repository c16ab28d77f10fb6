//! # Throttle State
//!
//! The current tier and the cached baseline live behind a mutex that the
//! cycle holds from start to finish. Both are mirrored into atomics after
//! every cycle so that readers (the `thermal_throttled` attribute, stats)
//! never wait on a cycle that may be stuck inside a terminal power-off.
//!
//! The shutdown guard is separate: a single `AtomicBool` flipped with
//! compare-exchange. It is never cleared.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use spin::{Mutex, MutexGuard};
use static_assertions::assert_impl_all;
use thermcap_hal::Frequency;

use crate::tier::Tier;

/// State owned by the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThrottleState {
    /// Current tier
    pub tier: Tier,
    /// Core 0 cap captured while unthrottled
    pub baseline: Option<Frequency>,
}

/// Throttle state shared between the cycle and the readers
#[derive(Debug)]
pub struct SharedState {
    inner: Mutex<ThrottleState>,
    published_tier: AtomicU8,
    /// Baseline in kHz, 0 = never captured
    published_baseline: AtomicU32,
    shutdown_in_progress: AtomicBool,
}

impl SharedState {
    /// Unthrottled, no baseline, no shutdown
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(ThrottleState {
                tier: Tier::Unthrottled,
                baseline: None,
            }),
            published_tier: AtomicU8::new(0),
            published_baseline: AtomicU32::new(0),
            shutdown_in_progress: AtomicBool::new(false),
        }
    }

    /// Lock the state for one cycle
    pub fn lock(&self) -> MutexGuard<'_, ThrottleState> {
        self.inner.lock()
    }

    /// Lock the state unless a cycle holds it
    pub fn try_lock(&self) -> Option<MutexGuard<'_, ThrottleState>> {
        self.inner.try_lock()
    }

    /// Mirror a state into the atomics
    pub fn publish(&self, state: &ThrottleState) {
        self.published_tier.store(state.tier.level(), Ordering::Release);
        let khz = state.baseline.map_or(0, |f| f.khz());
        self.published_baseline.store(khz, Ordering::Release);
    }

    /// Tier as of the last completed cycle
    pub fn tier(&self) -> Tier {
        Tier::from_level(self.published_tier.load(Ordering::Acquire)).unwrap_or(Tier::Unthrottled)
    }

    /// Baseline as of the last completed cycle
    pub fn baseline(&self) -> Option<Frequency> {
        match self.published_baseline.load(Ordering::Acquire) {
            0 => None,
            khz => Some(Frequency::from_khz(khz)),
        }
    }

    /// Claim the shutdown
    ///
    /// Returns `true` for exactly one caller over the lifetime of the state.
    pub fn begin_shutdown(&self) -> bool {
        self.shutdown_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Has a power-off been requested?
    pub fn shutdown_in_progress(&self) -> bool {
        self.shutdown_in_progress.load(Ordering::Acquire)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

assert_impl_all!(SharedState: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let s = SharedState::new();
        assert_eq!(s.tier(), Tier::Unthrottled);
        assert_eq!(s.baseline(), None);
        assert!(!s.shutdown_in_progress());
        assert_eq!(*s.lock(), ThrottleState::default());
    }

    #[test]
    fn test_publish_mirrors_locked_state() {
        let s = SharedState::new();
        {
            let mut st = s.lock();
            st.tier = Tier::Mid;
            st.baseline = Some(Frequency::from_khz(1_800_000));
            // Not visible until published
            assert_eq!(s.tier(), Tier::Unthrottled);
            s.publish(&st);
        }
        assert_eq!(s.tier(), Tier::Mid);
        assert_eq!(s.baseline(), Some(Frequency::from_khz(1_800_000)));
    }

    #[test]
    fn test_try_lock_fails_while_held() {
        let s = SharedState::new();
        let _guard = s.lock();
        assert!(s.try_lock().is_none());
    }

    #[test]
    fn test_begin_shutdown_once() {
        let s = SharedState::new();
        assert!(s.begin_shutdown());
        assert!(!s.begin_shutdown());
        assert!(s.shutdown_in_progress());
    }

    #[test]
    fn test_begin_shutdown_race_has_one_winner() {
        use std::sync::Barrier;

        for _ in 0..200 {
            let s = SharedState::new();
            let barrier = Barrier::new(2);
            let winners = std::thread::scope(|scope| {
                let racers: Vec<_> = (0..2)
                    .map(|_| {
                        scope.spawn(|| {
                            barrier.wait();
                            s.begin_shutdown()
                        })
                    })
                    .collect();
                racers
                    .into_iter()
                    .map(|r| r.join().unwrap_or(false))
                    .filter(|&won| won)
                    .count()
            });
            assert_eq!(winners, 1);
            assert!(s.shutdown_in_progress());
        }
    }
}
