//! # Delayed Work
//!
//! A single delayed work item on a workqueue. The owner arms it with
//! [`DelayedWork::schedule_after`]; when the delay expires the platform
//! invokes the owner's work callback. Arming an already pending item
//! replaces its deadline.

/// One delayed work item
pub trait DelayedWork: Send + Sync {
    /// Arm the work to fire after `delay_ms` milliseconds (0 = as soon as possible)
    fn schedule_after(&self, delay_ms: u32);

    /// Cancel pending work
    ///
    /// Returns `true` if work was pending.
    fn cancel(&self) -> bool;

    /// Is the work armed?
    fn is_pending(&self) -> bool;
}
