//! # CPU Hotplug Helper
//!
//! Takes the secondary cores offline while the system is suspended and
//! brings them back on resume. Both transitions are deferred through a
//! delayed work item so that a quick suspend/resume bounce does not cycle
//! the cores.
//!
//! ```text
//!   suspend ──(suspend_delay_ms)──▶ offline all but CPU 0
//!   resume  ──(resume_delay_ms)───▶ online all
//! ```
//!
//! Each call cancels the opposite pending work first, except the very first
//! suspend after boot, where no online work can exist yet.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use heapless::String;
use thermcap_hal::{CpuHotplug, CpuId, DelayedWork};

/// Default delay between suspend and offlining
pub const DEFAULT_SUSPEND_DELAY_MS: u32 = 2000;

/// Default delay between resume and onlining
pub const DEFAULT_RESUME_DELAY_MS: u32 = 100;

/// Helper version
pub const VERSION: HotplugVersion = HotplugVersion { major: 1, minor: 2 };

/// Version structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotplugVersion {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
}

impl fmt::Display for HotplugVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

// =============================================================================
// Work
// =============================================================================

/// Which deferred sweep fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotplugWork {
    /// Take every online secondary core down
    OfflineAll,
    /// Bring every offline secondary core up
    OnlineAll,
}

/// Result of one sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Cores that changed state
    pub changed: u32,
    /// Cores whose transition failed
    pub failed: u32,
}

/// Delays used by the helper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotplugConfig {
    /// Delay before offlining
    pub suspend_delay_ms: u32,
    /// Delay before onlining
    pub resume_delay_ms: u32,
}

impl Default for HotplugConfig {
    fn default() -> Self {
        Self {
            suspend_delay_ms: DEFAULT_SUSPEND_DELAY_MS,
            resume_delay_ms: DEFAULT_RESUME_DELAY_MS,
        }
    }
}

// =============================================================================
// Helper
// =============================================================================

/// Suspend/resume hotplug driver
#[derive(Debug)]
pub struct HotplugHelper<H: CpuHotplug, W: DelayedWork> {
    cpus: H,
    offline_work: W,
    online_work: W,
    suspend_delay_ms: AtomicU32,
    resume_delay_ms: AtomicU32,
    /// Set until the first suspend
    boot_flag: AtomicBool,
}

impl<H: CpuHotplug, W: DelayedWork> HotplugHelper<H, W> {
    /// Create the helper; nothing is armed
    pub fn new(cpus: H, offline_work: W, online_work: W, config: HotplugConfig) -> Self {
        log::info!(
            "hotplug: initialized, {} of {} cpus online",
            cpus.online_count(),
            cpus.possible_cpus()
        );
        Self {
            cpus,
            offline_work,
            online_work,
            suspend_delay_ms: AtomicU32::new(config.suspend_delay_ms),
            resume_delay_ms: AtomicU32::new(config.resume_delay_ms),
            boot_flag: AtomicBool::new(true),
        }
    }

    /// System is going to sleep
    pub fn suspend(&self) {
        let first = self.boot_flag.swap(false, Ordering::AcqRel);
        if !first {
            self.online_work.cancel();
        }
        self.offline_work
            .schedule_after(self.suspend_delay_ms.load(Ordering::Relaxed));
    }

    /// System woke up
    pub fn resume(&self) {
        self.offline_work.cancel();
        self.online_work
            .schedule_after(self.resume_delay_ms.load(Ordering::Relaxed));
    }

    /// Work callback
    pub fn on_work(&self, work: HotplugWork) -> SweepReport {
        let mut report = SweepReport::default();

        for index in 1..self.cpus.possible_cpus() {
            let cpu = CpuId::new(index);
            let online = self.cpus.is_online(cpu);
            let result = match work {
                HotplugWork::OfflineAll if online => self.cpus.cpu_down(cpu),
                HotplugWork::OnlineAll if !online => self.cpus.cpu_up(cpu),
                _ => continue,
            };
            match result {
                Ok(()) => report.changed += 1,
                Err(err) => {
                    log::warn!("hotplug: {}", err);
                    report.failed += 1;
                },
            }
        }

        log::debug!(
            "hotplug: {:?} done, {} cpus online",
            work,
            self.cpus.online_count()
        );
        report
    }

    /// Cancel both sweeps
    pub fn shutdown(&self) {
        self.offline_work.cancel();
        self.online_work.cancel();
    }

    /// Change the suspend delay
    pub fn set_suspend_delay(&self, ms: u32) {
        self.suspend_delay_ms.store(ms, Ordering::Relaxed);
    }

    /// Change the resume delay
    pub fn set_resume_delay(&self, ms: u32) {
        self.resume_delay_ms.store(ms, Ordering::Relaxed);
    }

    /// Current delays
    pub fn config(&self) -> HotplugConfig {
        HotplugConfig {
            suspend_delay_ms: self.suspend_delay_ms.load(Ordering::Relaxed),
            resume_delay_ms: self.resume_delay_ms.load(Ordering::Relaxed),
        }
    }

    /// Work item for `work`
    pub fn work(&self, work: HotplugWork) -> &W {
        match work {
            HotplugWork::OfflineAll => &self.offline_work,
            HotplugWork::OnlineAll => &self.online_work,
        }
    }

    /// Render the version attribute
    pub fn show_version(&self) -> Result<String<8>, fmt::Error> {
        let mut buf = String::new();
        writeln!(buf, "{}", VERSION)?;
        Ok(buf)
    }
}

// =============================================================================
// TESTS
// =============================================================================
