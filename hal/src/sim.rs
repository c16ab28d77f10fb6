//! # Simulated Platform
//!
//! In-memory implementations of every HAL capability. State lives behind
//! `spin` locks so a single instance can be shared between the controller
//! and the code driving it.
//!
//! ```rust,ignore
//! let sensor = SimSensor::new();
//! sensor.push_celsius(45);
//! let cpus = SimCpuFreq::uniform(4, Frequency::from_khz(384_000), Frequency::from_khz(1_512_000));
//! ```

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use spin::Mutex;

use crate::cpufreq::{ActuatorError, CpuFreq, FreqPolicy};
use crate::hotplug::{CpuHotplug, HotplugError};
use crate::power::{PowerControl, PowerOffMode, ShutdownFailure};
use crate::sensor::{SensorError, TemperatureSensor};
use crate::types::{CpuId, Frequency, SensorId, Temperature};
use crate::workqueue::DelayedWork;

// =============================================================================
// Sensor
// =============================================================================

/// Scripted temperature sensor
///
/// Queued readings are consumed first; once the queue is empty the steady
/// reading (if any) is returned on every call.
#[derive(Debug, Default)]
pub struct SimSensor {
    script: Mutex<VecDeque<Result<Temperature, SensorError>>>,
    steady: Mutex<Option<Temperature>>,
    reads: Mutex<Vec<SensorId>>,
}

impl SimSensor {
    /// Create a sensor with no readings
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one reading
    pub fn push(&self, reading: Result<Temperature, SensorError>) {
        self.script.lock().push_back(reading);
    }

    /// Queue one reading in degrees Celsius
    pub fn push_celsius(&self, c: i32) {
        self.push(Ok(Temperature::from_celsius(c)));
    }

    /// Return `c` whenever the script is empty
    pub fn set_steady(&self, c: i32) {
        *self.steady.lock() = Some(Temperature::from_celsius(c));
    }

    /// Sensors queried so far, in order
    pub fn reads(&self) -> Vec<SensorId> {
        self.reads.lock().clone()
    }
}

impl TemperatureSensor for SimSensor {
    fn read_temperature(&self, sensor: SensorId) -> Result<Temperature, SensorError> {
        self.reads.lock().push(sensor);
        if let Some(reading) = self.script.lock().pop_front() {
            return reading;
        }
        (*self.steady.lock()).ok_or(SensorError::NotReady)
    }
}

// =============================================================================
// cpufreq
// =============================================================================

#[derive(Debug)]
struct SimCpu {
    policy: Option<FreqPolicy>,
    fail_next: Option<ActuatorError>,
    updates: u32,
}

/// Simulated cpufreq core
#[derive(Debug)]
pub struct SimCpuFreq {
    cpus: Mutex<Vec<SimCpu>>,
}

impl SimCpuFreq {
    /// `count` identical CPUs whose cap starts at the hardware maximum
    pub fn uniform(count: u32, min: Frequency, cpuinfo_max: Frequency) -> Self {
        let cpus = (0..count)
            .map(|i| SimCpu {
                policy: Some(FreqPolicy::new(CpuId::new(i), min, cpuinfo_max, cpuinfo_max)),
                fail_next: None,
                updates: 0,
            })
            .collect();
        Self {
            cpus: Mutex::new(cpus),
        }
    }

    /// Drop the policy of `cpu`, as if it went offline
    pub fn remove_policy(&self, cpu: CpuId) {
        if let Some(c) = self.cpus.lock().get_mut(cpu.index() as usize) {
            c.policy = None;
        }
    }

    /// Force the current cap of `cpu` (no update is counted)
    pub fn set_current_max(&self, cpu: CpuId, max: Frequency) {
        if let Some(p) = self
            .cpus
            .lock()
            .get_mut(cpu.index() as usize)
            .and_then(|c| c.policy.as_mut())
        {
            p.max = max;
        }
    }

    /// Make the next update on `cpu` fail with `err`
    pub fn fail_next(&self, cpu: CpuId, err: ActuatorError) {
        if let Some(c) = self.cpus.lock().get_mut(cpu.index() as usize) {
            c.fail_next = Some(err);
        }
    }

    /// Current cap of `cpu`, `None` if it has no policy
    pub fn current_max(&self, cpu: CpuId) -> Option<Frequency> {
        self.cpus
            .lock()
            .get(cpu.index() as usize)
            .and_then(|c| c.policy.map(|p| p.max))
    }

    /// Number of successful updates on `cpu`
    pub fn updates(&self, cpu: CpuId) -> u32 {
        self.cpus
            .lock()
            .get(cpu.index() as usize)
            .map_or(0, |c| c.updates)
    }
}

impl CpuFreq for SimCpuFreq {
    fn possible_cpus(&self) -> u32 {
        self.cpus.lock().len() as u32
    }

    fn policy(&self, cpu: CpuId) -> Option<FreqPolicy> {
        self.cpus
            .lock()
            .get(cpu.index() as usize)
            .and_then(|c| c.policy)
    }

    fn set_max_frequency(&self, policy: &FreqPolicy, cap: Frequency) -> Result<(), ActuatorError> {
        let mut cpus = self.cpus.lock();
        let c = cpus
            .get_mut(policy.cpu.index() as usize)
            .ok_or(ActuatorError::PolicyGone(policy.cpu))?;
        if let Some(err) = c.fail_next.take() {
            return Err(err);
        }
        let live = c.policy.as_mut().ok_or(ActuatorError::PolicyGone(policy.cpu))?;
        live.max = live.verify_within_limits(cap);
        c.updates += 1;
        Ok(())
    }
}

// =============================================================================
// Power
// =============================================================================

/// Records power-off requests instead of powering off
#[derive(Debug)]
pub struct SimPower {
    requests: Mutex<Vec<PowerOffMode>>,
    graceful_available: bool,
}

impl SimPower {
    /// Platform where both modes succeed
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            graceful_available: true,
        }
    }

    /// Platform without an orderly shutdown path
    pub fn forced_only() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            graceful_available: false,
        }
    }

    /// Requests seen so far, including failed ones
    pub fn requests(&self) -> Vec<PowerOffMode> {
        self.requests.lock().clone()
    }
}

impl Default for SimPower {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerControl for SimPower {
    fn power_off(&self, mode: PowerOffMode) -> Result<(), ShutdownFailure> {
        log::debug!("sim: {} power-off requested", mode.name());
        self.requests.lock().push(mode);
        match mode {
            PowerOffMode::Graceful if !self.graceful_available => {
                Err(ShutdownFailure::Unavailable(mode))
            },
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Delayed work
// =============================================================================

/// Delayed work item driven by hand
///
/// Nothing fires on its own: the test calls [`SimWork::take_pending`] and
/// then invokes the owner's work callback.
#[derive(Debug, Default)]
pub struct SimWork {
    pending: Mutex<Option<u32>>,
    history: Mutex<Vec<u32>>,
}

impl SimWork {
    /// Create an idle work item
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay of the pending arm, if any
    pub fn pending_delay(&self) -> Option<u32> {
        *self.pending.lock()
    }

    /// Consume the pending arm, as if the timer expired
    pub fn take_pending(&self) -> Option<u32> {
        self.pending.lock().take()
    }

    /// Every delay ever armed, in order
    pub fn history(&self) -> Vec<u32> {
        self.history.lock().clone()
    }
}

impl DelayedWork for SimWork {
    fn schedule_after(&self, delay_ms: u32) {
        *self.pending.lock() = Some(delay_ms);
        self.history.lock().push(delay_ms);
    }

    fn cancel(&self) -> bool {
        self.pending.lock().take().is_some()
    }

    fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }
}

// =============================================================================
// Hotplug
// =============================================================================

/// Simulated hotplug core
#[derive(Debug)]
pub struct SimHotplug {
    online: Mutex<Vec<bool>>,
    refuse: Mutex<Vec<CpuId>>,
}

impl SimHotplug {
    /// `count` CPUs, all online
    pub fn new(count: u32) -> Self {
        Self {
            online: Mutex::new((0..count).map(|_| true).collect()),
            refuse: Mutex::new(Vec::new()),
        }
    }

    /// Refuse every transition of `cpu`
    pub fn refuse(&self, cpu: CpuId) {
        self.refuse.lock().push(cpu);
    }

    fn transition(&self, cpu: CpuId, up: bool) -> Result<(), HotplugError> {
        if self.refuse.lock().contains(&cpu) {
            return Err(HotplugError::Refused(cpu));
        }
        let mut online = self.online.lock();
        let slot = online
            .get_mut(cpu.index() as usize)
            .ok_or(HotplugError::NoSuchCpu(cpu))?;
        *slot = up;
        log::trace!("sim: {} {}", cpu, if up { "up" } else { "down" });
        Ok(())
    }
}

impl CpuHotplug for SimHotplug {
    fn possible_cpus(&self) -> u32 {
        self.online.lock().len() as u32
    }

    fn is_online(&self, cpu: CpuId) -> bool {
        self.online
            .lock()
            .get(cpu.index() as usize)
            .copied()
            .unwrap_or(false)
    }

    fn cpu_up(&self, cpu: CpuId) -> Result<(), HotplugError> {
        self.transition(cpu, true)
    }

    fn cpu_down(&self, cpu: CpuId) -> Result<(), HotplugError> {
        self.transition(cpu, false)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_script_then_steady() {
        let s = SimSensor::new();
        s.push_celsius(40);
        s.push(Err(SensorError::Timeout));
        s.set_steady(30);

        let id = SensorId::new(7);
        assert_eq!(s.read_temperature(id), Ok(Temperature::from_celsius(40)));
        assert_eq!(s.read_temperature(id), Err(SensorError::Timeout));
        assert_eq!(s.read_temperature(id), Ok(Temperature::from_celsius(30)));
        assert_eq!(s.reads().len(), 3);
    }

    #[test]
    fn test_cpufreq_clamps_and_fails_once() {
        let f = SimCpuFreq::uniform(2, Frequency::from_khz(300), Frequency::from_khz(1800));
        let p = f.policy(CpuId::new(1)).unwrap();

        f.set_max_frequency(&p, Frequency::from_khz(100)).unwrap();
        assert_eq!(f.current_max(CpuId::new(1)), Some(Frequency::from_khz(300)));

        f.fail_next(CpuId::new(1), ActuatorError::Busy(CpuId::new(1)));
        assert!(f.set_max_frequency(&p, Frequency::from_khz(900)).is_err());
        assert!(f.set_max_frequency(&p, Frequency::from_khz(900)).is_ok());
        assert_eq!(f.updates(CpuId::new(1)), 2);
    }

    #[test]
    fn test_work_arm_and_cancel() {
        let w = SimWork::new();
        w.schedule_after(250);
        assert!(w.is_pending());
        assert!(w.cancel());
        assert!(!w.cancel());
        assert_eq!(w.history(), alloc::vec![250]);
    }

    #[test]
    fn test_hotplug_refuse() {
        let h = SimHotplug::new(4);
        h.refuse(CpuId::new(2));
        assert!(h.cpu_down(CpuId::new(1)).is_ok());
        assert!(h.cpu_down(CpuId::new(2)).is_err());
        assert_eq!(h.online_count(), 3);
    }
}
