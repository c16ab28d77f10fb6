//! # Thermal Controller
//!
//! Owns the configuration, the throttle state, the scheduler and the
//! platform collaborators, and ties them into the periodic cycle.
//!
//! ```rust,ignore
//! let ctl = ThermalController::new(config, sensor, cpus, power, work)?;
//! ctl.start();
//! // platform calls this every time the delayed work fires
//! ctl.on_work()?;
//! ```
//!
//! Readers (`tier`, `show`, `stats`) never take the cycle lock.

use core::fmt;

use thermcap_hal::{CpuFreq, DelayedWork, Frequency, PowerControl, TemperatureSensor};

use crate::attr::{self, AttrBuf, Attribute};
use crate::config::{SharedConfig, ThermalConfig};
use crate::engine::{self, CycleFlags, CycleOutcome};
use crate::error::{AttrError, ThermalError, ThermalResult};
use crate::scheduler::{PollMode, PollSchedule, Scheduler};
use crate::state::SharedState;
use crate::stats::{StatsCounters, ThermalStats};
use crate::tier::Tier;
use crate::VERSION;

/// Closed-loop thermal throttling controller
pub struct ThermalController<S, F, P, W>
where
    S: TemperatureSensor,
    F: CpuFreq,
    P: PowerControl,
    W: DelayedWork,
{
    config: SharedConfig,
    state: SharedState,
    scheduler: Scheduler<W>,
    stats: StatsCounters,
    poll_mode: PollMode,
    sensor: S,
    cpus: F,
    power: P,
}

impl<S, F, P, W> ThermalController<S, F, P, W>
where
    S: TemperatureSensor,
    F: CpuFreq,
    P: PowerControl,
    W: DelayedWork,
{
    /// Create a stopped controller
    ///
    /// An out-of-range sensor is fatal. Inconsistent bands are only logged.
    pub fn new(config: ThermalConfig, sensor: S, cpus: F, power: P, work: W) -> ThermalResult<Self> {
        config.validate_sensor()?;
        if let Err(err) = config.validate_bands() {
            log::warn!("thermcap: inconsistent thresholds: {}", err);
        }

        log::info!(
            "thermcap: sensor {}, shutdown at {}C, {} cpus",
            config.sensor_id,
            config.shutdown_temp,
            cpus.possible_cpus()
        );

        Ok(Self {
            config: SharedConfig::new(config),
            state: SharedState::new(),
            scheduler: Scheduler::new(work),
            stats: StatsCounters::new(),
            poll_mode: PollMode::Dynamic,
            sensor,
            cpus,
            power,
        })
    }

    /// Choose how poll intervals are picked
    pub fn with_poll_mode(mut self, mode: PollMode) -> Self {
        self.poll_mode = mode;
        self
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Arm the first cycle immediately
    ///
    /// Returns `false` if already running.
    pub fn start(&self) -> bool {
        let started = self.scheduler.start();
        if started {
            log::info!("thermcap: started ({:?} polling)", self.poll_mode);
        }
        started
    }

    /// Cancel pending work; a cycle in progress finishes without re-arming
    pub fn stop(&self) -> bool {
        let was_running = self.scheduler.stop();
        if was_running {
            log::info!("thermcap: stopped");
        }
        was_running
    }

    /// Delayed-work callback: run one cycle and re-arm
    pub fn on_work(&self) -> ThermalResult<CycleOutcome> {
        if let Err(err) = self.scheduler.begin_cycle() {
            if err == ThermalError::CycleInProgress {
                self.stats.record_overlap();
            }
            log::debug!("thermcap: cycle not run: {}", err);
            return Err(err);
        }

        let config = self.config.snapshot();
        let reading = self.sensor.read_temperature(config.sensor_id);

        let outcome = {
            let mut state = self.state.lock();
            let outcome = engine::run_cycle(
                &config,
                &mut state,
                &self.state,
                reading,
                &self.cpus,
                &self.power,
            );
            self.state.publish(&state);
            outcome
        };
        self.stats.record(&outcome);

        let delay = PollSchedule::from_config(&config, self.poll_mode)
            .next_delay(outcome.tier, outcome.flags.contains(CycleFlags::SENSOR_FAULT));
        if !self.scheduler.finish_cycle(delay) {
            log::debug!("thermcap: stopped during cycle, not re-arming");
        }

        Ok(outcome)
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    /// Tier as of the last cycle
    pub fn tier(&self) -> Tier {
        self.state.tier()
    }

    /// Captured baseline frequency
    pub fn baseline(&self) -> Option<Frequency> {
        self.state.baseline()
    }

    /// Has a power-off been requested?
    pub fn shutdown_in_progress(&self) -> bool {
        self.state.shutdown_in_progress()
    }

    /// Current configuration
    pub fn config(&self) -> ThermalConfig {
        self.config.snapshot()
    }

    /// Counter snapshot
    pub fn stats(&self) -> ThermalStats {
        self.stats.snapshot()
    }

    /// Poll interval mode
    pub fn poll_mode(&self) -> PollMode {
        self.poll_mode
    }

    /// Cycle driver
    pub fn scheduler(&self) -> &Scheduler<W> {
        &self.scheduler
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Render an attribute
    pub fn show(&self, attr: Attribute) -> Result<AttrBuf, AttrError> {
        match attr {
            Attribute::Conf(field) => attr::render(self.config.get(field)),
            Attribute::ThermalThrottled => attr::render(self.tier().level()),
            Attribute::Version => attr::render(VERSION),
        }
    }

    /// Store to an attribute
    ///
    /// Returns the number of bytes consumed. The new value is picked up by
    /// the next cycle.
    pub fn store(&self, attr: Attribute, input: &str) -> Result<usize, AttrError> {
        let Attribute::Conf(field) = attr else {
            return Err(AttrError::ReadOnly);
        };
        let value = attr::parse_u32(input)?;
        let updated = self.config.store(field, value);
        log::info!("thermcap: {} = {}", attr, value);

        if field.is_threshold() {
            if let Err(err) = updated.validate_bands() {
                log::warn!("thermcap: inconsistent thresholds: {}", err);
            }
        }
        Ok(input.len())
    }

    /// Render an attribute by path
    pub fn show_path(&self, path: &str) -> Result<AttrBuf, AttrError> {
        self.show(Attribute::from_path(path)?)
    }

    /// Store to an attribute by path
    pub fn store_path(&self, path: &str, input: &str) -> Result<usize, AttrError> {
        self.store(Attribute::from_path(path)?, input)
    }
}

impl<S, F, P, W> fmt::Debug for ThermalController<S, F, P, W>
where
    S: TemperatureSensor,
    F: CpuFreq,
    P: PowerControl,
    W: DelayedWork,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThermalController")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("phase", &self.scheduler.phase())
            .field("poll_mode", &self.poll_mode)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Band, ConfigField};
    use crate::error::ConfigError;
    use static_assertions::assert_impl_all;
    use thermcap_hal::sim::{SimCpuFreq, SimPower, SimSensor, SimWork};
    use thermcap_hal::{CpuId, PowerOffMode, SensorError, SensorId};

    type Ctl = ThermalController<SimSensor, SimCpuFreq, SimPower, SimWork>;

    assert_impl_all!(Ctl: Send, Sync);

    fn config() -> ThermalConfig {
        ThermalConfig::builder()
            .sensor_id(3)
            .shutdown_temp(70)
            .band(Band::Low, 40, 35, 1_200_000)
            .band(Band::Mid, 50, 45, 900_000)
            .band(Band::Max, 60, 55, 600_000)
            .poll_intervals(1000, 500, 250)
            .build()
            .unwrap()
    }

    fn controller_with(config: ThermalConfig) -> Ctl {
        let cpus = SimCpuFreq::uniform(4, Frequency::from_khz(300_000), Frequency::from_khz(2_000_000));
        for i in 0..4 {
            cpus.set_current_max(CpuId::new(i), Frequency::from_khz(1_800_000));
        }
        ThermalController::new(config, SimSensor::new(), cpus, SimPower::new(), SimWork::new())
            .unwrap()
    }

    fn controller() -> Ctl {
        controller_with(config())
    }

    /// Fire the pending work with `reading`, returning the next delay
    fn fire(ctl: &Ctl, reading: i32) -> Option<u32> {
        ctl.sensor.push_celsius(reading);
        ctl.scheduler().work().take_pending().expect("work not armed");
        ctl.on_work().unwrap();
        ctl.scheduler().work().pending_delay()
    }

    #[test]
    fn test_new_rejects_sensor_out_of_range() {
        let mut cfg = config();
        cfg.sensor_id = SensorId::new(16);
        let err = ThermalController::new(
            cfg,
            SimSensor::new(),
            SimCpuFreq::uniform(1, Frequency::from_khz(1), Frequency::from_khz(2)),
            SimPower::new(),
            SimWork::new(),
        )
        .err();
        assert_eq!(
            err,
            Some(ThermalError::Config(ConfigError::SensorOutOfRange { sensor: 16, max: 16 }))
        );
    }

    #[test]
    fn test_new_accepts_inconsistent_bands() {
        let mut cfg = config();
        cfg.low.clear = 45;
        let ctl = controller_with(cfg);
        assert_eq!(ctl.tier(), Tier::Unthrottled);
    }

    #[test]
    fn test_first_cycle_armed_immediately() {
        let ctl = controller();
        assert!(ctl.start());
        assert!(!ctl.start());
        assert_eq!(ctl.scheduler().work().pending_delay(), Some(0));
    }

    #[test]
    fn test_scenario_through_controller() {
        let ctl = controller();
        ctl.start();

        let steps = [
            (45, Tier::Low, 1_200_000, 500),
            (55, Tier::Mid, 900_000, 250),
            (65, Tier::Max, 600_000, 250),
            (50, Tier::Mid, 900_000, 250),
            (30, Tier::Unthrottled, 1_800_000, 1000),
        ];
        for (reading, tier, cap, delay) in steps {
            assert_eq!(fire(&ctl, reading), Some(delay), "reading {}", reading);
            assert_eq!(ctl.tier(), tier, "reading {}", reading);
            for i in 0..4 {
                assert_eq!(ctl.cpus.current_max(CpuId::new(i)), Some(Frequency::from_khz(cap)));
            }
        }

        assert_eq!(ctl.baseline(), Some(Frequency::from_khz(1_800_000)));
        assert_eq!(ctl.sensor.reads()[0], SensorId::new(3));
        let stats = ctl.stats();
        assert_eq!(stats.cycles, 5);
        assert_eq!(stats.tier_transitions, 5);
    }

    #[test]
    fn test_sensor_fault_retries_fast() {
        let ctl = controller();
        ctl.start();
        ctl.sensor.push(Err(SensorError::Timeout));
        ctl.scheduler().work().take_pending();

        let outcome = ctl.on_work().unwrap();
        assert!(outcome.flags.contains(CycleFlags::SENSOR_FAULT));
        assert_eq!(ctl.tier(), Tier::Unthrottled);
        assert_eq!(ctl.scheduler().work().pending_delay(), Some(250));
        assert_eq!(ctl.stats().sensor_faults, 1);
    }

    #[test]
    fn test_fixed_poll_mode() {
        let ctl = controller().with_poll_mode(PollMode::Fixed);
        ctl.start();
        assert_eq!(fire(&ctl, 55), Some(1000));
        assert_eq!(ctl.tier(), Tier::Mid);
    }

    #[test]
    fn test_shutdown_once_across_cycles() {
        let ctl = controller();
        ctl.start();

        fire(&ctl, 72);
        fire(&ctl, 75);

        assert!(ctl.shutdown_in_progress());
        assert_eq!(ctl.power.requests(), vec![PowerOffMode::Graceful]);
        assert_eq!(ctl.show(Attribute::ThermalThrottled).unwrap().as_str(), "3\n");
        assert_eq!(ctl.stats().shutdown_requests, 1);
    }

    #[test]
    fn test_on_work_before_start() {
        let ctl = controller();
        assert_eq!(ctl.on_work().err(), Some(ThermalError::NotRunning));
        assert_eq!(ctl.stats().cycles, 0);
    }

    #[test]
    fn test_stop_cancels_and_ignores_work() {
        let ctl = controller();
        ctl.start();
        assert!(ctl.stop());
        assert!(!ctl.scheduler().work().is_pending());
        assert_eq!(ctl.on_work().err(), Some(ThermalError::NotRunning));
    }

    #[test]
    fn test_overlapping_cycle_rejected() {
        let ctl = controller();
        ctl.start();
        ctl.scheduler().begin_cycle().unwrap();

        assert_eq!(ctl.on_work().err(), Some(ThermalError::CycleInProgress));
        assert_eq!(ctl.stats().overlapping_cycles, 1);
        assert!(ctl.sensor.reads().is_empty());
    }

    #[test]
    fn test_show_values() {
        let ctl = controller();
        assert_eq!(ctl.show_path("conf/allowed_low_freq").unwrap().as_str(), "1200000\n");
        assert_eq!(ctl.show_path("conf/poll_ms").unwrap().as_str(), "1000\n");
        assert_eq!(ctl.show_path("thermal_throttled").unwrap().as_str(), "0\n");
        assert_eq!(ctl.show_path("version").unwrap().as_str(), "thermcap 0.1.0\n");
    }

    #[test]
    fn test_store_roundtrip_every_field() {
        let ctl = controller();
        for field in ConfigField::ALL {
            let attr = Attribute::Conf(field);
            assert_eq!(ctl.store(attr, "1234\n"), Ok(5));
            assert_eq!(ctl.show(attr).unwrap().as_str(), "1234\n");
        }
    }

    #[test]
    fn test_store_invalid_leaves_value() {
        let ctl = controller();
        assert_eq!(ctl.store_path("conf/poll_ms", "fast"), Err(AttrError::InvalidInput));
        assert_eq!(ctl.config().poll_ms, 1000);
    }

    #[test]
    fn test_store_read_only_and_unknown() {
        let ctl = controller();
        assert_eq!(ctl.store_path("thermal_throttled", "2"), Err(AttrError::ReadOnly));
        assert_eq!(ctl.store_path("version", "2"), Err(AttrError::ReadOnly));
        assert_eq!(ctl.store_path("conf/turbo", "2"), Err(AttrError::UnknownAttribute));
    }

    #[test]
    fn test_store_applies_next_cycle() {
        let ctl = controller();
        ctl.start();

        fire(&ctl, 35);
        assert_eq!(ctl.tier(), Tier::Unthrottled);

        ctl.store_path("conf/allowed_low_high", "30").unwrap();
        ctl.store_path("conf/low_poll_ms", "750").unwrap();
        assert_eq!(fire(&ctl, 35), Some(750));
        assert_eq!(ctl.tier(), Tier::Low);
    }
}
