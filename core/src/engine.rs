//! # Sampling & Decision Engine
//!
//! One cycle turns a sensor reading into a tier and a uniform frequency cap.
//!
//! ## Hysteresis Chain
//!
//! Rules are tried in order against the tier held at the start of the cycle;
//! the first match wins and no match leaves everything unchanged.
//!
//! | # | Rule | Condition | Tier | Cap |
//! |---|------|-----------|------|-----|
//! | 1 | [`Rule::TripLow`]  | `low.trip <= t < mid.trip`, tier 0 | 1 | `low.freq` |
//! | 2 | [`Rule::ClearLow`] | `t < low.clear`, tier > 0 | 0 | baseline |
//! | 3 | [`Rule::TripMid`]  | `mid.trip <= t < max.trip`, tier < 2 | 2 | `mid.freq` |
//! | 4 | [`Rule::ClearMid`] | `t < mid.clear`, tier > 1 | 1 | `low.freq` |
//! | 5 | [`Rule::TripMax`]  | `t >= max.trip` | 3 | `max.freq` |
//! | 6 | [`Rule::ClearMax`] | `t < max.clear`, tier > 2 | 2 | `mid.freq` |
//!
//! Rule 2 returns to tier 0 from any throttled tier, not one step down.
//!
//! At or above `shutdown_temp` the chain is bypassed: tier 3, `max.freq`,
//! and a single power-off request for the lifetime of the controller.

use bitflags::bitflags;
use thermcap_hal::{
    CpuFreq, Frequency, PowerControl, PowerOffMode, SensorError, ShutdownFailure, Temperature,
};

use crate::actuator::{self, ApplyReport};
use crate::config::ThermalConfig;
use crate::state::{SharedState, ThrottleState};
use crate::tier::Tier;

// =============================================================================
// Decisions
// =============================================================================

/// Cap requested for every core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreqCap {
    /// Fixed cap
    Limit(Frequency),
    /// Each core's hardware maximum
    Unrestricted,
}

/// Rule that produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Entered the low band from tier 0
    TripLow,
    /// Fell below the low clear threshold
    ClearLow,
    /// Entered the mid band from tier 0 or 1
    TripMid,
    /// Fell below the mid clear threshold
    ClearMid,
    /// At or above the max trip threshold
    TripMax,
    /// Fell below the max clear threshold
    ClearMax,
    /// At or above the shutdown threshold
    Emergency,
}

impl Rule {
    /// Position in the chain, 0 for the emergency override
    pub const fn number(&self) -> u8 {
        match self {
            Rule::Emergency => 0,
            Rule::TripLow => 1,
            Rule::ClearLow => 2,
            Rule::TripMid => 3,
            Rule::ClearMid => 4,
            Rule::TripMax => 5,
            Rule::ClearMax => 6,
        }
    }
}

/// Outcome of the rule chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Matching rule
    pub rule: Rule,
    /// Tier after the cycle
    pub tier: Tier,
    /// Cap for every core
    pub cap: FreqCap,
}

impl Decision {
    const fn new(rule: Rule, tier: Tier, cap: FreqCap) -> Self {
        Self { rule, tier, cap }
    }
}

/// Run the hysteresis chain
pub fn evaluate(
    config: &ThermalConfig,
    tier: Tier,
    temp: Temperature,
    baseline: Option<Frequency>,
) -> Option<Decision> {
    let (low, mid, max) = (&config.low, &config.mid, &config.max);

    let decision = if temp.within(low.trip, mid.trip) && tier == Tier::Unthrottled {
        Decision::new(Rule::TripLow, Tier::Low, FreqCap::Limit(low.cap()))
    } else if temp.below(low.clear) && tier > Tier::Unthrottled {
        let cap = baseline
            .filter(|f| !f.is_zero())
            .map_or(FreqCap::Unrestricted, FreqCap::Limit);
        Decision::new(Rule::ClearLow, Tier::Unthrottled, cap)
    } else if temp.within(mid.trip, max.trip) && tier < Tier::Mid {
        Decision::new(Rule::TripMid, Tier::Mid, FreqCap::Limit(mid.cap()))
    } else if temp.below(mid.clear) && tier > Tier::Low {
        Decision::new(Rule::ClearMid, Tier::Low, FreqCap::Limit(low.cap()))
    } else if temp.at_least(max.trip) {
        Decision::new(Rule::TripMax, Tier::Max, FreqCap::Limit(max.cap()))
    } else if temp.below(max.clear) && tier > Tier::Mid {
        Decision::new(Rule::ClearMax, Tier::Mid, FreqCap::Limit(mid.cap()))
    } else {
        return None;
    };

    Some(decision)
}

/// Emergency override, then the hysteresis chain
pub fn decide(
    config: &ThermalConfig,
    tier: Tier,
    temp: Temperature,
    baseline: Option<Frequency>,
) -> Option<Decision> {
    if temp.at_least(config.shutdown_temp) {
        return Some(Decision::new(
            Rule::Emergency,
            Tier::Max,
            FreqCap::Limit(config.max.cap()),
        ));
    }
    evaluate(config, tier, temp, baseline)
}

// =============================================================================
// Cycle
// =============================================================================

bitflags! {
    /// What happened during a cycle
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CycleFlags: u32 {
        /// Sensor read failed, nothing else was done
        const SENSOR_FAULT       = 1 << 0;
        /// Reading at or above the shutdown threshold
        const OVER_SHUTDOWN_TEMP = 1 << 1;
        /// Tier differs from the start of the cycle
        const TIER_CHANGED       = 1 << 2;
        /// At least one core took a cap
        const CAP_APPLIED        = 1 << 3;
        /// This cycle issued the power-off request
        const SHUTDOWN_REQUESTED = 1 << 4;
        /// At least one core rejected its cap
        const ACTUATOR_FAULT     = 1 << 5;
        /// At least one core had no policy
        const CORE_SKIPPED       = 1 << 6;
    }
}

/// Everything a cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Sensor result
    pub reading: Result<Temperature, SensorError>,
    /// Tier at cycle start
    pub start_tier: Tier,
    /// Tier at cycle end
    pub tier: Tier,
    /// Decision, if a rule matched
    pub decision: Option<Decision>,
    /// Per-core sweep
    pub report: ApplyReport,
    /// Power-off result, if this cycle issued one
    pub shutdown: Option<Result<PowerOffMode, ShutdownFailure>>,
    /// Summary
    pub flags: CycleFlags,
}

impl CycleOutcome {
    fn sensor_fault(tier: Tier, err: SensorError) -> Self {
        Self {
            reading: Err(err),
            start_tier: tier,
            tier,
            decision: None,
            report: ApplyReport::default(),
            shutdown: None,
            flags: CycleFlags::SENSOR_FAULT,
        }
    }

    /// Frequency cap requested this cycle
    pub fn cap(&self) -> Option<FreqCap> {
        self.decision.map(|d| d.cap)
    }
}

/// Run one cycle against locked state
///
/// The decision is computed once from the tier at cycle start and applied
/// to every core; the new tier is committed after the sweep.
pub fn run_cycle<F: CpuFreq, P: PowerControl>(
    config: &ThermalConfig,
    state: &mut ThrottleState,
    shared: &SharedState,
    reading: Result<Temperature, SensorError>,
    cpus: &F,
    power: &P,
) -> CycleOutcome {
    let start_tier = state.tier;

    let temp = match reading {
        Ok(temp) => temp,
        Err(err) => {
            log::warn!("thermcap: failed to read sensor {}: {}", config.sensor_id, err);
            return CycleOutcome::sensor_fault(start_tier, err);
        },
    };

    let mut flags = CycleFlags::empty();
    let mut shutdown = None;

    if temp.at_least(config.shutdown_temp) {
        flags |= CycleFlags::OVER_SHUTDOWN_TEMP;
        if shared.begin_shutdown() {
            log::warn!(
                "thermcap: {} at or above shutdown threshold {}C",
                temp,
                config.shutdown_temp
            );
            flags |= CycleFlags::SHUTDOWN_REQUESTED;
            shutdown = Some(actuator::emergency_power_off(power));
        }
    }

    let decision = decide(config, start_tier, temp, state.baseline);
    let report = actuator::apply(cpus, decision.map(|d| d.cap), !start_tier.is_throttled());

    // cpufreq reports 0 for "unset"
    if let Some(baseline) = report.baseline {
        state.baseline = (!baseline.is_zero()).then_some(baseline);
    }
    if let Some(d) = decision {
        state.tier = d.tier;
    }

    if state.tier != start_tier {
        flags |= CycleFlags::TIER_CHANGED;
        log::info!(
            "thermcap: {} -> tier {} (rule {}, {})",
            temp,
            state.tier,
            decision.map_or(0, |d| d.rule.number()),
            start_tier
        );
    }
    flags.set(CycleFlags::CAP_APPLIED, report.applied > 0);
    flags.set(CycleFlags::ACTUATOR_FAULT, !report.is_clean());
    flags.set(CycleFlags::CORE_SKIPPED, report.skipped > 0);

    CycleOutcome {
        reading: Ok(temp),
        start_tier,
        tier: state.tier,
        decision,
        report,
        shutdown,
        flags,
    }
}

// =============================================================================
// TESTS
// =============================================================================
