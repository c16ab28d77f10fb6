//! # Core HAL Types
//!
//! Scalar newtypes shared by every capability: temperatures, frequencies,
//! CPU and sensor identifiers.

use core::fmt;

use static_assertions::const_assert_eq;

// =============================================================================
// Temperature
// =============================================================================

/// Temperature in whole degrees Celsius
///
/// Sensors may report sub-zero values, thresholds are unsigned, so the
/// comparison helpers widen both sides before comparing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Temperature(pub i32);

impl Temperature {
    /// Create from degrees Celsius
    pub const fn from_celsius(c: i32) -> Self {
        Self(c)
    }

    /// Create from millidegrees Celsius (TSENS native unit)
    pub const fn from_millidegrees(md: i32) -> Self {
        Self(md / 1000)
    }

    /// Get as degrees Celsius
    pub const fn celsius(&self) -> i32 {
        self.0
    }

    /// `self >= threshold`
    #[inline]
    pub const fn at_least(&self, threshold: u32) -> bool {
        self.0 as i64 >= threshold as i64
    }

    /// `self < threshold`
    #[inline]
    pub const fn below(&self, threshold: u32) -> bool {
        (self.0 as i64) < threshold as i64
    }

    /// `low <= self < high`
    #[inline]
    pub const fn within(&self, low: u32, high: u32) -> bool {
        self.at_least(low) && self.below(high)
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}C", self.0)
    }
}

// =============================================================================
// Frequency
// =============================================================================

/// CPU frequency in kHz (cpufreq native unit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Frequency(pub u32);

impl Frequency {
    /// Zero frequency, used by cpufreq for "unset"
    pub const ZERO: Self = Self(0);

    /// Create from kHz
    pub const fn from_khz(khz: u32) -> Self {
        Self(khz)
    }

    /// Create from MHz
    pub const fn from_mhz(mhz: u32) -> Self {
        Self(mhz.saturating_mul(1000))
    }

    /// Get as kHz
    pub const fn khz(&self) -> u32 {
        self.0
    }

    /// Check for the unset value
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Clamp into `[min, max]`
    #[inline]
    pub fn clamp_to(self, min: Frequency, max: Frequency) -> Self {
        if self < min {
            min
        } else if self > max {
            max
        } else {
            self
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kHz", self.0)
    }
}

// =============================================================================
// Identifiers
// =============================================================================

/// Logical CPU index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct CpuId(pub u32);

impl CpuId {
    /// The boot CPU, never hot-unplugged
    pub const BOOT: Self = Self(0);

    /// Create new CPU ID
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get raw index
    pub const fn index(&self) -> u32 {
        self.0
    }

    /// Is this the boot CPU?
    pub const fn is_boot(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu{}", self.0)
    }
}

/// Temperature sensor handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SensorId(pub u32);

impl SensorId {
    /// Create new sensor ID
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get raw value
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tsens{}", self.0)
    }
}

// Frequencies cross into cpufreq as raw 32-bit kHz values.
const_assert_eq!(core::mem::size_of::<Frequency>(), 4);
const_assert_eq!(core::mem::size_of::<CpuId>(), 4);

// =============================================================================
// TESTS
// =============================================================================
