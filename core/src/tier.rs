//! # Throttle Tiers
//!
//! The severity ladder. Tier 0 is unthrottled, tier 3 is maximum throttling.

use core::fmt;

use static_assertions::const_assert_eq;

/// Throttling severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Tier {
    /// No cap imposed
    #[default]
    Unthrottled = 0,
    /// Low band cap
    Low         = 1,
    /// Mid band cap
    Mid         = 2,
    /// Max band cap
    Max         = 3,
}

impl Tier {
    /// Number of tiers
    pub const COUNT: usize = 4;

    /// All tiers, ascending
    pub const ALL: [Tier; Tier::COUNT] = [Tier::Unthrottled, Tier::Low, Tier::Mid, Tier::Max];

    /// Numeric level as reported through `thermal_throttled`
    pub const fn level(self) -> u8 {
        self as u8
    }

    /// Tier for a numeric level
    pub const fn from_level(level: u8) -> Option<Tier> {
        match level {
            0 => Some(Tier::Unthrottled),
            1 => Some(Tier::Low),
            2 => Some(Tier::Mid),
            3 => Some(Tier::Max),
            _ => None,
        }
    }

    /// Is a cap in force?
    pub const fn is_throttled(self) -> bool {
        !matches!(self, Tier::Unthrottled)
    }

    /// Get tier name
    pub const fn name(self) -> &'static str {
        match self {
            Tier::Unthrottled => "none",
            Tier::Low => "low",
            Tier::Mid => "mid",
            Tier::Max => "max",
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> u8 {
        tier.level()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.level(), self.name())
    }
}

const_assert_eq!(Tier::COUNT, 4);
const_assert_eq!(Tier::Max as usize, Tier::COUNT - 1);
