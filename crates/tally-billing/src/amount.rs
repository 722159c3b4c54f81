//! Fixed-point currency amounts.

use serde::{Deserialize, Serialize};

/// Micro-units in one currency unit.
pub const MICROS_PER_UNIT: u64 = 1_000_000;

/// A non-negative amount in micro-units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    pub const fn micros(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{:06}",
            self.0 / MICROS_PER_UNIT,
            self.0 % MICROS_PER_UNIT
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_has_six_decimal_places() {
        assert_eq!(Amount::from_micros(220_000).to_string(), "0.220000");
        assert_eq!(Amount::from_micros(12_000_001).to_string(), "12.000001");
        assert_eq!(Amount::ZERO.to_string(), "0.000000");
    }

    #[test]
    fn checked_add_detects_overflow() {
        let a = Amount::from_micros(5);
        assert_eq!(a.checked_add(a), Some(Amount::from_micros(10)));
        assert_eq!(Amount::from_micros(u64::MAX).checked_add(a), None);
    }

    #[test]
    fn serializes_as_micros() {
        let json = serde_json::to_string(&Amount::from_micros(165_000)).unwrap();
        assert_eq!(json, "165000");
    }
}
