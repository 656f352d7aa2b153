use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A PDG Monte Carlo particle code.
///
/// Classification follows the standard numbering scheme `±nq1 nq2 nq3 nJ`
/// (the last four decimal digits). Nuclear codes are not supported.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PdgCode(pub i32);

impl PdgCode {
    pub const PROTON: PdgCode = PdgCode(2212);
    pub const NEUTRON: PdgCode = PdgCode(2112);
    pub const PI_PLUS: PdgCode = PdgCode(211);
    pub const PI_ZERO: PdgCode = PdgCode(111);
    pub const PI_MINUS: PdgCode = PdgCode(-211);

    #[inline]
    pub fn code(self) -> i32 {
        self.0
    }

    #[inline]
    fn digit(self, position: u32) -> u32 {
        (self.0.unsigned_abs() / 10u32.pow(position)) % 10
    }

    pub fn is_antiparticle(self) -> bool {
        self.0 < 0
    }

    pub fn antiparticle(self) -> PdgCode {
        PdgCode(-self.0)
    }

    pub fn is_lepton(self) -> bool {
        (11..=18).contains(&self.0.unsigned_abs())
    }

    pub fn is_baryon(self) -> bool {
        self.0.unsigned_abs() < 1_000_000 && self.digit(3) != 0 && self.digit(2) != 0 && self.digit(1) != 0
    }

    pub fn is_meson(self) -> bool {
        self.0.unsigned_abs() < 1_000_000 && self.digit(3) == 0 && self.digit(2) != 0 && self.digit(1) != 0
    }

    pub fn is_hadron(self) -> bool {
        self.is_baryon() || self.is_meson()
    }

    pub fn is_pion(self) -> bool {
        matches!(self.0, 111 | 211 | -211)
    }

    /// +1 for baryons, -1 for antibaryons, 0 otherwise.
    pub fn baryon_number(self) -> i32 {
        if !self.is_baryon() {
            0
        } else if self.is_antiparticle() {
            -1
        } else {
            1
        }
    }

    /// Spin degeneracy 2J+1.
    pub fn spin_degeneracy(self) -> u32 {
        match self.0.unsigned_abs() {
            11 | 13 | 15 | 17 => 2,
            12 | 14 | 16 | 18 => 1,
            _ if self.is_hadron() => self.digit(0).max(1),
            _ => 1,
        }
    }
}

impl fmt::Display for PdgCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "-0x{:x}", self.0.unsigned_abs())
        } else {
            write!(f, "0x{:x}", self.0)
        }
    }
}

impl FromStr for PdgCode {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i32>().map(PdgCode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_species() {
        assert!(PdgCode::PROTON.is_baryon());
        assert!(PdgCode(-2212).is_baryon());
        assert_eq!(PdgCode(-2212).baryon_number(), -1);
        assert!(PdgCode::PI_PLUS.is_meson());
        assert!(PdgCode::PI_ZERO.is_pion());
        assert!(PdgCode(1114).is_baryon());
        assert!(PdgCode(11).is_lepton());
        assert!(!PdgCode(11).is_hadron());
        assert!(!PdgCode(22).is_hadron());
    }

    #[test]
    fn spin_degeneracy_from_last_digit() {
        assert_eq!(PdgCode::PROTON.spin_degeneracy(), 2);
        assert_eq!(PdgCode::PI_MINUS.spin_degeneracy(), 1);
        assert_eq!(PdgCode(2224).spin_degeneracy(), 4);
        assert_eq!(PdgCode(213).spin_degeneracy(), 3);
        assert_eq!(PdgCode(-11).spin_degeneracy(), 2);
    }

    #[test]
    fn parses_decimal_codes() {
        assert_eq!("-211".parse::<PdgCode>().unwrap(), PdgCode::PI_MINUS);
        assert!("pion".parse::<PdgCode>().is_err());
    }
}
