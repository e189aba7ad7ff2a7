//! claim.rs
//!
//! The value an agent claims to be the network value, as stored in the vault.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Vault text reserved for "no value yet". Never a numeral.
pub const ABSENT_MARKER: &str = "absent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Claim {
    Value(i64),
    Absent,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid claim encoding: {0:?}")]
pub struct ClaimParseError(pub String);

impl Claim {
    /// Returns the claimed integer, if any.
    pub fn value(&self) -> Option<i64> {
        match self {
            Claim::Value(v) => Some(*v),
            Claim::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Claim::Absent)
    }

    /// Encodes the claim in the vault record format.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl From<i64> for Claim {
    fn from(v: i64) -> Self {
        Claim::Value(v)
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Claim::Value(v) => write!(f, "{v}"),
            Claim::Absent => f.write_str(ABSENT_MARKER),
        }
    }
}

impl FromStr for Claim {
    type Err = ClaimParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ABSENT_MARKER {
            return Ok(Claim::Absent);
        }
        s.parse::<i64>()
            .map(Claim::Value)
            .map_err(|_| ClaimParseError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_text_is_a_value() {
        assert_eq!("10".parse::<Claim>(), Ok(Claim::Value(10)));
        assert_eq!("-3".parse::<Claim>(), Ok(Claim::Value(-3)));
        assert_eq!(Claim::Value(42).encode(), "42");
    }

    #[test]
    fn test_absent_marker_is_distinct_from_zero() {
        let zero: Claim = "0".parse().unwrap();
        let absent: Claim = ABSENT_MARKER.parse().unwrap();

        assert_eq!(zero, Claim::Value(0));
        assert!(absent.is_absent());
        assert_ne!(zero, absent);
        assert_eq!(absent.value(), None);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!("ten".parse::<Claim>().is_err());
        assert!("".parse::<Claim>().is_err());
        assert!(" 7".parse::<Claim>().is_err());
    }
}
