//! Bus classification for power flow.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BUS TYPE  │  CODE │  SPECIFIED         │  CALCULATED    │  TYPICAL USE │
//! │────────────│───────│────────────────────│────────────────│──────────────│
//! │  PQ        │   1   │  P, Q              │  |V|, θ        │  Loads       │
//! │  PV        │   2   │  P, |V|            │  Q, θ          │  Generators  │
//! │  SLACK     │   3   │  V, θ              │  P, Q          │  Reference   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The integer codes match the conventional case-file encoding so that
//! classification vectors coming from importers can be converted directly.

use serde::{Deserialize, Serialize};

use crate::error::GatError;

/// Bus type classification for power flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusType {
    /// PQ bus: P and Q are specified, V and θ are calculated
    PQ,
    /// PV bus: P and |V| are specified, Q and θ are calculated
    PV,
    /// Slack bus: V and θ are fixed, P and Q are calculated
    Slack,
}

impl BusType {
    /// Integer code of this bus type (PQ=1, PV=2, Slack=3).
    pub fn code(self) -> i32 {
        match self {
            BusType::PQ => 1,
            BusType::PV => 2,
            BusType::Slack => 3,
        }
    }

    /// Parse a bus type from its integer code.
    pub fn from_code(code: i32) -> Result<Self, GatError> {
        match code {
            1 => Ok(BusType::PQ),
            2 => Ok(BusType::PV),
            3 => Ok(BusType::Slack),
            other => Err(GatError::Validation(format!(
                "unknown bus type code {}; expected 1 (PQ), 2 (PV) or 3 (Slack)",
                other
            ))),
        }
    }

    /// Convert a whole classification vector.
    pub fn from_codes(codes: &[i32]) -> Result<Vec<Self>, GatError> {
        codes.iter().map(|&c| Self::from_code(c)).collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BusType::PQ => "PQ",
            BusType::PV => "PV",
            BusType::Slack => "Slack",
        }
    }
}

impl TryFrom<i32> for BusType {
    type Error = GatError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        BusType::from_code(code)
    }
}

impl std::fmt::Display for BusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for ty in [BusType::PQ, BusType::PV, BusType::Slack] {
            assert_eq!(BusType::from_code(ty.code()).unwrap(), ty);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        let err = BusType::try_from(4).unwrap_err();
        assert!(matches!(err, GatError::Validation(_)));
        assert!(BusType::from_codes(&[3, 1, 0]).is_err());
    }

    #[test]
    fn from_codes_preserves_order() {
        let types = BusType::from_codes(&[3, 1, 2, 1]).unwrap();
        assert_eq!(
            types,
            vec![BusType::Slack, BusType::PQ, BusType::PV, BusType::PQ]
        );
    }
}
