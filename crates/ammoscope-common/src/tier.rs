//! Tier labels derived from a normalised score.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered tier labels, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "S+")]
    SPlus,
    S,
    A,
    B,
    C,
    D,
}

/// Lower bounds (inclusive), evaluated top-down. Anything below the last is `D`.
pub const TIER_THRESHOLDS: [(f64, Tier); 5] = [
    (95.0, Tier::SPlus),
    (85.0, Tier::S),
    (70.0, Tier::A),
    (50.0, Tier::B),
    (30.0, Tier::C),
];

impl Tier {
    /// First threshold the value reaches wins. Values above 100 stay `S+`.
    pub fn from_normalized(normalized: f64) -> Self {
        TIER_THRESHOLDS
            .iter()
            .find(|(floor, _)| normalized >= *floor)
            .map(|(_, tier)| *tier)
            .unwrap_or(Tier::D)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::SPlus => "S+",
            Tier::S     => "S",
            Tier::A     => "A",
            Tier::B     => "B",
            Tier::C     => "C",
            Tier::D     => "D",
        }
    }

    /// Parse the stored label.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "S+" => Some(Tier::SPlus),
            "S"  => Some(Tier::S),
            "A"  => Some(Tier::A),
            "B"  => Some(Tier::B),
            "C"  => Some(Tier::C),
            "D"  => Some(Tier::D),
            _    => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
