use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Millibuckets in one ingot.
pub const FINE_PER_COARSE: f64 = 100.0;

/// The two interchangeable quantity units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantityUnit {
    /// Fine unit.
    #[serde(rename = "mB")]
    Millibucket,
    /// Coarse unit, 100 mB.
    #[serde(rename = "Ingots")]
    Ingot,
}

impl QuantityUnit {
    pub fn label(self) -> &'static str {
        match self {
            QuantityUnit::Millibucket => "mB",
            QuantityUnit::Ingot => "Ingots",
        }
    }

    pub fn to_fine(self, amount: f64) -> f64 {
        match self {
            QuantityUnit::Millibucket => amount,
            QuantityUnit::Ingot => amount * FINE_PER_COARSE,
        }
    }
}

impl fmt::Display for QuantityUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownUnit(pub String);

impl fmt::Display for UnknownUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown quantity unit '{}' (expected mB or Ingots)", self.0)
    }
}

impl std::error::Error for UnknownUnit {}

impl FromStr for QuantityUnit {
    type Err = UnknownUnit;

    /// Only the exact labels `mB` and `Ingots` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mB" => Ok(QuantityUnit::Millibucket),
            "Ingots" => Ok(QuantityUnit::Ingot),
            other => Err(UnknownUnit(other.to_string())),
        }
    }
}
