use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Semantic category of a signal. Each category oscillates at a fixed frequency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveType {
    Context,
    Intent,
    Confidence,
    Temporal,
    Memory,
    Persona,
    Reasoning,
    Visual,
}

impl WaveType {
    pub const ALL: [WaveType; 8] = [
        Self::Context,
        Self::Intent,
        Self::Confidence,
        Self::Temporal,
        Self::Memory,
        Self::Persona,
        Self::Reasoning,
        Self::Visual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Context => "context",
            Self::Intent => "intent",
            Self::Confidence => "confidence",
            Self::Temporal => "temporal",
            Self::Memory => "memory",
            Self::Persona => "persona",
            Self::Reasoning => "reasoning",
            Self::Visual => "visual",
        }
    }

    /// Built-in frequency for this category.
    pub fn default_frequency(&self) -> f64 {
        match self {
            Self::Context => 1.0,
            Self::Intent => 2.0,
            Self::Confidence => 3.0,
            Self::Temporal => 0.5,
            Self::Memory => 0.8,
            Self::Persona => 1.5,
            Self::Reasoning => 2.5,
            Self::Visual => 4.0,
        }
    }
}

impl fmt::Display for WaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownWaveType(pub String);

impl fmt::Display for UnknownWaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown wave type '{}'", self.0)
    }
}

impl std::error::Error for UnknownWaveType {}

impl FromStr for WaveType {
    type Err = UnknownWaveType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| UnknownWaveType(s.to_string()))
    }
}
