//! Engine configuration.
//!
//! Every section has serde defaults so a partial TOML file (or none at all)
//! yields a usable config. `validate` is the only place configuration can
//! fail, and it runs before any engine component is built.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::wave_type::{UnknownWaveType, WaveType};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub frequencies: FrequencyTable,
    pub interference: InterferenceConfig,
    pub memory: MemoryConfig,
    pub degradation: DegradationConfig,
}

/// Per-wave-type frequency overrides keyed by lowercase wave type name.
/// Missing entries fall back to the built-in table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrequencyTable(pub BTreeMap<String, f64>);

impl FrequencyTable {
    pub fn set(&mut self, wave_type: WaveType, frequency: f64) {
        self.0.insert(wave_type.as_str().to_string(), frequency);
    }

    pub fn frequency(&self, wave_type: WaveType) -> f64 {
        self.0
            .get(wave_type.as_str())
            .copied()
            .unwrap_or_else(|| wave_type.default_frequency())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterferenceConfig {
    /// Pairs at or below this coherence are discarded.
    pub constructive_threshold: f64,
    /// Patterns above this coherence (with content) become emergent behavior.
    pub emergent_threshold: f64,
    /// Time constant of signal amplitude decay, in milliseconds.
    pub decay_constant: f64,
    /// Upper bound on simultaneously active signals.
    pub max_active_signals: usize,
    /// Cached patterns older than this are garbage-collected after a decay tick.
    pub pattern_max_age_ms: u64,
}

impl Default for InterferenceConfig {
    fn default() -> Self {
        Self {
            constructive_threshold: 0.6,
            emergent_threshold: 0.75,
            decay_constant: 10_000.0,
            max_active_signals: 64,
            pattern_max_age_ms: 5 * 60 * 1000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub max_fragments_per_region: usize,
    /// Relevance a fragment needs before it takes part in reconstruction.
    pub reconstruction_threshold: f64,
    /// Fade persisted amplitudes by age when loading them back.
    pub persistence_decay: bool,
    /// Mirror fragments into the blob store and reload them on startup.
    pub cross_session: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_fragments_per_region: 100,
            reconstruction_threshold: 0.2,
            persistence_decay: true,
            cross_session: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DegradationConfig {
    pub enabled: bool,
    /// Whole-store attempts before giving up with an error. Only an `Err`
    /// from reconstruction is retried; with no blob I/O on that path the
    /// only error source is cache-key encoding, so in practice one attempt
    /// decides. An empty result is not retried and goes straight to
    /// `fallback_regions`.
    pub retry_attempts: u32,
    /// Coherence floor used for fallback reconstruction. Looser than normal.
    pub min_coherence: f64,
    /// Regions tried one at a time when a whole-store reconstruction finds nothing.
    pub fallback_regions: Vec<String>,
}

impl Default for DegradationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retry_attempts: 3,
            min_coherence: 0.3,
            fallback_regions: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, freq) in &self.frequencies.0 {
            let wave_type: WaveType = name
                .parse()
                .map_err(|e: UnknownWaveType| invalid(format!("frequencies: {e}")))?;
            if wave_type.as_str() != name {
                return Err(invalid(format!(
                    "frequencies: key '{name}' must be written as '{wave_type}'"
                )));
            }
            if !freq.is_finite() || *freq <= 0.0 {
                return Err(invalid(format!(
                    "frequency for {wave_type} must be positive, got {freq}"
                )));
            }
        }

        let i = &self.interference;
        unit_interval("interference.constructive_threshold", i.constructive_threshold)?;
        unit_interval("interference.emergent_threshold", i.emergent_threshold)?;
        if i.emergent_threshold < i.constructive_threshold {
            return Err(invalid(format!(
                "interference.emergent_threshold ({}) is below constructive_threshold ({})",
                i.emergent_threshold, i.constructive_threshold
            )));
        }
        if !i.decay_constant.is_finite() || i.decay_constant <= 0.0 {
            return Err(invalid(format!(
                "interference.decay_constant must be positive, got {}",
                i.decay_constant
            )));
        }
        if i.max_active_signals == 0 {
            return Err(invalid("interference.max_active_signals must be at least 1"));
        }

        let m = &self.memory;
        if m.max_fragments_per_region == 0 {
            return Err(invalid("memory.max_fragments_per_region must be at least 1"));
        }
        unit_interval("memory.reconstruction_threshold", m.reconstruction_threshold)?;

        let d = &self.degradation;
        if d.retry_attempts == 0 {
            return Err(invalid("degradation.retry_attempts must be at least 1"));
        }
        unit_interval("degradation.min_coherence", d.min_coherence)?;

        Ok(())
    }
}

fn unit_interval(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(format!("{name} must be within [0, 1], got {value}")));
    }
    Ok(())
}

fn invalid(msg: impl Into<String>) -> EngineError {
    EngineError::InvalidConfig(msg.into())
}
