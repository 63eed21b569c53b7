use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fragment::clamp_unit;
use crate::payload::Payload;
use crate::phase::derive_phase;
use crate::wave_type::WaveType;

/// Where a signal is headed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Targets {
    #[default]
    All,
    Regions(Vec<String>),
}

impl Targets {
    /// `None` or an empty list both mean every region.
    pub fn from_list(regions: Option<Vec<String>>) -> Self {
        match regions {
            Some(list) if !list.is_empty() => Self::Regions(list),
            _ => Self::All,
        }
    }
}

/// A transient propagation event. Never persisted.
///
/// Lifecycle: created by the orchestrator, active while its amplitude stays
/// at or above the signal floor, removed for good once it drops below.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: Uuid,
    pub source_region: String,
    pub target_regions: Targets,
    pub wave_type: WaveType,
    pub frequency: f64,
    pub phase: f64,
    pub amplitude: f64,
    pub content: Payload,
    /// Fragments created as a side effect of propagating this signal.
    pub fragment_ids: Vec<Uuid>,
    pub timestamp: u64,
}

impl Signal {
    pub fn new(
        source_region: &str,
        content: Payload,
        wave_type: WaveType,
        frequency: f64,
        amplitude: f64,
        target_regions: Targets,
        timestamp: u64,
    ) -> Self {
        let phase = derive_phase(&content.extract_text(), source_region);
        Self {
            id: Uuid::new_v4(),
            source_region: source_region.to_string(),
            target_regions,
            wave_type,
            frequency,
            phase,
            amplitude: clamp_unit(amplitude),
            content,
            fragment_ids: Vec::new(),
            timestamp,
        }
    }

    /// Exponential decay over `delta_time` with time constant `decay_constant`.
    pub fn decay(&mut self, delta_time: f64, decay_constant: f64) {
        self.amplitude *= (-delta_time / decay_constant).exp();
    }
}
