use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::phase::derive_phase;
use crate::tokenizer::coherence_signature;
use crate::wave_type::WaveType;

/// A stored unit of context with signal-like numeric attributes.
///
/// Everything except `amplitude` is fixed at creation. The amplitude is the
/// fragment's importance and only changes when persisted fragments decay on
/// load; `stored_amplitude` keeps the value as first stored, and that is the
/// one written back to the blob store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: Uuid,
    pub content: String,
    pub source_region: String,
    pub wave_type: WaveType,
    pub frequency: f64,
    pub amplitude: f64,
    /// Amplitude before any load-time decay.
    pub stored_amplitude: f64,
    pub phase: f64,
    pub coherence_signature: String,
    /// Creation time, Unix milliseconds.
    pub timestamp: u64,
    pub session_id: String,
}

impl Fragment {
    pub fn new(
        content: &str,
        source_region: &str,
        wave_type: WaveType,
        frequency: f64,
        importance: f64,
        session_id: &str,
        timestamp: u64,
    ) -> Self {
        let amplitude = clamp_unit(importance);
        Self {
            id: Uuid::new_v4(),
            content: content.to_string(),
            source_region: source_region.to_string(),
            wave_type,
            frequency,
            amplitude,
            stored_amplitude: amplitude,
            phase: derive_phase(content, source_region),
            coherence_signature: coherence_signature(content),
            timestamp,
            session_id: session_id.to_string(),
        }
    }

    /// Importance used for relevance weighting. Alias of amplitude.
    pub fn importance(&self) -> f64 {
        self.amplitude
    }

    /// Age in hours relative to `now_ms`. Future timestamps count as fresh.
    pub fn age_hours(&self, now_ms: u64) -> f64 {
        now_ms.saturating_sub(self.timestamp) as f64 / 3_600_000.0
    }
}

/// Clamp to `[0, 1]`; NaN and infinities map to 0.
pub fn clamp_unit(x: f64) -> f64 {
    if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 }
}
