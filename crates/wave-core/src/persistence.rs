//! JSON layout for fragments mirrored into a blob store.
//!
//! One blob holds an object mapping fragment id to a record with camelCase
//! field names and an ISO-8601 timestamp. Decoding is per record: a record
//! that cannot be read is logged and skipped, never fatal for the rest.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{PERSISTENCE_MAX_AGE_MS, SIGNAL_FLOOR};
use crate::error::Result;
use crate::fragment::Fragment;
use crate::time::{millis_to_iso8601, parse_iso8601};
use crate::wave_type::WaveType;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FragmentRecord {
    pub id: String,
    pub content: String,
    pub source_region: String,
    pub wave_type: WaveType,
    pub frequency: f64,
    pub amplitude: f64,
    pub phase: f64,
    pub coherence_signature: String,
    pub timestamp: String,
    pub session_id: String,
}

impl From<&Fragment> for FragmentRecord {
    fn from(f: &Fragment) -> Self {
        Self {
            id: f.id.to_string(),
            content: f.content.clone(),
            source_region: f.source_region.clone(),
            wave_type: f.wave_type,
            frequency: f.frequency,
            amplitude: f.stored_amplitude,
            phase: f.phase,
            coherence_signature: f.coherence_signature.clone(),
            timestamp: millis_to_iso8601(f.timestamp),
            session_id: f.session_id.clone(),
        }
    }
}

/// Fragments recovered from a blob plus how many records were left behind.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub fragments: Vec<Fragment>,
    pub skipped_invalid: usize,
    pub skipped_expired: usize,
    pub skipped_faded: usize,
}

pub fn encode_fragments<'a>(fragments: impl IntoIterator<Item = &'a Fragment>) -> Result<String> {
    let map: BTreeMap<String, FragmentRecord> = fragments
        .into_iter()
        .map(|f| (f.id.to_string(), FragmentRecord::from(f)))
        .collect();
    Ok(serde_json::to_string(&map)?)
}

/// Decode a persisted blob as of `now_ms`.
///
/// Records older than seven days are dropped. With `decay` set, survivors
/// fade by `exp(-age / 7d)` and are dropped at or below the signal floor.
/// The persisted amplitude is kept as `stored_amplitude`, so decay is always
/// a function of age and never compounds across reloads. The result is
/// sorted oldest first.
pub fn decode_fragments(json: &str, now_ms: u64, decay: bool) -> Result<LoadOutcome> {
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
    let mut outcome = LoadOutcome::default();

    for (key, value) in raw {
        let record: FragmentRecord = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("skipping persisted fragment {key}: {e}");
                outcome.skipped_invalid += 1;
                continue;
            }
        };
        let Some(timestamp) = parse_iso8601(&record.timestamp) else {
            tracing::warn!(
                "skipping persisted fragment {key}: bad timestamp '{}'",
                record.timestamp
            );
            outcome.skipped_invalid += 1;
            continue;
        };
        let Ok(id) = Uuid::parse_str(&record.id) else {
            tracing::warn!("skipping persisted fragment {key}: bad id '{}'", record.id);
            outcome.skipped_invalid += 1;
            continue;
        };

        let age = now_ms.saturating_sub(timestamp);
        if age > PERSISTENCE_MAX_AGE_MS {
            outcome.skipped_expired += 1;
            continue;
        }

        let mut amplitude = record.amplitude;
        if decay {
            amplitude *= (-(age as f64) / PERSISTENCE_MAX_AGE_MS as f64).exp();
            if amplitude.is_nan() || amplitude <= SIGNAL_FLOOR {
                outcome.skipped_faded += 1;
                continue;
            }
        }

        outcome.fragments.push(Fragment {
            id,
            content: record.content,
            source_region: record.source_region,
            wave_type: record.wave_type,
            frequency: record.frequency,
            amplitude,
            stored_amplitude: record.amplitude,
            phase: record.phase,
            coherence_signature: record.coherence_signature,
            timestamp,
            session_id: record.session_id,
        });
    }

    outcome.fragments.sort_by_key(|f| f.timestamp);
    Ok(outcome)
}
