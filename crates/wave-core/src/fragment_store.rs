//! Keyed fragment collections per source region.
//!
//! The store owns every fragment: creation, per-region eviction, decay on
//! load, flush. Reconstruction scores all fragments against a target
//! context, checks that the relevant ones hang together well enough, and
//! stitches their contents back into text.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::blob::BlobStore;
use crate::config::{EngineConfig, FrequencyTable, MemoryConfig};
use crate::constants::{
    CONTENT_PREFIX_CHARS, FRAGMENTS_KEY, NAMESPACE_PREFIX, RECONSTRUCTION_IMPORTANCE_FLOOR,
    SOLO_FRAGMENT_COHERENCE, TEMPORAL_WINDOW_HOURS, VIABILITY_SATURATION,
};
use crate::error::Result;
use crate::fragment::Fragment;
use crate::payload::Payload;
use crate::persistence::{decode_fragments, encode_fragments};
use crate::time::now_unix_millis;
use crate::tokenizer::{overlap_ratio, significant_word_set, significant_words};
use crate::wave_type::WaveType;

/// What a caller wants reconstructed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionContext {
    pub content: Payload,
    /// Fragments of this type get a relevance bonus.
    pub wave_type: Option<WaveType>,
}

impl ReconstructionContext {
    pub fn new(content: impl Into<Payload>) -> Self {
        Self {
            content: content.into(),
            wave_type: None,
        }
    }

    pub fn with_type(mut self, wave_type: WaveType) -> Self {
        self.wave_type = Some(wave_type);
        self
    }
}

#[derive(Serialize)]
struct CacheKey<'a> {
    context: &'a ReconstructionContext,
    required_coherence: f64,
    regions: Option<&'a [String]>,
}

pub struct FragmentStore {
    config: MemoryConfig,
    frequencies: FrequencyTable,
    regions: BTreeMap<String, Vec<Fragment>>,
    cache: HashMap<String, Option<String>>,
    blob: Option<Box<dyn BlobStore>>,
}

impl FragmentStore {
    /// Build a store, loading persisted fragments when cross-session memory
    /// is enabled and a blob store is attached.
    pub fn new(config: &EngineConfig, blob: Option<Box<dyn BlobStore>>) -> Result<Self> {
        Self::new_at(config, blob, now_unix_millis())
    }

    pub fn new_at(
        config: &EngineConfig,
        blob: Option<Box<dyn BlobStore>>,
        now_ms: u64,
    ) -> Result<Self> {
        config.validate()?;
        let mut store = Self {
            config: config.memory.clone(),
            frequencies: config.frequencies.clone(),
            regions: BTreeMap::new(),
            cache: HashMap::new(),
            blob,
        };
        if store.config.cross_session {
            store.load_persisted(now_ms);
        }
        Ok(store)
    }

    /// In-memory store with no persistence.
    pub fn in_memory(config: &EngineConfig) -> Result<Self> {
        Self::new(config, None)
    }

    pub fn store_fragment(
        &mut self,
        content: &str,
        source_region: &str,
        wave_type: WaveType,
        importance: f64,
        session_id: &str,
    ) -> Uuid {
        self.store_fragment_at(
            content,
            source_region,
            wave_type,
            importance,
            session_id,
            now_unix_millis(),
        )
    }

    /// Insert a fragment created at `now_ms`, evict past the region cap, and
    /// mirror the result to the blob store.
    pub fn store_fragment_at(
        &mut self,
        content: &str,
        source_region: &str,
        wave_type: WaveType,
        importance: f64,
        session_id: &str,
        now_ms: u64,
    ) -> Uuid {
        let frequency = self.frequencies.frequency(wave_type);
        let fragment = Fragment::new(
            content,
            source_region,
            wave_type,
            frequency,
            importance,
            session_id,
            now_ms,
        );
        let id = fragment.id;

        self.regions
            .entry(source_region.to_string())
            .or_default()
            .push(fragment);
        self.evict(source_region);
        self.cache.clear();
        self.persist();

        id
    }

    /// Keep only the newest `max_fragments_per_region` fragments of `region`.
    fn evict(&mut self, region: &str) {
        let cap = self.config.max_fragments_per_region;
        if let Some(fragments) = self.regions.get_mut(region)
            && fragments.len() > cap
        {
            let excess = fragments.len() - cap;
            fragments.drain(..excess);
            tracing::debug!(region, evicted = excess, "evicted oldest fragments");
        }
    }

    fn persist(&mut self) {
        if !self.config.cross_session {
            return;
        }
        let Some(blob) = self.blob.as_mut() else {
            return;
        };
        let encoded = match encode_fragments(self.regions.values().flatten()) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("failed to encode fragments for persistence: {e}");
                return;
            }
        };
        if let Err(e) = blob.set(FRAGMENTS_KEY, &encoded) {
            tracing::warn!("failed to persist fragments: {e}");
        }
    }

    fn load_persisted(&mut self, now_ms: u64) {
        let Some(blob) = self.blob.as_ref() else {
            return;
        };
        let json = match blob.get(FRAGMENTS_KEY) {
            Ok(Some(json)) => json,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("failed to read persisted fragments: {e}");
                return;
            }
        };
        let outcome = match decode_fragments(&json, now_ms, self.config.persistence_decay) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("ignoring unreadable fragment blob: {e}");
                return;
            }
        };

        let loaded = outcome.fragments.len();
        let mut touched = HashSet::new();
        for fragment in outcome.fragments {
            touched.insert(fragment.source_region.clone());
            self.regions
                .entry(fragment.source_region.clone())
                .or_default()
                .push(fragment);
        }
        for region in touched {
            self.evict(&region);
        }
        self.cache.clear();

        tracing::info!(
            loaded,
            invalid = outcome.skipped_invalid,
            expired = outcome.skipped_expired,
            faded = outcome.skipped_faded,
            "loaded persisted fragments"
        );
    }

    pub fn reconstruct_information(
        &mut self,
        context: &ReconstructionContext,
        required_coherence: f64,
    ) -> Option<String> {
        match self.try_reconstruct_information(context, required_coherence) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("reconstruction failed: {e}");
                None
            }
        }
    }

    /// Reconstruct text for `context` from every stored fragment.
    ///
    /// `Ok(None)` means nothing relevant was found or the relevant fragments
    /// are not coherent enough; that is a normal outcome, not an error.
    pub fn try_reconstruct_information(
        &mut self,
        context: &ReconstructionContext,
        required_coherence: f64,
    ) -> Result<Option<String>> {
        self.reconstruct_cached(context, required_coherence, None, now_unix_millis())
    }

    /// Same as `try_reconstruct_information`, restricted to `regions`.
    pub fn reconstruct_from_regions(
        &mut self,
        context: &ReconstructionContext,
        required_coherence: f64,
        regions: &[String],
    ) -> Result<Option<String>> {
        self.reconstruct_cached(context, required_coherence, Some(regions), now_unix_millis())
    }

    fn reconstruct_cached(
        &mut self,
        context: &ReconstructionContext,
        required_coherence: f64,
        regions: Option<&[String]>,
        now_ms: u64,
    ) -> Result<Option<String>> {
        let key = serde_json::to_string(&CacheKey {
            context,
            required_coherence,
            regions,
        })?;
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.clone());
        }

        let result = self.reconstruct_uncached(context, required_coherence, regions, now_ms);
        self.cache.insert(key, result.clone());
        Ok(result)
    }

    fn reconstruct_uncached(
        &self,
        context: &ReconstructionContext,
        required_coherence: f64,
        regions: Option<&[String]>,
        now_ms: u64,
    ) -> Option<String> {
        let mut context_words = significant_words(&context.content.extract_text());
        context_words.sort();
        context_words.dedup();

        let mut relevant: Vec<(&Fragment, f64)> = self
            .regions
            .iter()
            .filter(|(region, _)| regions.is_none_or(|rs| rs.iter().any(|r| r == *region)))
            .flat_map(|(_, fragments)| fragments.iter())
            .map(|f| (f, relevance(f, &context_words, context.wave_type, now_ms)))
            .filter(|(_, score)| *score > self.config.reconstruction_threshold)
            .collect();

        if relevant.is_empty() {
            return None;
        }
        relevant.sort_by(|a, b| b.1.total_cmp(&a.1));

        let fragments: Vec<&Fragment> = relevant.iter().map(|(f, _)| *f).collect();
        let viability = viability(&fragments);
        if viability < required_coherence {
            tracing::debug!(
                relevant = fragments.len(),
                viability,
                required_coherence,
                "reconstruction not viable"
            );
            return None;
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut included: Vec<&str> = Vec::new();
        for f in &fragments {
            if !seen.insert(f.content.as_str()) {
                continue;
            }
            let prefix = content_prefix(&f.content);
            let weight: f64 = fragments
                .iter()
                .filter(|other| content_prefix(&other.content) == prefix)
                .map(|other| other.importance())
                .sum();
            if weight > RECONSTRUCTION_IMPORTANCE_FLOOR {
                included.push(f.content.as_str());
            }
        }

        let text = included.join("\n\n").trim().to_string();
        if text.is_empty() { None } else { Some(text) }
    }

    pub fn fragments_by_region(&self, region: &str) -> &[Fragment] {
        self.regions.get(region).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fragment_count(&self) -> usize {
        self.regions.values().map(Vec::len).sum()
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn get(&self, id: Uuid) -> Option<&Fragment> {
        self.regions.values().flatten().find(|f| f.id == id)
    }

    /// Drop every fragment, the cache, and this engine's persisted namespace.
    pub fn flush_all_memory(&mut self) {
        let count = self.fragment_count();
        self.regions.clear();
        self.cache.clear();
        if let Some(blob) = self.blob.as_mut() {
            match blob.remove_all_with_prefix(NAMESPACE_PREFIX) {
                Ok(removed) => tracing::debug!(removed, "purged persisted namespace"),
                Err(e) => tracing::warn!("failed to purge persisted fragments: {e}"),
            }
        }
        tracing::info!(count, "flushed fragment memory");
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

/// Relevance of `fragment` to a target context, weighted by importance.
pub fn relevance(
    fragment: &Fragment,
    context_words: &[String],
    context_type: Option<WaveType>,
    now_ms: u64,
) -> f64 {
    let lower = fragment.content.to_lowercase();
    let overlaps = context_words
        .iter()
        .filter(|w| lower.contains(w.as_str()))
        .count();

    let mut score = 0.1 * overlaps as f64;
    if context_type == Some(fragment.wave_type) {
        score += 0.3;
    }
    let temporal_boost = (1.0 - fragment.age_hours(now_ms) / TEMPORAL_WINDOW_HOURS).max(0.0);
    score += temporal_boost * 0.2;

    score * fragment.importance()
}

/// Coherence between two fragments: frequency closeness, phase alignment,
/// and shared vocabulary.
pub fn fragment_coherence(
    a: &Fragment,
    b: &Fragment,
    words_a: &HashSet<String>,
    words_b: &HashSet<String>,
) -> f64 {
    0.3 * (-(a.frequency - b.frequency).abs()).exp()
        + 0.3 * (a.phase - b.phase).cos()
        + 0.4 * overlap_ratio(words_a, words_b)
}

/// How well a set of relevant fragments supports a reconstruction.
pub fn viability(fragments: &[&Fragment]) -> f64 {
    let words: Vec<HashSet<String>> = fragments
        .iter()
        .map(|f| significant_word_set(&f.content))
        .collect();

    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..fragments.len() {
        for j in (i + 1)..fragments.len() {
            total += fragment_coherence(fragments[i], fragments[j], &words[i], &words[j]);
            pairs += 1;
        }
    }
    let mean = if pairs == 0 {
        SOLO_FRAGMENT_COHERENCE
    } else {
        total / pairs as f64
    };

    0.7 * mean + 0.3 * (fragments.len() as f64 / VIABILITY_SATURATION).min(1.0)
}

fn content_prefix(content: &str) -> &str {
    match content.char_indices().nth(CONTENT_PREFIX_CHARS) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}
