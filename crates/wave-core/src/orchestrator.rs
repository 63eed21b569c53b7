//! Composition root: signals in, fragments and insights out.
//!
//! The orchestrator owns the active signal set. Each propagation stores a
//! linked fragment, rescores the whole active set, and files every emergent
//! insight back into memory under the interference region. Decay ticks fade
//! signals out; graceful degradation turns stored fragments into a fallback
//! answer when the caller's main path has failed.

use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::blob::BlobStore;
use crate::config::EngineConfig;
use crate::constants::{INTERFERENCE_REGION, SIGNAL_FLOOR};
use crate::error::{EngineError, Result};
use crate::fragment_store::{FragmentStore, ReconstructionContext};
use crate::interference::{InterferenceEngine, InterferenceReport};
use crate::payload::Payload;
use crate::signal::{Signal, Targets};
use crate::time::now_unix_millis;
use crate::wave_type::WaveType;

/// Point-in-time view of the engine, recomputed on every request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SystemState {
    pub active_signals: usize,
    pub total_fragments: usize,
    pub system_coherence: f64,
    pub emergent_behaviors: usize,
    pub active_patterns: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationMethod {
    HolographicReconstruction,
    EmergencyFallback,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DegradationResult {
    pub success: bool,
    pub method: DegradationMethod,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconstructed: Option<String>,
}

impl DegradationResult {
    fn reconstructed(text: String) -> Self {
        Self {
            success: true,
            method: DegradationMethod::HolographicReconstruction,
            confidence: 0.6,
            reconstructed: Some(text),
        }
    }

    fn emergency() -> Self {
        Self {
            success: true,
            method: DegradationMethod::EmergencyFallback,
            confidence: 0.3,
            reconstructed: None,
        }
    }

    fn failed() -> Self {
        Self {
            success: false,
            method: DegradationMethod::Failed,
            confidence: 0.0,
            reconstructed: None,
        }
    }
}

pub struct WaveOrchestrator {
    config: EngineConfig,
    store: FragmentStore,
    engine: InterferenceEngine,
    active: Vec<Signal>,
    session_id: String,
}

impl WaveOrchestrator {
    /// Validate `config` and build the engine. Configuration faults are the
    /// only way this fails.
    pub fn new(config: EngineConfig, blob: Option<Box<dyn BlobStore>>) -> Result<Self> {
        let store = FragmentStore::new(&config, blob)?;
        let engine = InterferenceEngine::new(&config.interference);
        let session_id = Uuid::new_v4().to_string();
        tracing::debug!(session = %session_id, "wave orchestrator ready");
        Ok(Self {
            config,
            store,
            engine,
            active: Vec::new(),
            session_id,
        })
    }

    pub fn in_memory(config: EngineConfig) -> Result<Self> {
        Self::new(config, None)
    }

    pub fn propagate_wave(
        &mut self,
        source_region: &str,
        content: impl Into<Payload>,
        wave_type: WaveType,
        amplitude: f64,
        target_regions: Option<Vec<String>>,
    ) -> Uuid {
        self.propagate_wave_at(
            source_region,
            content.into(),
            wave_type,
            amplitude,
            target_regions,
            now_unix_millis(),
        )
    }

    pub fn propagate_wave_at(
        &mut self,
        source_region: &str,
        content: Payload,
        wave_type: WaveType,
        amplitude: f64,
        target_regions: Option<Vec<String>>,
        now_ms: u64,
    ) -> Uuid {
        let frequency = self.config.frequencies.frequency(wave_type);
        let mut signal = Signal::new(
            source_region,
            content,
            wave_type,
            frequency,
            amplitude,
            Targets::from_list(target_regions),
            now_ms,
        );
        let text = signal.content.extract_text();
        let fragment_id = self.store.store_fragment_at(
            &text,
            source_region,
            wave_type,
            signal.amplitude,
            &self.session_id,
            now_ms,
        );
        signal.fragment_ids.push(fragment_id);

        let signal_id = signal.id;
        self.active.push(signal);
        self.enforce_signal_cap();

        let report = self.engine.process_wave_interference_at(&self.active, now_ms);
        let mut insight_ids = Vec::with_capacity(report.emergent_behaviors.len());
        for behavior in &report.emergent_behaviors {
            insight_ids.push(self.store.store_fragment_at(
                &behavior.insight,
                INTERFERENCE_REGION,
                WaveType::Memory,
                behavior.confidence,
                &self.session_id,
                now_ms,
            ));
        }
        if let Some(signal) = self.active.iter_mut().find(|s| s.id == signal_id) {
            signal.fragment_ids.extend(insight_ids);
        }

        tracing::debug!(
            signal = %signal_id,
            region = source_region,
            wave_type = %wave_type,
            active = self.active.len(),
            emergent = report.emergent_behaviors.len(),
            "propagated wave"
        );
        signal_id
    }

    /// Drop the weakest signal (oldest on ties) until the active set fits.
    /// The newest signal is never the one dropped.
    fn enforce_signal_cap(&mut self) {
        let cap = self.config.interference.max_active_signals;
        while self.active.len() > cap {
            let candidates = &self.active[..self.active.len() - 1];
            let weakest = candidates
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.amplitude.total_cmp(&b.amplitude))
                .map(|(i, _)| i);
            match weakest {
                Some(i) => {
                    let dropped = self.active.remove(i);
                    tracing::debug!(
                        signal = %dropped.id,
                        "active signal cap reached, dropped weakest"
                    );
                }
                None => break,
            }
        }
    }

    pub fn enhance_with_holographic_reconstruction(
        &mut self,
        context: &ReconstructionContext,
        required_coherence: f64,
    ) -> Option<String> {
        self.store.reconstruct_information(context, required_coherence)
    }

    /// Fresh snapshot. Rescores every active pair, so this is O(n²) in the
    /// number of active signals.
    pub fn get_system_state(&mut self) -> SystemState {
        let report = self.engine.process_wave_interference(&self.active);
        self.snapshot(&report)
    }

    fn snapshot(&self, report: &InterferenceReport) -> SystemState {
        SystemState {
            active_signals: self.active.len(),
            total_fragments: self.store.fragment_count(),
            system_coherence: report.system_coherence,
            emergent_behaviors: report.emergent_behaviors.len(),
            active_patterns: report.patterns.len(),
        }
    }

    pub fn update_wave_decay(&mut self, delta_time: f64) {
        self.update_wave_decay_at(delta_time, now_unix_millis());
    }

    /// Fade every active signal by `delta_time` milliseconds, retire the
    /// ones that fall below the floor, then garbage-collect old patterns.
    pub fn update_wave_decay_at(&mut self, delta_time: f64, now_ms: u64) {
        let dt = delta_time.max(0.0);
        let decay_constant = self.config.interference.decay_constant;
        for signal in &mut self.active {
            signal.decay(dt, decay_constant);
        }

        let before = self.active.len();
        self.active.retain(|s| s.amplitude >= SIGNAL_FLOOR);
        let retired = before - self.active.len();
        if retired > 0 {
            tracing::debug!(retired, remaining = self.active.len(), "signals decayed out");
        }

        let max_age = Duration::from_millis(self.config.interference.pattern_max_age_ms);
        self.engine.clear_old_patterns_at(now_ms, max_age);
    }

    /// Fallback used when the caller's main processing path has failed.
    /// Never returns an error: internal failures become `{success: false}`.
    pub fn graceful_degradation(
        &mut self,
        fallback_context: &ReconstructionContext,
    ) -> DegradationResult {
        if !self.config.degradation.enabled {
            tracing::debug!("graceful degradation disabled");
            return DegradationResult::failed();
        }

        match self.degraded_reconstruction(fallback_context) {
            Ok(Some(text)) => DegradationResult::reconstructed(text),
            Ok(None) => DegradationResult::emergency(),
            Err(e) => {
                tracing::warn!("graceful degradation failed: {e}");
                DegradationResult::failed()
            }
        }
    }

    fn degraded_reconstruction(
        &mut self,
        context: &ReconstructionContext,
    ) -> Result<Option<String>> {
        let floor = self.config.degradation.min_coherence;
        let attempts = self.config.degradation.retry_attempts;

        let mut last_err: Option<EngineError> = None;
        let mut found = None;
        for attempt in 1..=attempts {
            match self.store.try_reconstruct_information(context, floor) {
                Ok(text) => {
                    found = Some(text);
                    break;
                }
                Err(e) => {
                    tracing::debug!(attempt, "degraded reconstruction attempt failed: {e}");
                    last_err = Some(e);
                }
            }
        }
        let text = match (found, last_err) {
            (Some(text), _) => text,
            (None, Some(e)) => return Err(e),
            (None, None) => None,
        };
        if text.is_some() {
            return Ok(text);
        }

        for region in &self.config.degradation.fallback_regions {
            let scoped = self
                .store
                .reconstruct_from_regions(context, floor, std::slice::from_ref(region))?;
            if scoped.is_some() {
                tracing::debug!(region = %region, "degraded reconstruction via fallback region");
                return Ok(scoped);
            }
        }
        Ok(None)
    }

    /// Forget everything: fragments, persisted namespace, live signals and
    /// cached patterns.
    pub fn flush_all_memory(&mut self) {
        self.store.flush_all_memory();
        self.active.clear();
        self.engine.clear();
    }

    pub fn active_signals(&self) -> &[Signal] {
        &self.active
    }

    pub fn fragment_store(&self) -> &FragmentStore {
        &self.store
    }

    pub fn fragment_store_mut(&mut self) -> &mut FragmentStore {
        &mut self.store
    }

    pub fn interference_engine(&self) -> &InterferenceEngine {
        &self.engine
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interference::BehaviorType;

    const NOW: u64 = 1_771_632_000_000;

    fn orchestrator() -> WaveOrchestrator {
        WaveOrchestrator::in_memory(EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_propagate_creates_signal_and_fragment() {
        let mut o = orchestrator();
        let id = o.propagate_wave("persona", "friendly and concise", WaveType::Persona, 0.8, None);

        let signal = &o.active_signals()[0];
        assert_eq!(signal.id, id);
        assert_eq!(signal.frequency, WaveType::Persona.default_frequency());
        assert_eq!(signal.target_regions, Targets::All);
        assert_eq!(signal.fragment_ids.len(), 1);

        let fragment = o.fragment_store().get(signal.fragment_ids[0]).unwrap();
        assert_eq!(fragment.source_region, "persona");
        assert_eq!(fragment.amplitude, 0.8);
        assert_eq!(fragment.session_id, o.session_id());
    }

    #[test]
    fn test_targets_recorded() {
        let mut o = orchestrator();
        o.propagate_wave("intent", "search", WaveType::Intent, 0.5, Some(vec!["memory".into()]));
        assert_eq!(
            o.active_signals()[0].target_regions,
            Targets::Regions(vec!["memory".to_string()])
        );
    }

    #[test]
    fn test_identical_waves_emit_insight_fragment() {
        let mut o = orchestrator();
        // Same text and region → same phase; same type → same frequency.
        o.propagate_wave("chat", "rust ownership semantics", WaveType::Reasoning, 1.0, None);
        o.propagate_wave("chat", "rust ownership semantics", WaveType::Reasoning, 1.0, None);

        let insights = o.fragment_store().fragments_by_region(INTERFERENCE_REGION);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].wave_type, WaveType::Memory);
        assert!(insights[0].content.contains("rust, ownership, semantics"));
        assert_eq!(o.active_signals()[1].fragment_ids.len(), 2);

        let behaviors = o.interference_engine().emergent_behaviors();
        assert_eq!(behaviors[0].behavior_type, BehaviorType::Synthesis);
    }

    #[test]
    fn test_system_state_counts() {
        let mut o = orchestrator();
        let empty = o.get_system_state();
        assert_eq!(empty.active_signals, 0);
        assert_eq!(empty.system_coherence, 0.5);

        o.propagate_wave("chat", "shared topic words", WaveType::Context, 1.0, None);
        o.propagate_wave("chat", "shared topic words", WaveType::Context, 1.0, None);
        let state = o.get_system_state();
        assert_eq!(state.active_signals, 2);
        assert_eq!(state.active_patterns, 1);
        assert_eq!(state.emergent_behaviors, 1);
        // two waves + one insight
        assert_eq!(state.total_fragments, 3);
        assert!((0.0..=1.0).contains(&state.system_coherence));
    }

    #[test]
    fn test_decay_strictly_reduces_amplitude() {
        let mut o = orchestrator();
        o.propagate_wave("chat", "fading", WaveType::Context, 0.9, None);
        let before = o.active_signals()[0].amplitude;
        o.update_wave_decay(1_000.0);
        let after = o.active_signals()[0].amplitude;
        assert!(after < before);
        assert!((after - before * (-0.1f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_decay_removes_weak_signals() {
        let mut o = orchestrator();
        o.propagate_wave("chat", "strong", WaveType::Context, 1.0, None);
        o.propagate_wave("chat", "weak", WaveType::Context, 0.11, None);
        // exp(-0.2) ≈ 0.819: 0.11 → 0.090, 1.0 → 0.819
        o.update_wave_decay(2_000.0);
        assert_eq!(o.active_signals().len(), 1);
        assert_eq!(o.active_signals()[0].content, Payload::from("strong"));
        // fragments are not affected by signal decay
        assert_eq!(o.fragment_store().fragment_count(), 2);
    }

    #[test]
    fn test_negative_delta_is_ignored() {
        let mut o = orchestrator();
        o.propagate_wave("chat", "steady", WaveType::Context, 0.5, None);
        o.update_wave_decay(-5_000.0);
        assert_eq!(o.active_signals()[0].amplitude, 0.5);
    }

    #[test]
    fn test_decay_clears_old_patterns() {
        let mut o = orchestrator();
        let text = Payload::from("pattern source words");
        o.propagate_wave_at("chat", text.clone(), WaveType::Context, 1.0, None, NOW);
        o.propagate_wave_at("chat", text, WaveType::Context, 1.0, None, NOW);
        assert_eq!(o.interference_engine().active_patterns().len(), 1);

        o.update_wave_decay_at(0.0, NOW + 5 * 60 * 1000 + 1);
        assert!(o.interference_engine().active_patterns().is_empty());
        assert_eq!(o.active_signals().len(), 2);
    }

    #[test]
    fn test_signal_cap_drops_weakest_not_newest() {
        let mut config = EngineConfig::default();
        config.interference.max_active_signals = 2;
        let mut o = WaveOrchestrator::in_memory(config).unwrap();
        o.propagate_wave("a", "first", WaveType::Context, 0.9, None);
        o.propagate_wave("b", "second", WaveType::Context, 0.2, None);
        let newest = o.propagate_wave("c", "third", WaveType::Context, 0.1, None);

        let contents: Vec<_> = o
            .active_signals()
            .iter()
            .map(|s| s.content.extract_text())
            .collect();
        assert_eq!(contents, vec!["first", "third"]);
        assert_eq!(o.active_signals()[1].id, newest);
    }

    #[test]
    fn test_enhance_delegates_to_store() {
        let mut o = orchestrator();
        o.propagate_wave("chat", "tokio runtime internals", WaveType::Reasoning, 1.0, None);
        let ctx = ReconstructionContext::new("tokio internals");
        assert_eq!(
            o.enhance_with_holographic_reconstruction(&ctx, 0.0),
            Some("tokio runtime internals".to_string())
        );
    }

    #[test]
    fn test_degradation_reconstructs() {
        let mut o = orchestrator();
        o.propagate_wave("chat", "fallback knowledge base entry", WaveType::Context, 1.0, None);
        let result = o.graceful_degradation(&ReconstructionContext::new("knowledge entry"));
        assert_eq!(result.method, DegradationMethod::HolographicReconstruction);
        assert!(result.success);
        assert_eq!(result.confidence, 0.6);
        assert_eq!(result.reconstructed.as_deref(), Some("fallback knowledge base entry"));
    }

    #[test]
    fn test_degradation_emergency_on_empty_store() {
        let mut o = orchestrator();
        let result = o.graceful_degradation(&ReconstructionContext::new("anything"));
        assert_eq!(result, DegradationResult::emergency());
    }

    #[test]
    fn test_degradation_disabled() {
        let mut config = EngineConfig::default();
        config.degradation.enabled = false;
        let mut o = WaveOrchestrator::in_memory(config).unwrap();
        let result = o.graceful_degradation(&ReconstructionContext::new("anything"));
        assert!(!result.success);
        assert_eq!(result.method, DegradationMethod::Failed);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_degradation_tries_fallback_regions() {
        let mut config = EngineConfig::default();
        // one relevant fragment alone is viable at 0.41, the mixed pair stays below 0.4
        config.degradation.min_coherence = 0.4;
        config.degradation.fallback_regions = vec!["docs".to_string()];
        let mut o = WaveOrchestrator::in_memory(config).unwrap();
        let store = o.fragment_store_mut();
        store.store_fragment("tracing spans and events", "docs", WaveType::Context, 1.0, "s");
        store.store_fragment("tracing the outline of a drawing", "art", WaveType::Visual, 1.0, "s");

        let result = o.graceful_degradation(&ReconstructionContext::new("tracing"));
        assert_eq!(result.method, DegradationMethod::HolographicReconstruction);
        assert_eq!(result.reconstructed.as_deref(), Some("tracing spans and events"));
    }

    #[test]
    fn test_empty_result_is_not_retried() {
        let run = |retry_attempts: u32| {
            let mut config = EngineConfig::default();
            config.degradation.min_coherence = 0.4;
            config.degradation.retry_attempts = retry_attempts;
            config.degradation.fallback_regions = vec!["docs".to_string()];
            let mut o = WaveOrchestrator::in_memory(config).unwrap();
            let store = o.fragment_store_mut();
            store.store_fragment("tracing spans and events", "docs", WaveType::Context, 1.0, "s");
            store.store_fragment(
                "tracing the outline of a drawing",
                "art",
                WaveType::Visual,
                1.0,
                "s",
            );
            o.graceful_degradation(&ReconstructionContext::new("tracing"))
        };

        let once = run(1);
        assert_eq!(once.reconstructed.as_deref(), Some("tracing spans and events"));
        assert_eq!(run(5), once);
    }

    #[test]
    fn test_degradation_result_json() {
        let json = serde_json::to_value(DegradationResult::emergency()).unwrap();
        assert_eq!(json["method"], "emergency_fallback");
        assert!(json.get("reconstructed").is_none());
    }

    #[test]
    fn test_flush_resets_everything() {
        let mut o = orchestrator();
        o.propagate_wave("chat", "shared flush words", WaveType::Context, 1.0, None);
        o.propagate_wave("chat", "shared flush words", WaveType::Context, 1.0, None);
        o.flush_all_memory();
        assert_eq!(o.fragment_store().fragment_count(), 0);
        assert!(o.active_signals().is_empty());
        assert!(o.interference_engine().active_patterns().is_empty());
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let mut config = EngineConfig::default();
        config.interference.emergent_threshold = -0.5;
        assert!(matches!(
            WaveOrchestrator::in_memory(config),
            Err(EngineError::InvalidConfig(_))
        ));
    }
}
