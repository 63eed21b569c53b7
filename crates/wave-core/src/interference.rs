//! Pairwise interference scoring over the live signal set.
//!
//! For each unordered pair the phase difference decides between constructive
//! and destructive interference, and coherence blends phase alignment with
//! frequency closeness. Highly coherent pairs that share vocabulary get a
//! short synthesized insight, and the strongest of those are classified into
//! emergent behaviors.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::InterferenceConfig;
use crate::constants::{
    COMPLEXITY_BONUS_CAP, COMPLEXITY_BONUS_STEP, CONSTRUCTIVE_PHASE_WINDOW, EXCERPT_CHARS,
    MIN_SIGNIFICANT_LEN, NEUTRAL_COHERENCE, SYNTHESIS_MIN_COHERENCE,
};
use crate::signal::Signal;
use crate::time::now_unix_millis;
use crate::tokenizer::whitespace_tokens;

type PairKey = (Uuid, Uuid);

/// Scored relationship between exactly two signals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterferencePattern {
    pub wave_ids: PairKey,
    pub resultant_amplitude: f64,
    pub resultant_frequency: f64,
    pub coherence_level: f64,
    pub constructive: bool,
    pub emergent_content: Option<String>,
    pub timestamp: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BehaviorType {
    Synthesis,
    Insight,
    Contradiction,
    Correlation,
}

/// Classified insight derived from an unusually coherent pattern.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmergentBehavior {
    /// `wave_ids` of the triggering pattern.
    pub trigger_pattern: PairKey,
    pub behavior_type: BehaviorType,
    pub confidence: f64,
    pub insight: String,
    pub timestamp: u64,
}

/// Output of one interference pass.
#[derive(Clone, Debug, Default, Serialize)]
pub struct InterferenceReport {
    pub patterns: Vec<InterferencePattern>,
    pub emergent_behaviors: Vec<EmergentBehavior>,
    pub system_coherence: f64,
}

/// Scores signal pairs. Holds no state beyond a rolling cache of recent
/// patterns and behaviors kept for reporting.
pub struct InterferenceEngine {
    constructive_threshold: f64,
    emergent_threshold: f64,
    patterns: HashMap<PairKey, InterferencePattern>,
    behaviors: HashMap<PairKey, EmergentBehavior>,
}

impl InterferenceEngine {
    pub fn new(config: &InterferenceConfig) -> Self {
        Self {
            constructive_threshold: config.constructive_threshold,
            emergent_threshold: config.emergent_threshold,
            patterns: HashMap::new(),
            behaviors: HashMap::new(),
        }
    }

    pub fn process_wave_interference(&mut self, signals: &[Signal]) -> InterferenceReport {
        self.process_wave_interference_at(signals, now_unix_millis())
    }

    /// Score every unordered pair of `signals`, cache what survives, and
    /// report the pass.
    pub fn process_wave_interference_at(
        &mut self,
        signals: &[Signal],
        now_ms: u64,
    ) -> InterferenceReport {
        let mut patterns = Vec::new();

        for (i, a) in signals.iter().enumerate() {
            for b in &signals[i + 1..] {
                let mut pattern = score_pair(a, b, now_ms);
                if pattern.coherence_level.is_nan()
                    || pattern.coherence_level <= self.constructive_threshold
                {
                    continue;
                }
                pattern.emergent_content = synthesize_content(a, b, pattern.coherence_level);
                patterns.push(pattern);
            }
        }

        let emergent_behaviors: Vec<EmergentBehavior> = patterns
            .iter()
            .filter(|p| p.coherence_level > self.emergent_threshold)
            .filter_map(|p| {
                let insight = p.emergent_content.clone()?;
                Some(EmergentBehavior {
                    trigger_pattern: p.wave_ids,
                    behavior_type: classify(p),
                    confidence: p.coherence_level,
                    insight,
                    timestamp: now_ms,
                })
            })
            .collect();

        let system_coherence = system_coherence(&patterns);

        for p in &patterns {
            self.patterns.insert(pair_key(p.wave_ids), p.clone());
        }
        for b in &emergent_behaviors {
            self.behaviors.insert(pair_key(b.trigger_pattern), b.clone());
        }

        tracing::debug!(
            signals = signals.len(),
            retained = patterns.len(),
            emergent = emergent_behaviors.len(),
            system_coherence,
            "interference pass"
        );

        InterferenceReport {
            patterns,
            emergent_behaviors,
            system_coherence,
        }
    }

    /// Cached patterns, oldest first.
    pub fn active_patterns(&self) -> Vec<&InterferencePattern> {
        let mut out: Vec<_> = self.patterns.values().collect();
        out.sort_by_key(|p| p.timestamp);
        out
    }

    /// Cached emergent behaviors, oldest first.
    pub fn emergent_behaviors(&self) -> Vec<&EmergentBehavior> {
        let mut out: Vec<_> = self.behaviors.values().collect();
        out.sort_by_key(|b| b.timestamp);
        out
    }

    /// Drop cached entries older than `max_age`. Only affects reporting.
    pub fn clear_old_patterns_at(&mut self, now_ms: u64, max_age: Duration) {
        let max_age_ms = max_age.as_millis() as u64;
        let before = self.patterns.len() + self.behaviors.len();
        self.patterns
            .retain(|_, p| now_ms.saturating_sub(p.timestamp) <= max_age_ms);
        self.behaviors
            .retain(|_, b| now_ms.saturating_sub(b.timestamp) <= max_age_ms);
        let dropped = before - self.patterns.len() - self.behaviors.len();
        if dropped > 0 {
            tracing::debug!(dropped, "cleared old interference entries");
        }
    }

    pub fn clear(&mut self) {
        self.patterns.clear();
        self.behaviors.clear();
    }
}

fn pair_key((a, b): PairKey) -> PairKey {
    if a <= b { (a, b) } else { (b, a) }
}

/// Raw interference between two signals, before any threshold is applied.
pub fn score_pair(a: &Signal, b: &Signal, now_ms: u64) -> InterferencePattern {
    let phase_diff = (a.phase - b.phase).abs();
    let freq_ratio = a.frequency / b.frequency;

    let constructive = phase_diff < CONSTRUCTIVE_PHASE_WINDOW;
    let resultant_amplitude = if constructive {
        a.amplitude * b.amplitude * phase_diff.cos()
    } else {
        a.amplitude * b.amplitude * phase_diff.sin()
    };
    let coherence_level = (phase_diff.cos() + (-(freq_ratio - 1.0).abs()).exp()) / 2.0;

    InterferencePattern {
        wave_ids: (a.id, b.id),
        resultant_amplitude,
        resultant_frequency: (a.frequency + b.frequency) / 2.0,
        coherence_level,
        constructive,
        emergent_content: None,
        timestamp: now_ms,
    }
}

/// Describe what two coherent signals have in common, if anything.
pub fn synthesize_content(a: &Signal, b: &Signal, coherence: f64) -> Option<String> {
    if coherence < SYNTHESIS_MIN_COHERENCE {
        return None;
    }

    let text_a = a.content.extract_text();
    let text_b = b.content.extract_text();
    let tokens_b = whitespace_tokens(&text_b);

    let mut shared: Vec<String> = Vec::new();
    for token in whitespace_tokens(&text_a) {
        if token.chars().count() > MIN_SIGNIFICANT_LEN
            && tokens_b.contains(&token)
            && !shared.contains(&token)
        {
            shared.push(token);
        }
    }
    if shared.is_empty() {
        return None;
    }
    shared.truncate(3);

    Some(format!(
        "Connection between \"{}\" and \"{}\" via shared concepts: {}",
        excerpt(&text_a),
        excerpt(&text_b),
        shared.join(", ")
    ))
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}

/// Behavior classification, first match wins.
pub fn classify(p: &InterferencePattern) -> BehaviorType {
    let c = p.coherence_level;
    if c > 0.8 && p.constructive && p.resultant_amplitude > 0.7 {
        BehaviorType::Synthesis
    } else if c > 0.7 && p.constructive {
        BehaviorType::Insight
    } else if !p.constructive && c > 0.6 {
        BehaviorType::Contradiction
    } else {
        BehaviorType::Correlation
    }
}

/// Mean retained coherence plus a complexity bonus, capped at 1.
pub fn system_coherence(patterns: &[InterferencePattern]) -> f64 {
    if patterns.is_empty() {
        return NEUTRAL_COHERENCE;
    }
    let mean =
        patterns.iter().map(|p| p.coherence_level).sum::<f64>() / patterns.len() as f64;
    let bonus = (patterns.len() as f64 * COMPLEXITY_BONUS_STEP).min(COMPLEXITY_BONUS_CAP);
    (mean + bonus).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Payload;
    use crate::signal::Targets;
    use crate::wave_type::WaveType;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn wave(text: &str, phase: f64, frequency: f64, amplitude: f64) -> Signal {
        let mut s = Signal::new(
            "test",
            Payload::from(text),
            WaveType::Context,
            frequency,
            amplitude,
            Targets::All,
            0,
        );
        s.phase = phase;
        s
    }

    fn engine() -> InterferenceEngine {
        InterferenceEngine::new(&InterferenceConfig::default())
    }

    #[test]
    fn test_in_phase_same_frequency() {
        let a = wave("a", 1.0, 2.0, 0.9);
        let b = wave("b", 1.0, 2.0, 0.5);
        let p = score_pair(&a, &b, 0);
        assert!(p.constructive);
        assert_relative_eq!(p.coherence_level, 1.0);
        assert_relative_eq!(p.resultant_amplitude, 0.45);
        assert_relative_eq!(p.resultant_frequency, 2.0);
    }

    #[test]
    fn test_destructive_uses_sine() {
        let a = wave("a", 0.0, 1.0, 1.0);
        let b = wave("b", PI / 2.0, 1.0, 0.5);
        let p = score_pair(&a, &b, 0);
        assert!(!p.constructive);
        assert_relative_eq!(p.resultant_amplitude, 0.5);
        // cos(π/2) ≈ 0, exp(0) = 1
        assert_relative_eq!(p.coherence_level, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_boundary_is_destructive() {
        let a = wave("a", 0.0, 1.0, 1.0);
        let b = wave("b", PI / 4.0, 1.0, 1.0);
        assert!(!score_pair(&a, &b, 0).constructive);
    }

    #[test]
    fn test_frequency_mismatch_lowers_coherence() {
        let a = wave("a", 0.0, 1.0, 1.0);
        let b = wave("b", 0.0, 3.0, 1.0);
        let p = score_pair(&a, &b, 0);
        let expected = (1.0 + (-(1.0f64 / 3.0 - 1.0).abs()).exp()) / 2.0;
        assert_relative_eq!(p.coherence_level, expected);
    }

    #[test]
    fn test_low_coherence_pairs_discarded() {
        let mut e = engine();
        let a = wave("rust systems", 0.0, 1.0, 1.0);
        let b = wave("rust systems", PI, 1.0, 1.0);
        let report = e.process_wave_interference_at(&[a, b], 0);
        assert!(report.patterns.is_empty());
        assert!(e.active_patterns().is_empty());
        assert_eq!(report.system_coherence, NEUTRAL_COHERENCE);
    }

    #[test]
    fn test_synthesis_names_shared_tokens() {
        let a = wave("Rust and Go are great", 0.1, 1.0, 1.0);
        let b = wave("Rust is excellent for systems work", 0.2, 1.0, 1.0);
        let text = synthesize_content(&a, &b, 0.9).unwrap();
        assert!(text.contains("rust"), "{text}");
        assert!(text.contains("Rust and Go are great"));
        assert!(!text.contains(" and,"));
    }

    #[test]
    fn test_synthesis_needs_shared_long_tokens() {
        let a = wave("go is fun", 0.0, 1.0, 1.0);
        let b = wave("go was fun", 0.0, 1.0, 1.0);
        assert!(synthesize_content(&a, &b, 0.99).is_none());
    }

    #[test]
    fn test_synthesis_below_half_coherence() {
        let a = wave("shared vocabulary", 0.0, 1.0, 1.0);
        let b = wave("shared vocabulary", 0.0, 1.0, 1.0);
        assert!(synthesize_content(&a, &b, 0.49).is_none());
    }

    #[test]
    fn test_synthesis_caps_at_three_tokens() {
        let a = wave("alpha bravo charlie delta echo", 0.0, 1.0, 1.0);
        let b = wave("echo delta charlie bravo alpha", 0.0, 1.0, 1.0);
        let text = synthesize_content(&a, &b, 1.0).unwrap();
        assert!(text.ends_with("alpha, bravo, charlie"), "{text}");
    }

    #[test]
    fn test_excerpt_truncates_to_fifty_chars() {
        let long = "memory ".repeat(20);
        let a = wave(&long, 0.0, 1.0, 1.0);
        let b = wave("memory", 0.0, 1.0, 1.0);
        let text = synthesize_content(&a, &b, 1.0).unwrap();
        let quoted = text.split('"').nth(1).unwrap();
        assert_eq!(quoted.chars().count(), 50);
    }

    fn pattern(coherence: f64, constructive: bool, amplitude: f64) -> InterferencePattern {
        InterferencePattern {
            wave_ids: (Uuid::new_v4(), Uuid::new_v4()),
            resultant_amplitude: amplitude,
            resultant_frequency: 1.0,
            coherence_level: coherence,
            constructive,
            emergent_content: Some("x".into()),
            timestamp: 0,
        }
    }

    #[test]
    fn test_classification_precedence() {
        assert_eq!(classify(&pattern(0.9, true, 0.8)), BehaviorType::Synthesis);
        assert_eq!(classify(&pattern(0.9, true, 0.5)), BehaviorType::Insight);
        assert_eq!(classify(&pattern(0.75, true, 0.9)), BehaviorType::Insight);
        assert_eq!(classify(&pattern(0.65, false, 0.9)), BehaviorType::Contradiction);
        assert_eq!(classify(&pattern(0.65, true, 0.9)), BehaviorType::Correlation);
        assert_eq!(classify(&pattern(0.55, false, 0.9)), BehaviorType::Correlation);
    }

    #[test]
    fn test_system_coherence_bonus() {
        let ps = vec![pattern(0.7, true, 0.5), pattern(0.9, true, 0.5)];
        assert_relative_eq!(system_coherence(&ps), 0.8 + 0.1);

        let many: Vec<_> = (0..10).map(|_| pattern(0.95, true, 0.5)).collect();
        assert_relative_eq!(system_coherence(&many), 1.0);
    }

    #[test]
    fn test_emergent_behavior_from_coherent_pair() {
        let mut e = engine();
        let a = wave("Rust and Go are great", 0.1, 1.0, 1.0);
        let b = wave("Rust is excellent for systems work", 0.15, 1.0, 1.0);
        let report = e.process_wave_interference_at(&[a, b], 10);

        assert_eq!(report.patterns.len(), 1);
        assert_eq!(report.emergent_behaviors.len(), 1);
        let behavior = &report.emergent_behaviors[0];
        // coherence ≈ 0.9994, amplitude ≈ 0.9987
        assert_eq!(behavior.behavior_type, BehaviorType::Synthesis);
        assert_eq!(behavior.confidence, report.patterns[0].coherence_level);
        assert_eq!(e.emergent_behaviors().len(), 1);
    }

    #[test]
    fn test_no_emergence_without_content() {
        let mut e = engine();
        let a = wave("apples", 0.0, 1.0, 1.0);
        let b = wave("oranges", 0.0, 1.0, 1.0);
        let report = e.process_wave_interference_at(&[a, b], 0);
        assert_eq!(report.patterns.len(), 1);
        assert!(report.emergent_behaviors.is_empty());
    }

    #[test]
    fn test_recompute_replaces_cached_pair() {
        let mut e = engine();
        let signals = vec![
            wave("shared words here", 0.0, 1.0, 1.0),
            wave("shared words there", 0.0, 1.0, 1.0),
        ];
        e.process_wave_interference_at(&signals, 0);
        e.process_wave_interference_at(&signals, 50);
        let cached = e.active_patterns();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].timestamp, 50);
    }

    #[test]
    fn test_clear_old_patterns() {
        let mut e = engine();
        let signals = vec![
            wave("shared words here", 0.0, 1.0, 1.0),
            wave("shared words there", 0.0, 1.0, 1.0),
        ];
        e.process_wave_interference_at(&signals, 1_000);

        e.clear_old_patterns_at(1_500, Duration::from_millis(500));
        assert_eq!(e.active_patterns().len(), 1, "age == max_age is kept");

        e.clear_old_patterns_at(1_501, Duration::from_millis(500));
        assert!(e.active_patterns().is_empty());
        assert!(e.emergent_behaviors().is_empty());
    }

    #[test]
    fn test_three_signals_three_pairs() {
        let mut e = engine();
        let signals: Vec<_> = (0..3)
            .map(|i| wave("common thread", 0.01 * i as f64, 1.0, 1.0))
            .collect();
        let report = e.process_wave_interference_at(&signals, 0);
        assert_eq!(report.patterns.len(), 3);
    }
}
