/// Signals weaker than this are dropped from the active set.
pub const SIGNAL_FLOOR: f64 = 0.1;

/// Phase difference below which two signals interfere constructively.
pub const CONSTRUCTIVE_PHASE_WINDOW: f64 = std::f64::consts::FRAC_PI_4;

/// Minimum coherence before a pair is worth describing in words.
pub const SYNTHESIS_MIN_COHERENCE: f64 = 0.5;

/// System coherence reported when no pattern is retained.
pub const NEUTRAL_COHERENCE: f64 = 0.5;

/// Each retained pattern adds this much to system coherence...
pub const COMPLEXITY_BONUS_STEP: f64 = 0.05;

/// ...up to this cap.
pub const COMPLEXITY_BONUS_CAP: f64 = 0.2;

/// Words shorter than or equal to this are not significant.
pub const MIN_SIGNIFICANT_LEN: usize = 3;

/// Number of words kept in a coherence signature.
pub const SIGNATURE_WORDS: usize = 5;

/// Characters of source text quoted in an emergent insight.
pub const EXCERPT_CHARS: usize = 50;

/// Prefix length used to group near-duplicate fragment contents.
pub const CONTENT_PREFIX_CHARS: usize = 50;

/// Summed importance a content group needs to make it into a reconstruction.
pub const RECONSTRUCTION_IMPORTANCE_FLOOR: f64 = 0.3;

/// Fragments count toward reconstruction viability up to this many.
pub const VIABILITY_SATURATION: f64 = 5.0;

/// Mean pairwise coherence assumed when fewer than two fragments are relevant.
pub const SOLO_FRAGMENT_COHERENCE: f64 = 0.5;

/// Window over which a fragment's recency boost fades out.
pub const TEMPORAL_WINDOW_HOURS: f64 = 24.0;

/// Persisted fragments older than this are not loaded back.
pub const PERSISTENCE_MAX_AGE_MS: u64 = 7 * 24 * 60 * 60 * 1000;

/// Blob-store key holding every persisted fragment.
pub const FRAGMENTS_KEY: &str = "wave_memory.fragments";

/// Prefix reserved for this engine inside a shared blob store.
pub const NAMESPACE_PREFIX: &str = "wave_memory.";

/// Source region used for fragments synthesized from emergent behavior.
pub const INTERFERENCE_REGION: &str = "interference_engine";
