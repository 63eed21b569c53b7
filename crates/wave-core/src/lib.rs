//! Wave-interference memory engine.
//!
//! Information moves between regions as wave signals carrying a frequency,
//! phase and amplitude. Every signal leaves a fragment behind; fragments can
//! be recombined into an answer for a query context, and coherent pairs of
//! live signals synthesize short insights that are fed back into memory.
//!
//! No I/O of its own: persistence goes through the [`BlobStore`] trait.

pub mod blob;
pub mod config;
pub mod constants;
pub mod error;
pub mod fragment;
pub mod fragment_store;
pub mod interference;
pub mod orchestrator;
pub mod payload;
pub mod persistence;
pub mod phase;
pub mod signal;
pub mod time;
pub mod tokenizer;
pub mod wave_type;

pub use blob::{BlobStore, MemoryBlobStore};
pub use config::{DegradationConfig, EngineConfig, FrequencyTable, InterferenceConfig, MemoryConfig};
pub use error::{EngineError, Result};
pub use fragment::Fragment;
pub use fragment_store::{FragmentStore, ReconstructionContext};
pub use interference::{
    BehaviorType, EmergentBehavior, InterferenceEngine, InterferencePattern, InterferenceReport,
};
pub use orchestrator::{DegradationMethod, DegradationResult, SystemState, WaveOrchestrator};
pub use payload::Payload;
pub use signal::{Signal, Targets};
pub use wave_type::{UnknownWaveType, WaveType};
