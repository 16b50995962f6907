//! Foreman: context-aware decision and pattern-memory engine for a
//! simulated industrial facility.
//!
//! Each evaluation cycle the engine inspects facility telemetry (machines,
//! workers, alerts, shifts, weather), emits at most one prioritized
//! tactical decision, learns from reported outcomes, tracks anomalies and
//! cross-machine correlations in bounded rolling memory, and forecasts
//! near-future events.
//!
//! Layers:
//! - `types`: telemetry snapshot contract, decisions, forecast/memory
//!   records, the remote wire contract
//! - `config`: TOML-backed engine configuration with validated defaults
//! - `engine`: the `DecisionEngine` context plus its components: cooldown
//!   ledger, confidence calibrator, pattern memory, forecaster, impact
//!   accountant, shift observer, heuristic and remote generators, and the
//!   mode coordinator
//!
//! The engine is single-timeline: evaluation is driven by discrete ticks
//! from an external scheduler, and the remote-model call is the only
//! suspension point. Remote failures degrade to the local heuristic at the
//! remote boundary and never surface to callers.

pub mod config;
pub mod engine;
pub mod types;

pub use config::{EngineConfig, EngineMode};
pub use engine::audio::should_trigger_audio_cue;
pub use engine::coordinator::Coordinator;
pub use engine::log::{DecisionLog, InMemoryDecisionLog};
pub use engine::remote::{CompactJsonEncoder, ContextEncoder, HttpRemoteModel, RemoteModel};
pub use engine::shift::{ShiftObserver, ShiftObserverHandle, ShiftResettable};
pub use engine::DecisionEngine;
pub use types::{
    Decision, DecisionCategory, DecisionPriority, DecisionStatus, TelemetrySnapshot,
};
