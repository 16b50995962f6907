//! System-wide default constants.
//!
//! Centralises the engine's fixed capacity bounds. These are structural
//! invariants, not tuning. Tunable values live in `EngineConfig`.

// ============================================================================
// Bounded memories
// ============================================================================

/// Metric history ring-buffer capacity per (machine, metric) series.
///
/// 60 samples at one sample per cycle ≈ one minute of context at 1 Hz.
pub const METRIC_HISTORY_CAPACITY: usize = 60;

/// Maximum retained cross-machine correlation patterns (FIFO eviction).
pub const CROSS_PATTERN_CAPACITY: usize = 50;

/// Maximum retained anomaly records (FIFO eviction).
pub const ANOMALY_CAPACITY: usize = 100;

/// Maximum predicted events per forecast recomputation.
pub const FORECAST_CAPACITY: usize = 10;

// ============================================================================
// Decision log (in-memory backend)
// ============================================================================

/// Retention bound for the bundled in-memory decision log.
pub const DECISION_LOG_CAPACITY: usize = 200;

// ============================================================================
// Forecast heuristics
// ============================================================================

/// Assumed fatigue accumulation rate (fraction per simulated hour) used to
/// extrapolate fatigue-threshold crossings.
pub const FATIGUE_RATE_PER_HOUR: f64 = 0.06;

/// Horizon for forecast events (simulated seconds). Events further out are
/// not predicted.
pub const FORECAST_HORIZON_SECS: u64 = 4 * 3600;
