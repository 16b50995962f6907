//! Pattern & anomaly memory record types

use serde::{Deserialize, Serialize};

use super::MetricKind;

/// Correlation record between two machines' metric trends.
///
/// Only produced for machines in the same process group, with statistical
/// significance gating. Bounded list (max 50), FIFO eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossMachinePattern {
    pub machine_a: String,
    pub machine_b: String,
    pub metric: MetricKind,
    /// Pearson correlation coefficient
    pub r_value: f64,
    /// Two-tailed p-value from Student's t-distribution
    pub p_value: f64,
    pub sample_count: usize,
    /// Simulated time the pattern was recorded
    pub detected_at_sim_secs: u64,
}

/// A statistical-outlier sample in one machine's metric history.
///
/// Bounded list (max 100), FIFO eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub id: String,
    pub machine_id: String,
    pub metric: MetricKind,
    /// Normalized sample value [0, 1] that triggered the record
    pub value: f64,
    /// Z-score versus the series' rolling mean at detection time
    pub z_score: f64,
    pub detected_at_sim_secs: u64,
}

/// Compact summary of engine-internal memory state, for presentation layers.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MemorySummary {
    pub tracked_machines: usize,
    pub tracked_series: usize,
    pub total_samples: usize,
    pub pattern_count: usize,
    pub anomaly_count: usize,
    pub active_strategic_priorities: usize,
}

/// Direction of a metric's recent trend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TrendDirection {
    Rising,
    Falling,
    Flat,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Rising => write!(f, "rising"),
            TrendDirection::Falling => write!(f, "falling"),
            TrendDirection::Flat => write!(f, "flat"),
        }
    }
}
