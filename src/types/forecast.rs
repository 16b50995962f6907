//! Predictive forecast types

use serde::{Deserialize, Serialize};

use super::DecisionPriority;

/// Kind of predicted near-future event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PredictedEventKind {
    Maintenance,
    ShiftChange,
    Weather,
    Fatigue,
    Optimization,
}

impl std::fmt::Display for PredictedEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictedEventKind::Maintenance => write!(f, "maintenance"),
            PredictedEventKind::ShiftChange => write!(f, "shift_change"),
            PredictedEventKind::Weather => write!(f, "weather"),
            PredictedEventKind::Fatigue => write!(f, "fatigue"),
            PredictedEventKind::Optimization => write!(f, "optimization"),
        }
    }
}

/// A forecast event extrapolated from current trends.
///
/// The forecast list is bounded (max 10), kept ascending by
/// `predicted_at_sim_secs`, and wholesale-replaced on each recomputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictedEvent {
    pub id: String,
    pub kind: PredictedEventKind,
    pub description: String,
    /// Simulated time at which the event is expected
    pub predicted_at_sim_secs: u64,
    /// Confidence percentage [0, 100]
    pub confidence: f64,
    pub priority: DecisionPriority,
    pub machine_id: Option<String>,
}
