//! Decision types: DecisionCategory, DecisionPriority, DecisionStatus, Decision

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of an emitted decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DecisionCategory {
    /// Dispatch workers or transport to where they are needed
    Assignment,
    /// Rebalance load / improve throughput
    Optimization,
    /// Pre-emptive action from detected trends
    Prediction,
    /// Service a degrading machine
    Maintenance,
    /// Protect people and equipment
    Safety,
}

impl DecisionCategory {
    /// All categories, in heuristic scan order (safety first).
    pub const ALL: [DecisionCategory; 5] = [
        DecisionCategory::Safety,
        DecisionCategory::Maintenance,
        DecisionCategory::Assignment,
        DecisionCategory::Optimization,
        DecisionCategory::Prediction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionCategory::Assignment => "assignment",
            DecisionCategory::Optimization => "optimization",
            DecisionCategory::Prediction => "prediction",
            DecisionCategory::Maintenance => "maintenance",
            DecisionCategory::Safety => "safety",
        }
    }
}

impl std::fmt::Display for DecisionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Priority of an emitted decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DecisionPriority {
    #[default]
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl std::fmt::Display for DecisionPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionPriority::Low => write!(f, "LOW"),
            DecisionPriority::Medium => write!(f, "MEDIUM"),
            DecisionPriority::High => write!(f, "HIGH"),
            DecisionPriority::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Lifecycle status of a decision. Mutated by external consumers once the
/// decision leaves the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DecisionStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Superseded,
}

impl DecisionStatus {
    /// Whether a follow-up decision may still chain onto this one.
    pub fn accepts_follow_up(&self) -> bool {
        matches!(self, DecisionStatus::Pending | DecisionStatus::InProgress)
    }
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionStatus::Pending => write!(f, "pending"),
            DecisionStatus::InProgress => write!(f, "in_progress"),
            DecisionStatus::Completed => write!(f, "completed"),
            DecisionStatus::Superseded => write!(f, "superseded"),
        }
    }
}

/// A prioritized operational recommendation emitted by a generator.
///
/// Created by the engine, consumed and status-mutated externally. The
/// external decision log owns retention/eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub category: DecisionCategory,
    /// What to do
    pub action: String,
    /// Why the engine recommends it
    pub reasoning: String,
    /// Confidence percentage, always within [0, 100]
    pub confidence: f64,
    /// Expected effect if followed
    pub impact: String,
    pub machine_id: Option<String>,
    pub worker_id: Option<String>,
    pub status: DecisionStatus,
    /// Outcome text set by the consumer on completion
    pub outcome: Option<String>,
    /// Parent decision this one follows up on (chain link)
    pub parent_id: Option<String>,
    /// Alternative actions that were considered
    pub alternatives: Option<Vec<String>>,
    /// Caveat attached when the generator is unsure
    pub uncertainty: Option<String>,
    pub priority: DecisionPriority,
    /// Simulated time after which the decision is stale
    pub expires_at_sim_secs: Option<u64>,
}

impl Decision {
    /// Build a decision with required fields; optional fields start empty.
    pub fn new(
        category: DecisionCategory,
        priority: DecisionPriority,
        action: impl Into<String>,
        reasoning: impl Into<String>,
        impact: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            category,
            action: action.into(),
            reasoning: reasoning.into(),
            confidence: confidence.clamp(0.0, 100.0),
            impact: impact.into(),
            machine_id: None,
            worker_id: None,
            status: DecisionStatus::Pending,
            outcome: None,
            parent_id: None,
            alternatives: None,
            uncertainty: None,
            priority,
            expires_at_sim_secs: None,
        }
    }

    pub fn with_machine(mut self, machine_id: impl Into<String>) -> Self {
        self.machine_id = Some(machine_id.into());
        self
    }

    pub fn with_worker(mut self, worker_id: impl Into<String>) -> Self {
        self.worker_id = Some(worker_id.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_expiry(mut self, sim_secs: u64) -> Self {
        self.expires_at_sim_secs = Some(sim_secs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_clamped_on_construction() {
        let d = Decision::new(
            DecisionCategory::Maintenance,
            DecisionPriority::High,
            "Service press-01",
            "Temperature above critical threshold",
            "Avoid unplanned shutdown",
            147.0,
        );
        assert_eq!(d.confidence, 100.0);

        let d = Decision::new(
            DecisionCategory::Optimization,
            DecisionPriority::Low,
            "Rebalance line-a",
            "Load spread too wide",
            "Evener wear",
            -3.0,
        );
        assert_eq!(d.confidence, 0.0);
    }

    #[test]
    fn follow_up_acceptance_by_status() {
        assert!(DecisionStatus::Pending.accepts_follow_up());
        assert!(DecisionStatus::InProgress.accepts_follow_up());
        assert!(!DecisionStatus::Completed.accepts_follow_up());
        assert!(!DecisionStatus::Superseded.accepts_follow_up());
    }

    #[test]
    fn builder_sets_optional_fields() {
        let d = Decision::new(
            DecisionCategory::Safety,
            DecisionPriority::Critical,
            "Evacuate line-b",
            "Drill phase: evacuation",
            "Personnel safety",
            95.0,
        )
        .with_machine("press-01")
        .with_worker("w-04")
        .with_parent("abc-123")
        .with_expiry(3600);

        assert_eq!(d.machine_id.as_deref(), Some("press-01"));
        assert_eq!(d.worker_id.as_deref(), Some("w-04"));
        assert_eq!(d.parent_id.as_deref(), Some("abc-123"));
        assert_eq!(d.expires_at_sim_secs, Some(3600));
    }
}
