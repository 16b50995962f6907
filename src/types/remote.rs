//! Remote-model wire contract and outcome types
//!
//! Only the request/response shapes live here; the remote model's
//! internals are an external collaborator. Failures on the remote path are
//! represented as explicit fallback values, never as propagated errors.

use serde::{Deserialize, Serialize};

use super::{Decision, DecisionCategory, DecisionPriority};

/// Tactical decision payload as produced by the remote model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteDecisionPayload {
    pub category: DecisionCategory,
    pub priority: DecisionPriority,
    pub action: String,
    pub reasoning: String,
    pub impact: String,
    /// Confidence percentage; clamped to [0, 100] on conversion
    pub confidence: f64,
    #[serde(default)]
    pub machine_id: Option<String>,
    #[serde(default)]
    pub worker_id: Option<String>,
    #[serde(default)]
    pub alternatives: Option<Vec<String>>,
    #[serde(default)]
    pub uncertainty: Option<String>,
}

impl RemoteDecisionPayload {
    /// Convert the wire payload into an engine decision.
    pub fn into_decision(self) -> Decision {
        let mut decision = Decision::new(
            self.category,
            self.priority,
            self.action,
            self.reasoning,
            self.impact,
            self.confidence,
        );
        decision.machine_id = self.machine_id;
        decision.worker_id = self.worker_id;
        decision.alternatives = self.alternatives;
        decision.uncertainty = self.uncertainty;
        decision
    }
}

/// Strategic priority payload as produced by the remote model.
///
/// A strategic call yields weighted directives rather than a single
/// decision; the heuristic scorer reads them as an additive, capped bonus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategicPriorityPayload {
    pub category: DecisionCategory,
    /// Directive weight, clamped to 1-5 on ingestion
    pub weight: u8,
    #[serde(default)]
    pub machines: Vec<String>,
    /// Time-to-live in simulated seconds
    pub ttl_secs: u64,
}

/// Structured remote response: exactly one of these shapes, discriminated
/// by a `type` field in the JSON object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemoteResponse {
    Decision(RemoteDecisionPayload),
    Strategic { priorities: Vec<StrategicPriorityPayload> },
}

/// An active strategic priority stored by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategicPriority {
    pub category: DecisionCategory,
    /// Weight 1-5
    pub weight: u8,
    /// Machines this directive favors; empty = all machines
    pub machines: Vec<String>,
    /// Simulated time at which this priority expires
    pub expires_at_sim_secs: u64,
}

impl StrategicPriority {
    /// Build from a wire payload, clamping weight and anchoring the TTL to
    /// the current simulated clock.
    pub fn from_payload(payload: StrategicPriorityPayload, now_sim_secs: u64) -> Self {
        Self {
            category: payload.category,
            weight: payload.weight.clamp(1, 5),
            machines: payload.machines,
            expires_at_sim_secs: now_sim_secs.saturating_add(payload.ttl_secs),
        }
    }

    pub fn is_expired(&self, now_sim_secs: u64) -> bool {
        now_sim_secs >= self.expires_at_sim_secs
    }
}

/// Why the remote path yielded no result this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Transport-level failure (connection, HTTP status, rate limit)
    Transport(String),
    /// The call exceeded the configured deadline
    Timeout,
    /// Response was not a valid `RemoteResponse` object
    MalformedResponse(String),
    /// Remote layer not active for this cycle
    Inactive,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::Transport(e) => write!(f, "transport: {e}"),
            FallbackReason::Timeout => write!(f, "timeout"),
            FallbackReason::MalformedResponse(e) => write!(f, "malformed response: {e}"),
            FallbackReason::Inactive => write!(f, "remote layer inactive"),
        }
    }
}

/// Result of one remote-assisted call, consumed synchronously by the
/// coordinator. A fallback is a value, not an error.
#[derive(Debug, Clone)]
pub enum RemoteOutcome {
    Decision(Decision),
    Strategic(Vec<StrategicPriority>),
    Fallback(FallbackReason),
}
