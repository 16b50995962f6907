//! Remote-assisted generation
//!
//! Seam for the external model: a compact serialized context goes out, a
//! structured decision or strategic-priority set comes back. Every failure
//! mode on this path resolves to an explicit fallback value at this
//! boundary; nothing propagates past it.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::types::{
    FallbackReason, RemoteOutcome, RemoteResponse, StrategicPriority, TelemetrySnapshot,
};

/// What the coordinator is asking the remote model for this call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteRequestKind {
    /// One tactical decision for this cycle
    Tactical,
    /// A weighted strategic-priority set
    Strategic,
}

/// Serializes a telemetry snapshot into the compact context string sent to
/// the remote model.
pub trait ContextEncoder: Send + Sync {
    fn encode(&self, snapshot: &TelemetrySnapshot, kind: RemoteRequestKind) -> String;
}

/// Compact JSON context: per-machine metric summary plus facility flags.
/// Kept small so the remote call stays cheap.
#[derive(Debug, Default)]
pub struct CompactJsonEncoder;

impl ContextEncoder for CompactJsonEncoder {
    fn encode(&self, snapshot: &TelemetrySnapshot, kind: RemoteRequestKind) -> String {
        let machines: Vec<_> = snapshot
            .machines
            .iter()
            .map(|m| {
                json!({
                    "id": m.id,
                    "group": m.group,
                    "status": m.status.to_string(),
                    "temp": round1(m.temperature),
                    "vib": round1(m.vibration),
                    "load": round1(m.load),
                    "fill": m.fill_level.map(round2),
                })
            })
            .collect();
        let workers: Vec<_> = snapshot
            .workers
            .iter()
            .map(|w| json!({ "id": w.id, "role": w.role.to_string(), "fatigue": round2(w.fatigue) }))
            .collect();
        let alerts: Vec<_> = snapshot
            .alerts
            .iter()
            .map(|a| json!({ "id": a.id, "machine": a.machine_id, "msg": a.message }))
            .collect();

        json!({
            "request": match kind {
                RemoteRequestKind::Tactical => "tactical",
                RemoteRequestKind::Strategic => "strategic",
            },
            "sim_time": snapshot.environment.sim_time_secs,
            "shift": snapshot.environment.shift.to_string(),
            "weather": snapshot.environment.weather.to_string(),
            "emergency": snapshot.emergency_active,
            "drill": snapshot.drill_active,
            "machines": machines,
            "workers": workers,
            "alerts": alerts,
        })
        .to_string()
    }
}

/// The external model seam. Implementations return raw response text;
/// parsing and fallback classification happen in `call_remote` so every
/// backend gets identical failure handling.
#[async_trait]
pub trait RemoteModel: Send + Sync {
    /// One round trip: context string out, raw response text back.
    async fn complete(&self, context: &str) -> Result<String, FallbackReason>;
}

/// Issue one remote call and classify the result.
///
/// Timeout, transport, and parse failures all come back as
/// `RemoteOutcome::Fallback`; the caller never sees an error.
pub async fn call_remote(
    model: &dyn RemoteModel,
    encoder: &dyn ContextEncoder,
    config: &RemoteConfig,
    snapshot: &TelemetrySnapshot,
    kind: RemoteRequestKind,
) -> RemoteOutcome {
    let context = encoder.encode(snapshot, kind);
    let deadline = Duration::from_secs(config.timeout_secs);

    let raw = match tokio::time::timeout(deadline, model.complete(&context)).await {
        Err(_) => {
            warn!(timeout_secs = config.timeout_secs, "Remote call timed out");
            return RemoteOutcome::Fallback(FallbackReason::Timeout);
        }
        Ok(Err(reason)) => {
            warn!(reason = %reason, "Remote call failed");
            return RemoteOutcome::Fallback(reason);
        }
        Ok(Ok(text)) => text,
    };

    match serde_json::from_str::<RemoteResponse>(&raw) {
        Ok(RemoteResponse::Decision(payload)) => {
            debug!(category = %payload.category, "Remote tactical decision received");
            RemoteOutcome::Decision(payload.into_decision())
        }
        Ok(RemoteResponse::Strategic { priorities }) => {
            let now = snapshot.environment.sim_time_secs;
            let active: Vec<StrategicPriority> = priorities
                .into_iter()
                .map(|p| StrategicPriority::from_payload(p, now))
                .collect();
            debug!(count = active.len(), "Remote strategic priorities received");
            RemoteOutcome::Strategic(active)
        }
        Err(e) => {
            warn!(error = %e, "Remote response failed to parse");
            RemoteOutcome::Fallback(FallbackReason::MalformedResponse(e.to_string()))
        }
    }
}

/// HTTP adapter posting the context to a JSON endpoint.
pub struct HttpRemoteModel {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRemoteModel {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
        }
    }
}

#[async_trait]
impl RemoteModel for HttpRemoteModel {
    async fn complete(&self, context: &str) -> Result<String, FallbackReason> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .body(context.to_string())
            .send()
            .await
            .map_err(|e| FallbackReason::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FallbackReason::Transport(format!(
                "endpoint returned {}",
                response.status()
            )));
        }
        response
            .text()
            .await
            .map_err(|e| FallbackReason::Transport(e.to_string()))
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        DecisionCategory, Environment, MachineReading, MachineStatus, Shift, Weather,
    };

    struct CannedModel {
        response: Result<String, FallbackReason>,
    }

    #[async_trait]
    impl RemoteModel for CannedModel {
        async fn complete(&self, _context: &str) -> Result<String, FallbackReason> {
            self.response.clone()
        }
    }

    struct SlowModel;

    #[async_trait]
    impl RemoteModel for SlowModel {
        async fn complete(&self, _context: &str) -> Result<String, FallbackReason> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    fn snapshot() -> TelemetrySnapshot {
        TelemetrySnapshot {
            machines: vec![MachineReading {
                id: "m1".to_string(),
                group: "line-a".to_string(),
                status: MachineStatus::Running,
                rpm: 1200.0,
                temperature: 55.0,
                vibration: 2.0,
                load: 60.0,
                fill_level: Some(0.4),
            }],
            workers: vec![],
            alerts: vec![],
            environment: Environment {
                weather: Weather::Clear,
                shift: Shift::Day,
                sim_time_secs: 1000,
            },
            emergency_active: false,
            drill_active: false,
            drill_phase: Default::default(),
        }
    }

    #[tokio::test]
    async fn valid_decision_response_parses() {
        let model = CannedModel {
            response: Ok(r#"{
                "type": "decision",
                "category": "Maintenance",
                "priority": "High",
                "action": "Service m1",
                "reasoning": "Remote analysis",
                "impact": "Uptime",
                "confidence": 77.0,
                "machine_id": "m1"
            }"#
            .to_string()),
        };
        let outcome = call_remote(
            &model,
            &CompactJsonEncoder,
            &RemoteConfig::default(),
            &snapshot(),
            RemoteRequestKind::Tactical,
        )
        .await;
        match outcome {
            RemoteOutcome::Decision(d) => {
                assert_eq!(d.category, DecisionCategory::Maintenance);
                assert_eq!(d.machine_id.as_deref(), Some("m1"));
            }
            other => panic!("expected decision, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn strategic_response_anchors_ttl_to_sim_clock() {
        let model = CannedModel {
            response: Ok(r#"{
                "type": "strategic",
                "priorities": [
                    {"category": "Optimization", "weight": 3, "machines": ["m1"], "ttl_secs": 300}
                ]
            }"#
            .to_string()),
        };
        let outcome = call_remote(
            &model,
            &CompactJsonEncoder,
            &RemoteConfig::default(),
            &snapshot(),
            RemoteRequestKind::Strategic,
        )
        .await;
        match outcome {
            RemoteOutcome::Strategic(priorities) => {
                assert_eq!(priorities.len(), 1);
                assert_eq!(priorities[0].expires_at_sim_secs, 1300);
            }
            other => panic!("expected strategic set, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_response_falls_back() {
        let model = CannedModel {
            response: Ok("not json at all".to_string()),
        };
        let outcome = call_remote(
            &model,
            &CompactJsonEncoder,
            &RemoteConfig::default(),
            &snapshot(),
            RemoteRequestKind::Tactical,
        )
        .await;
        assert!(matches!(
            outcome,
            RemoteOutcome::Fallback(FallbackReason::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn transport_failure_falls_back() {
        let model = CannedModel {
            response: Err(FallbackReason::Transport("connection refused".to_string())),
        };
        let outcome = call_remote(
            &model,
            &CompactJsonEncoder,
            &RemoteConfig::default(),
            &snapshot(),
            RemoteRequestKind::Tactical,
        )
        .await;
        assert!(matches!(
            outcome,
            RemoteOutcome::Fallback(FallbackReason::Transport(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_model_times_out_to_fallback() {
        let outcome = call_remote(
            &SlowModel,
            &CompactJsonEncoder,
            &RemoteConfig::default(),
            &snapshot(),
            RemoteRequestKind::Tactical,
        )
        .await;
        assert!(matches!(
            outcome,
            RemoteOutcome::Fallback(FallbackReason::Timeout)
        ));
    }

    #[test]
    fn encoder_produces_parseable_json() {
        let context = CompactJsonEncoder.encode(&snapshot(), RemoteRequestKind::Tactical);
        let value: serde_json::Value = serde_json::from_str(&context).expect("valid json");
        assert_eq!(value["request"], "tactical");
        assert_eq!(value["machines"][0]["id"], "m1");
    }
}
