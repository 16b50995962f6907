//! Mode coordination
//!
//! Decides which generation layers run each cycle and drives the remote
//! path with its heuristic fallback. Three independent predicates govern a
//! cycle: the tactical layer (always on), the remote-tactical override
//! (remote mode), and the low-cadence strategic layer (hybrid mode). A
//! reentrancy gate ensures a slow remote call can never let a second
//! tactical decision for the same tick family through.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::config::{EngineMode, RemoteConfig};
use crate::engine::remote::{call_remote, ContextEncoder, RemoteModel, RemoteRequestKind};
use crate::engine::DecisionEngine;
use crate::types::{Decision, RemoteOutcome, TelemetrySnapshot};

/// Whether the remote model replaces the heuristic for tactical decisions.
pub fn remote_mode_active(mode: EngineMode) -> bool {
    mode == EngineMode::Remote
}

/// Whether a strategic call is due this cycle.
pub fn strategic_layer_active(
    mode: EngineMode,
    last_call: Option<u64>,
    now_sim_secs: u64,
    interval_secs: u64,
) -> bool {
    if mode != EngineMode::Hybrid {
        return false;
    }
    match last_call {
        None => true,
        Some(t) => now_sim_secs.saturating_sub(t) >= interval_secs,
    }
}

/// Drives the engine's per-cycle evaluation across modes.
pub struct Coordinator {
    engine: Arc<Mutex<DecisionEngine>>,
    model: Arc<dyn RemoteModel>,
    encoder: Arc<dyn ContextEncoder>,
    tactical_in_flight: AtomicBool,
    last_strategic: Mutex<Option<u64>>,
}

impl Coordinator {
    pub fn new(
        engine: Arc<Mutex<DecisionEngine>>,
        model: Arc<dyn RemoteModel>,
        encoder: Arc<dyn ContextEncoder>,
    ) -> Self {
        Self {
            engine,
            model,
            encoder,
            tactical_in_flight: AtomicBool::new(false),
            last_strategic: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> Arc<Mutex<DecisionEngine>> {
        Arc::clone(&self.engine)
    }

    /// One tactical tick. At most one decision per tick; an overlapping
    /// invocation while a remote call is in flight yields None without
    /// touching engine state.
    pub async fn run_cycle(&self, snapshot: &TelemetrySnapshot) -> Option<Decision> {
        if self
            .tactical_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Tactical cycle already in flight, skipping overlapping tick");
            return None;
        }
        let decision = self.run_cycle_gated(snapshot).await;
        self.tactical_in_flight.store(false, Ordering::SeqCst);
        decision
    }

    async fn run_cycle_gated(&self, snapshot: &TelemetrySnapshot) -> Option<Decision> {
        let (mode, remote_config) = {
            let engine = self.lock_engine();
            (engine.config().mode, engine.config().remote.clone())
        };
        let now = snapshot.environment.sim_time_secs;

        // Strategic layer: independent of the tactical result.
        let strategic_interval = {
            let engine = self.lock_engine();
            engine.config().cadence.strategic_interval_secs
        };
        let last = *self.lock_last_strategic();
        if strategic_layer_active(mode, last, now, strategic_interval) {
            self.run_strategic(&remote_config, snapshot, now).await;
        }

        // Tactical layer.
        if remote_mode_active(mode) {
            match call_remote(
                self.model.as_ref(),
                self.encoder.as_ref(),
                &remote_config,
                snapshot,
                RemoteRequestKind::Tactical,
            )
            .await
            {
                RemoteOutcome::Decision(decision) => {
                    return Some(self.lock_engine().emit_external(decision, snapshot));
                }
                RemoteOutcome::Strategic(priorities) => {
                    // Tactical request answered with a strategic set: keep
                    // the set, fall back for the tactical decision.
                    self.lock_engine().apply_strategic(priorities);
                }
                RemoteOutcome::Fallback(reason) => {
                    debug!(reason = %reason, "Remote tactical unavailable, using heuristic");
                }
            }
        }
        self.lock_engine().generate(snapshot, None)
    }

    async fn run_strategic(
        &self,
        remote_config: &RemoteConfig,
        snapshot: &TelemetrySnapshot,
        now: u64,
    ) {
        *self.lock_last_strategic() = Some(now);
        match call_remote(
            self.model.as_ref(),
            self.encoder.as_ref(),
            remote_config,
            snapshot,
            RemoteRequestKind::Strategic,
        )
        .await
        {
            RemoteOutcome::Strategic(priorities) => {
                self.lock_engine().apply_strategic(priorities);
            }
            RemoteOutcome::Decision(_) => {
                warn!("Strategic request answered with a tactical decision, discarding");
            }
            RemoteOutcome::Fallback(reason) => {
                debug!(reason = %reason, "Strategic call unavailable this interval");
            }
        }
    }

    fn lock_engine(&self) -> std::sync::MutexGuard<'_, DecisionEngine> {
        match self.engine.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_last_strategic(&self) -> std::sync::MutexGuard<'_, Option<u64>> {
        match self.last_strategic.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::remote::CompactJsonEncoder;
    use crate::types::{
        DecisionCategory, Environment, FallbackReason, MachineReading, MachineStatus, Shift,
        Weather,
    };
    use async_trait::async_trait;
    use std::time::Duration;

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

    fn warm_snapshot(sim_time_secs: u64) -> TelemetrySnapshot {
        TelemetrySnapshot {
            machines: vec![MachineReading {
                id: "m1".to_string(),
                group: "line-a".to_string(),
                status: MachineStatus::Running,
                rpm: 1200.0,
                temperature: 80.0,
                vibration: 2.0,
                load: 60.0,
                fill_level: Some(0.4),
            }],
            workers: vec![],
            alerts: vec![],
            environment: Environment {
                weather: Weather::Clear,
                shift: Shift::Day,
                sim_time_secs,
            },
            emergency_active: false,
            drill_active: false,
            drill_phase: Default::default(),
        }
    }

    fn coordinator(mode: EngineMode, model: Arc<dyn RemoteModel>) -> Coordinator {
        let mut config = EngineConfig::default();
        config.mode = mode;
        Coordinator::new(
            Arc::new(Mutex::new(DecisionEngine::new(config))),
            model,
            Arc::new(CompactJsonEncoder),
        )
    }

    #[tokio::test]
    async fn remote_mode_emits_remote_decision_through_pipeline() {
        let model = Arc::new(CannedModel {
            response: Ok(r#"{
                "type": "decision",
                "category": "Optimization",
                "priority": "Medium",
                "action": "Rebalance line-a",
                "reasoning": "Remote analysis",
                "impact": "Throughput",
                "confidence": 70.0,
                "machine_id": "m1"
            }"#
            .to_string()),
        });
        let coordinator = coordinator(EngineMode::Remote, model);
        let d = coordinator
            .run_cycle(&warm_snapshot(100))
            .await
            .expect("remote decision");
        assert_eq!(d.category, DecisionCategory::Optimization);

        let engine = coordinator.engine();
        let engine = engine.lock().expect("not poisoned");
        assert_eq!(engine.impact_stats().total_decisions, 1);
        assert_eq!(engine.recent_decisions(5).len(), 1);
    }

    #[tokio::test]
    async fn remote_failure_falls_back_to_heuristic_same_tick() {
        let model = Arc::new(CannedModel {
            response: Err(FallbackReason::Transport("connection refused".to_string())),
        });
        let coordinator = coordinator(EngineMode::Remote, model);
        let d = coordinator
            .run_cycle(&warm_snapshot(100))
            .await
            .expect("heuristic fallback");
        // The warm machine's maintenance condition wins locally
        assert_eq!(d.category, DecisionCategory::Maintenance);
        assert_eq!(d.machine_id.as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn hybrid_mode_applies_strategic_set_and_keeps_tactical_local() {
        let model = Arc::new(CannedModel {
            response: Ok(r#"{
                "type": "strategic",
                "priorities": [
                    {"category": "Maintenance", "weight": 3, "machines": [], "ttl_secs": 600}
                ]
            }"#
            .to_string()),
        });
        let coordinator = coordinator(EngineMode::Hybrid, model);
        let d = coordinator
            .run_cycle(&warm_snapshot(100))
            .await
            .expect("tactical decision still heuristic");
        assert_eq!(d.category, DecisionCategory::Maintenance);

        let engine = coordinator.engine();
        let engine = engine.lock().expect("not poisoned");
        assert_eq!(engine.strategic_priorities().len(), 1);
    }

    #[tokio::test]
    async fn heuristic_mode_never_calls_remote() {
        // A slow model would hang the cycle if it were called
        let coordinator = coordinator(EngineMode::Heuristic, Arc::new(SlowModel));
        let d = coordinator
            .run_cycle(&warm_snapshot(100))
            .await
            .expect("heuristic decision");
        assert_eq!(d.category, DecisionCategory::Maintenance);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_tick_is_gated_out() {
        let coordinator = coordinator(EngineMode::Remote, Arc::new(SlowModel));
        let snapshot = warm_snapshot(100);
        // First cycle holds the gate while its remote call times out; the
        // concurrent second cycle must refuse to run.
        let (first, second) =
            tokio::join!(coordinator.run_cycle(&snapshot), coordinator.run_cycle(&snapshot));
        let emitted: Vec<_> = [first, second].into_iter().flatten().collect();
        assert_eq!(emitted.len(), 1, "exactly one tactical decision per tick family");

        let engine = coordinator.engine();
        let engine = engine.lock().expect("not poisoned");
        assert_eq!(engine.impact_stats().total_decisions, 1);
    }
}
