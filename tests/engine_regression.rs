//! End-to-end regression over the public engine API: a long scenario run
//! against the documented bounds and behavioral guarantees.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use foreman::engine::coordinator::Coordinator;
use foreman::engine::remote::{CompactJsonEncoder, RemoteModel};
use foreman::types::{
    Environment, FallbackReason, MachineReading, MachineStatus, MetricKind, Shift,
    TelemetrySnapshot, Weather, WorkerReading, WorkerRole, WorkerStatus,
};
use foreman::{
    should_trigger_audio_cue, DecisionCategory, DecisionEngine, DecisionPriority, EngineConfig,
    EngineMode,
};

fn machine(id: &str, group: &str, temperature: f64, vibration: f64, load: f64) -> MachineReading {
    MachineReading {
        id: id.to_string(),
        group: group.to_string(),
        status: if temperature > 92.0 || vibration > 6.5 {
            MachineStatus::Critical
        } else if temperature > 75.0 || vibration > 3.5 {
            MachineStatus::Warning
        } else {
            MachineStatus::Running
        },
        rpm: 1400.0,
        temperature,
        vibration,
        load,
        fill_level: Some(0.4),
    }
}

fn snapshot(machines: Vec<MachineReading>, sim_time_secs: u64) -> TelemetrySnapshot {
    TelemetrySnapshot {
        machines,
        workers: vec![WorkerReading {
            id: "worker-00".to_string(),
            role: WorkerRole::Operator,
            status: WorkerStatus::Working,
            fatigue: 0.4,
        }],
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

/// A few hundred cycles of a degrading facility: every emitted decision
/// stays within the confidence range and every bounded memory stays within
/// its cap.
#[test]
fn long_run_respects_bounds_and_confidence_range() {
    let mut engine = DecisionEngine::new(EngineConfig::default());
    let mut emitted = Vec::new();

    for cycle in 0..400u64 {
        let now = 6 * 3600 + cycle * 5;
        // Temperatures drift upward over the run; one machine ramps hard
        let drift = (cycle as f64 * 0.12).min(50.0);
        let machines = vec![
            machine("press-01", "line-a", 55.0 + drift, 1.8, 60.0),
            machine("press-02", "line-a", 56.0 + drift, 1.9, 62.0),
            machine("mixer-01", "line-b", 54.0, 1.7 + (cycle % 7) as f64 * 0.9, 58.0),
        ];
        if let Some(d) = engine.generate(&snapshot(machines, now), None) {
            assert!((0.0..=100.0).contains(&d.confidence), "cycle {cycle}");
            emitted.push(d);
        }
    }
    assert!(!emitted.is_empty(), "a degrading run must emit decisions");

    assert!(engine.predicted_events().len() <= 10);
    assert!(engine.patterns().len() <= 50);
    assert!(engine.anomalies().len() <= 100);
    for id in ["press-01", "press-02", "mixer-01"] {
        for kind in MetricKind::ALL {
            let spark = engine.sparkline(id, kind);
            assert!(spark.len() <= 60);
            assert!(spark.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }
    assert!(engine.sparkline("unknown-machine", MetricKind::Rpm).is_empty());

    let stats = engine.impact_stats();
    assert_eq!(stats.category_count_sum(), stats.total_decisions);
}

#[test]
fn same_machine_same_category_deduped_within_cooldown() {
    let mut engine = DecisionEngine::new(EngineConfig::default());
    let warm = |now| snapshot(vec![machine("press-01", "line-a", 80.0, 1.8, 60.0)], now);

    let first = engine.generate(&warm(100), None);
    let second = engine.generate(&warm(110), None);
    let emitted = [first, second].into_iter().flatten().count();
    assert_eq!(emitted, 1);
}

#[test]
fn critical_machine_scenario_yields_urgent_targeted_decision() {
    let mut engine = DecisionEngine::new(EngineConfig::default());
    let snap = snapshot(vec![machine("press-01", "line-a", 85.0, 4.5, 60.0)], 100);
    // status Warning from the helper; force critical as in the field report
    let mut snap = snap;
    snap.machines[0].status = MachineStatus::Critical;

    let d = engine.generate(&snap, None).expect("urgent condition");
    assert!(matches!(
        d.category,
        DecisionCategory::Maintenance | DecisionCategory::Safety
    ));
    assert!(d.priority >= DecisionPriority::High);
    assert_eq!(d.machine_id.as_deref(), Some("press-01"));
}

#[test]
fn empty_machine_set_is_a_valid_no_action_cycle() {
    let mut engine = DecisionEngine::new(EngineConfig::default());
    assert!(engine.generate(&snapshot(vec![], 100), None).is_none());
}

#[test]
fn repeated_optimization_successes_move_adjustment_positive_within_clamp() {
    let mut engine = DecisionEngine::new(EngineConfig::default());
    let clamp = engine.config().calibrator.adjustment_clamp;
    let before = engine.confidence_adjustments()[&DecisionCategory::Optimization];
    assert_eq!(before, 0.0);

    // Imbalanced load pair re-qualifies after each optimization cooldown
    for i in 0..5u64 {
        let now = 100 + i * 400;
        let snap = snapshot(
            vec![
                machine("press-01", "line-a", 55.0, 1.8, 95.0),
                machine("press-02", "line-a", 55.0, 1.8, 30.0),
            ],
            now,
        );
        let d = engine
            .generate(&snap, Some(DecisionCategory::Optimization))
            .expect("imbalance qualifies");
        let outcome = if i % 2 == 0 { "Success" } else { "Resolved" };
        assert!(engine.record_outcome(&d.id, outcome));
    }

    let after = engine.confidence_adjustments()[&DecisionCategory::Optimization];
    assert!(after > before, "successes must raise the adjustment");
    assert!(after <= clamp, "adjustment must stay within the clamp");
}

#[test]
fn audio_cue_truth_table_on_emitted_decisions() {
    let mut engine = DecisionEngine::new(EngineConfig::default());

    // Critical machine → critical-priority decision → cue
    let mut snap = snapshot(vec![machine("press-01", "line-a", 55.0, 1.8, 60.0)], 100);
    snap.machines[0].status = MachineStatus::Critical;
    let critical = engine.generate(&snap, None).expect("critical condition");
    assert_eq!(critical.priority, DecisionPriority::Critical);
    assert!(should_trigger_audio_cue(&critical));

    // Low-priority optimization → no cue
    let imbalanced = snapshot(
        vec![
            machine("mixer-01", "line-b", 55.0, 1.8, 95.0),
            machine("mixer-02", "line-b", 55.0, 1.8, 30.0),
        ],
        1000,
    );
    let routine = engine
        .generate(&imbalanced, Some(DecisionCategory::Optimization))
        .expect("imbalance qualifies");
    assert_eq!(routine.category, DecisionCategory::Optimization);
    assert!(routine.priority < DecisionPriority::High);
    assert!(!should_trigger_audio_cue(&routine));
}

#[test]
fn predicted_event_accessor_returns_distinct_copies() {
    let mut engine = DecisionEngine::new(EngineConfig::default());
    engine.generate(
        &snapshot(vec![machine("press-01", "line-a", 55.0, 1.8, 60.0)], 100),
        None,
    );
    let mut first = engine.predicted_events();
    let second = engine.predicted_events();
    assert_eq!(first.len(), second.len());
    first.clear();
    assert_eq!(engine.predicted_events().len(), second.len());
}

struct FailingModel;

#[async_trait]
impl RemoteModel for FailingModel {
    async fn complete(&self, _context: &str) -> Result<String, FallbackReason> {
        Err(FallbackReason::Transport("connection refused".to_string()))
    }
}

/// Remote mode with an unreachable model: every tick still produces a
/// heuristic decision when a condition qualifies, and the failure never
/// escapes the coordinator.
#[tokio::test]
async fn unreachable_remote_degrades_to_heuristic() {
    let mut config = EngineConfig::default();
    config.mode = EngineMode::Remote;
    let coordinator = Coordinator::new(
        Arc::new(Mutex::new(DecisionEngine::new(config))),
        Arc::new(FailingModel),
        Arc::new(CompactJsonEncoder),
    );

    let snap = snapshot(vec![machine("press-01", "line-a", 80.0, 1.8, 60.0)], 100);
    let d = coordinator
        .run_cycle(&snap)
        .await
        .expect("heuristic fallback decision");
    assert_eq!(d.category, DecisionCategory::Maintenance);
    assert_eq!(d.machine_id.as_deref(), Some("press-01"));
}
