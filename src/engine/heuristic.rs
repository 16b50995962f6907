//! Heuristic decision generator
//!
//! Scans the telemetry snapshot for qualifying conditions and produces at
//! most one tactical decision per cycle. Conditions are ranked by a score:
//! emergency and critical-safety conditions first, then by severity of
//! metric deviation. Candidates inside a cooldown window are skipped before
//! scoring; strategic priorities and the confidence calibrator shape the
//! final pick.

use tracing::debug;

use crate::config::EngineConfig;
use crate::engine::calibrator::ConfidenceCalibrator;
use crate::engine::ledger::CooldownLedger;
use crate::engine::memory::PatternMemory;
use crate::types::{
    AlertCategory, Decision, DecisionCategory, DecisionPriority, DrillPhase, MachineStatus,
    StrategicPriority, TelemetrySnapshot, WorkerStatus,
};

/// Entity key for facility-wide decisions that target no single machine.
const FACILITY_ENTITY: &str = "facility";

/// Read-only inputs the generator scores against.
pub struct HeuristicContext<'a> {
    pub config: &'a EngineConfig,
    pub ledger: &'a CooldownLedger,
    pub calibrator: &'a ConfidenceCalibrator,
    pub memory: &'a PatternMemory,
    pub strategic: &'a [StrategicPriority],
}

/// An un-emitted decision candidate with its ranking score.
#[derive(Debug)]
pub struct Candidate {
    pub category: DecisionCategory,
    pub priority: DecisionPriority,
    pub action: String,
    pub reasoning: String,
    pub impact: String,
    /// Base confidence before calibrator adjustment
    pub base_confidence: f64,
    /// Ranking score; highest wins the cycle
    pub score: f64,
    pub machine_id: Option<String>,
    pub worker_id: Option<String>,
}

impl Candidate {
    /// Cooldown key: the machine, the worker, or the facility as a whole.
    pub fn entity_id(&self) -> &str {
        self.machine_id
            .as_deref()
            .or(self.worker_id.as_deref())
            .unwrap_or(FACILITY_ENTITY)
    }
}

/// Produce the winning candidate for this cycle, or None when nothing
/// qualifies. An empty machine set is a valid "no action needed" result.
///
/// `forced` restricts the scan to a single category (drills and tests).
pub fn generate(
    ctx: &HeuristicContext<'_>,
    snapshot: &TelemetrySnapshot,
    forced: Option<DecisionCategory>,
) -> Option<Decision> {
    if snapshot.machines.is_empty() {
        return None;
    }
    let now = snapshot.environment.sim_time_secs;

    let mut candidates: Vec<Candidate> = Vec::new();
    scan_emergency(snapshot, &mut candidates);
    scan_drill(snapshot, now, &mut candidates);
    scan_machines(ctx.config, snapshot, &mut candidates);
    scan_alerts(snapshot, &mut candidates);
    scan_fill_levels(ctx.config, snapshot, &mut candidates);
    scan_load_balance(ctx.config, snapshot, &mut candidates);
    scan_workers(ctx.config, snapshot, &mut candidates);
    scan_anomalies(ctx, snapshot, now, &mut candidates);

    let mut best: Option<Candidate> = None;
    for mut candidate in candidates {
        if let Some(category) = forced {
            if candidate.category != category {
                continue;
            }
        }
        if !ctx.ledger.can_emit(
            &ctx.config.cooldowns,
            candidate.entity_id(),
            candidate.category,
            candidate.priority,
            now,
        ) {
            debug!(
                entity = candidate.entity_id(),
                category = %candidate.category,
                "Candidate suppressed by cooldown"
            );
            continue;
        }
        candidate.score += strategic_bonus(ctx, &candidate, now);
        match &best {
            Some(current) if current.score >= candidate.score => {}
            _ => best = Some(candidate),
        }
    }

    let winner = best?;
    let confidence = winner.base_confidence
        + ctx
            .calibrator
            .adjustment_for(&ctx.config.calibrator, winner.category);

    let mut decision = Decision::new(
        winner.category,
        winner.priority,
        winner.action,
        winner.reasoning,
        winner.impact,
        confidence,
    );
    decision.machine_id = winner.machine_id;
    decision.worker_id = winner.worker_id;
    Some(decision)
}

/// Additive bonus from active strategic priorities matching the candidate's
/// category, capped. A priority with a machine affinity list only applies
/// to machines it names.
fn strategic_bonus(ctx: &HeuristicContext<'_>, candidate: &Candidate, now_sim_secs: u64) -> f64 {
    let remote = &ctx.config.remote;
    let mut bonus = 0.0;
    for priority in ctx.strategic {
        if priority.is_expired(now_sim_secs) || priority.category != candidate.category {
            continue;
        }
        if !priority.machines.is_empty() {
            let matches = candidate
                .machine_id
                .as_deref()
                .map(|m| priority.machines.iter().any(|p| p == m))
                .unwrap_or(false);
            if !matches {
                continue;
            }
        }
        bonus += priority.weight as f64 * remote.strategic_bonus_per_weight;
    }
    bonus.min(remote.strategic_bonus_cap)
}

fn scan_emergency(snapshot: &TelemetrySnapshot, candidates: &mut Vec<Candidate>) {
    if !snapshot.emergency_active {
        return;
    }
    candidates.push(Candidate {
        category: DecisionCategory::Safety,
        priority: DecisionPriority::Critical,
        action: "Halt all running machines and clear personnel from active bays".to_string(),
        reasoning: "Facility emergency flag is active".to_string(),
        impact: "Personnel safety during an active emergency".to_string(),
        base_confidence: 95.0,
        score: 120.0,
        machine_id: None,
        worker_id: None,
    });
}

/// During a drill only the current phase's instruction qualifies.
fn scan_drill(snapshot: &TelemetrySnapshot, _now: u64, candidates: &mut Vec<Candidate>) {
    if !snapshot.drill_active {
        return;
    }
    let (category, priority, action, impact) = match snapshot.drill_phase {
        DrillPhase::None | DrillPhase::Review => return,
        DrillPhase::Alert => (
            DecisionCategory::Safety,
            DecisionPriority::High,
            "Sound the drill alert and pause non-essential tasks",
            "Drill readiness: alert acknowledged by all crews",
        ),
        DrillPhase::Evacuation => (
            DecisionCategory::Safety,
            DecisionPriority::High,
            "Guide workers along evacuation routes to the exits",
            "Drill readiness: evacuation routes exercised",
        ),
        DrillPhase::Assembly => (
            DecisionCategory::Assignment,
            DecisionPriority::High,
            "Direct all workers to the assembly point for headcount",
            "Drill readiness: full headcount at assembly",
        ),
    };
    candidates.push(Candidate {
        category,
        priority,
        action: action.to_string(),
        reasoning: format!("Emergency drill in progress, phase: {}", snapshot.drill_phase),
        impact: impact.to_string(),
        base_confidence: 92.0,
        score: 100.0,
        machine_id: None,
        worker_id: None,
    });
}

/// Per-machine condition scan: critical status, then critical and warning
/// metric deviations. Scores grow with the deviation above threshold.
fn scan_machines(
    config: &EngineConfig,
    snapshot: &TelemetrySnapshot,
    candidates: &mut Vec<Candidate>,
) {
    let t = &config.thresholds;
    for machine in &snapshot.machines {
        if machine.status == MachineStatus::Maintenance {
            continue;
        }
        if machine.status == MachineStatus::Critical {
            candidates.push(Candidate {
                category: DecisionCategory::Safety,
                priority: DecisionPriority::Critical,
                action: format!("Emergency-stop {} and keep personnel clear", machine.id),
                reasoning: format!("{} is in critical state", machine.id),
                impact: "Prevent equipment damage and injury".to_string(),
                base_confidence: 90.0,
                score: 90.0,
                machine_id: Some(machine.id.clone()),
                worker_id: None,
            });
            continue;
        }
        if machine.temperature >= t.temperature_critical_c {
            let over = machine.temperature - t.temperature_critical_c;
            candidates.push(Candidate {
                category: DecisionCategory::Maintenance,
                priority: DecisionPriority::Critical,
                action: format!("Shut down {} for immediate cooling inspection", machine.id),
                reasoning: format!(
                    "{} temperature {:.1}°C exceeds critical {:.1}°C",
                    machine.id, machine.temperature, t.temperature_critical_c
                ),
                impact: "Avoid heat-induced component failure".to_string(),
                base_confidence: 88.0,
                score: 80.0 + over,
                machine_id: Some(machine.id.clone()),
                worker_id: None,
            });
        } else if machine.temperature >= t.temperature_warning_c {
            let over = machine.temperature - t.temperature_warning_c;
            candidates.push(Candidate {
                category: DecisionCategory::Maintenance,
                priority: DecisionPriority::High,
                action: format!("Schedule cooling-system service on {}", machine.id),
                reasoning: format!(
                    "{} temperature {:.1}°C above warning {:.1}°C",
                    machine.id, machine.temperature, t.temperature_warning_c
                ),
                impact: "Head off a forced shutdown later in the shift".to_string(),
                base_confidence: 78.0,
                score: 60.0 + over,
                machine_id: Some(machine.id.clone()),
                worker_id: None,
            });
        }
        if machine.vibration >= t.vibration_critical_mm_s {
            let over = machine.vibration - t.vibration_critical_mm_s;
            candidates.push(Candidate {
                category: DecisionCategory::Maintenance,
                priority: DecisionPriority::Critical,
                action: format!("Stop {} and inspect bearings and mounts", machine.id),
                reasoning: format!(
                    "{} vibration {:.1} mm/s exceeds critical {:.1} mm/s",
                    machine.id, machine.vibration, t.vibration_critical_mm_s
                ),
                impact: "Prevent mechanical failure from severe vibration".to_string(),
                base_confidence: 87.0,
                score: 80.0 + over * 4.0,
                machine_id: Some(machine.id.clone()),
                worker_id: None,
            });
        } else if machine.vibration >= t.vibration_warning_mm_s {
            let over = machine.vibration - t.vibration_warning_mm_s;
            candidates.push(Candidate {
                category: DecisionCategory::Maintenance,
                priority: DecisionPriority::High,
                action: format!("Book a vibration check on {}", machine.id),
                reasoning: format!(
                    "{} vibration {:.1} mm/s above warning {:.1} mm/s",
                    machine.id, machine.vibration, t.vibration_warning_mm_s
                ),
                impact: "Catch bearing wear before it spreads".to_string(),
                base_confidence: 76.0,
                score: 58.0 + over * 4.0,
                machine_id: Some(machine.id.clone()),
                worker_id: None,
            });
        }
    }
}

fn scan_alerts(snapshot: &TelemetrySnapshot, candidates: &mut Vec<Candidate>) {
    for alert in &snapshot.alerts {
        match alert.category {
            AlertCategory::SafetyIncident => candidates.push(Candidate {
                category: DecisionCategory::Safety,
                priority: DecisionPriority::High,
                action: format!("Respond to safety incident: {}", alert.message),
                reasoning: format!("Active safety alert {}", alert.id),
                impact: "Contain the incident before it escalates".to_string(),
                base_confidence: 85.0,
                score: 85.0,
                machine_id: alert.machine_id.clone(),
                worker_id: None,
            }),
            AlertCategory::MachineFault => candidates.push(Candidate {
                category: DecisionCategory::Maintenance,
                priority: DecisionPriority::High,
                action: format!("Dispatch a technician for fault: {}", alert.message),
                reasoning: format!("Active machine-fault alert {}", alert.id),
                impact: "Restore the faulted machine to service".to_string(),
                base_confidence: 80.0,
                score: 65.0,
                machine_id: alert.machine_id.clone(),
                worker_id: None,
            }),
            AlertCategory::SupplyShortage => candidates.push(Candidate {
                category: DecisionCategory::Assignment,
                priority: DecisionPriority::Medium,
                action: format!("Reroute logistics to cover shortage: {}", alert.message),
                reasoning: format!("Active supply alert {}", alert.id),
                impact: "Keep production lines fed".to_string(),
                base_confidence: 72.0,
                score: 48.0,
                machine_id: alert.machine_id.clone(),
                worker_id: None,
            }),
            AlertCategory::Environment => {}
        }
    }
}

fn scan_fill_levels(
    config: &EngineConfig,
    snapshot: &TelemetrySnapshot,
    candidates: &mut Vec<Candidate>,
) {
    let threshold = config.thresholds.fill_level_warning;
    for machine in &snapshot.machines {
        let fill = match machine.fill_level {
            Some(f) if f >= threshold => f,
            _ => continue,
        };
        candidates.push(Candidate {
            category: DecisionCategory::Assignment,
            priority: DecisionPriority::Medium,
            action: format!("Send transport to unload {}", machine.id),
            reasoning: format!(
                "{} storage at {:.0}% of capacity",
                machine.id,
                fill * 100.0
            ),
            impact: "Avoid a full-storage stall".to_string(),
            base_confidence: 75.0,
            score: 50.0 + (fill - threshold) * 100.0,
            machine_id: Some(machine.id.clone()),
            worker_id: None,
        });
    }
}

/// Load spread across running machines; flagged once max/min exceeds the
/// configured ratio.
fn scan_load_balance(
    config: &EngineConfig,
    snapshot: &TelemetrySnapshot,
    candidates: &mut Vec<Candidate>,
) {
    let running: Vec<_> = snapshot
        .machines
        .iter()
        .filter(|m| m.status == MachineStatus::Running && m.load > 0.0)
        .collect();
    if running.len() < 2 {
        return;
    }
    let busiest = match running
        .iter()
        .max_by(|a, b| a.load.total_cmp(&b.load)) {
        Some(m) => *m,
        None => return,
    };
    let idlest = match running
        .iter()
        .min_by(|a, b| a.load.total_cmp(&b.load)) {
        Some(m) => *m,
        None => return,
    };
    let ratio = busiest.load / idlest.load;
    if ratio < config.thresholds.load_imbalance_ratio {
        return;
    }
    candidates.push(Candidate {
        category: DecisionCategory::Optimization,
        priority: DecisionPriority::Medium,
        action: format!("Shift work from {} to {}", busiest.id, idlest.id),
        reasoning: format!(
            "Load ratio {:.2} between {} ({:.0}%) and {} ({:.0}%)",
            ratio, busiest.id, busiest.load, idlest.id, idlest.load
        ),
        impact: "Even out wear and raise line throughput".to_string(),
        base_confidence: 70.0,
        score: 40.0 + (ratio - config.thresholds.load_imbalance_ratio) * 10.0,
        machine_id: Some(busiest.id.clone()),
        worker_id: None,
    });
}

fn scan_workers(
    config: &EngineConfig,
    snapshot: &TelemetrySnapshot,
    candidates: &mut Vec<Candidate>,
) {
    for worker in &snapshot.workers {
        let tired = worker.status == WorkerStatus::Fatigued
            || worker.fatigue >= config.thresholds.fatigue_warning;
        if !tired {
            continue;
        }
        candidates.push(Candidate {
            category: DecisionCategory::Assignment,
            priority: DecisionPriority::Medium,
            action: format!("Rotate {} out for a break", worker.id),
            reasoning: format!(
                "{} fatigue at {:.0}%",
                worker.id,
                worker.fatigue * 100.0
            ),
            impact: "Reduce error risk from fatigue".to_string(),
            base_confidence: 74.0,
            score: 45.0 + worker.fatigue * 10.0,
            machine_id: None,
            worker_id: Some(worker.id.clone()),
        });
    }
}

/// Fresh anomalies become pre-emptive prediction candidates.
fn scan_anomalies(
    ctx: &HeuristicContext<'_>,
    snapshot: &TelemetrySnapshot,
    now: u64,
    candidates: &mut Vec<Candidate>,
) {
    let window_start = now.saturating_sub(ctx.config.cadence.cycle_secs * 6);
    for anomaly in ctx.memory.anomalies_since(window_start) {
        if snapshot.machine(&anomaly.machine_id).is_none() {
            continue;
        }
        let excess = anomaly.z_score.abs() - ctx.config.memory.anomaly_sigma;
        candidates.push(Candidate {
            category: DecisionCategory::Prediction,
            priority: DecisionPriority::Medium,
            action: format!(
                "Investigate {} anomaly on {}",
                anomaly.metric, anomaly.machine_id
            ),
            reasoning: format!(
                "{} {} deviated {:.1}σ from its rolling mean",
                anomaly.machine_id, anomaly.metric, anomaly.z_score
            ),
            impact: "Act on the deviation before it becomes a fault".to_string(),
            base_confidence: 68.0,
            score: 35.0 + excess.max(0.0) * 5.0,
            machine_id: Some(anomaly.machine_id.clone()),
            worker_id: None,
        });
    }
}
