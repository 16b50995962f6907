//! Look-ahead forecaster
//!
//! Extrapolates current telemetry and trends into a short list of predicted
//! near-future events. The list is recomputed wholesale on its own cadence,
//! kept ascending by predicted time, and bounded to a fixed capacity.

use tracing::debug;
use uuid::Uuid;

use crate::config::defaults::{FATIGUE_RATE_PER_HOUR, FORECAST_CAPACITY, FORECAST_HORIZON_SECS};
use crate::config::EngineConfig;
use crate::engine::memory::PatternMemory;
use crate::types::{
    DecisionPriority, MachineStatus, MetricKind, PredictedEvent, PredictedEventKind,
    TelemetrySnapshot, Weather, WorkerStatus,
};

/// Bounded list of predicted events, ascending by predicted time.
#[derive(Debug, Default)]
pub struct Forecaster {
    events: Vec<PredictedEvent>,
}

impl Forecaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the forecast from the current snapshot and metric trends.
    /// Replaces the previous forecast entirely, so stale predictions never
    /// linger past a recomputation.
    pub fn recompute(
        &mut self,
        config: &EngineConfig,
        snapshot: &TelemetrySnapshot,
        memory: &PatternMemory,
    ) {
        let now = snapshot.environment.sim_time_secs;
        let horizon = now + FORECAST_HORIZON_SECS;
        let mut events: Vec<PredictedEvent> = Vec::new();

        self.forecast_shift_change(snapshot, horizon, &mut events);
        self.forecast_machine_wear(config, snapshot, memory, horizon, &mut events);
        self.forecast_weather_stress(snapshot, horizon, &mut events);
        self.forecast_fatigue(config, snapshot, horizon, &mut events);
        self.forecast_optimization_window(config, snapshot, &mut events);

        events.sort_by_key(|e| e.predicted_at_sim_secs);
        events.truncate(FORECAST_CAPACITY);

        debug!(count = events.len(), "Forecast recomputed");
        self.events = events;
    }

    /// Shift boundaries are exact clock times, so this prediction carries
    /// full confidence.
    fn forecast_shift_change(
        &self,
        snapshot: &TelemetrySnapshot,
        horizon: u64,
        events: &mut Vec<PredictedEvent>,
    ) {
        let env = &snapshot.environment;
        let at = env.sim_time_secs + env.secs_to_shift_change();
        if at > horizon {
            return;
        }
        events.push(PredictedEvent {
            id: Uuid::new_v4().to_string(),
            kind: PredictedEventKind::ShiftChange,
            description: format!(
                "{} shift hands over to {} shift",
                env.shift,
                env.shift.next()
            ),
            predicted_at_sim_secs: at,
            confidence: 100.0,
            priority: DecisionPriority::Medium,
            machine_id: None,
        });
    }

    /// Extrapolate rising temperature/vibration to the critical threshold
    /// and predict when each machine crosses it.
    fn forecast_machine_wear(
        &self,
        config: &EngineConfig,
        snapshot: &TelemetrySnapshot,
        memory: &PatternMemory,
        horizon: u64,
        events: &mut Vec<PredictedEvent>,
    ) {
        let now = snapshot.environment.sim_time_secs;
        let cycle_secs = config.cadence.cycle_secs.max(1) as f64;

        for machine in &snapshot.machines {
            if machine.status == MachineStatus::Maintenance {
                continue;
            }
            let wear_paths = [
                (
                    MetricKind::Temperature,
                    machine.temperature,
                    config.thresholds.temperature_critical_c,
                    config.memory.temperature_max_c,
                    "temperature",
                ),
                (
                    MetricKind::Vibration,
                    machine.vibration,
                    config.thresholds.vibration_critical_mm_s,
                    config.memory.vibration_max_mm_s,
                    "vibration",
                ),
            ];
            for (kind, current, critical, norm_max, label) in wear_paths {
                if current >= critical {
                    continue; // already critical, heuristic territory
                }
                let slope_norm = match memory.slope(&machine.id, kind) {
                    Some(s) if s > 0.0 => s,
                    _ => continue,
                };
                // normalized units/sample → raw units/sim-second
                let rate = slope_norm * norm_max / cycle_secs;
                let remaining_secs = ((critical - current) / rate) as u64;
                let at = now + remaining_secs;
                if at > horizon {
                    continue;
                }
                // Nearer crossings are extrapolated over less noise
                let confidence = (90.0
                    - 40.0 * (remaining_secs as f64 / FORECAST_HORIZON_SECS as f64))
                    .clamp(50.0, 90.0);
                events.push(PredictedEvent {
                    id: Uuid::new_v4().to_string(),
                    kind: PredictedEventKind::Maintenance,
                    description: format!(
                        "{} {} projected to reach critical ({:.1}) at current rate",
                        machine.id, label, critical
                    ),
                    predicted_at_sim_secs: at,
                    confidence,
                    priority: if remaining_secs < 1800 {
                        DecisionPriority::High
                    } else {
                        DecisionPriority::Medium
                    },
                    machine_id: Some(machine.id.clone()),
                });
            }
        }
    }

    /// Active severe weather stresses machines and logistics over the
    /// following half hour.
    fn forecast_weather_stress(
        &self,
        snapshot: &TelemetrySnapshot,
        horizon: u64,
        events: &mut Vec<PredictedEvent>,
    ) {
        let now = snapshot.environment.sim_time_secs;
        let (description, priority) = match snapshot.environment.weather {
            Weather::Storm => (
                "Storm conditions: expect power fluctuation and outdoor task delays",
                DecisionPriority::High,
            ),
            Weather::Heatwave => (
                "Heatwave: expect elevated machine temperatures and faster worker fatigue",
                DecisionPriority::High,
            ),
            Weather::Fog => (
                "Fog: expect slowed logistics movement between bays",
                DecisionPriority::Medium,
            ),
            Weather::Clear | Weather::Rain => return,
        };
        let at = now + 1800;
        if at > horizon {
            return;
        }
        events.push(PredictedEvent {
            id: Uuid::new_v4().to_string(),
            kind: PredictedEventKind::Weather,
            description: description.to_string(),
            predicted_at_sim_secs: at,
            confidence: 70.0,
            priority,
            machine_id: None,
        });
    }

    /// Linear fatigue accumulation toward the warning threshold.
    fn forecast_fatigue(
        &self,
        config: &EngineConfig,
        snapshot: &TelemetrySnapshot,
        horizon: u64,
        events: &mut Vec<PredictedEvent>,
    ) {
        let now = snapshot.environment.sim_time_secs;
        let threshold = config.thresholds.fatigue_warning;
        for worker in &snapshot.workers {
            if worker.status != WorkerStatus::Working || worker.fatigue >= threshold {
                continue;
            }
            let remaining_secs =
                ((threshold - worker.fatigue) / FATIGUE_RATE_PER_HOUR * 3600.0) as u64;
            let at = now + remaining_secs;
            if at > horizon {
                continue;
            }
            events.push(PredictedEvent {
                id: Uuid::new_v4().to_string(),
                kind: PredictedEventKind::Fatigue,
                description: format!(
                    "{} projected to reach fatigue threshold, plan a rotation",
                    worker.id
                ),
                predicted_at_sim_secs: at,
                confidence: 65.0,
                priority: DecisionPriority::Medium,
                machine_id: None,
            });
        }
    }

    /// A widening load spread among running machines signals a balancing
    /// opportunity before the imbalance threshold trips.
    fn forecast_optimization_window(
        &self,
        config: &EngineConfig,
        snapshot: &TelemetrySnapshot,
        events: &mut Vec<PredictedEvent>,
    ) {
        let now = snapshot.environment.sim_time_secs;
        let loads: Vec<f64> = snapshot
            .machines
            .iter()
            .filter(|m| m.status == MachineStatus::Running && m.load > 0.0)
            .map(|m| m.load)
            .collect();
        if loads.len() < 2 {
            return;
        }
        let max = loads.iter().cloned().fold(f64::MIN, f64::max);
        let min = loads.iter().cloned().fold(f64::MAX, f64::min);
        let ratio = max / min;
        let approaching = config.thresholds.load_imbalance_ratio * 0.75;
        if ratio < approaching || ratio >= config.thresholds.load_imbalance_ratio {
            return;
        }
        events.push(PredictedEvent {
            id: Uuid::new_v4().to_string(),
            kind: PredictedEventKind::Optimization,
            description: format!(
                "Load spread widening (ratio {ratio:.2}), rebalancing window ahead"
            ),
            predicted_at_sim_secs: now + 600,
            confidence: 60.0,
            priority: DecisionPriority::Low,
            machine_id: None,
        });
    }

    /// Current forecast, ascending by predicted time. Value copy.
    pub fn events(&self) -> Vec<PredictedEvent> {
        self.events.clone()
    }

    /// Earliest predicted event, if any. Value copy.
    pub fn next_event(&self) -> Option<PredictedEvent> {
        self.events.first().cloned()
    }
}
