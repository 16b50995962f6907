//! Facility Simulation
//!
//! Generates realistic facility telemetry for exercising the foreman
//! engine. Simulates several operating scenarios:
//! - Normal steady-state operation
//! - Heat buildup (cooling degradation on one machine)
//! - Vibration fault (bearing wear on one machine)
//! - Supply strain (storage filling up, fatigued workers)
//! - Emergency drill (phased drill walkthrough)
//!
//! # Usage
//! ```bash
//! ./simulation --hours 2 --speed 200 --mode heuristic
//! ```

use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

use foreman::engine::coordinator::Coordinator;
use foreman::engine::remote::{CompactJsonEncoder, HttpRemoteModel};
use foreman::engine::shift::ShiftObserver;
use foreman::engine::DecisionEngine;
use foreman::types::{
    AlertCategory, AlertRecord, DrillPhase, Environment, MachineReading, MachineStatus, Shift,
    TelemetrySnapshot, Weather, WorkerReading, WorkerRole, WorkerStatus,
};
use foreman::{should_trigger_audio_cue, EngineConfig, EngineMode};

// ============================================================================
// Facility Constants
// ============================================================================

/// Baseline machine RPM
const BASE_RPM: f64 = 1400.0;
/// Baseline machine temperature (°C)
const BASE_TEMP: f64 = 55.0;
/// Baseline vibration (mm/s)
const BASE_VIB: f64 = 1.8;
/// Baseline load (%)
const BASE_LOAD: f64 = 60.0;
/// Fatigue gained per simulated hour of work
const FATIGUE_PER_HOUR: f64 = 0.06;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "facility-simulation")]
#[command(about = "Facility telemetry simulation for foreman engine testing")]
#[command(version = "1.0")]
struct Args {
    /// Simulation duration in simulated hours (1-24)
    #[arg(short = 'H', long, default_value = "2", value_parser = clap::value_parser!(u32).range(1..=24))]
    hours: u32,

    /// Time compression factor (1 = real-time, 200 = 200x faster)
    #[arg(short, long, default_value = "200", value_parser = clap::value_parser!(u32).range(1..=1000))]
    speed: u32,

    /// Number of simulated machines
    #[arg(long, default_value = "6", value_parser = clap::value_parser!(u32).range(1..=32))]
    machines: u32,

    /// Number of simulated workers
    #[arg(long, default_value = "8", value_parser = clap::value_parser!(u32).range(1..=64))]
    workers: u32,

    /// Engine mode: heuristic, remote, or hybrid
    #[arg(long, default_value = "heuristic")]
    mode: String,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Suppress per-decision narration (summary only)
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================================
// Scenario Phases
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// Steady-state running (0-30%)
    Normal,
    /// Cooling degradation on one machine (30-50%)
    HeatBuildup,
    /// Bearing wear on another machine (50-65%)
    VibrationFault,
    /// Storage filling and fatigue climbing (65-80%)
    SupplyStrain,
    /// Phased emergency drill (80-90%)
    EmergencyDrill,
    /// Return to steady state (90-100%)
    Recovery,
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Normal => "Normal Operations",
            Phase::HeatBuildup => "Heat Buildup (Cooling Degradation)",
            Phase::VibrationFault => "Vibration Fault (Bearing Wear)",
            Phase::SupplyStrain => "Supply Strain (Storage & Fatigue)",
            Phase::EmergencyDrill => "Emergency Drill",
            Phase::Recovery => "Recovery (Return to Normal)",
        }
    }

    fn from_progress(progress: f64) -> Self {
        match progress {
            p if p < 0.30 => Phase::Normal,
            p if p < 0.50 => Phase::HeatBuildup,
            p if p < 0.65 => Phase::VibrationFault,
            p if p < 0.80 => Phase::SupplyStrain,
            p if p < 0.90 => Phase::EmergencyDrill,
            _ => Phase::Recovery,
        }
    }
}

// ============================================================================
// Simulation State
// ============================================================================

struct SimulationState {
    rng: StdRng,
    current_phase: Phase,
    sim_time_secs: u64,
    total_duration_secs: u64,
    cycle_secs: u64,

    machine_count: u32,
    worker_count: u32,
    fill_level: f64,
    fatigue: Vec<f64>,
    drill_phase: DrillPhase,
    drill_ticks: u32,
    weather: Weather,

    cycles: u64,
    decisions_emitted: u64,
    audio_cues: u64,

    small_noise: Normal<f64>,
}

impl SimulationState {
    fn new(args: &Args, cycle_secs: u64) -> Self {
        let rng = match args.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            current_phase: Phase::Normal,
            sim_time_secs: 6 * 3600, // start at day-shift opening
            total_duration_secs: args.hours as u64 * 3600,
            cycle_secs,
            machine_count: args.machines,
            worker_count: args.workers,
            fill_level: 0.3,
            fatigue: vec![0.2; args.workers as usize],
            drill_phase: DrillPhase::None,
            drill_ticks: 0,
            weather: Weather::Clear,
            cycles: 0,
            decisions_emitted: 0,
            audio_cues: 0,
            small_noise: Normal::new(0.0, 0.02).unwrap(),
        }
    }

    fn progress(&self) -> f64 {
        (self.sim_time_secs - 6 * 3600) as f64 / self.total_duration_secs as f64
    }

    fn update_phase(&mut self) -> bool {
        let new_phase = Phase::from_progress(self.progress());
        if new_phase != self.current_phase {
            self.current_phase = new_phase;
            if new_phase == Phase::EmergencyDrill {
                self.drill_phase = DrillPhase::Alert;
                self.drill_ticks = 0;
            }
            if new_phase == Phase::Recovery {
                self.drill_phase = DrillPhase::None;
            }
            true
        } else {
            false
        }
    }

    fn phase_severity(&self, lo: f64, hi: f64) -> f64 {
        ((self.progress() - lo) / (hi - lo)).clamp(0.0, 1.0)
    }

    fn machine(&mut self, index: u32) -> MachineReading {
        let noise = self.small_noise.sample(&mut self.rng);
        let mut temperature = BASE_TEMP * (1.0 + noise);
        let mut vibration = BASE_VIB * (1.0 + noise * 2.0);
        let mut load = BASE_LOAD * (1.0 + noise);
        let mut status = MachineStatus::Running;

        // Machine 0 runs hot in the heat phase; machine 1 shakes in the
        // vibration phase.
        if index == 0 && self.current_phase == Phase::HeatBuildup {
            let severity = self.phase_severity(0.30, 0.50);
            temperature = BASE_TEMP + 45.0 * severity + noise * 3.0;
            if temperature > 92.0 {
                status = MachineStatus::Critical;
            } else if temperature > 75.0 {
                status = MachineStatus::Warning;
            }
        }
        if index == 1 && self.current_phase == Phase::VibrationFault {
            let severity = self.phase_severity(0.50, 0.65);
            vibration = BASE_VIB + 5.5 * severity + noise;
            if vibration > 6.0 {
                status = MachineStatus::Critical;
            } else if vibration > 3.5 {
                status = MachineStatus::Warning;
            }
        }
        if self.current_phase == Phase::SupplyStrain {
            load = BASE_LOAD * (1.0 + 0.4 * (index % 2) as f64) * (1.0 + noise);
        }

        MachineReading {
            id: format!("machine-{index:02}"),
            group: if index < self.machine_count / 2 {
                "line-a".to_string()
            } else {
                "line-b".to_string()
            },
            status,
            rpm: BASE_RPM * (1.0 + noise),
            temperature,
            vibration,
            load,
            fill_level: if index == 2 {
                Some(self.fill_level)
            } else {
                None
            },
        }
    }

    fn snapshot(&mut self) -> TelemetrySnapshot {
        self.cycles += 1;

        // Scenario side-state
        match self.current_phase {
            Phase::SupplyStrain => {
                self.fill_level = (self.fill_level + 0.01).min(0.98);
                for f in &mut self.fatigue {
                    *f = (*f + FATIGUE_PER_HOUR * 2.0 * self.cycle_secs as f64 / 3600.0).min(1.0);
                }
            }
            Phase::Recovery => {
                self.fill_level = (self.fill_level - 0.02).max(0.3);
                for f in &mut self.fatigue {
                    *f = (*f - 0.01).max(0.2);
                }
            }
            _ => {
                for f in &mut self.fatigue {
                    *f = (*f + FATIGUE_PER_HOUR * self.cycle_secs as f64 / 3600.0).min(1.0);
                }
            }
        }
        if self.current_phase == Phase::EmergencyDrill {
            self.drill_ticks += 1;
            if self.drill_ticks % 6 == 0 {
                self.drill_phase = self.drill_phase.advance();
            }
        }
        self.weather = match (self.progress() * 10.0) as u32 {
            0..=3 => Weather::Clear,
            4..=5 => Weather::Rain,
            6 => Weather::Heatwave,
            7 => Weather::Fog,
            _ => Weather::Clear,
        };

        let machines = (0..self.machine_count).map(|i| self.machine(i)).collect();
        let workers = (0..self.worker_count)
            .map(|i| {
                let fatigue = self.fatigue[i as usize];
                WorkerReading {
                    id: format!("worker-{i:02}"),
                    role: match i % 4 {
                        0 => WorkerRole::Operator,
                        1 => WorkerRole::Technician,
                        2 => WorkerRole::Supervisor,
                        _ => WorkerRole::Logistics,
                    },
                    status: if fatigue > 0.9 {
                        WorkerStatus::Fatigued
                    } else {
                        WorkerStatus::Working
                    },
                    fatigue,
                }
            })
            .collect();

        let mut alerts = Vec::new();
        if self.current_phase == Phase::SupplyStrain && self.fill_level > 0.92 {
            alerts.push(AlertRecord {
                id: "alert-supply".to_string(),
                category: AlertCategory::SupplyShortage,
                machine_id: Some("machine-02".to_string()),
                message: "Raw material buffer below reorder point".to_string(),
            });
        }

        let hour = (self.sim_time_secs / 3600) % 24;
        TelemetrySnapshot {
            machines,
            workers,
            alerts,
            environment: Environment {
                weather: self.weather,
                shift: Shift::at_hour(hour),
                sim_time_secs: self.sim_time_secs,
            },
            emergency_active: false,
            drill_active: self.current_phase == Phase::EmergencyDrill,
            drill_phase: self.drill_phase,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = EngineConfig::load();
    config.mode = match args.mode.as_str() {
        "remote" => EngineMode::Remote,
        "hybrid" => EngineMode::Hybrid,
        _ => EngineMode::Heuristic,
    };
    let cycle_secs = config.cadence.cycle_secs;
    let remote_config = config.remote.clone();

    let engine = Arc::new(Mutex::new(DecisionEngine::new(config)));
    let coordinator = Coordinator::new(
        Arc::clone(&engine),
        Arc::new(HttpRemoteModel::new(&remote_config)),
        Arc::new(CompactJsonEncoder),
    );

    // Shift boundary plumbing: the simulation announces boundaries, the
    // observer resets shift-scoped stats.
    let (shift_tx, shift_rx) = tokio::sync::broadcast::channel(16);
    let observer = ShiftObserver::new();
    let _observer_handle = observer
        .initialize(Arc::clone(&engine), shift_rx)
        .ok_or_else(|| anyhow::anyhow!("shift observer failed to initialize"))?;

    let mut state = SimulationState::new(&args, cycle_secs);
    let tick_interval = Duration::from_secs_f64(cycle_secs as f64 / args.speed as f64);
    let end_time = state.sim_time_secs + state.total_duration_secs;

    info!(
        hours = args.hours,
        speed = args.speed,
        machines = args.machines,
        workers = args.workers,
        mode = %args.mode,
        "Facility simulation starting"
    );

    let start = Instant::now();
    let mut pending: Vec<foreman::Decision> = Vec::new();
    let mut last_shift = Shift::Day;

    while state.sim_time_secs < end_time {
        let loop_start = Instant::now();

        if state.update_phase() {
            info!(phase = state.current_phase.name(), "Scenario phase change");
        }

        let snapshot = state.snapshot();
        if snapshot.environment.shift != last_shift {
            last_shift = snapshot.environment.shift;
            let _ = shift_tx.send(last_shift);
        }

        if let Some(decision) = coordinator.run_cycle(&snapshot).await {
            state.decisions_emitted += 1;
            if should_trigger_audio_cue(&decision) {
                state.audio_cues += 1;
                if !args.quiet {
                    info!(action = %decision.action, "AUDIO CUE");
                }
            }
            pending.push(decision);
        }

        // A crew picks up the oldest queued decision before working it.
        if let Some(oldest) = pending.first() {
            let mut guard = engine.lock().unwrap_or_else(|p| p.into_inner());
            guard.mark_in_progress(&oldest.id);
        }

        // Consumers resolve older decisions; most recommendations pan out.
        while pending.len() > 3 {
            let decision = pending.remove(0);
            let outcome = if state.rng.gen_bool(0.8) {
                "resolved"
            } else {
                "condition persisted"
            };
            let mut guard = engine.lock().unwrap_or_else(|p| p.into_inner());
            guard.record_outcome(&decision.id, outcome);
        }
        {
            let mut guard = engine.lock().unwrap_or_else(|p| p.into_inner());
            guard.add_production(1);
        }

        state.sim_time_secs += cycle_secs;
        if args.speed < 1000 {
            let elapsed = loop_start.elapsed();
            if elapsed < tick_interval {
                tokio::time::sleep(tick_interval - elapsed).await;
            }
        }
    }

    // Debrief
    let guard = engine.lock().unwrap_or_else(|p| p.into_inner());
    let stats = guard.impact_stats();
    let summary = guard.memory_summary();
    let (produced, target) = guard.production_target();
    info!(
        cycles = state.cycles,
        decisions = state.decisions_emitted,
        audio_cues = state.audio_cues,
        successful = stats.successful_decisions,
        prevented_shutdowns = stats.prevented_shutdowns,
        estimated_savings = stats.estimated_savings,
        produced,
        target,
        "Simulation complete"
    );
    info!(
        tracked_machines = summary.tracked_machines,
        total_samples = summary.total_samples,
        patterns = summary.pattern_count,
        anomalies = summary.anomaly_count,
        forecast_events = guard.predicted_events().len(),
        elapsed_secs = start.elapsed().as_secs_f64(),
        "Engine memory summary"
    );

    Ok(())
}
