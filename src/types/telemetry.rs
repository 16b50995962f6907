//! Telemetry snapshot contract: machines, workers, alerts, environment.
//!
//! The snapshot is owned by the simulation/state layer and recomputed every
//! cycle. The engine only reads it; nothing here is engine state.

use serde::{Deserialize, Serialize};

/// Operational state of a machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum MachineStatus {
    #[default]
    Idle,
    Running,
    /// Degraded but operating
    Warning,
    /// Imminent failure risk
    Critical,
    /// Offline for maintenance
    Maintenance,
}

impl std::fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MachineStatus::Idle => write!(f, "Idle"),
            MachineStatus::Running => write!(f, "Running"),
            MachineStatus::Warning => write!(f, "Warning"),
            MachineStatus::Critical => write!(f, "Critical"),
            MachineStatus::Maintenance => write!(f, "Maintenance"),
        }
    }
}

/// Tracked machine metric series.
///
/// Each variant maps to one ring buffer per machine in pattern memory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Rpm,
    Temperature,
    Vibration,
    Load,
    FillLevel,
}

impl MetricKind {
    /// All metric kinds sampled every cycle.
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Rpm,
        MetricKind::Temperature,
        MetricKind::Vibration,
        MetricKind::Load,
        MetricKind::FillLevel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Rpm => "rpm",
            MetricKind::Temperature => "temperature",
            MetricKind::Vibration => "vibration",
            MetricKind::Load => "load",
            MetricKind::FillLevel => "fill_level",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One machine's readings for the current cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineReading {
    /// Stable machine identifier (e.g. "press-02")
    pub id: String,
    /// Process line / group; cross-machine correlation only compares
    /// machines in the same group
    pub group: String,
    pub status: MachineStatus,
    /// Rotational speed (rpm)
    pub rpm: f64,
    /// Operating temperature (°C)
    pub temperature: f64,
    /// Vibration level (mm/s RMS)
    pub vibration: f64,
    /// Utilization load (0-100 %)
    pub load: f64,
    /// Storage fill level (0.0-1.0), for machines with output buffers
    pub fill_level: Option<f64>,
}

impl MachineReading {
    /// Raw (unnormalized) value for a metric kind.
    ///
    /// Machines without a fill buffer report 0.0 for `FillLevel`.
    pub fn metric(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Rpm => self.rpm,
            MetricKind::Temperature => self.temperature,
            MetricKind::Vibration => self.vibration,
            MetricKind::Load => self.load,
            MetricKind::FillLevel => self.fill_level.unwrap_or(0.0),
        }
    }
}

/// Worker roles within the facility.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WorkerRole {
    Operator,
    Technician,
    Supervisor,
    Logistics,
}

impl std::fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerRole::Operator => write!(f, "Operator"),
            WorkerRole::Technician => write!(f, "Technician"),
            WorkerRole::Supervisor => write!(f, "Supervisor"),
            WorkerRole::Logistics => write!(f, "Logistics"),
        }
    }
}

/// Current worker activity state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WorkerStatus {
    Idle,
    Working,
    OnBreak,
    Fatigued,
}

/// One worker's state for the current cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerReading {
    pub id: String,
    pub role: WorkerRole,
    pub status: WorkerStatus,
    /// Fatigue level (0.0 = fresh, 1.0 = exhausted)
    pub fatigue: f64,
}

/// Category of an active facility alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AlertCategory {
    MachineFault,
    SafetyIncident,
    SupplyShortage,
    Environment,
}

/// An active alert raised by the facility state layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: String,
    pub category: AlertCategory,
    /// Machine this alert concerns, if any
    pub machine_id: Option<String>,
    pub message: String,
}

/// Facility weather conditions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Weather {
    #[default]
    Clear,
    Rain,
    Storm,
    Fog,
    Heatwave,
}

impl std::fmt::Display for Weather {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Weather::Clear => write!(f, "Clear"),
            Weather::Rain => write!(f, "Rain"),
            Weather::Storm => write!(f, "Storm"),
            Weather::Fog => write!(f, "Fog"),
            Weather::Heatwave => write!(f, "Heatwave"),
        }
    }
}

/// Work shift. Boundaries are exact simulated clock times.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Shift {
    #[default]
    Day,
    Evening,
    Night,
}

impl Shift {
    /// Shift starting hour on the 24h simulated clock.
    pub fn start_hour(&self) -> u64 {
        match self {
            Shift::Day => 6,
            Shift::Evening => 14,
            Shift::Night => 22,
        }
    }

    /// Shift active at a given simulated hour-of-day.
    pub fn at_hour(hour: u64) -> Self {
        match hour % 24 {
            6..=13 => Shift::Day,
            14..=21 => Shift::Evening,
            _ => Shift::Night,
        }
    }

    /// The shift that follows this one.
    pub fn next(&self) -> Self {
        match self {
            Shift::Day => Shift::Evening,
            Shift::Evening => Shift::Night,
            Shift::Night => Shift::Day,
        }
    }
}

impl std::fmt::Display for Shift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shift::Day => write!(f, "Day"),
            Shift::Evening => write!(f, "Evening"),
            Shift::Night => write!(f, "Night"),
        }
    }
}

/// Emergency-drill stage. Advanced by an external drill timer; the
/// heuristic generator only reads the current phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DrillPhase {
    #[default]
    None,
    Alert,
    Evacuation,
    Assembly,
    Review,
}

impl DrillPhase {
    /// Advance to the next stage in the drill cycle (Review wraps to None).
    pub fn advance(&self) -> Self {
        match self {
            DrillPhase::None => DrillPhase::Alert,
            DrillPhase::Alert => DrillPhase::Evacuation,
            DrillPhase::Evacuation => DrillPhase::Assembly,
            DrillPhase::Assembly => DrillPhase::Review,
            DrillPhase::Review => DrillPhase::None,
        }
    }
}

impl std::fmt::Display for DrillPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrillPhase::None => write!(f, "None"),
            DrillPhase::Alert => write!(f, "Alert"),
            DrillPhase::Evacuation => write!(f, "Evacuation"),
            DrillPhase::Assembly => write!(f, "Assembly"),
            DrillPhase::Review => write!(f, "Review"),
        }
    }
}

/// Facility environment for the current cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub weather: Weather,
    pub shift: Shift,
    /// Simulated clock, seconds since facility start
    pub sim_time_secs: u64,
}

impl Environment {
    /// Simulated hour-of-day (0-23).
    pub fn hour_of_day(&self) -> u64 {
        (self.sim_time_secs / 3600) % 24
    }

    /// Simulated seconds until the next shift boundary. Exact.
    pub fn secs_to_shift_change(&self) -> u64 {
        let next_start = self.shift.next().start_hour();
        let hour = self.hour_of_day();
        let hours_ahead = (next_start + 24 - hour - 1) % 24 + 1;
        let into_hour = self.sim_time_secs % 3600;
        hours_ahead * 3600 - into_hour
    }
}

/// Read-only view of the facility for one evaluation cycle.
///
/// Recomputed by the state layer every cycle; the engine never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub machines: Vec<MachineReading>,
    pub workers: Vec<WorkerReading>,
    pub alerts: Vec<AlertRecord>,
    pub environment: Environment,
    /// A real emergency is in progress
    pub emergency_active: bool,
    /// An emergency drill is in progress
    pub drill_active: bool,
    /// Current drill stage (None unless a drill is active)
    pub drill_phase: DrillPhase,
}

impl TelemetrySnapshot {
    /// Machine lookup by id.
    pub fn machine(&self, id: &str) -> Option<&MachineReading> {
        self.machines.iter().find(|m| m.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_at_hour_boundaries() {
        assert_eq!(Shift::at_hour(6), Shift::Day);
        assert_eq!(Shift::at_hour(13), Shift::Day);
        assert_eq!(Shift::at_hour(14), Shift::Evening);
        assert_eq!(Shift::at_hour(22), Shift::Night);
        assert_eq!(Shift::at_hour(5), Shift::Night);
        assert_eq!(Shift::at_hour(30), Shift::Day);
    }

    #[test]
    fn drill_phase_cycles_back_to_none() {
        let mut phase = DrillPhase::None;
        for _ in 0..5 {
            phase = phase.advance();
        }
        assert_eq!(phase, DrillPhase::None);
    }

    #[test]
    fn secs_to_shift_change_is_exact() {
        // 07:00 on day shift → evening starts at 14:00 → 7 hours out
        let env = Environment {
            weather: Weather::Clear,
            shift: Shift::Day,
            sim_time_secs: 7 * 3600,
        };
        assert_eq!(env.secs_to_shift_change(), 7 * 3600);

        // 13:59:30 → 30 seconds to the evening shift
        let env = Environment {
            weather: Weather::Clear,
            shift: Shift::Day,
            sim_time_secs: 13 * 3600 + 3570,
        };
        assert_eq!(env.secs_to_shift_change(), 30);
    }

    #[test]
    fn fill_level_metric_defaults_to_zero() {
        let m = MachineReading {
            id: "m1".into(),
            group: "line-a".into(),
            status: MachineStatus::Running,
            rpm: 1200.0,
            temperature: 55.0,
            vibration: 1.2,
            load: 60.0,
            fill_level: None,
        };
        assert_eq!(m.metric(MetricKind::FillLevel), 0.0);
        assert_eq!(m.metric(MetricKind::Temperature), 55.0);
    }
}
