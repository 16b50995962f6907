//! Context-aware decision engine
//!
//! One `DecisionEngine` instance owns all bounded memories, the cooldown
//! ledger, the calibrator, the forecaster, and the impact accountant. It is
//! constructed once per session and passed by reference into every
//! evaluation path; there is no global mutable state. External callers
//! read engine memory only through copy-returning accessors.

pub mod audio;
pub mod calibrator;
pub mod coordinator;
pub mod forecaster;
pub mod heuristic;
pub mod impact;
pub mod ledger;
pub mod log;
pub mod memory;
pub mod remote;
pub mod shift;

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::types::{
    AnomalyRecord, CrossMachinePattern, Decision, DecisionCategory, DecisionStatus, ImpactStats,
    MemorySummary, MetricKind, PredictedEvent, StrategicPriority, TelemetrySnapshot,
    TrendDirection,
};

use calibrator::ConfidenceCalibrator;
use forecaster::Forecaster;
use heuristic::HeuristicContext;
use impact::ImpactAccountant;
use ledger::CooldownLedger;
use log::{DecisionLog, InMemoryDecisionLog};
use memory::PatternMemory;
use shift::ShiftResettable;

/// The engine context: every stateful component as an explicit field.
pub struct DecisionEngine {
    config: EngineConfig,
    ledger: CooldownLedger,
    calibrator: ConfidenceCalibrator,
    memory: PatternMemory,
    forecaster: Forecaster,
    impact: ImpactAccountant,
    log: Box<dyn DecisionLog>,
    strategic: Vec<StrategicPriority>,
    last_correlation_scan: Option<u64>,
    last_forecast: Option<u64>,
}

impl DecisionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_log(config, Box::new(InMemoryDecisionLog::new()))
    }

    /// Construct with a caller-supplied decision log implementation.
    pub fn with_log(config: EngineConfig, log: Box<dyn DecisionLog>) -> Self {
        info!(mode = %config.mode, "Decision engine initialized");
        Self {
            config,
            ledger: CooldownLedger::new(),
            calibrator: ConfidenceCalibrator::new(),
            memory: PatternMemory::new(),
            forecaster: Forecaster::new(),
            impact: ImpactAccountant::new(),
            log,
            strategic: Vec::new(),
            last_correlation_scan: None,
            last_forecast: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// One evaluation cycle: cooldown-gated heuristic generation, then the
    /// cycle's ledger/log/impact/memory updates, in that order. Cadenced
    /// correlation scans and forecast recomputation run afterwards.
    ///
    /// Returns None when nothing qualifies, a valid "no action" cycle.
    pub fn generate(
        &mut self,
        snapshot: &TelemetrySnapshot,
        forced: Option<DecisionCategory>,
    ) -> Option<Decision> {
        let now = snapshot.environment.sim_time_secs;
        self.prune_strategic(now);

        let ctx = HeuristicContext {
            config: &self.config,
            ledger: &self.ledger,
            calibrator: &self.calibrator,
            memory: &self.memory,
            strategic: &self.strategic,
        };
        let decision = heuristic::generate(&ctx, snapshot, forced);
        let decision = decision.map(|d| self.emit(d, now));

        self.memory.ingest(&self.config.memory, snapshot);
        self.run_cadenced(snapshot, now);
        decision
    }

    /// Emit an externally produced decision (remote tactical path) through
    /// the same ledger/log/impact pipeline as heuristic output.
    pub fn emit_external(&mut self, decision: Decision, snapshot: &TelemetrySnapshot) -> Decision {
        let now = snapshot.environment.sim_time_secs;
        let decision = self.emit(decision, now);
        self.memory.ingest(&self.config.memory, snapshot);
        self.run_cadenced(snapshot, now);
        decision
    }

    fn emit(&mut self, decision: Decision, now_sim_secs: u64) -> Decision {
        let decision = self.link_follow_up(decision);
        let entity = decision
            .machine_id
            .as_deref()
            .or(decision.worker_id.as_deref())
            .unwrap_or("facility")
            .to_string();
        self.ledger
            .record_emission(&entity, decision.category, now_sim_secs);
        self.impact.record_decision(&decision);
        self.log.record(decision.clone());
        info!(
            id = %decision.id,
            category = %decision.category,
            priority = %decision.priority,
            confidence = decision.confidence,
            action = %decision.action,
            "Decision emitted"
        );
        decision
    }

    /// A maintenance decision for a machine with an unresolved safety
    /// decision becomes its follow-up. One follow-up per parent.
    fn link_follow_up(&mut self, decision: Decision) -> Decision {
        if decision.category != DecisionCategory::Maintenance {
            return decision;
        }
        let machine_id = match decision.machine_id.as_deref() {
            Some(id) => id,
            None => return decision,
        };
        let parent = self.log.recent(50).into_iter().find(|d| {
            d.category == DecisionCategory::Safety
                && d.machine_id.as_deref() == Some(machine_id)
                && d.status.accepts_follow_up()
                && !self.ledger.has_follow_up(&d.id)
        });
        match parent {
            Some(parent) if self.ledger.register_chain(&decision.id, &parent.id) => {
                debug!(child = %decision.id, parent = %parent.id, "Follow-up chain registered");
                decision.with_parent(parent.id)
            }
            _ => decision,
        }
    }

    fn run_cadenced(&mut self, snapshot: &TelemetrySnapshot, now: u64) {
        let cadence = self.config.cadence.clone();
        if due(self.last_correlation_scan, now, cadence.correlation_interval_secs) {
            self.memory.scan_correlations(&self.config.memory, now);
            self.last_correlation_scan = Some(now);
        }
        if due(self.last_forecast, now, cadence.forecast_interval_secs) {
            self.forecaster
                .recompute(&self.config, snapshot, &self.memory);
            self.last_forecast = Some(now);
        }
    }

    /// Record the consumer-reported outcome for a logged decision. Outcome
    /// tracking (calibrator) runs before impact accounting.
    pub fn record_outcome(&mut self, decision_id: &str, outcome: &str) -> bool {
        let resolved = match self.log.resolve(decision_id, outcome) {
            Some(d) => d,
            None => return false,
        };
        self.calibrator.record_outcome(&resolved);
        self.impact
            .record_outcome(&self.config.savings, &resolved, outcome);
        true
    }

    /// Note that a crew has picked up a logged decision. In-progress
    /// decisions still accept follow-up chaining.
    pub fn mark_in_progress(&mut self, decision_id: &str) -> bool {
        self.log
            .transition(decision_id, DecisionStatus::InProgress)
            .is_some()
    }

    /// Advance shift production progress.
    pub fn add_production(&mut self, units: u64) {
        self.impact.add_production(units);
    }

    /// Replace the active strategic priority set (one strategic call yields
    /// a complete set).
    pub fn apply_strategic(&mut self, priorities: Vec<StrategicPriority>) {
        info!(count = priorities.len(), "Strategic priorities applied");
        self.strategic = priorities;
    }

    fn prune_strategic(&mut self, now_sim_secs: u64) {
        self.strategic.retain(|p| !p.is_expired(now_sim_secs));
    }

    // Copy-returning accessors. Callers never see engine-internal
    // references.

    pub fn predicted_events(&self) -> Vec<PredictedEvent> {
        self.forecaster.events()
    }

    pub fn impact_stats(&self) -> ImpactStats {
        self.impact.stats()
    }

    /// Shift production progress against the configured target.
    pub fn production_target(&self) -> (u64, u64) {
        (
            self.impact.stats().production_progress,
            self.config.production.shift_target_units,
        )
    }

    pub fn sparkline(&self, machine_id: &str, kind: MetricKind) -> Vec<f64> {
        self.memory.sparkline(machine_id, kind)
    }

    pub fn patterns(&self) -> Vec<CrossMachinePattern> {
        self.memory.patterns()
    }

    pub fn anomalies(&self) -> Vec<AnomalyRecord> {
        self.memory.anomalies()
    }

    pub fn metric_trend(&self, machine_id: &str, kind: MetricKind) -> TrendDirection {
        self.memory.trend(machine_id, kind)
    }

    pub fn confidence_adjustments(&self) -> HashMap<DecisionCategory, f64> {
        self.calibrator.adjustments(&self.config.calibrator)
    }

    pub fn strategic_priorities(&self) -> Vec<StrategicPriority> {
        self.strategic.clone()
    }

    pub fn recent_decisions(&self, n: usize) -> Vec<Decision> {
        self.log.recent(n)
    }

    pub fn decision(&self, id: &str) -> Option<Decision> {
        self.log.get(id)
    }

    pub fn memory_summary(&self) -> MemorySummary {
        MemorySummary {
            tracked_machines: self.memory.tracked_machines(),
            tracked_series: self.memory.tracked_series(),
            total_samples: self.memory.total_samples(),
            pattern_count: self.memory.pattern_count(),
            anomaly_count: self.memory.anomaly_count(),
            active_strategic_priorities: self.strategic.len(),
        }
    }
}

impl ShiftResettable for DecisionEngine {
    /// Zero all shift-scoped counters. Cooldown windows and pattern memory
    /// span shift boundaries and are left alone.
    fn reset_shift_stats(&mut self) {
        self.impact.reset();
        self.calibrator.reset();
    }
}

fn due(last: Option<u64>, now: u64, interval_secs: u64) -> bool {
    match last {
        None => true,
        Some(t) => now.saturating_sub(t) >= interval_secs,
    }
}
