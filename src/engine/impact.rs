//! Impact accountant
//!
//! Tracks shift-scoped decision impact: totals, success counts, prevented
//! shutdowns, and estimated savings. Counters reset at shift boundaries via
//! the shift observer.

use tracing::debug;

use crate::config::SavingsConfig;
use crate::engine::calibrator::is_affirmative_outcome;
use crate::types::{Decision, DecisionCategory, ImpactStats};

/// Shift-scoped impact counters with a per-category breakdown.
#[derive(Debug, Default)]
pub struct ImpactAccountant {
    stats: ImpactStats,
}

impl ImpactAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an emitted decision. Keeps the per-category counts summing to
    /// the total.
    pub fn record_decision(&mut self, decision: &Decision) {
        self.stats.total_decisions += 1;
        self.stats
            .by_category
            .entry(decision.category)
            .or_default()
            .count += 1;
    }

    /// Credit a resolved outcome. Non-affirmative outcomes still count as
    /// resolved but earn no savings.
    pub fn record_outcome(&mut self, savings: &SavingsConfig, decision: &Decision, outcome: &str) {
        if !is_affirmative_outcome(outcome) {
            return;
        }
        self.stats.successful_decisions += 1;
        self.stats
            .by_category
            .entry(decision.category)
            .or_default()
            .successful += 1;
        self.stats.estimated_savings += savings.for_category(decision.category);
        if matches!(
            decision.category,
            DecisionCategory::Maintenance | DecisionCategory::Safety
        ) {
            self.stats.prevented_shutdowns += 1;
        }
        debug!(
            decision_id = %decision.id,
            category = %decision.category,
            savings = self.stats.estimated_savings,
            "Outcome credited"
        );
    }

    /// Advance shift production progress by completed units.
    pub fn add_production(&mut self, units: u64) {
        self.stats.production_progress += units;
    }

    /// Current statistics. Value copy.
    pub fn stats(&self) -> ImpactStats {
        self.stats.clone()
    }

    /// Zero every counter. Called at shift boundaries.
    pub fn reset(&mut self) {
        self.stats = ImpactStats::default();
    }
}
