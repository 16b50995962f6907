//! Confidence calibrator - per-category outcome tallies and adjustment
//!
//! Tracks shift-scoped success/failure counts from completed decisions and
//! derives a damped, clamped confidence adjustment per category, so a small
//! number of outcomes cannot swing future confidence disproportionately.

use std::collections::HashMap;
use tracing::debug;

use crate::config::CalibratorConfig;
use crate::types::{Decision, DecisionCategory, DecisionStatus};

/// Outcome texts counted as success (case-insensitive).
const AFFIRMATIVE_OUTCOMES: [&str; 4] = ["success", "resolved", "completed", "improved"];

/// Whether an outcome text reads as a success. Shared with the impact
/// accountant so both sides agree on what counts.
pub fn is_affirmative_outcome(outcome: &str) -> bool {
    let lower = outcome.to_lowercase();
    AFFIRMATIVE_OUTCOMES.iter().any(|k| lower.contains(k))
}

/// Shift-scoped success/failure tally for one category.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceStat {
    pub successes: u64,
    pub failures: u64,
}

impl ConfidenceStat {
    fn total(&self) -> u64 {
        self.successes + self.failures
    }

    fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.5
        } else {
            self.successes as f64 / total as f64
        }
    }
}

/// Per-category running tallies with derived confidence adjustments.
#[derive(Debug, Default)]
pub struct ConfidenceCalibrator {
    stats: HashMap<DecisionCategory, ConfidenceStat>,
}

impl ConfidenceCalibrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed decision's outcome.
    ///
    /// Strictly a no-op unless status is `Completed` AND the outcome text
    /// is non-empty/non-whitespace. An empty outcome on a completed
    /// decision would count as success per the affirmative rule, but the
    /// no-op gate wins: no state change, ever, on invalid input.
    pub fn record_outcome(&mut self, decision: &Decision) {
        if decision.status != DecisionStatus::Completed {
            return;
        }
        let outcome = match decision.outcome.as_deref() {
            Some(text) if !text.trim().is_empty() => text.trim(),
            _ => return,
        };

        let stat = self.stats.entry(decision.category).or_default();
        if is_affirmative_outcome(outcome) {
            stat.successes += 1;
        } else {
            stat.failures += 1;
        }
        debug!(
            category = %decision.category,
            outcome = outcome,
            successes = stat.successes,
            failures = stat.failures,
            "Recorded decision outcome"
        );
    }

    /// Signed confidence adjustment for a category, in percentage points.
    ///
    /// Computed from the gap between observed success rate and the neutral
    /// 50% baseline, damped by sample count (n / (n + pivot)) and clamped
    /// to ± `adjustment_clamp`.
    pub fn adjustment_for(&self, config: &CalibratorConfig, category: DecisionCategory) -> f64 {
        let stat = match self.stats.get(&category) {
            Some(s) if s.total() > 0 => s,
            _ => return 0.0,
        };
        let n = stat.total() as f64;
        let damping = n / (n + config.damping_pivot);
        let raw = (stat.success_rate() - 0.5) * 40.0 * damping;
        raw.clamp(-config.adjustment_clamp, config.adjustment_clamp)
    }

    /// All per-category adjustments, for presentation layers.
    pub fn adjustments(&self, config: &CalibratorConfig) -> HashMap<DecisionCategory, f64> {
        DecisionCategory::ALL
            .iter()
            .map(|&c| (c, self.adjustment_for(config, c)))
            .collect()
    }

    /// Raw tally for a category (value copy).
    pub fn stat(&self, category: DecisionCategory) -> ConfidenceStat {
        self.stats.get(&category).copied().unwrap_or_default()
    }

    /// Zero all tallies. Called at shift boundaries.
    pub fn reset(&mut self) {
        self.stats.clear();
    }
}
