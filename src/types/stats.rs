//! Shift-scoped impact statistics

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::DecisionCategory;

/// Per-category slice of the impact breakdown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct CategoryImpact {
    pub count: u64,
    pub successful: u64,
}

impl CategoryImpact {
    /// Success rate over recorded outcomes in this category (0.0-1.0).
    pub fn success_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.successful as f64 / self.count as f64
        }
    }
}

/// Shift-scoped aggregate impact statistics.
///
/// Invariant: the per-category counts always sum to `total_decisions`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImpactStats {
    pub total_decisions: u64,
    pub successful_decisions: u64,
    pub prevented_shutdowns: u64,
    /// Estimated savings in facility currency units
    pub estimated_savings: f64,
    /// Units produced this shift (reset at shift boundaries)
    pub production_progress: u64,
    pub by_category: HashMap<DecisionCategory, CategoryImpact>,
}

impl ImpactStats {
    /// Sum of per-category counts. Must equal `total_decisions`.
    pub fn category_count_sum(&self) -> u64 {
        self.by_category.values().map(|c| c.count).sum()
    }
}
