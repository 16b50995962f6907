//! Decision log
//!
//! Append-mostly record of emitted decisions behind a trait seam, so the
//! engine can be tested against an in-memory log and production can swap in
//! a persistent store without touching the decision path.

use std::collections::VecDeque;

use crate::config::defaults::DECISION_LOG_CAPACITY;
use crate::types::{Decision, DecisionStatus};

/// Storage seam for emitted decisions.
pub trait DecisionLog: Send + Sync {
    /// Append an emitted decision.
    fn record(&mut self, decision: Decision);

    /// Look up a decision by id. Value copy.
    fn get(&self, id: &str) -> Option<Decision>;

    /// Current status of a decision, if it is still in the log.
    fn status_of(&self, id: &str) -> Option<DecisionStatus> {
        self.get(id).map(|d| d.status)
    }

    /// The most recent `n` decisions, newest first. Value copies.
    fn recent(&self, n: usize) -> Vec<Decision>;

    /// Transition a decision to a new status. Returns the updated copy,
    /// or None if the id is unknown.
    fn transition(&mut self, id: &str, status: DecisionStatus) -> Option<Decision>;

    /// Complete a decision with an outcome text. Returns the updated copy.
    fn resolve(&mut self, id: &str, outcome: &str) -> Option<Decision>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounded in-memory log, oldest entries evicted first.
#[derive(Debug, Default)]
pub struct InMemoryDecisionLog {
    entries: VecDeque<Decision>,
}

impl InMemoryDecisionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DecisionLog for InMemoryDecisionLog {
    fn record(&mut self, decision: Decision) {
        if self.entries.len() == DECISION_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(decision);
    }

    fn get(&self, id: &str) -> Option<Decision> {
        self.entries.iter().find(|d| d.id == id).cloned()
    }

    fn recent(&self, n: usize) -> Vec<Decision> {
        self.entries.iter().rev().take(n).cloned().collect()
    }

    fn transition(&mut self, id: &str, status: DecisionStatus) -> Option<Decision> {
        let entry = self.entries.iter_mut().find(|d| d.id == id)?;
        entry.status = status;
        Some(entry.clone())
    }

    fn resolve(&mut self, id: &str, outcome: &str) -> Option<Decision> {
        let entry = self.entries.iter_mut().find(|d| d.id == id)?;
        entry.status = DecisionStatus::Completed;
        entry.outcome = Some(outcome.to_string());
        Some(entry.clone())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
