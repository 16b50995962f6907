//! Cooldown, dedup & chain ledger
//!
//! Keyed suppression: one non-expired cooldown per (entity, category).
//! Chain linkage: child decision id → parent decision id, so a follow-up
//! can be gated on its parent's lifecycle status.
//!
//! Purely in-memory, rebuilt from nothing at process start.

use std::collections::HashMap;

use crate::config::CooldownConfig;
use crate::types::{DecisionCategory, DecisionPriority};

/// Per-entity, per-category suppression windows plus follow-up links.
#[derive(Debug, Default)]
pub struct CooldownLedger {
    /// (entity id, category) → last emission, simulated seconds
    last_emission: HashMap<(String, DecisionCategory), u64>,
    /// child decision id → parent decision id
    chains: HashMap<String, String>,
}

impl CooldownLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a new decision for this (entity, category) key may be
    /// emitted at `now_sim_secs`.
    ///
    /// Critical-priority safety decisions bypass cooldown entirely; all
    /// other keys are suppressed until the configured interval elapses.
    pub fn can_emit(
        &self,
        cooldowns: &CooldownConfig,
        entity_id: &str,
        category: DecisionCategory,
        priority: DecisionPriority,
        now_sim_secs: u64,
    ) -> bool {
        if category == DecisionCategory::Safety && priority == DecisionPriority::Critical {
            return true;
        }
        match self
            .last_emission
            .get(&(entity_id.to_string(), category))
        {
            None => true,
            Some(&last) => now_sim_secs.saturating_sub(last) >= cooldowns.interval_secs(category),
        }
    }

    /// Record an emission, replacing any previous entry for the key.
    ///
    /// Re-inserting keeps the invariant of at most one non-expired entry
    /// per (entity, category).
    pub fn record_emission(
        &mut self,
        entity_id: &str,
        category: DecisionCategory,
        now_sim_secs: u64,
    ) {
        self.last_emission
            .insert((entity_id.to_string(), category), now_sim_secs);
    }

    /// Register a follow-up link from child to parent.
    ///
    /// A parent accepts at most one follow-up; a second registration for
    /// the same parent is refused.
    pub fn register_chain(&mut self, child_id: &str, parent_id: &str) -> bool {
        if self.chains.values().any(|p| p == parent_id) {
            return false;
        }
        self.chains.insert(child_id.to_string(), parent_id.to_string());
        true
    }

    /// Parent decision id for a follow-up, if one was registered.
    pub fn chain_parent(&self, child_id: &str) -> Option<&str> {
        self.chains.get(child_id).map(|s| s.as_str())
    }

    /// Whether a follow-up has already been chained onto this parent.
    pub fn has_follow_up(&self, parent_id: &str) -> bool {
        self.chains.values().any(|p| p == parent_id)
    }

    /// Number of live cooldown entries. Expired entries are counted until
    /// overwritten; they are inert, `can_emit` treats them as elapsed.
    pub fn entry_count(&self) -> usize {
        self.last_emission.len()
    }

    /// Drop all suppression windows and chain links. Cooldowns span shift
    /// boundaries, so the shift reset never calls this.
    pub fn clear(&mut self) {
        self.last_emission.clear();
        self.chains.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cooldowns() -> CooldownConfig {
        CooldownConfig::default()
    }

    #[test]
    fn first_emission_always_allowed() {
        let ledger = CooldownLedger::new();
        assert!(ledger.can_emit(
            &cooldowns(),
            "press-01",
            DecisionCategory::Maintenance,
            DecisionPriority::Medium,
            0,
        ));
    }

    #[test]
    fn suppresses_within_interval() {
        let mut ledger = CooldownLedger::new();
        ledger.record_emission("press-01", DecisionCategory::Maintenance, 100);
        // 119 seconds later, maintenance cooldown (120 s) still active
        assert!(!ledger.can_emit(
            &cooldowns(),
            "press-01",
            DecisionCategory::Maintenance,
            DecisionPriority::Medium,
            219,
        ));
        // Exactly at the interval boundary → allowed
        assert!(ledger.can_emit(
            &cooldowns(),
            "press-01",
            DecisionCategory::Maintenance,
            DecisionPriority::Medium,
            220,
        ));
    }

    #[test]
    fn different_entity_or_category_not_suppressed() {
        let mut ledger = CooldownLedger::new();
        ledger.record_emission("press-01", DecisionCategory::Maintenance, 100);
        assert!(ledger.can_emit(
            &cooldowns(),
            "press-02",
            DecisionCategory::Maintenance,
            DecisionPriority::Medium,
            101,
        ));
        assert!(ledger.can_emit(
            &cooldowns(),
            "press-01",
            DecisionCategory::Optimization,
            DecisionPriority::Medium,
            101,
        ));
    }

    #[test]
    fn critical_safety_bypasses_cooldown() {
        let mut ledger = CooldownLedger::new();
        ledger.record_emission("line-a", DecisionCategory::Safety, 100);
        assert!(ledger.can_emit(
            &cooldowns(),
            "line-a",
            DecisionCategory::Safety,
            DecisionPriority::Critical,
            101,
        ));
        // Non-critical safety still honors its interval
        assert!(!ledger.can_emit(
            &cooldowns(),
            "line-a",
            DecisionCategory::Safety,
            DecisionPriority::High,
            101,
        ));
    }

    #[test]
    fn one_entry_per_key_after_reemission() {
        let mut ledger = CooldownLedger::new();
        ledger.record_emission("press-01", DecisionCategory::Maintenance, 100);
        ledger.record_emission("press-01", DecisionCategory::Maintenance, 400);
        assert_eq!(ledger.entry_count(), 1);
    }

    #[test]
    fn clear_drops_windows_and_chains() {
        let mut ledger = CooldownLedger::new();
        ledger.record_emission("press-01", DecisionCategory::Maintenance, 100);
        ledger.register_chain("child-1", "parent-1");
        ledger.clear();
        assert_eq!(ledger.entry_count(), 0);
        assert!(!ledger.has_follow_up("parent-1"));
        assert!(ledger.can_emit(
            &cooldowns(),
            "press-01",
            DecisionCategory::Maintenance,
            DecisionPriority::Medium,
            101,
        ));
    }

    #[test]
    fn one_follow_up_per_parent() {
        let mut ledger = CooldownLedger::new();
        assert!(ledger.register_chain("child-1", "parent-1"));
        assert!(!ledger.register_chain("child-2", "parent-1"));
        assert_eq!(ledger.chain_parent("child-1"), Some("parent-1"));
        assert!(ledger.has_follow_up("parent-1"));
        assert!(!ledger.has_follow_up("parent-2"));
    }
}
