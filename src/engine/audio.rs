//! Audio cue policy
//!
//! Pure decision → bool policy for whether a decision should sound an
//! operator alert tone. No playback here; the caller owns the speaker.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::{Decision, DecisionCategory, DecisionPriority};

/// Compiled once; matches decision text that references detected anomalies
/// or imminent failures.
fn urgent_text_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(anomal|imminent|evacuat|shutdown)\w*\b")
            .unwrap_or_else(|e| panic!("invalid urgent-text pattern: {e}"))
    })
}

/// Whether a decision warrants an audible cue.
///
/// Critical priority always sounds. High-priority safety decisions sound.
/// Anything whose action or reasoning references anomalies, imminent
/// failure, evacuation, or shutdown sounds regardless of priority.
pub fn should_trigger_audio_cue(decision: &Decision) -> bool {
    if decision.priority == DecisionPriority::Critical {
        return true;
    }
    if decision.priority == DecisionPriority::High
        && decision.category == DecisionCategory::Safety
    {
        return true;
    }
    let pattern = urgent_text_pattern();
    pattern.is_match(&decision.action) || pattern.is_match(&decision.reasoning)
}
