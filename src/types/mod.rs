//! Shared data structures for the facility decision engine
//!
//! - Telemetry: read-only snapshot contract from the state layer
//! - Decision: emitted recommendations and their lifecycle
//! - Forecast: bounded predicted-event records
//! - Memory: pattern/anomaly records and summaries
//! - Stats: shift-scoped impact aggregates
//! - Remote: remote-model wire contract and fallback outcomes

mod decision;
mod forecast;
mod memory;
mod remote;
mod stats;
mod telemetry;

pub use decision::*;
pub use forecast::*;
pub use memory::*;
pub use remote::*;
pub use stats::*;
pub use telemetry::*;
